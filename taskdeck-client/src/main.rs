//! Taskdeck command-line entry point.

use chrono::Local;
use std::sync::Arc;
use taskdeck_client::api_client::RestClient;
use taskdeck_client::config::ClientConfig;
use taskdeck_client::error::ClientError;
use taskdeck_client::notifications::{Notification, NotificationLevel};
use taskdeck_client::persistence;
use taskdeck_client::{MutationCoordinator, RemoteStore, TaskView, ViewSnapshot};
use taskdeck_core::{
    format_due_date, is_overdue, ExportOutcome, FilterUpdate, Priority, Task, TaskDraft, TaskId,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage: taskdeck --config <path> <list [page] | search <text> | add <title> | done <id> | rm <id> | projects | export>";

#[derive(Debug)]
enum Command {
    List { page: u32 },
    Search { text: String },
    Add { title: String },
    Done { id: TaskId },
    Remove { id: TaskId },
    Projects,
    Export,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();

    let config = ClientConfig::load().map_err(ClientError::from)?;
    let command = parse_command(command_args())?;

    let remote: Arc<dyn RemoteStore> = Arc::new(RestClient::new(&config).map_err(ClientError::from)?);
    let coordinator = MutationCoordinator::new(remote, config.cache_config());
    let mut view = TaskView::new(coordinator, config.page_size, config.search_debounce());

    match persistence::load(&config.persistence_path) {
        Ok(Some(state)) => view.restore_preferences(&state),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "Ignoring unreadable preferences"),
    }

    let outcome = run(&mut view, command).await;
    for notification in view.take_notifications() {
        print_notification(&notification);
    }

    if let Err(err) = persistence::save(&config.persistence_path, &view.preferences()) {
        tracing::warn!(error = %err, "Failed to save preferences");
    }
    outcome?;
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskdeck=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

/// Arguments after the program name, without the `--config <path>` pair.
fn command_args() -> Vec<String> {
    let mut args = std::env::args().skip(1);
    let mut rest = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            args.next();
            continue;
        }
        rest.push(arg);
    }
    rest
}

fn parse_command(args: Vec<String>) -> Result<Command, ClientError> {
    let usage = || ClientError::Usage(USAGE.to_string());
    let mut args = args.into_iter();
    let name = args.next().ok_or_else(usage)?;
    let rest: Vec<String> = args.collect();

    let parse_id = |rest: &[String]| -> Result<TaskId, ClientError> {
        let raw = rest.first().ok_or_else(usage)?;
        raw.parse::<TaskId>()
            .map_err(|_| ClientError::Usage(format!("not a task id: {}", raw)))
    };

    match name.as_str() {
        "list" => {
            let page = match rest.first() {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| ClientError::Usage(format!("not a page number: {}", raw)))?,
                None => 1,
            };
            Ok(Command::List { page })
        }
        "search" if !rest.is_empty() => Ok(Command::Search {
            text: rest.join(" "),
        }),
        "add" if !rest.is_empty() => Ok(Command::Add {
            title: rest.join(" "),
        }),
        "done" => Ok(Command::Done { id: parse_id(&rest)? }),
        "rm" => Ok(Command::Remove { id: parse_id(&rest)? }),
        "projects" => Ok(Command::Projects),
        "export" => Ok(Command::Export),
        _ => Err(usage()),
    }
}

async fn run(view: &mut TaskView, command: Command) -> Result<(), ClientError> {
    match command {
        Command::List { page } => {
            view.update(FilterUpdate::Page(page));
            let snapshot = view.load().await;
            print_page(view, &snapshot).await;
        }
        Command::Search { text } => {
            view.type_search(text);
            view.settle_search().await;
            let snapshot = view.load().await;
            print_page(view, &snapshot).await;
        }
        Command::Add { title } => {
            let task = view
                .create_task(&TaskDraft::new(title, Priority::Medium))
                .await?;
            println!("created #{} {}", task.id, task.title);
        }
        Command::Done { id } => {
            view.load().await;
            let outcome = view.toggle_complete(id).await?;
            if let Some(task) = outcome.task {
                println!("{}", format_task(&task));
            }
        }
        Command::Remove { id } => {
            view.delete_task(id).await?;
            println!("deleted #{}", id);
        }
        Command::Projects => {
            let projects = view.coordinator().projects().await?;
            for project in projects.iter() {
                println!("#{} {}", project.id, project.name);
            }
        }
        Command::Export => {
            if let ExportOutcome::Csv { content, .. } = view.export().await? {
                print!("{}", content);
            }
        }
    }
    Ok(())
}

async fn print_page(view: &TaskView, snapshot: &ViewSnapshot) {
    let projects = match view.coordinator().projects().await {
        Ok(projects) => projects.to_vec(),
        Err(err) => {
            tracing::debug!(error = %err, "Project list unavailable");
            Vec::new()
        }
    };
    println!("{}", view.view_title(&projects));

    if let Some(err) = &snapshot.last_error {
        eprintln!("warning: showing last known tasks ({})", err);
    }
    if let Some(empty) = snapshot.empty_state {
        println!("{}", empty.message());
        if let Some(hint) = empty.hint() {
            println!("{}", hint);
        }
        return;
    }

    for task in &snapshot.active {
        println!("{}", format_task(task));
    }
    if snapshot.show_separator {
        println!("--");
    }
    for task in &snapshot.completed {
        println!("{}", format_task(task));
    }
    if let Some(page) = &snapshot.pagination {
        println!(
            "page {} of {} ({} tasks)",
            page.current_page, page.total_pages, page.total_items
        );
    }
}

fn format_task(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let mut line = format!("[{}] #{} {} ({})", mark, task.id, task.title, task.priority.as_str());
    if let Some(due) = task.due_date {
        let now = Local::now();
        let due = due.with_timezone(&Local);
        line.push_str(&format!(", due {}", format_due_date(&due, &now)));
        if !task.completed && is_overdue(&due, &now) {
            line.push_str(", overdue");
        }
    }
    line
}

fn print_notification(notification: &Notification) {
    let prefix = match notification.level {
        NotificationLevel::Error => "error",
        NotificationLevel::Warning => "warning",
        NotificationLevel::Success | NotificationLevel::Info => "ok",
    };
    eprintln!("{}: {}", prefix, notification.message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_list_defaults_to_first_page() {
        assert!(matches!(parse_command(args(&["list"])), Ok(Command::List { page: 1 })));
        assert!(matches!(parse_command(args(&["list", "3"])), Ok(Command::List { page: 3 })));
    }

    #[test]
    fn test_parse_joins_free_text() {
        match parse_command(args(&["add", "buy", "milk"])) {
            Ok(Command::Add { title }) => assert_eq!(title, "buy milk"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command(args(&[])).is_err());
        assert!(parse_command(args(&["done", "seven"])).is_err());
        assert!(parse_command(args(&["search"])).is_err());
        assert!(parse_command(args(&["frobnicate"])).is_err());
    }
}
