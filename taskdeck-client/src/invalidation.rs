//! Which cache namespaces each mutation invalidates, and when.

/// A cached resource collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Tasks,
    Projects,
    DisplayName,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Tasks => "tasks",
            Namespace::Projects => "projects",
            Namespace::DisplayName => "display_name",
        }
    }
}

/// How a remote call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Success,
    Failure,
}

/// Every mutation the coordinator issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    CreateTask,
    UpdateTask,
    DeleteTask,
    ToggleTask,
    CreateProject,
    RenameProject,
    DeleteProject,
    SetDisplayName,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::CreateTask => "create_task",
            Mutation::UpdateTask => "update_task",
            Mutation::DeleteTask => "delete_task",
            Mutation::ToggleTask => "toggle_task",
            Mutation::CreateProject => "create_project",
            Mutation::RenameProject => "rename_project",
            Mutation::DeleteProject => "delete_project",
            Mutation::SetDisplayName => "set_display_name",
        }
    }

    /// Namespaces to invalidate once the remote call has settled.
    ///
    /// Form-gated mutations invalidate on success only; a failure leaves the
    /// cache untouched. Toggle and display-name changes invalidate on every
    /// settlement, since the local view may already disagree with the store.
    pub fn invalidates(&self, settlement: Settlement) -> &'static [Namespace] {
        use Namespace::*;
        match (self, settlement) {
            (Mutation::ToggleTask, _) => &[Tasks],
            (Mutation::SetDisplayName, _) => &[DisplayName],
            (_, Settlement::Failure) => &[],
            (Mutation::CreateTask | Mutation::UpdateTask | Mutation::DeleteTask, _) => &[Tasks],
            (Mutation::CreateProject | Mutation::RenameProject, _) => &[Projects],
            (Mutation::DeleteProject, _) => &[Projects, Tasks],
        }
    }

    /// Whether the mutation patches cached data before the remote answers.
    pub fn is_optimistic(&self) -> bool {
        matches!(self, Mutation::ToggleTask)
    }
}
