//! CSV projection of exported tasks.

use crate::{TaskExport, Timestamp};
use std::fmt::Write as _;

/// Header row of every export.
pub const CSV_HEADER: &str = "id,title,description,dueDate,priority,project,completed,createdAt";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of projecting an export query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing matched the filter; no file should be produced.
    Empty,
    Csv { rows: usize, content: String },
}

impl ExportOutcome {
    pub fn from_rows(rows: &[TaskExport]) -> Self {
        if rows.is_empty() {
            return ExportOutcome::Empty;
        }
        ExportOutcome::Csv {
            rows: rows.len(),
            content: to_csv(rows),
        }
    }
}

/// Render rows as CSV with a header line. Every line, including the last,
/// ends with `\n`.
pub fn to_csv(rows: &[TaskExport]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + rows.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in rows {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            row.id,
            escape_field(&row.title),
            escape_field(row.description.as_deref().unwrap_or("")),
            format_timestamp(row.due_date),
            row.priority,
            escape_field(row.project_name.as_deref().unwrap_or("")),
            if row.completed { "Yes" } else { "No" },
            format_timestamp(Some(row.created_at)),
        );
    }
    out
}

/// Quote a field if it contains a comma, a quote or a newline.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_timestamp(ts: Option<Timestamp>) -> String {
    ts.map(|ts| ts.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Priority, TaskId};
    use chrono::{TimeZone, Utc};

    fn row(title: &str) -> TaskExport {
        TaskExport {
            id: TaskId::new(3),
            title: title.to_string(),
            description: None,
            due_date: Some(Utc.with_ymd_and_hms(2026, 1, 2, 9, 30, 0).unwrap()),
            priority: Priority::Medium,
            project_name: Some("Home".to_string()),
            completed: true,
            created_at: Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap(),
        }
    }

    #[test]
    fn test_csv_row_layout() {
        let csv = to_csv(&[row("Buy milk")]);
        assert_eq!(
            csv,
            "id,title,description,dueDate,priority,project,completed,createdAt\n\
             3,Buy milk,,2026-01-02 09:30:00,medium,Home,Yes,2025-12-31 23:59:59\n"
        );
    }

    #[test]
    fn test_escape_quotes_commas_and_newlines() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_missing_due_date_is_empty_field() {
        let mut r = row("x");
        r.due_date = None;
        r.project_name = None;
        r.completed = false;
        let csv = to_csv(&[r]);
        assert!(csv.ends_with("3,x,,,medium,,No,2025-12-31 23:59:59\n"));
    }

    #[test]
    fn test_empty_export_produces_no_file() {
        assert_eq!(ExportOutcome::from_rows(&[]), ExportOutcome::Empty);
        assert!(matches!(
            ExportOutcome::from_rows(&[row("a"), row("b")]),
            ExportOutcome::Csv { rows: 2, .. }
        ));
    }
}
