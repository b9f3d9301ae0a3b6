// src/display.rs

//! Plain-text rendering of task views for the `list` and `show` commands.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::registry::TaskView;
use crate::types::TaskName;

fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One row per task: name, reported status, priority, next run.
pub fn format_task_table(tasks: &[TaskView]) -> String {
    if tasks.is_empty() {
        return "No tasks found.\n".to_string();
    }

    let width = tasks
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:<9}  {:<8}  NEXT RUN",
        "NAME", "STATUS", "PRIORITY"
    );
    for t in tasks {
        let _ = writeln!(
            out,
            "{:<width$}  {:<9}  {:<8}  {}",
            t.name,
            t.status.to_string(),
            t.priority.to_string(),
            fmt_time(t.next_run)
        );
    }
    out
}

/// Every field of one task, plus the tasks that depend on it.
pub fn format_task_details(task: &TaskView, dependents: &[TaskName]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Task: {}", task.name);
    let _ = writeln!(out, "  command:      {}", task.command);
    let _ = writeln!(out, "  status:       {}", task.status);
    let _ = writeln!(out, "  priority:     {}", task.priority);
    let _ = write!(out, "  frequency:    {}", task.frequency);
    if !task.custom_schedule.is_empty() {
        let _ = write!(out, " ({})", task.custom_schedule);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  created:      {}", fmt_time(Some(task.created_at)));
    let _ = writeln!(out, "  last run:     {}", fmt_time(task.last_run));
    let _ = writeln!(out, "  next run:     {}", fmt_time(task.next_run));
    let _ = writeln!(out, "  retries:      {}/{}", task.retry_count, task.max_retries);
    if !task.dependencies.is_empty() {
        let _ = writeln!(out, "  depends on:   {}", task.dependencies.join(", "));
    }
    if !dependents.is_empty() {
        let _ = writeln!(out, "  needed by:    {}", dependents.join(", "));
    }
    if !task.error_message.is_empty() {
        let _ = writeln!(out, "  last error:   {}", task.error_message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Task;
    use crate::types::{Priority, TaskStatus};

    fn view(name: &str) -> TaskView {
        let created = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        TaskView::from_task(&Task::new(name, "echo hi", Priority::High, created), true)
    }

    #[test]
    fn empty_table() {
        assert_eq!(format_task_table(&[]), "No tasks found.\n");
    }

    #[test]
    fn table_has_header_and_rows() {
        let out = format_task_table(&[view("backup"), view("verify")]);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("backup"));
        assert!(lines[1].contains("pending"));
        assert!(lines[1].contains("high"));
        assert!(lines[1].ends_with('-'));
    }

    #[test]
    fn details_include_error_and_relations() {
        let mut v = view("verify");
        v.status = TaskStatus::Failed;
        v.error_message = "checksum mismatch".into();
        v.dependencies = vec!["backup".into()];
        let out = format_task_details(&v, &["report".to_string()]);
        assert!(out.contains("depends on:   backup"));
        assert!(out.contains("needed by:    report"));
        assert!(out.contains("last error:   checksum mismatch"));
        assert!(out.contains("created:      2026-01-02 03:04:05 UTC"));
    }
}
