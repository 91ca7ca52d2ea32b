use crate::models::{parse_date, TaskPriority, TaskRecord, TaskStatus};
use chrono::{TimeZone, Utc};

pub fn task(id: &str, status: TaskStatus, priority: TaskPriority, due: Option<&str>) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        title: format!("Task {}", id),
        description: None,
        status,
        priority,
        project_id: "p-1".to_string(),
        assigned_to: None,
        due_date: due.and_then(parse_date),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    }
}

pub fn ids(tasks: &[&TaskRecord]) -> Vec<String> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

/// The three-task board used by several scenarios.
pub fn scenario_board() -> Vec<TaskRecord> {
    vec![
        task("1", TaskStatus::Pending, TaskPriority::High, Some("2024-01-20")),
        task("2", TaskStatus::Completed, TaskPriority::Low, Some("2024-01-10")),
        task("3", TaskStatus::Pending, TaskPriority::Urgent, None),
    ]
}
