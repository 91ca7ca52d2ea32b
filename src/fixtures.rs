use crate::error::SourceError;
use crate::models::{NewTask, Project, TaskRecord, TaskStatus};
use crate::source::{FetchScope, TaskSource};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

const DEMO_PROJECTS: &str = r##"[
  { "id": "p-web", "name": "Website relaunch", "color": "#3b82f6" },
  { "id": "p-mobile", "name": "Mobile app", "color": "#10b981" },
  { "id": "p-ops", "name": "Operations", "color": "#f59e0b" }
]"##;

const DEMO_TASKS: &str = r##"[
  {
    "id": "t-1",
    "title": "Implementar autenticación",
    "description": "Login with email and password, plus password reset",
    "status": "in_progress",
    "priority": "urgent",
    "project_id": "p-web",
    "assigned_to": "u-ana",
    "due_date": "2024-01-20",
    "created_at": "2024-01-02T09:00:00Z",
    "updated_at": "2024-01-08T16:20:00Z"
  },
  {
    "id": "t-2",
    "title": "Design landing page",
    "description": "<p>Hero, pricing table and <b>testimonials</b></p>",
    "status": "completed",
    "priority": "high",
    "project_id": "p-web",
    "assigned_to": "u-luis",
    "due_date": "2024-01-10",
    "created_at": "2024-01-03T10:15:00Z",
    "updated_at": "2024-01-09T11:00:00Z"
  },
  {
    "id": "t-3",
    "title": "Set up push notifications",
    "description": null,
    "status": "pending",
    "priority": "medium",
    "project_id": "p-mobile",
    "assigned_to": "u-ana",
    "due_date": null,
    "created_at": "2024-01-04T08:30:00Z",
    "updated_at": "2024-01-04T08:30:00Z"
  },
  {
    "id": "t-4",
    "title": "Rotate database credentials",
    "description": "Quarterly rotation for the reporting replica",
    "status": "pending",
    "priority": "high",
    "project_id": "p-ops",
    "assigned_to": null,
    "due_date": "2024-01-31",
    "created_at": "2024-01-05T14:45:00Z",
    "updated_at": "2024-01-05T14:45:00Z"
  },
  {
    "id": "t-5",
    "title": "Offline mode for task list",
    "description": "Cache the last fetched board on device",
    "status": "pending",
    "priority": "low",
    "project_id": "p-mobile",
    "assigned_to": "u-marta",
    "due_date": "2024-02-15",
    "created_at": "2024-01-06T09:10:00Z",
    "updated_at": "2024-01-06T09:10:00Z"
  },
  {
    "id": "t-6",
    "title": "Migrate blog to new CMS",
    "description": "Dropped after the relaunch scope review",
    "status": "cancelled",
    "priority": "low",
    "project_id": "p-web",
    "assigned_to": "u-luis",
    "due_date": "2024-01-15",
    "created_at": "2024-01-07T13:00:00Z",
    "updated_at": "2024-01-12T09:40:00Z"
  },
  {
    "id": "t-7",
    "title": "Write incident runbook",
    "description": "Escalation paths and on-call contacts",
    "status": "in_progress",
    "priority": "medium",
    "project_id": "p-ops",
    "assigned_to": "u-ana",
    "due_date": "2024-01-25",
    "created_at": "2024-01-08T15:30:00Z",
    "updated_at": "2024-01-11T10:05:00Z"
  },
  {
    "id": "t-8",
    "title": "App store screenshots",
    "description": null,
    "status": "pending",
    "priority": "urgent",
    "project_id": "p-mobile",
    "assigned_to": "u-marta",
    "due_date": "2024-01-18",
    "created_at": "2024-01-09T17:00:00Z",
    "updated_at": "2024-01-09T17:00:00Z"
  }
]"##;

// In-memory board used when no backend is configured
pub struct FixtureSource {
    tasks: Mutex<Vec<TaskRecord>>,
    projects: Vec<Project>,
    next_id: AtomicU64,
}

impl FixtureSource {
    pub fn new(tasks: Vec<TaskRecord>, projects: Vec<Project>) -> Self {
        let next_id = AtomicU64::new(tasks.len() as u64 + 1);
        FixtureSource {
            tasks: Mutex::new(tasks),
            projects,
            next_id,
        }
    }

    /// The bundled demo board.
    pub fn demo() -> Result<Self, SourceError> {
        let tasks: Vec<TaskRecord> = serde_json::from_str(DEMO_TASKS)?;
        let projects: Vec<Project> = serde_json::from_str(DEMO_PROJECTS)?;
        Ok(FixtureSource::new(tasks, projects))
    }
}

#[async_trait]
impl TaskSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_tasks(&self, scope: &FetchScope) -> Result<Vec<TaskRecord>, SourceError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.iter().filter(|t| scope.admits(t)).cloned().collect())
    }

    async fn fetch_projects(&self) -> Result<Vec<Project>, SourceError> {
        Ok(self.projects.clone())
    }

    async fn update_status(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, SourceError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn create_task(&self, new_task: &NewTask) -> Result<TaskRecord, SourceError> {
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = TaskRecord {
            id: format!("t-new-{}", id),
            title: new_task.title.clone(),
            description: new_task.description.clone(),
            status: new_task.status,
            priority: new_task.priority,
            project_id: new_task.project_id.clone(),
            assigned_to: new_task.assigned_to.clone(),
            due_date: new_task.due_date,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().await.push(task.clone());
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskPriority;

    #[test]
    fn test_demo_board_parses() {
        let source = FixtureSource::demo().unwrap();
        assert_eq!(source.projects.len(), 3);
        assert_eq!(source.tasks.try_lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_fetch_with_scope() {
        let source = FixtureSource::demo().unwrap();
        let scope = FetchScope {
            project_id: Some("p-mobile".to_string()),
            assigned_to: None,
        };
        let tasks = source.fetch_tasks(&scope).await.unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t-3", "t-5", "t-8"]);
    }

    #[tokio::test]
    async fn test_update_status_is_persisted() {
        let source = FixtureSource::demo().unwrap();
        let updated = source.update_status("t-3", TaskStatus::Completed).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);

        let tasks = source.fetch_tasks(&FetchScope::default()).await.unwrap();
        let stored = tasks.iter().find(|t| t.id == "t-3").unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_unknown_task() {
        let source = FixtureSource::demo().unwrap();
        let err = source
            .update_status("missing", TaskStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_create_task_gets_fresh_id() {
        let source = FixtureSource::demo().unwrap();
        let new_task = NewTask {
            title: "Draft release notes".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            project_id: "p-web".to_string(),
            assigned_to: Some("u-ana".to_string()),
            due_date: None,
        };
        let created = source.create_task(&new_task).await.unwrap();
        assert_eq!(created.id, "t-new-9");
        let tasks = source.fetch_tasks(&FetchScope::default()).await.unwrap();
        assert_eq!(tasks.len(), 9);
    }
}
