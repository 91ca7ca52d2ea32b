// Where tasks come from: the hosted backend or the bundled demo board

use crate::api::RemoteSource;
use crate::config::{Settings, SourceKind};
use crate::error::{ConfigError, SourceError, StartupError};
use crate::fixtures::FixtureSource;
use crate::models::{NewTask, Project, TaskRecord, TaskStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchScope {
    pub project_id: Option<String>,
    pub assigned_to: Option<String>,
}

impl FetchScope {
    pub fn admits(&self, task: &TaskRecord) -> bool {
        self.project_id.as_ref().map_or(true, |p| *p == task.project_id)
            && self
                .assigned_to
                .as_ref()
                .map_or(true, |u| task.assigned_to.as_ref() == Some(u))
    }
}

#[async_trait]
pub trait TaskSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_tasks(&self, scope: &FetchScope) -> Result<Vec<TaskRecord>, SourceError>;

    async fn fetch_projects(&self) -> Result<Vec<Project>, SourceError>;

    /// Writes a new status and returns the stored task.
    async fn update_status(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, SourceError>;

    async fn create_task(&self, task: &NewTask) -> Result<TaskRecord, SourceError>;
}

pub fn build_source(settings: &Settings) -> Result<Arc<dyn TaskSource>, StartupError> {
    let source: Arc<dyn TaskSource> = match settings.source {
        SourceKind::Remote => {
            let url = settings.backend_url.as_deref().ok_or(ConfigError::Missing("backend_url"))?;
            let key = settings.api_key.as_deref().ok_or(ConfigError::Missing("api_key"))?;
            Arc::new(RemoteSource::new(url, key))
        }
        SourceKind::Fixture => Arc::new(FixtureSource::demo()?),
    };
    info!(source = source.name(), "task source selected");
    Ok(source)
}
