use crate::error::SourceError;
use crate::models::{NewTask, Project, TaskRecord, TaskStatus};
use crate::source::{FetchScope, TaskSource};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

// REST client for the hosted backend's table endpoints
pub struct RemoteSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteSource {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        RemoteSource {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn read_rows<T: DeserializeOwned>(res: Response) -> Result<Vec<T>, SourceError> {
        if res.status().is_success() {
            let body = res.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let status = res.status().as_u16();
            let body = res.text().await?;
            warn!(status, %body, "backend rejected request");
            Err(SourceError::Backend { status, body })
        }
    }
}

#[async_trait]
impl TaskSource for RemoteSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn fetch_tasks(&self, scope: &FetchScope) -> Result<Vec<TaskRecord>, SourceError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(project) = &scope.project_id {
            query.push(("project_id", format!("eq.{}", project)));
        }
        if let Some(user) = &scope.assigned_to {
            query.push(("assigned_to", format!("eq.{}", user)));
        }

        let res = self
            .authorize(self.client.get(self.table_url("tasks")))
            .query(&query)
            .send()
            .await?;
        let tasks: Vec<TaskRecord> = Self::read_rows(res).await?;
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    async fn fetch_projects(&self) -> Result<Vec<Project>, SourceError> {
        let res = self
            .authorize(self.client.get(self.table_url("projects")))
            .query(&[("select", "id,name,color"), ("order", "name.asc")])
            .send()
            .await?;
        Self::read_rows(res).await
    }

    async fn update_status(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, SourceError> {
        let body = json!({
            "status": status,
            "updated_at": Utc::now(),
        });

        let res = self
            .authorize(self.client.patch(self.table_url("tasks")))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        let rows: Vec<TaskRecord> = Self::read_rows(res).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }

    async fn create_task(&self, task: &NewTask) -> Result<TaskRecord, SourceError> {
        let res = self
            .authorize(self.client.post(self.table_url("tasks")))
            .header("Prefer", "return=representation")
            .json(task)
            .send()
            .await?;

        let rows: Vec<TaskRecord> = Self::read_rows(res).await?;
        rows.into_iter().next().ok_or_else(|| SourceError::Backend {
            status: 201,
            body: "insert returned no rows".to_string(),
        })
    }
}
