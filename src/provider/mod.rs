//! Task-tracker collaborator.
//!
//! [`TaskProvider`] is the seam the TUI talks to; [`ClickUp`] is the real
//! implementation over the ClickUp v2 REST API. The provider is stateless:
//! the credential travels with every call so background jobs can share one
//! provider while the user swaps tokens.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::store::{Task, TaskList, TaskStatus};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing API token")]
    MissingToken,
    #[error("unauthorized (token invalid or expired)")]
    Unauthorized,
    #[error("invalid response: {reason}")]
    InvalidResponse { payload: String, reason: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

impl ProviderError {
    /// Whether the error means the credential must be (re-)entered.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::MissingToken | Self::Unauthorized)
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

pub trait TaskProvider: Send + Sync {
    fn get_task(&self, token: &str, id: &str) -> ProviderResult<Task>;

    /// Every task in a list.
    fn get_task_list(&self, token: &str, list_id: &str) -> ProviderResult<Vec<Task>>;

    fn update_task(&self, token: &str, id: &str, status: &TaskStatus) -> ProviderResult<()>;

    /// Workflow statuses available in a list, in board order.
    fn get_statuses(&self, token: &str, list_id: &str) -> ProviderResult<Vec<TaskStatus>>;
}

// ── ClickUp wire types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    id: Option<String>,
    status: String,
}

impl ApiStatus {
    fn into_status(self) -> TaskStatus {
        TaskStatus {
            // Older workspaces omit status ids; the label is unique within a list.
            id: self.id.unwrap_or_else(|| self.status.clone()),
            label: self.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiListRef {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTask {
    id: String,
    name: String,
    status: ApiStatus,
    list: ApiListRef,
}

impl ApiTask {
    fn into_task(self) -> Task {
        Task {
            id: self.id,
            name: self.name,
            status: self.status.into_status(),
            list: TaskList {
                id: self.list.id,
                name: self.list.name,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiTaskPage {
    tasks: Vec<ApiTask>,
}

#[derive(Debug, Deserialize)]
struct ApiList {
    statuses: Vec<ApiStatus>,
}

// ── ClickUp client ───────────────────────────────────────────────────

pub struct ClickUp {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ClickUp {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("worktask/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(|e| anyhow::anyhow!("build http client: {e}"))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder, token: &str) -> ProviderResult<String> {
        if token.is_empty() {
            return Err(ProviderError::MissingToken);
        }
        let resp = req
            .header(reqwest::header::AUTHORIZATION, token)
            .send()?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        Ok(resp.text()?)
    }

    fn get_json<T: DeserializeOwned>(&self, token: &str, path: &str) -> ProviderResult<T> {
        let body = self.send(self.client.get(self.url(path)), token)?;
        parse_body(&body)
    }
}

/// Parse a response body, keeping the raw payload when it does not match the schema.
fn parse_body<T: DeserializeOwned>(body: &str) -> ProviderResult<T> {
    serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse {
        payload: body.to_string(),
        reason: e.to_string(),
    })
}

impl TaskProvider for ClickUp {
    fn get_task(&self, token: &str, id: &str) -> ProviderResult<Task> {
        let task: ApiTask = self.get_json(token, &format!("/task/{id}"))?;
        Ok(task.into_task())
    }

    fn get_task_list(&self, token: &str, list_id: &str) -> ProviderResult<Vec<Task>> {
        let page: ApiTaskPage = self.get_json(token, &format!("/list/{list_id}/task"))?;
        Ok(page.tasks.into_iter().map(ApiTask::into_task).collect())
    }

    fn update_task(&self, token: &str, id: &str, status: &TaskStatus) -> ProviderResult<()> {
        let body = serde_json::json!({ "status": status.label });
        let req = self.client.put(self.url(&format!("/task/{id}"))).json(&body);
        let resp = self.send(req, token)?;
        // The API echoes the task back; make sure it is one.
        let _: ApiTask = parse_body(&resp)?;
        Ok(())
    }

    fn get_statuses(&self, token: &str, list_id: &str) -> ProviderResult<Vec<TaskStatus>> {
        let list: ApiList = self.get_json(token, &format!("/list/{list_id}"))?;
        Ok(list
            .statuses
            .into_iter()
            .map(ApiStatus::into_status)
            .collect())
    }
}
