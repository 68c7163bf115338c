//! HTTP implementation of the remote store.

use crate::config::{AuthConfig, ClientConfig};
use crate::remote::RemoteStore;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use taskdeck_core::wire::{
    WirePage, WirePageRequest, WireProject, WireTask, WireTaskExport, WireTaskFields,
    WireTaskFilter,
};
use taskdeck_core::{
    ApiFilter, PaginatedResult, Project, ProjectId, RemoteError, Task, TaskDraft, TaskExport,
    TaskId,
};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl From<ApiClientError> for RemoteError {
    fn from(err: ApiClientError) -> Self {
        match err {
            ApiClientError::Http(err) => RemoteError::transport(err.to_string()),
            ApiClientError::Rejected { message, .. } => RemoteError::rejected(message),
            other => RemoteError::rejected(other.to_string()),
        }
    }
}

/// Error body returned by the store on a refused request.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskQueryBody {
    filter: WireTaskFilter,
    #[serde(flatten)]
    page: WirePageRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportBody {
    filter: WireTaskFilter,
}

#[derive(Debug, Serialize)]
struct ProjectNameBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayNameBody {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!(method = "GET", path, "Remote request");
        let response = self
            .client
            .get(self.url(path))
            .headers(self.auth_header.clone())
            .send()
            .await?;
        parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        debug!(method = "POST", path, "Remote request");
        let response = self
            .client
            .post(self.url(path))
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await?;
        parse_response(response).await
    }

    async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        debug!(method = "PUT", path, "Remote request");
        let response = self
            .client
            .put(self.url(path))
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await?;
        parse_response(response).await
    }

    /// PUT whose response body, if any, is ignored.
    async fn put_unit<B>(&self, path: &str, body: &B) -> Result<(), ApiClientError>
    where
        B: serde::Serialize + ?Sized,
    {
        debug!(method = "PUT", path, "Remote request");
        let response = self
            .client
            .put(self.url(path))
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    /// POST without a body, for actions addressed entirely by path.
    async fn post_action<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!(method = "POST", path, "Remote request");
        let response = self
            .client
            .post(self.url(path))
            .headers(self.auth_header.clone())
            .send()
            .await?;
        parse_response(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiClientError> {
        debug!(method = "DELETE", path, "Remote request");
        let response = self
            .client
            .delete(self.url(path))
            .headers(self.auth_header.clone())
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiClientError> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await?;
    Err(rejection(status.as_u16(), &text))
}

fn rejection(status: u16, text: &str) -> ApiClientError {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) => {
            debug!(status, code = body.code.as_deref().unwrap_or(""), "Request rejected");
            ApiClientError::Rejected {
                status,
                message: body.message,
            }
        }
        Err(_) => ApiClientError::InvalidResponse(format!("HTTP {}: {}", status, text)),
    }
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    if let Some(token) = &auth.bearer_token {
        let value = format!("Bearer {}", token);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

#[async_trait]
impl RemoteStore for RestClient {
    async fn list_tasks(
        &self,
        filter: &ApiFilter,
        page: u32,
        page_size: u32,
    ) -> Result<PaginatedResult, RemoteError> {
        let body = TaskQueryBody {
            filter: WireTaskFilter::from(filter),
            page: WirePageRequest {
                page,
                limit: page_size,
            },
        };
        let wire: WirePage = self.post_json("/api/v1/tasks/query", &body).await?;
        Ok(PaginatedResult::try_from(wire)?)
    }

    async fn create_task(&self, fields: &TaskDraft) -> Result<Task, RemoteError> {
        let body = WireTaskFields::try_from(fields)?;
        let wire: WireTask = self.post_json("/api/v1/tasks", &body).await?;
        Ok(Task::try_from(wire)?)
    }

    async fn update_task(&self, id: TaskId, fields: &TaskDraft) -> Result<Task, RemoteError> {
        let body = WireTaskFields::try_from(fields)?;
        let path = format!("/api/v1/tasks/{}", id);
        let wire: WireTask = self.put_json(&path, &body).await?;
        Ok(Task::try_from(wire)?)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError> {
        let path = format!("/api/v1/tasks/{}", id);
        Ok(self.delete(&path).await?)
    }

    async fn toggle_task_complete(&self, id: TaskId) -> Result<Task, RemoteError> {
        let path = format!("/api/v1/tasks/{}/toggle", id);
        let wire: WireTask = self.post_action(&path).await?;
        Ok(Task::try_from(wire)?)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError> {
        let wire: Vec<WireProject> = self.get_json("/api/v1/projects").await?;
        Ok(wire.into_iter().map(Project::from).collect())
    }

    async fn create_project(&self, name: &str) -> Result<Project, RemoteError> {
        let wire: WireProject = self
            .post_json("/api/v1/projects", &ProjectNameBody { name })
            .await?;
        Ok(Project::from(wire))
    }

    async fn rename_project(&self, id: ProjectId, name: &str) -> Result<Project, RemoteError> {
        let path = format!("/api/v1/projects/{}", id);
        let wire: WireProject = self.put_json(&path, &ProjectNameBody { name }).await?;
        Ok(Project::from(wire))
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), RemoteError> {
        let path = format!("/api/v1/projects/{}", id);
        Ok(self.delete(&path).await?)
    }

    async fn export_tasks(&self, filter: &ApiFilter) -> Result<Vec<TaskExport>, RemoteError> {
        let body = ExportBody {
            filter: WireTaskFilter::from(filter),
        };
        let wire: Vec<WireTaskExport> = self.post_json("/api/v1/tasks/export", &body).await?;
        wire.into_iter()
            .map(|row| TaskExport::try_from(row).map_err(RemoteError::from))
            .collect()
    }

    async fn get_display_name(&self) -> Result<Option<String>, RemoteError> {
        let body: DisplayNameBody = self.get_json("/api/v1/profile/display-name").await?;
        Ok(body.display_name)
    }

    async fn set_display_name(&self, name: &str) -> Result<(), RemoteError> {
        let body = DisplayNameBody {
            display_name: Some(name.to_string()),
        };
        Ok(self.put_unit("/api/v1/profile/display-name", &body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::{FilterState, Priority, SortBy};

    fn auth(api_key: Option<&str>, bearer_token: Option<&str>) -> AuthConfig {
        AuthConfig {
            api_key: api_key.map(str::to_string),
            bearer_token: bearer_token.map(str::to_string),
        }
    }

    #[test]
    fn test_auth_headers_carry_both_credentials() {
        let headers = build_auth_headers(&auth(Some("key"), Some("token"))).unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "key");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer token");
    }

    #[test]
    fn test_auth_header_rejects_invalid_value() {
        let err = build_auth_headers(&auth(Some("bad\nkey"), None)).unwrap_err();
        assert!(matches!(err, ApiClientError::Config(_)));
    }

    #[test]
    fn test_error_body_becomes_rejection_message() {
        let err = rejection(409, r#"{"code":"conflict","message":"Project name already exists"}"#);
        let remote = RemoteError::from(err);
        assert_eq!(remote, RemoteError::rejected("Project name already exists"));
    }

    #[test]
    fn test_unparseable_error_body_keeps_status() {
        let err = rejection(502, "bad gateway");
        assert_eq!(err.to_string(), "Unexpected response: HTTP 502: bad gateway");
        assert!(matches!(RemoteError::from(err), RemoteError::Rejected { .. }));
    }

    #[test]
    fn test_query_body_flattens_page_request() {
        let mut state = FilterState::new();
        state.set_priority_filter(Some(Priority::High));
        state.set_sort_by(SortBy::AlphaAsc);
        let body = TaskQueryBody {
            filter: WireTaskFilter::from(&state.api_filter()),
            page: WirePageRequest { page: 2, limit: 20 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 20);
        assert_eq!(json["filter"]["priority"], "high");
        assert_eq!(json["filter"]["sortBy"], "alphaAsc");
        assert!(json["filter"].get("searchQuery").is_none());
    }

    #[test]
    fn test_display_name_body_is_camel_case() {
        let body: DisplayNameBody = serde_json::from_str(r#"{"displayName":"Ada"}"#).unwrap();
        assert_eq!(body.display_name.as_deref(), Some("Ada"));
        let empty: DisplayNameBody = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.display_name, None);
    }
}
