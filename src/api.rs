//! HTTP client for the project/task backend.
//!
//! Every endpoint answers with an envelope `{ "data": ... }`, which is
//! unwrapped here so callers only ever see typed payloads. Failures are
//! normalised into [`Error`] with a display-ready message taken from the
//! backend's `{ "message": ... }` body when there is one, else from the
//! transport, else a generic fallback.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result, GENERIC_ERROR_MESSAGE};
use crate::fields::Status;
use crate::project::{Project, ProjectInput};
use crate::task::{NewTask, Task, TaskEdit};

/// Everything the store, the CLI and the board need from the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn create_project(&self, input: &ProjectInput) -> Result<Project>;
    async fn update_project(&self, id: &str, input: &ProjectInput) -> Result<Project>;
    async fn delete_project(&self, id: &str) -> Result<()>;

    async fn list_tasks_by_project(&self, project_id: &str) -> Result<Vec<Task>>;
    async fn create_task(&self, input: &NewTask) -> Result<Task>;
    async fn update_task(&self, id: &str, input: &TaskEdit) -> Result<Task>;
    async fn delete_task(&self, id: &str) -> Result<()>;
    async fn set_task_status(&self, id: &str, status: Status) -> Result<Task>;

    async fn summarize_project(&self, project_id: &str) -> Result<String>;
    async fn answer_task_question(&self, task_id: &str, question: &str) -> Result<String>;
    async fn suggest_for_task(&self, task_id: &str) -> Result<String>;
}

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: Status,
}

#[derive(Debug, Serialize)]
struct QuestionBody<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: String,
}

#[derive(Debug, Deserialize)]
struct AnswerPayload {
    answer: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionsPayload {
    suggestions: String,
}

/// reqwest-backed implementation of [`Backend`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g. `http://localhost:5000/api`).
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid API URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("API URL '{base_url}' cannot be a base")));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Join path segments onto the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        tracing::debug!(%method, %url, "backend request");
        self.client
            .request(method, url)
            .header("Content-Type", "application/json")
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            let message = e.to_string();
            tracing::warn!(error = %message, "backend unreachable");
            if message.is_empty() {
                Error::Network(GENERIC_ERROR_MESSAGE.to_string())
            } else {
                Error::Network(message)
            }
        })?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "backend response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(backend_error(status.as_u16(), &body))
    }

    /// Send a request and unwrap the `data` field of the envelope.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.dispatch(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    /// Send a request whose payload is not needed.
    async fn execute(&self, request: RequestBuilder) -> Result<()> {
        self.dispatch(request).await.map(|_| ())
    }
}

/// Build the error for a non-success response.
///
/// A structured `{ "message": ... }` body wins; otherwise the status line is
/// reported the way the transport would.
pub fn backend_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status code {status}"));
    Error::Backend { status, message }
}

#[async_trait]
impl Backend for ApiClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.fetch(self.request(Method::GET, &["projects"])).await
    }

    async fn create_project(&self, input: &ProjectInput) -> Result<Project> {
        input.validate()?;
        self.fetch(self.request(Method::POST, &["projects"]).json(input))
            .await
    }

    async fn update_project(&self, id: &str, input: &ProjectInput) -> Result<Project> {
        input.validate()?;
        self.fetch(self.request(Method::PUT, &["projects", id]).json(input))
            .await
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.execute(self.request(Method::DELETE, &["projects", id]))
            .await
    }

    async fn list_tasks_by_project(&self, project_id: &str) -> Result<Vec<Task>> {
        self.fetch(self.request(Method::GET, &["tasks", "project", project_id]))
            .await
    }

    async fn create_task(&self, input: &NewTask) -> Result<Task> {
        input.validate()?;
        self.fetch(self.request(Method::POST, &["tasks"]).json(input))
            .await
    }

    async fn update_task(&self, id: &str, input: &TaskEdit) -> Result<Task> {
        input.validate()?;
        self.fetch(self.request(Method::PUT, &["tasks", id]).json(input))
            .await
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.execute(self.request(Method::DELETE, &["tasks", id]))
            .await
    }

    async fn set_task_status(&self, id: &str, status: Status) -> Result<Task> {
        self.fetch(
            self.request(Method::PATCH, &["tasks", id, "status"])
                .json(&StatusBody { status }),
        )
        .await
    }

    async fn summarize_project(&self, project_id: &str) -> Result<String> {
        let payload: SummaryPayload = self
            .fetch(self.request(Method::GET, &["ai", "summarize", project_id]))
            .await?;
        Ok(payload.summary)
    }

    async fn answer_task_question(&self, task_id: &str, question: &str) -> Result<String> {
        crate::error::require_non_empty(question, "Question")?;
        let payload: AnswerPayload = self
            .fetch(
                self.request(Method::POST, &["ai", "question", task_id])
                    .json(&QuestionBody { question }),
            )
            .await?;
        Ok(payload.answer)
    }

    async fn suggest_for_task(&self, task_id: &str) -> Result<String> {
        let payload: SuggestionsPayload = self
            .fetch(self.request(Method::GET, &["ai", "suggestions", task_id]))
            .await?;
        Ok(payload.suggestions)
    }
}
