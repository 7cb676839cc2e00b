//! HTTP client for the AgentRun server.

use futures_util::StreamExt;
use eventsource_stream::Event as MessageEvent;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use agentrun_core::{RunId, RunSummary, StatusEvent};

use crate::error::ClientError;

/// Event name the server leaves off plain data events.
const DEFAULT_EVENT: &str = "message";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartReply {
    run_id: RunId,
}

/// Reply of the pause, resume, toggle and stop endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlReply {
    pub applied: bool,
    #[serde(default)]
    pub run_id: Option<RunId>,
    #[serde(default)]
    pub paused: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ComponentsReply {
    pub count: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEntry {
    pub label: String,
    pub socket_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    detail: String,
}

/// Lifecycle control endpoints.
#[derive(Debug, Clone, Copy)]
pub enum ControlAction {
    Pause,
    Resume,
    Toggle,
    Stop,
}

impl ControlAction {
    fn path(self) -> &'static str {
        match self {
            Self::Pause => "/api/agent/pause",
            Self::Resume => "/api/agent/resume",
            Self::Toggle => "/api/agent/toggle",
            Self::Stop => "/api/agent/stop",
        }
    }
}

/// HTTP client for the server's REST and SSE endpoints.
pub struct AgentClient {
    inner: reqwest::Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Start a run and return its id.
    pub async fn start(&self, task: &str) -> Result<RunId, ClientError> {
        let reply: StartReply = self
            .post_json("/api/agent/start", &json!({ "task": task }))
            .await?;
        Ok(reply.run_id)
    }

    pub async fn control(
        &self,
        action: ControlAction,
        run_id: Option<&RunId>,
    ) -> Result<ControlReply, ClientError> {
        self.post_json(action.path(), &json!({ "runId": run_id }))
            .await
    }

    pub async fn runs(&self) -> Result<Vec<RunSummary>, ClientError> {
        self.get_json("/api/agent/runs").await
    }

    pub async fn components(&self) -> Result<ComponentsReply, ClientError> {
        self.get_json("/api/debug/components").await
    }

    pub async fn tabs(&self, endpoint: Option<&str>) -> Result<Vec<TabEntry>, ClientError> {
        let url = format!("{}/api/browser/tabs", self.base_url);
        debug!(url = %url, "GET request");

        let mut request = self.inner.get(&url);
        if let Some(endpoint) = endpoint {
            request = request.query(&[("endpoint", endpoint)]);
        }
        Self::decode(request.send().await?).await
    }

    /// Follow a run's event stream, calling `on_event` for each event, until
    /// the terminal status event.
    pub async fn stream<F>(&self, run_id: &RunId, mut on_event: F) -> Result<(), ClientError>
    where
        F: FnMut(&MessageEvent),
    {
        let url = format!("{}/api/agent/stream", self.base_url);
        debug!(url = %url, run_id = %run_id, "Opening event stream");

        let request = self.inner.get(&url).query(&[("runId", run_id.as_str())]);
        let mut source =
            EventSource::new(request).map_err(|e| ClientError::Stream(e.to_string()))?;

        // The source reconnects on its own after an error, so every exit closes it.
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => debug!(run_id = %run_id, "Event stream opened"),
                Ok(Event::Message(message)) => {
                    on_event(&message);
                    if is_terminal(&message) {
                        source.close();
                        return Ok(());
                    }
                }
                Err(EventSourceError::StreamEnded) => {
                    source.close();
                    return Err(ClientError::StreamClosed);
                }
                Err(EventSourceError::InvalidStatusCode(status, response)) => {
                    source.close();
                    let text = response.text().await.unwrap_or_default();
                    return Err(api_error(status, text));
                }
                Err(e) => {
                    source.close();
                    return Err(ClientError::Stream(e.to_string()));
                }
            }
        }
        Err(ClientError::StreamClosed)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST request");

        let response = self.inner.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(api_error(status, text))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

fn api_error(status: reqwest::StatusCode, text: String) -> ClientError {
    let detail = serde_json::from_str::<ErrorReply>(&text)
        .map(|e| e.detail)
        .unwrap_or(text);
    ClientError::Api {
        status: status.as_u16(),
        detail,
    }
}

fn is_terminal(event: &MessageEvent) -> bool {
    event.event == StatusEvent::EVENT_NAME
        && serde_json::from_str::<StatusEvent>(&event.data)
            .map(|s| s.is_done())
            .unwrap_or(false)
}

/// Human-readable line for a data event.
pub fn describe(event: &MessageEvent) -> String {
    let Ok(value) = serde_json::from_str::<Value>(&event.data) else {
        return event.data.clone();
    };
    match value.get("type").and_then(Value::as_str) {
        Some("chat") => {
            let message = &value["message"];
            match (message.get("role").and_then(Value::as_str), message.get("content")) {
                (Some(role), Some(Value::String(content))) => format!("[{}] {}", role, content),
                _ => format!("[chat] {}", message),
            }
        }
        Some("log") => format!("[log] {}", value["message"].as_str().unwrap_or_default()),
        _ if event.event == DEFAULT_EVENT => value.to_string(),
        _ => format!("[{}] {}", event.event, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_start_returns_run_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/agent/start")
            .match_body(Matcher::Json(json!({ "task": "go" })))
            .with_status(200)
            .with_body(r#"{"runId":"abc"}"#)
            .create_async()
            .await;

        let client = AgentClient::new(&server.url());
        assert_eq!(client.start("go").await.unwrap(), RunId::new("abc"));
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/agent/start")
            .with_status(400)
            .with_body(r#"{"detail":"Missing task"}"#)
            .create_async()
            .await;

        let client = AgentClient::new(&server.url());
        match client.start("").await {
            Err(ClientError::Api { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Missing task");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_stops_at_status_event() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/stream")
            .match_query(Matcher::UrlEncoded("runId".into(), "r1".into()))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(
                "data: {\"type\":\"chat\",\"message\":{\"role\":\"user\",\"content\":\"go\"}}\n\n\
                 event: status\ndata: {\"state\":\"done\"}\n\n",
            )
            .create_async()
            .await;

        let client = AgentClient::new(&server.url());
        let mut lines = Vec::new();
        client
            .stream(&RunId::new("r1"), |event| lines.push(describe(event)))
            .await
            .unwrap();

        assert_eq!(lines, vec!["[user] go", "[status] {\"state\":\"done\"}"]);
    }

    #[tokio::test]
    async fn test_stream_without_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/stream")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: {\"type\":\"log\",\"message\":\"error: boom\"}\n\n")
            .create_async()
            .await;

        let client = AgentClient::new(&server.url());
        let mut lines = Vec::new();
        let result = client
            .stream(&RunId::new("r1"), |event| lines.push(describe(event)))
            .await;
        assert!(matches!(result, Err(ClientError::StreamClosed)));
        assert_eq!(lines, vec!["[log] error: boom"]);
    }

    #[tokio::test]
    async fn test_stream_error_status_surfaces_detail() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/stream")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body(r#"{"detail":"shutting down"}"#)
            .create_async()
            .await;

        let client = AgentClient::new(&server.url());
        match client.stream(&RunId::new("r1"), |_| {}).await {
            Err(ClientError::Api { status, detail }) => {
                assert_eq!(status, 503);
                assert_eq!(detail, "shutting down");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_split_lines_and_comments() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/stream")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(
                ": keep-alive\r\n\r\n\
                 data: {\"type\":\"chat\",\r\ndata: \"message\":{\"role\":\"assistant\",\"content\":\"hi\"}}\r\n\r\n\
                 event: status\r\ndata: {\"state\":\"done\"}\r\n\r\n",
            )
            .create_async()
            .await;

        let client = AgentClient::new(&server.url());
        let mut lines = Vec::new();
        client
            .stream(&RunId::new("r1"), |event| lines.push(describe(event)))
            .await
            .unwrap();

        assert_eq!(lines, vec!["[assistant] hi", "[status] {\"state\":\"done\"}"]);
    }
}
