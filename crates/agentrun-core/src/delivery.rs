//! Delivery messages queued for observers and the wire events they become.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A unit of streamed information queued for the observers of one run.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryMessage {
    /// A progress entry observed in the run's progress log.
    Chat { content: Value },
    /// Human-readable description of a runner failure.
    Error { description: String },
    /// Terminal sentinel. Exactly one per queue, always last.
    Done,
}

impl DeliveryMessage {
    /// Create a chat message from a progress entry.
    pub fn chat(content: Value) -> Self {
        Self::Chat { content }
    }

    /// Create an error message.
    pub fn error(description: impl Into<String>) -> Self {
        Self::Error {
            description: description.into(),
        }
    }

    /// Returns true for the terminal sentinel.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Translate the message into what gets pushed to an observer.
    ///
    /// Structured entries are forwarded as `chat` events; free-form error text
    /// is wrapped as a generic `log` event.
    pub fn to_frame(&self) -> WireFrame {
        match self {
            Self::Chat { content } => WireFrame::Data(WireEvent::Chat {
                message: content.clone(),
            }),
            Self::Error { description } => WireFrame::Data(WireEvent::Log {
                message: format!("error: {}", description),
            }),
            Self::Done => WireFrame::Status(StatusEvent::done()),
        }
    }
}

/// Data event pushed by the stream endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// `{"type":"chat","message":<progress entry>}`
    Chat { message: Value },
    /// `{"type":"log","message":"..."}`
    Log { message: String },
}

/// Terminal status event, `{"state":"done"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub state: String,
}

impl StatusEvent {
    /// SSE event name carrying status events.
    pub const EVENT_NAME: &'static str = "status";

    /// The terminal `done` state.
    pub fn done() -> Self {
        Self {
            state: "done".to_string(),
        }
    }

    /// Returns true for the terminal `done` state.
    pub fn is_done(&self) -> bool {
        self.state == "done"
    }
}

/// One frame of the push stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WireFrame {
    /// Unnamed SSE data event.
    Data(WireEvent),
    /// Named `status` event. Ends the stream.
    Status(StatusEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_forwarded_as_chat_event() {
        let msg = DeliveryMessage::chat(json!({"role": "assistant", "content": "hi"}));
        let WireFrame::Data(event) = msg.to_frame() else {
            panic!("expected data frame");
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "chat", "message": {"role": "assistant", "content": "hi"}})
        );
    }

    #[test]
    fn test_error_wrapped_as_log_event() {
        let msg = DeliveryMessage::error("browser closed");
        let WireFrame::Data(event) = msg.to_frame() else {
            panic!("expected data frame");
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "log", "message": "error: browser closed"})
        );
    }

    #[test]
    fn test_done_becomes_status_frame() {
        let frame = DeliveryMessage::Done.to_frame();
        assert_eq!(frame, WireFrame::Status(StatusEvent::done()));
        assert_eq!(
            serde_json::to_value(StatusEvent::done()).unwrap(),
            json!({"state": "done"})
        );
    }
}
