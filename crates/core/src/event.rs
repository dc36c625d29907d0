//! Channel protocol - inbound frames and outbound lifecycle events.
//!
//! Events are JSON-framed, internally tagged on `type`. The transport
//! (WebSocket, in the gateway) is out of scope here; only the message
//! contract lives in core so every crate can speak it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::KnowledgeEntry;
use crate::composite::CompositeResult;
use crate::error::ChannelError;
use crate::plan::ProviderName;

/// Byte-size ceiling for a single inbound frame.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Character ceiling for the free-text request in `submit_request`.
pub const MAX_REQUEST_CHARS: usize = 4_000;

// ── Inbound ───────────────────────────────────────────────────────────────

/// A validated inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Ping,
    SubmitRequest { client_id: String, text: String },
}

impl InboundFrame {
    /// Validate and parse one raw text frame.
    ///
    /// Applied before any business logic runs: rejects oversized frames,
    /// non-JSON and non-object payloads, unrecognized `type` tags, and
    /// `submit_request` frames with a missing client id or empty/oversized
    /// text. Every rejection maps to a typed error the caller reports back
    /// without closing the channel.
    pub fn parse(raw: &str) -> std::result::Result<Self, ChannelError> {
        if raw.len() > MAX_FRAME_BYTES {
            return Err(ChannelError::FrameTooLarge {
                size: raw.len(),
                limit: MAX_FRAME_BYTES,
            });
        }

        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ChannelError::InvalidFrame(format!("not valid JSON: {e}")))?;

        let obj = value
            .as_object()
            .ok_or_else(|| ChannelError::InvalidFrame("frame must be a JSON object".into()))?;

        let msg_type = obj
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ChannelError::InvalidFrame("missing \"type\" tag".into()))?;

        match msg_type {
            "ping" => Ok(Self::Ping),
            "submit_request" => {
                let client_id = obj
                    .get("client_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                let text = obj
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if client_id.is_empty() {
                    return Err(ChannelError::InvalidRequest(
                        "submit_request requires a non-empty client_id".into(),
                    ));
                }
                if text.is_empty() {
                    return Err(ChannelError::InvalidRequest(
                        "submit_request requires non-empty text".into(),
                    ));
                }
                if text.chars().count() > MAX_REQUEST_CHARS {
                    return Err(ChannelError::InvalidRequest(format!(
                        "request text exceeds the {MAX_REQUEST_CHARS}-character ceiling"
                    )));
                }

                Ok(Self::SubmitRequest { client_id, text })
            }
            other => Err(ChannelError::UnknownMessageType(other.to_string())),
        }
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────

/// `thinking` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPayload {
    pub step: String,
}

/// `provider_dispatched` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionPayload {
    pub description: String,
}

/// `response` payload: narrative plus the composite when a dispatch ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub content: String,
    pub composite: Option<CompositeResult>,
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Events emitted over the channel during a request cycle.
///
/// Per-provider ordering is strict (dispatched → running → completed); no
/// ordering is guaranteed between different providers' events. Delivery is
/// at-most-once - a dead channel silently drops events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Pong,
    Thinking {
        payload: StepPayload,
    },
    ProviderDispatched {
        provider: ProviderName,
        client_id: String,
        task_id: String,
        payload: DescriptionPayload,
    },
    ProviderRunning {
        provider: ProviderName,
        client_id: String,
        task_id: String,
    },
    /// Completion of one provider, successful or not. A failed provider
    /// carries an `{"error": ...}` payload here and nowhere else.
    ProviderCompleted {
        provider: ProviderName,
        client_id: String,
        task_id: String,
        payload: serde_json::Value,
    },
    Response {
        client_id: String,
        task_id: String,
        payload: ResponsePayload,
    },
    CompositeReady {
        client_id: String,
        task_id: String,
        payload: CompositeResult,
    },
    KnowledgeAdded {
        client_id: String,
        payload: KnowledgeAddedPayload,
    },
    KnowledgeRemoved {
        client_id: String,
        payload: KnowledgeRemovedPayload,
    },
    Error {
        payload: ErrorPayload,
    },
}

/// `knowledge_added` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeAddedPayload {
    pub entries: Vec<KnowledgeEntry>,
}

/// `knowledge_removed` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRemovedPayload {
    pub entry_ids: Vec<String>,
}

impl OutboundEvent {
    pub fn thinking(step: impl Into<String>) -> Self {
        Self::Thinking {
            payload: StepPayload { step: step.into() },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            payload: ErrorPayload {
                message: message.into(),
            },
        }
    }

    /// Wire tag for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pong => "pong",
            Self::Thinking { .. } => "thinking",
            Self::ProviderDispatched { .. } => "provider_dispatched",
            Self::ProviderRunning { .. } => "provider_running",
            Self::ProviderCompleted { .. } => "provider_completed",
            Self::Response { .. } => "response",
            Self::CompositeReady { .. } => "composite_ready",
            Self::KnowledgeAdded { .. } => "knowledge_added",
            Self::KnowledgeRemoved { .. } => "knowledge_removed",
            Self::Error { .. } => "error",
        }
    }
}

/// Where a request cycle's events go.
///
/// The gateway implements this per session; delivery failures are handled
/// inside the sink (lazy unregistration), so emitting is infallible from
/// the engine's point of view.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: OutboundEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ping() {
        assert_eq!(InboundFrame::parse(r#"{"type":"ping"}"#).unwrap(), InboundFrame::Ping);
    }

    #[test]
    fn parse_submit_request() {
        let frame =
            InboundFrame::parse(r#"{"type":"submit_request","client_id":"c1","text":"hi"}"#)
                .unwrap();
        assert_eq!(
            frame,
            InboundFrame::SubmitRequest {
                client_id: "c1".into(),
                text: "hi".into()
            }
        );
    }

    #[test]
    fn reject_oversized_frame() {
        let raw = format!(
            r#"{{"type":"submit_request","client_id":"c1","text":"{}"}}"#,
            "x".repeat(MAX_FRAME_BYTES)
        );
        assert!(matches!(
            InboundFrame::parse(&raw),
            Err(ChannelError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn reject_non_json_and_non_object() {
        assert!(matches!(
            InboundFrame::parse("not json"),
            Err(ChannelError::InvalidFrame(_))
        ));
        assert!(matches!(
            InboundFrame::parse("[1,2,3]"),
            Err(ChannelError::InvalidFrame(_))
        ));
    }

    #[test]
    fn reject_unknown_type() {
        assert!(matches!(
            InboundFrame::parse(r#"{"type":"teleport"}"#),
            Err(ChannelError::UnknownMessageType(_))
        ));
    }

    #[test]
    fn reject_blank_client_or_text() {
        assert!(matches!(
            InboundFrame::parse(r#"{"type":"submit_request","client_id":"","text":"hi"}"#),
            Err(ChannelError::InvalidRequest(_))
        ));
        assert!(matches!(
            InboundFrame::parse(r#"{"type":"submit_request","client_id":"c1","text":"  "}"#),
            Err(ChannelError::InvalidRequest(_))
        ));
    }

    #[test]
    fn reject_overlong_text() {
        let raw = format!(
            r#"{{"type":"submit_request","client_id":"c1","text":"{}"}}"#,
            "y".repeat(MAX_REQUEST_CHARS + 1)
        );
        assert!(matches!(
            InboundFrame::parse(&raw),
            Err(ChannelError::InvalidRequest(_))
        ));
    }

    #[test]
    fn event_serialization_thinking() {
        let event = OutboundEvent::thinking("Analyzing your question...");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"thinking""#));
        assert!(json.contains(r#""step":"Analyzing your question...""#));
    }

    #[test]
    fn event_serialization_provider_dispatched() {
        let event = OutboundEvent::ProviderDispatched {
            provider: ProviderName::Quant,
            client_id: "c1".into(),
            task_id: "t1".into(),
            payload: DescriptionPayload {
                description: "Running financial calculations".into(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"provider_dispatched""#));
        assert!(json.contains(r#""provider":"quant""#));
    }

    #[test]
    fn event_kind_names() {
        assert_eq!(OutboundEvent::Pong.kind(), "pong");
        assert_eq!(OutboundEvent::thinking("x").kind(), "thinking");
        assert_eq!(OutboundEvent::error("x").kind(), "error");
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"error","payload":{"message":"Client not found"}}"#;
        let event: OutboundEvent = serde_json::from_str(json).unwrap();
        match event {
            OutboundEvent::Error { payload } => assert_eq!(payload.message, "Client not found"),
            _ => panic!("Wrong variant"),
        }
    }
}
