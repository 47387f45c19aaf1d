//! Host message protocol
//!
//! Inbound commands arrive as JSON objects discriminated by `type`. Outbound
//! messages are either the literal `Ready!` handshake or a `type`-tagged
//! object.

use crate::error::ProtocolError;
use crate::project::CompileRequest;
use sandbox_config::Phase;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use tracing::debug;

const LOG_TARGET: &str = Phase::Bridge.target();

/// Literal handshake posted at startup and after every bundle reload
pub const READY: &str = "Ready!";

/// Origin used for messages any embedder may receive
pub const ANY_ORIGIN: &str = "*";

/// A command sent by the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Compile(Box<CompileRequest>),
    UrlBack,
    UrlForward,
}

impl InboundMessage {
    pub fn compile(request: CompileRequest) -> Self {
        InboundMessage::Compile(Box::new(request))
    }

    /// Decode a raw inbound message
    ///
    /// Messages with an unknown or missing `type` are not ours and yield
    /// `None`; a known `type` with a malformed body is an error.
    pub fn decode(raw: &str) -> Result<Option<Self>, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let kind = value.get("type").and_then(|t| t.as_str());
        if !matches!(kind, Some("compile" | "urlback" | "urlforward")) {
            debug!(target: LOG_TARGET, kind, "ignoring inbound message");
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Compile(_) => "compile",
            InboundMessage::UrlBack => "urlback",
            InboundMessage::UrlForward => "urlforward",
        }
    }
}

/// Structured failure report delivered with an `error` message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ErrorPayload {
    /// `looksLikeUiModule` flag of a no-DOM-change payload
    pub fn looks_like_ui_module(&self) -> Option<bool> {
        self.payload
            .as_ref()?
            .get("looksLikeUiModule")?
            .as_bool()
    }
}

/// A message posted to the host
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Ready,
    Resize { height: f64 },
    UrlChange { url: String },
    Success,
    Error { error: ErrorPayload },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Ready => "ready",
            OutboundMessage::Resize { .. } => "resize",
            OutboundMessage::UrlChange { .. } => "urlchange",
            OutboundMessage::Success => "success",
            OutboundMessage::Error { .. } => "error",
        }
    }
}

impl Serialize for OutboundMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = match self {
            OutboundMessage::Ready => return serializer.serialize_str(READY),
            OutboundMessage::Success => serializer.serialize_map(Some(1))?,
            _ => serializer.serialize_map(Some(2))?,
        };
        map.serialize_entry("type", self.kind())?;
        match self {
            OutboundMessage::Resize { height } => map.serialize_entry("height", height)?,
            OutboundMessage::UrlChange { url } => map.serialize_entry("url", url)?,
            OutboundMessage::Error { error } => map.serialize_entry("error", error)?,
            OutboundMessage::Ready | OutboundMessage::Success => {}
        }
        map.end()
    }
}
