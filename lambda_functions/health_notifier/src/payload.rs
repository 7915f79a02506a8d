use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::NotifierError;

pub const EVENT_SOURCE: &str = "AWS Health";
pub const EVENT_CLASS: &str = "AWS Alert";
pub const EVENT_SEVERITY: &str = "3";
pub const EVENT_NODE: &str = "AWS";
pub const UNKNOWN: &str = "Unknown";

const DESCRIPTION_INDENT: &[u8] = b"    ";

/// Row written to the ServiceNow `em_event` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    pub source: String,
    pub event_class: String,
    pub resource: String,
    pub severity: String,
    pub description: String,
    pub node: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

impl OutboundEvent {
    /// Maps a published health notification onto an event row. Missing
    /// `detail.eventArn` or `detail-type` fall back to [`UNKNOWN`].
    pub fn from_message(message: &Value) -> Result<Self, NotifierError> {
        Ok(Self {
            source: EVENT_SOURCE.to_string(),
            event_class: EVENT_CLASS.to_string(),
            resource: lookup_str(message, &["detail", "eventArn"])
                .unwrap_or(UNKNOWN)
                .to_string(),
            severity: EVENT_SEVERITY.to_string(),
            description: render_description(message)?,
            node: EVENT_NODE.to_string(),
            event_type: lookup_str(message, &["detail-type"])
                .unwrap_or(UNKNOWN)
                .to_string(),
        })
    }
}

pub fn parse_message(text: &str) -> Result<Value, NotifierError> {
    serde_json::from_str(text).map_err(NotifierError::Parse)
}

/// Walks `path` through nested objects and returns the string found at the end.
/// Any missing key, non-object step or non-string leaf yields `None`.
pub fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))?
        .as_str()
}

fn render_description(message: &Value) -> Result<String, NotifierError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(DESCRIPTION_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    message
        .serialize(&mut serializer)
        .map_err(|e| NotifierError::Render(e.to_string()))?;

    String::from_utf8(buf).map_err(|e| NotifierError::Render(e.to_string()))
}
