pub mod adapter;

use serde::{Deserialize, Serialize};

pub use adapter::{HostChannel, ProtocolAdapter, WidgetEvent};

pub const DEFAULT_MESSAGE_SOURCE: &str = "santa-vegas-widget";

/// Message types the widget posts to its host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundKind {
    #[serde(rename = "sound_on")]
    SoundOn,
    #[serde(rename = "sound_off")]
    SoundOff,
    #[serde(rename = "santaClicked")]
    SantaClicked,
    #[serde(rename = "starClicked")]
    StarClicked,
    #[serde(rename = "hideStarDebugZone")]
    HideStarDebugZone,
    #[serde(rename = "animationEnded")]
    AnimationEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    pub source: String,
}

impl OutboundMessage {
    pub fn new(kind: OutboundKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Commands the host page may send. Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundCommand {
    #[serde(rename = "showDebugZones")]
    ShowDebugZones { value: bool },
    #[serde(rename = "activateGroup2")]
    ActivateGroup2,
}

impl InboundCommand {
    /// Parse a raw message payload. Malformed or unknown messages yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .and_then(Self::from_value)
    }

    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_wire_format() {
        let message = OutboundMessage::new(OutboundKind::SantaClicked, DEFAULT_MESSAGE_SOURCE);
        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "santaClicked", "source": "santa-vegas-widget"})
        );

        let sound = OutboundMessage::new(OutboundKind::SoundOff, "x");
        assert!(sound.to_json().unwrap().contains("\"sound_off\""));
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            InboundCommand::parse(r#"{"type":"activateGroup2"}"#),
            Some(InboundCommand::ActivateGroup2)
        );
        assert_eq!(
            InboundCommand::parse(r#"{"type":"showDebugZones","value":true,"extra":1}"#),
            Some(InboundCommand::ShowDebugZones { value: true })
        );
    }

    #[test]
    fn ignores_malformed_and_foreign_messages() {
        for raw in [
            "",
            "not json",
            "42",
            r#""activateGroup2""#,
            r#"{"type":"somethingElse"}"#,
            r#"{"type":"showDebugZones"}"#,
            r#"{"type":"showDebugZones","value":"yes"}"#,
            r#"{"kind":"activateGroup2"}"#,
        ] {
            assert_eq!(InboundCommand::parse(raw), None, "payload {raw:?}");
        }
    }
}
