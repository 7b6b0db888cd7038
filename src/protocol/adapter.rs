use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};

use crate::surface::PresentationSurface;

use super::{InboundCommand, OutboundKind, OutboundMessage};

/// Cross-document channel to the hosting page.
pub trait HostChannel: Send + Sync {
    /// True when the widget runs inside a host page that can receive messages.
    fn is_embedded(&self) -> bool;
    fn post(&self, message: &OutboundMessage) -> Result<()>;
}

/// Things the state machine reports; the adapter decides how they reach the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    SoundChanged { on: bool },
    TriggerFired,
    MascotCaught,
    RunEnded,
}

#[derive(Clone)]
pub struct ProtocolAdapter {
    host: Arc<dyn HostChannel>,
    source: String,
}

impl ProtocolAdapter {
    pub fn new(host: Arc<dyn HostChannel>, source: impl Into<String>) -> Self {
        Self {
            host,
            source: source.into(),
        }
    }

    pub fn decode(&self, raw: &str) -> Option<InboundCommand> {
        let command = InboundCommand::parse(raw);
        if command.is_none() {
            debug!("ignoring host message: {}", truncate(raw, 120));
        }
        command
    }

    pub fn emit(&self, event: WidgetEvent, surface: &dyn PresentationSurface) {
        let kinds: &[OutboundKind] = match event {
            WidgetEvent::SoundChanged { on: true } => &[OutboundKind::SoundOn],
            WidgetEvent::SoundChanged { on: false } => &[OutboundKind::SoundOff],
            WidgetEvent::TriggerFired => &[OutboundKind::StarClicked, OutboundKind::HideStarDebugZone],
            WidgetEvent::MascotCaught => &[OutboundKind::SantaClicked],
            WidgetEvent::RunEnded => &[OutboundKind::AnimationEnded],
        };

        if !self.host.is_embedded() {
            if event == WidgetEvent::MascotCaught {
                debug!("no host page, showing confirmation directly");
                surface.show_confirmation();
            }
            return;
        }

        for kind in kinds {
            let message = OutboundMessage::new(*kind, self.source.as_str());
            if let Err(err) = self.host.post(&message) {
                warn!("failed to post {:?} to host: {err:#}", kind);
            }
        }
    }
}

fn truncate(raw: &str, max_chars: usize) -> &str {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}
