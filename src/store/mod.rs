mod file;
mod migrations;
mod sqlite;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};

pub use file::JsonFileClaimBackend;
pub use sqlite::SqliteClaimBackend;

use crate::config::{StorageConfig, StorageKind};

/// Durable storage for the "prize already claimed" flag.
pub trait ClaimBackend: Send + Sync {
    /// When the widget was claimed, or `None` if it never was.
    fn load(&self, widget_id: &str) -> Result<Option<DateTime<Utc>>>;
    /// Record the claim. Saving an existing claim keeps the original timestamp.
    fn save(&self, widget_id: &str, claimed_at: DateTime<Utc>) -> Result<()>;
}

struct OutcomeStoreInner {
    widget_id: String,
    backend: Option<Arc<dyn ClaimBackend>>,
    session_claimed: AtomicBool,
}

/// Claim flag for one widget instance. Backend failures degrade to a
/// session-only flag instead of surfacing to the widget.
#[derive(Clone)]
pub struct OutcomeStore {
    inner: Arc<OutcomeStoreInner>,
}

impl OutcomeStore {
    pub fn new(widget_id: impl Into<String>, backend: Arc<dyn ClaimBackend>) -> Self {
        Self::build(widget_id.into(), Some(backend))
    }

    pub fn session_only(widget_id: impl Into<String>) -> Self {
        Self::build(widget_id.into(), None)
    }

    /// Open the configured backend, falling back to session-only tracking.
    pub fn open(config: &StorageConfig, widget_id: impl Into<String>) -> Self {
        let widget_id = widget_id.into();
        let backend: Result<Arc<dyn ClaimBackend>> = match config.kind {
            StorageKind::Sqlite => SqliteClaimBackend::open(config.path.clone())
                .map(|backend| Arc::new(backend) as Arc<dyn ClaimBackend>),
            StorageKind::Json => JsonFileClaimBackend::open(config.path.clone())
                .map(|backend| Arc::new(backend) as Arc<dyn ClaimBackend>),
            StorageKind::Memory => return Self::session_only(widget_id),
        };

        match backend {
            Ok(backend) => Self::build(widget_id, Some(backend)),
            Err(err) => {
                warn!("outcome storage unavailable, claims last this session only: {err:#}");
                Self::session_only(widget_id)
            }
        }
    }

    fn build(widget_id: String, backend: Option<Arc<dyn ClaimBackend>>) -> Self {
        Self {
            inner: Arc::new(OutcomeStoreInner {
                widget_id,
                backend,
                session_claimed: AtomicBool::new(false),
            }),
        }
    }

    pub fn widget_id(&self) -> &str {
        &self.inner.widget_id
    }

    pub fn is_durable(&self) -> bool {
        self.inner.backend.is_some()
    }

    pub fn is_claimed(&self) -> bool {
        if self.inner.session_claimed.load(Ordering::SeqCst) {
            return true;
        }
        let Some(backend) = &self.inner.backend else {
            return false;
        };

        match backend.load(&self.inner.widget_id) {
            Ok(Some(claimed_at)) => {
                info!("widget {} was claimed at {}", self.inner.widget_id, claimed_at);
                self.inner.session_claimed.store(true, Ordering::SeqCst);
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!("failed to read claim for {}: {err:#}", self.inner.widget_id);
                false
            }
        }
    }

    /// Record the claim. Only the first call in a process reaches the backend.
    pub fn mark_claimed(&self) {
        if self.inner.session_claimed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(backend) = &self.inner.backend else {
            return;
        };

        if let Err(err) = backend.save(&self.inner.widget_id, Utc::now()) {
            warn!(
                "failed to persist claim for {}, it will last this session only: {err:#}",
                self.inner.widget_id
            );
        }
    }
}
