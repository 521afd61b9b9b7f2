//! Structured session logging utilities.
//!
//! Every mode activation is a session with its own id, so log lines from a
//! streaming run and the single-shot pass that follows it can be told apart.

use glassify_models::{Notice, PipelineMode};
use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Session logger for mode lifecycle events.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    mode: PipelineMode,
}

impl SessionLogger {
    /// Create a logger for a new session in `mode`.
    pub fn new(mode: PipelineMode) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            mode,
        }
    }

    /// Log the start of a session.
    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            mode = %self.mode,
            "Session started: {}", message
        );
    }

    /// Log a user-facing notice. Fatal notices are logged as errors.
    pub fn log_notice(&self, notice: &Notice) {
        if notice.is_fatal() {
            error!(
                session_id = %self.session_id,
                mode = %self.mode,
                "Notice: {}", notice
            );
        } else {
            warn!(
                session_id = %self.session_id,
                mode = %self.mode,
                "Notice: {}", notice
            );
        }
    }

    /// Log the end of a session.
    pub fn log_stop(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            mode = %self.mode,
            "Session stopped: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Create a tracing span for this session.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            mode = %self.mode
        )
    }
}
