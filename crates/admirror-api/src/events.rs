//! Progress events streamed to a sync observer
//!
//! A run produces `status`, then per phase `step-start`, any number of `step-progress`,
//! and exactly one of `step-complete` / `step-error`. It ends with one `complete` or `error`.

use serde::{Deserialize, Serialize};

use crate::{ApiError, PhaseKey, PhaseResult};

/// Per-step payload carried by `step-complete` and `step-error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn count(count: usize) -> Self {
        Self {
            count: Some(count),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            count: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncEvent {
    /// Session-level status, not tied to a phase
    #[serde(rename_all = "camelCase")]
    Status {
        phase: String,
        message: String,
        progress: u8,
    },
    #[serde(rename_all = "camelCase")]
    StepStart {
        phase: PhaseKey,
        message: String,
        progress: u8,
        current_step: usize,
        total_steps: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        estimated_seconds_remaining: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    StepProgress {
        phase: PhaseKey,
        message: String,
        progress: u8,
        current_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_campaigns: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    StepComplete {
        phase: PhaseKey,
        message: String,
        progress: u8,
        step_result: StepResult,
    },
    #[serde(rename_all = "camelCase")]
    StepError {
        phase: PhaseKey,
        message: String,
        progress: u8,
        step_result: StepResult,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        message: String,
        overall_success: bool,
        results: Vec<PhaseResult>,
    },
    Error { message: String },
}

impl SyncEvent {
    /// Wire name of the event
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::Status { .. } => "status",
            SyncEvent::StepStart { .. } => "step-start",
            SyncEvent::StepProgress { .. } => "step-progress",
            SyncEvent::StepComplete { .. } => "step-complete",
            SyncEvent::StepError { .. } => "step-error",
            SyncEvent::Complete { .. } => "complete",
            SyncEvent::Error { .. } => "error",
        }
    }

    /// The channel closes after a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncEvent::Complete { .. } | SyncEvent::Error { .. })
    }

    pub fn phase(&self) -> Option<PhaseKey> {
        match self {
            SyncEvent::StepStart { phase, .. }
            | SyncEvent::StepProgress { phase, .. }
            | SyncEvent::StepComplete { phase, .. }
            | SyncEvent::StepError { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Encode as a server-sent-events frame
    pub fn to_sse_frame(&self) -> Result<String, ApiError> {
        let data = serde_json::to_string(self)?;
        Ok(format!("event: {}\ndata: {}\n\n", self.event_type(), data))
    }
}
