//! Per-request generation state.

use tracing::debug;
use uuid::Uuid;

use crate::extract::{self, Detection};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Fragments are being accumulated.
    StreamingRaw,
    /// An invocation was found in the buffer.
    Detected,
    /// The tool call is in flight.
    Dispatching,
    /// The tool result is being delivered.
    Resuming,
    Done,
    Failed,
}

impl SessionState {
    fn can_become(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (StreamingRaw, Detected | Done)
                | (Detected, Dispatching | Done)
                | (Dispatching, Resuming | Done)
                | (Resuming, Done)
                | (StreamingRaw | Detected | Dispatching | Resuming, Failed)
        )
    }
}

/// State of one generation request. Created per request, never shared.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    tools_enabled: bool,
    state: SessionState,
    buffer: String,
    /// Bytes of the narrative already delivered.
    emitted: usize,
    detection: Option<Detection>,
}

impl Session {
    pub fn new(tools_enabled: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            tools_enabled,
            state: SessionState::StreamingRaw,
            buffer: String::new(),
            emitted: 0,
            detection: None,
        }
    }

    pub fn tools_enabled(&self) -> bool {
        self.tools_enabled
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`. Returns false, leaving the state alone, if the
    /// lifecycle does not allow it.
    pub fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_become(next) {
            debug!(session = %self.id, from = ?self.state, to = ?next, "transition refused");
            return false;
        }
        debug!(session = %self.id, from = ?self.state, to = ?next, "transition");
        self.state = next;
        true
    }

    /// Append a raw model fragment.
    pub fn push(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Scan the buffer for an invocation. Once found it is kept; later
    /// fragments do not move it.
    pub fn detect(&mut self) -> bool {
        if self.detection.is_none() {
            self.detection = extract::locate(&self.buffer);
        }
        self.detection.is_some()
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    /// The buffer with any detected invocation removed.
    pub fn narrative(&self) -> String {
        match &self.detection {
            Some(detection) => extract::strip(&self.buffer, detection.span.clone()),
            None => self.buffer.clone(),
        }
    }

    /// Narrative text not yet delivered, advancing the cursor past it.
    pub fn take_pending(&mut self) -> String {
        let narrative = self.narrative();
        let pending = narrative.get(self.emitted..).unwrap_or_default().to_string();
        self.emitted = narrative.len();
        pending
    }
}
