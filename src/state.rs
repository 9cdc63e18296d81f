//! Recognition state machine - lifecycle of a single listening session
//!
//! The machine is the only writer of [`RecognitionState`]. It moves between
//! phases only through the engine lifecycle events, which keeps illegal
//! combinations (listening while carrying an error) unrepresentable.
//!
//! ```text
//! Idle --start--> Listening --result*--> Listening --end--> Idle
//!                     |                                      ^
//!                     +--error--> Error ----------end--------+
//! ```

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::EngineErrorKind;
use crate::keywords::messages;

/// Recognition lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready for a new session
    Idle,
    /// Engine is capturing audio
    Listening,
    /// Session failed, waiting for the engine to end it
    Error,
    /// Recognition unavailable on this platform (terminal)
    Unsupported,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Listening => write!(f, "Listening"),
            Phase::Error => write!(f, "Error"),
            Phase::Unsupported => write!(f, "Unsupported"),
        }
    }
}

/// Read-only snapshot handed to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionState {
    pub is_listening: bool,
    /// Latest recognised text, kept after the session ends
    pub transcript: String,
    /// User-facing status line
    pub message: String,
    pub confidence: f32,
    /// Raw error code of the last failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionState {
    pub fn ready() -> Self {
        Self {
            is_listening: false,
            transcript: String::new(),
            message: messages::READY.to_string(),
            confidence: 0.0,
            error: None,
        }
    }
}

impl Default for RecognitionState {
    fn default() -> Self {
        Self::ready()
    }
}

#[derive(Debug)]
pub struct RecognitionMachine {
    phase: Phase,
    state: RecognitionState,
}

impl RecognitionMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            state: RecognitionState::ready(),
        }
    }

    /// Machine for a platform without speech recognition
    pub fn unsupported() -> Self {
        Self {
            phase: Phase::Unsupported,
            state: RecognitionState {
                message: messages::NOT_SUPPORTED.to_string(),
                error: Some("NOT_SUPPORTED".to_string()),
                ..RecognitionState::ready()
            },
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_listening(&self) -> bool {
        self.phase == Phase::Listening
    }

    pub fn state(&self) -> &RecognitionState {
        &self.state
    }

    pub fn snapshot(&self) -> RecognitionState {
        self.state.clone()
    }

    // ========================================================================
    // Engine lifecycle transitions
    // ========================================================================

    /// Session started: clear the previous utterance and any error
    pub fn on_start(&mut self) -> bool {
        if self.phase == Phase::Unsupported {
            warn!("Start event ignored, recognition unsupported");
            return false;
        }
        self.phase = Phase::Listening;
        self.state = RecognitionState {
            is_listening: true,
            transcript: String::new(),
            message: messages::LISTENING.to_string(),
            confidence: 0.0,
            error: None,
        };
        true
    }

    /// Interim or final transcript; only accepted while listening
    pub fn on_result(&mut self, transcript: &str, confidence: f32) -> bool {
        if self.phase != Phase::Listening {
            warn!("Result outside a session dropped ({}): {:?}", self.phase, transcript);
            return false;
        }
        self.state.transcript = transcript.to_string();
        self.state.confidence = confidence;
        true
    }

    pub fn on_error(&mut self, code: &str) -> bool {
        if self.phase == Phase::Unsupported {
            return false;
        }
        let kind = EngineErrorKind::from_code(code);
        self.phase = Phase::Error;
        self.state.is_listening = false;
        self.state.message = kind.message().to_string();
        self.state.error = Some(code.to_string());
        true
    }

    /// Session over. Transcript and confidence stay visible.
    pub fn on_end(&mut self) -> bool {
        if self.phase == Phase::Unsupported {
            return false;
        }
        self.phase = Phase::Idle;
        self.state.is_listening = false;
        self.state.message = messages::READY.to_string();
        true
    }

    /// The engine refused to start a session
    pub fn on_start_failed(&mut self) {
        debug!("Start failed in phase {}", self.phase);
        if self.phase == Phase::Unsupported {
            return;
        }
        self.phase = Phase::Error;
        self.state.is_listening = false;
        self.state.message = messages::START_FAILED.to_string();
        self.state.error = Some("START_ERROR".to_string());
    }

    /// Replace the status line without changing phase
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.state.message = message.into();
    }
}

impl Default for RecognitionMachine {
    fn default() -> Self {
        Self::new()
    }
}
