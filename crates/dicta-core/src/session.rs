//! Recognition session controller.
//!
//! Owns the observable state bundle `{listening, transcript, error}` and the
//! `start`/`stop`/`reset` commands, and reconciles them with the engine's
//! asynchronous event stream. Two rules hold throughout:
//!
//! - Engine `StateChange` events are the sole writer of the listening flag.
//!   A command only records intent; the flag flips when the engine confirms.
//! - Every event carries a [`SessionId`]. Events from a superseded session
//!   are dropped; trailing events of the current session are applied even
//!   after `stop()`, which is advisory.

use std::fmt;

use crate::engine::{EngineEvent, EngineEventKind, RecognitionEngine, SessionId};
use crate::error::{ErrorCode, RecognitionError};

/// Whether a recognition session is confirmed active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Listening,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
        }
    }
}

/// Read-only view of the controller state for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: SessionState,
    pub transcript: String,
    pub error: Option<RecognitionError>,
}

/// Drives a recognition engine and mirrors its lifecycle into observable
/// state. Created once per view and discarded with it; nothing persists.
pub struct SessionController<E> {
    engine: E,
    language: String,
    state: SessionState,
    /// Recognized text from sessions that ended since the last reset.
    committed: String,
    /// Live tail of the current session's running interpretation.
    live: String,
    /// Bytes of the current session's running text hidden by a mid-session
    /// reset. Results only surface what the engine produced after that point.
    reset_marker: usize,
    last_error: Option<RecognitionError>,
    current: SessionId,
}

impl<E: RecognitionEngine> SessionController<E> {
    pub fn new(engine: E, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
            state: SessionState::Idle,
            committed: String::new(),
            live: String::new(),
            reset_marker: 0,
            last_error: None,
            current: SessionId::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    /// Everything recognized since the last reset, across sessions.
    ///
    /// A mid-session reset can leave the live tail starting with the
    /// separator the engine put before it; leading whitespace is not shown.
    pub fn transcript(&self) -> String {
        let full = format!("{}{}", self.committed, self.live);
        full.trim_start().to_string()
    }

    pub fn last_error(&self) -> Option<&RecognitionError> {
        self.last_error.as_ref()
    }

    /// The session id events must carry to be applied.
    pub fn current_session(&self) -> SessionId {
        self.current
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            transcript: self.transcript(),
            error: self.last_error.clone(),
        }
    }

    /// Begin a new continuous session. No-op while listening.
    ///
    /// Clears any prior error before the engine call, so a stale error is
    /// never shown next to a freshly confirmed session.
    pub fn start(&mut self) {
        if self.state == SessionState::Listening {
            return;
        }
        self.last_error = None;
        // Text already on screen stays; the new session appends after it.
        self.committed = self.transcript();
        self.live.clear();
        self.reset_marker = 0;
        self.current = self.current.next();
        crate::verbose!(
            "session {}: begin continuous recognition ({})",
            self.current.0,
            self.language
        );
        if let Err(err) = self
            .engine
            .begin_continuous_recognition(self.current, &self.language)
        {
            self.last_error = Some(RecognitionError {
                code: ErrorCode::Unknown,
                raw_message: format!("{err:#}"),
            });
        }
    }

    /// Ask the engine to end the active session. No-op while idle.
    ///
    /// Advisory: trailing results for the session are still applied; the
    /// listening flag flips only on the engine's own state change.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        crate::verbose!("session {}: end recognition requested", self.current.0);
        if let Err(err) = self.engine.end_recognition() {
            self.last_error = Some(RecognitionError {
                code: ErrorCode::Unknown,
                raw_message: format!("{err:#}"),
            });
        }
    }

    /// Clear the transcript and the recorded error. State is untouched: a
    /// live session keeps running and keeps appending from here on.
    pub fn reset(&mut self) {
        self.reset_marker += self.live.len();
        self.live.clear();
        self.committed.clear();
        self.last_error = None;
    }

    /// Apply one engine event. Events tagged with a superseded session are
    /// dropped before dispatch.
    pub fn handle_event(&mut self, event: EngineEvent) {
        if event.session != self.current {
            crate::verbose!(
                "dropping event from superseded session {} (current {})",
                event.session.0,
                self.current.0
            );
            return;
        }
        match event.kind {
            EngineEventKind::Result(text) => {
                // Surface only what came after a mid-session reset. The get()
                // comes back empty when the running text shrank below the
                // marker or the marker no longer falls on a char boundary.
                self.live = text.get(self.reset_marker..).unwrap_or_default().to_string();
            }
            EngineEventKind::Error { code, message } => {
                self.last_error = Some(RecognitionError::from_engine(&code, message));
            }
            EngineEventKind::StateChange(active) => {
                self.state = if active {
                    SessionState::Listening
                } else {
                    SessionState::Idle
                };
            }
        }
    }
}
