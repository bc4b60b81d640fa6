//! Recognition engine abstraction.
//!
//! The session controller talks to the engine through an explicit handle
//! rather than ambient callback registration, so any engine can be swapped
//! in and tests can drive the controller with a scripted fake. Engines are
//! constructed with a [`crossbeam_channel::Sender`] and push tagged
//! [`EngineEvent`]s back through it; the consumer applies them from the same
//! execution context that issues commands.

use anyhow::Result;

use crate::error::CapabilityError;

#[cfg(feature = "deepgram")]
pub mod deepgram;

/// Identifier for one continuous recognition session.
///
/// Minted by the controller on every `start()`. Engines tag every event with
/// the session it belongs to; events from a superseded session are dropped
/// by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The id the next session will get.
    pub fn next(self) -> SessionId {
        SessionId(self.0 + 1)
    }
}

/// A single engine notification, tagged with the session it belongs to.
#[derive(Debug, Clone)]
pub struct EngineEvent {
    pub session: SessionId,
    pub kind: EngineEventKind,
}

#[derive(Debug, Clone)]
pub enum EngineEventKind {
    /// The engine's running interpretation of everything recognized so far
    /// in this session. Interim revisions replace the open tail.
    Result(String),
    /// Engine-reported failure. `code` is the engine's native identifier;
    /// it is mapped onto the closed error set by the controller.
    Error { code: String, message: String },
    /// Authoritative lifecycle signal: recognition became active or inactive.
    StateChange(bool),
}

impl EngineEvent {
    pub fn result(session: SessionId, text: impl Into<String>) -> Self {
        Self {
            session,
            kind: EngineEventKind::Result(text.into()),
        }
    }

    pub fn error(session: SessionId, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session,
            kind: EngineEventKind::Error {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn state_change(session: SessionId, active: bool) -> Self {
        Self {
            session,
            kind: EngineEventKind::StateChange(active),
        }
    }
}

/// Contract between the session controller and a recognition engine.
pub trait RecognitionEngine {
    /// Whether recognition can work at all in this environment
    /// (e.g. credentials for a cloud engine are configured).
    fn is_supported(&self) -> bool;

    /// Whether an audio input device is present.
    fn is_microphone_available(&self) -> bool;

    /// Begin a continuous recognition session for `language`, tagging all
    /// emitted events with `session`. If a previous session is still winding
    /// down, the engine supersedes it.
    fn begin_continuous_recognition(&mut self, session: SessionId, language: &str) -> Result<()>;

    /// Request the end of the active session. Advisory: the engine may still
    /// deliver trailing results for the session it closes out.
    fn end_recognition(&mut self) -> Result<()>;
}

/// Verify the preconditions under which a session can be offered at all.
///
/// Failures here are terminal for the front-end, unlike the recoverable
/// errors an engine reports mid-session.
pub fn check_capabilities(engine: &impl RecognitionEngine) -> Result<(), CapabilityError> {
    if !engine.is_supported() {
        return Err(CapabilityError::Unsupported);
    }
    if !engine.is_microphone_available() {
        return Err(CapabilityError::NoMicrophone);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEngine {
        supported: bool,
        microphone: bool,
    }

    impl RecognitionEngine for StubEngine {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn is_microphone_available(&self) -> bool {
            self.microphone
        }

        fn begin_continuous_recognition(&mut self, _: SessionId, _: &str) -> Result<()> {
            Ok(())
        }

        fn end_recognition(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn capability_check_passes_when_both_available() {
        let engine = StubEngine {
            supported: true,
            microphone: true,
        };
        assert!(check_capabilities(&engine).is_ok());
    }

    #[test]
    fn missing_support_is_reported_before_missing_microphone() {
        let engine = StubEngine {
            supported: false,
            microphone: false,
        };
        assert_eq!(
            check_capabilities(&engine),
            Err(CapabilityError::Unsupported)
        );
    }

    #[test]
    fn missing_microphone_is_terminal() {
        let engine = StubEngine {
            supported: true,
            microphone: false,
        };
        assert_eq!(
            check_capabilities(&engine),
            Err(CapabilityError::NoMicrophone)
        );
    }

    #[test]
    fn session_ids_are_monotonic() {
        let first = SessionId::default().next();
        let second = first.next();
        assert!(second > first);
    }
}
