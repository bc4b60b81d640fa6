//! Error model: recognition error codes, clipboard and capability failures.

use std::fmt;

use thiserror::Error;

/// Closed set of recognition failure categories.
///
/// Engine-native identifiers map through [`ErrorCode::from_engine_code`];
/// anything the table does not list becomes [`ErrorCode::Unknown`] with the
/// raw message preserved on the surrounding [`RecognitionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoSpeech,
    NotAllowed,
    Network,
    Aborted,
    AudioCapture,
    LanguageNotSupported,
    ServiceNotAllowed,
    Unknown,
}

impl ErrorCode {
    /// Map an engine-native error identifier onto the closed set.
    pub fn from_engine_code(code: &str) -> Self {
        match code {
            "no-speech" => ErrorCode::NoSpeech,
            "not-allowed" => ErrorCode::NotAllowed,
            "network" => ErrorCode::Network,
            "aborted" => ErrorCode::Aborted,
            "audio-capture" => ErrorCode::AudioCapture,
            "language-not-supported" => ErrorCode::LanguageNotSupported,
            "service-not-allowed" => ErrorCode::ServiceNotAllowed,
            _ => ErrorCode::Unknown,
        }
    }

    /// Get the string identifier for this code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoSpeech => "no-speech",
            ErrorCode::NotAllowed => "not-allowed",
            ErrorCode::Network => "network",
            ErrorCode::Aborted => "aborted",
            ErrorCode::AudioCapture => "audio-capture",
            ErrorCode::LanguageNotSupported => "language-not-supported",
            ErrorCode::ServiceNotAllowed => "service-not-allowed",
            ErrorCode::Unknown => "unknown",
        }
    }

    /// Fixed user-facing message for this category.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::NoSpeech => "No speech was detected. Try speaking again.",
            ErrorCode::NotAllowed => {
                "Microphone access was denied. Check your permission settings."
            }
            ErrorCode::Network => "A network error interrupted recognition. Check your connection.",
            ErrorCode::Aborted => "The recognition session was cancelled.",
            ErrorCode::AudioCapture => {
                "The microphone could not be captured. Check your audio hardware."
            }
            ErrorCode::LanguageNotSupported => {
                "The configured language is not supported by the recognition engine."
            }
            ErrorCode::ServiceNotAllowed => "The recognition service refused the connection.",
            ErrorCode::Unknown => "Recognition failed with an unrecognized error.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The most recent engine-reported failure.
///
/// The raw engine message is kept alongside the mapped code for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionError {
    pub code: ErrorCode,
    pub raw_message: String,
}

impl RecognitionError {
    /// Build from an engine-native identifier and message.
    pub fn from_engine(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_engine_code(code),
            raw_message: message.into(),
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Unmapped codes surface the raw message; mapped codes have a fixed text.
        if self.code == ErrorCode::Unknown && !self.raw_message.is_empty() {
            write!(f, "{} ({})", self.code.user_message(), self.raw_message)
        } else {
            write!(f, "{}", self.code.user_message())
        }
    }
}

/// Failure reported by the clipboard export routine.
#[derive(Debug, Clone, Error)]
#[error("clipboard copy failed: {reason}")]
pub struct CopyError {
    pub reason: String,
}

/// Precondition failure that prevents any session from starting.
///
/// Unlike a [`RecognitionError`], these are terminal: the front-end refuses
/// to offer `start` and shows a fixed, non-retryable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("Speech recognition is not available in this environment.")]
    Unsupported,
    #[error("No microphone is available.")]
    NoMicrophone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_codes_map_onto_closed_set() {
        assert_eq!(
            ErrorCode::from_engine_code("no-speech"),
            ErrorCode::NoSpeech
        );
        assert_eq!(
            ErrorCode::from_engine_code("not-allowed"),
            ErrorCode::NotAllowed
        );
        assert_eq!(ErrorCode::from_engine_code("network"), ErrorCode::Network);
        assert_eq!(ErrorCode::from_engine_code("aborted"), ErrorCode::Aborted);
        assert_eq!(
            ErrorCode::from_engine_code("audio-capture"),
            ErrorCode::AudioCapture
        );
        assert_eq!(
            ErrorCode::from_engine_code("language-not-supported"),
            ErrorCode::LanguageNotSupported
        );
        assert_eq!(
            ErrorCode::from_engine_code("service-not-allowed"),
            ErrorCode::ServiceNotAllowed
        );
    }

    #[test]
    fn unlisted_codes_fall_through_to_unknown() {
        assert_eq!(ErrorCode::from_engine_code("bogus-code"), ErrorCode::Unknown);
        assert_eq!(ErrorCode::from_engine_code(""), ErrorCode::Unknown);
        // Identifiers are matched exactly, not case-folded
        assert_eq!(ErrorCode::from_engine_code("Network"), ErrorCode::Unknown);
    }

    #[test]
    fn recognition_error_keeps_raw_message() {
        let err = RecognitionError::from_engine("bogus-code", "engine said what");
        assert_eq!(err.code, ErrorCode::Unknown);
        assert_eq!(err.raw_message, "engine said what");
        assert!(err.to_string().contains("engine said what"));
    }

    #[test]
    fn mapped_errors_display_fixed_message_only() {
        let err = RecognitionError::from_engine("network", "ECONNRESET gibberish");
        assert_eq!(err.to_string(), ErrorCode::Network.user_message());
    }
}
