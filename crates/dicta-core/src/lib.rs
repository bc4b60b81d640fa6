pub mod audio;
#[cfg(feature = "clipboard")]
pub mod clipboard;
pub mod engine;
pub mod error;
pub mod resample;
pub mod session;
pub mod settings;
pub mod verbose;

pub use audio::{AudioDeviceInfo, default_input_available, list_input_devices};
#[cfg(feature = "clipboard")]
pub use clipboard::copy_to_clipboard;
#[cfg(feature = "deepgram")]
pub use engine::deepgram::DeepgramLiveEngine;
pub use engine::{
    EngineEvent, EngineEventKind, RecognitionEngine, SessionId, check_capabilities,
};
pub use error::{CapabilityError, CopyError, ErrorCode, RecognitionError};
pub use session::{SessionController, SessionState, Snapshot};
pub use settings::Settings;
pub use verbose::set_verbose;
