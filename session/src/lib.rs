//! gridpath-session: playback and session state on top of gridpath-core.
//!
//! Wraps the synchronous traversal engine with a tokio-paced scheduler,
//! bounded settings and a headless session that front ends (terminal,
//! GUI, tests) drive with clicks and run requests.

mod error;
mod scheduler;
mod session;
mod settings;

pub use error::{Result, SessionError};
pub use scheduler::{CancelToken, PlaybackHandle, StepScheduler};
pub use session::{Mark, PaintMode, Session};
pub use settings::{
    Settings, SettingsError, DEFAULT_COLS, DEFAULT_DELAY_MS, DEFAULT_MAX_DELAY_MS,
    DEFAULT_MIN_DELAY_MS, DEFAULT_ROWS,
};
