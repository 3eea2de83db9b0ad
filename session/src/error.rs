use thiserror::Error;

use crate::settings::SettingsError;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Edits and new runs wait until the current playback ends or is cancelled.
    #[error("gridpath: a playback is in progress, cancel it before editing or running")]
    PlaybackActive,

    #[error("gridpath: no tokio runtime available to drive playback")]
    NoRuntime,

    #[error("gridpath: invalid paint mode '{0}', use 'wall', 'start', or 'end'")]
    InvalidMode(String),

    #[error(transparent)]
    Grid(#[from] gridpath_core::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
