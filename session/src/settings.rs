use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLS: usize = 30;
pub const DEFAULT_DELAY_MS: u64 = 40;
pub const DEFAULT_MAX_DELAY_MS: u64 = 105;
pub const DEFAULT_MIN_DELAY_MS: u64 = 5;

const MAX_DIM: usize = 1000;
const DELAY_CEILING_MS: u64 = 60_000;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("gridpath: {name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("gridpath: invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Session configuration. Every field has a default and an allowed range.
///
/// Delays are in milliseconds. `max_delay_ms` and `min_delay_ms` shape the
/// speed control: a higher speed value means a shorter delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub rows: usize,
    pub cols: usize,
    pub delay_ms: u64,
    pub max_delay_ms: u64,
    pub min_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            delay_ms: DEFAULT_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
        }
    }
}

fn check_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), SettingsError> {
    if value < min || value > max {
        return Err(SettingsError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl Settings {
    /// Parse a JSON object; omitted fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("rows", self.rows as u64, 1, MAX_DIM as u64)?;
        check_range("cols", self.cols as u64, 1, MAX_DIM as u64)?;
        check_range("max_delay_ms", self.max_delay_ms, 1, DELAY_CEILING_MS)?;
        check_range("min_delay_ms", self.min_delay_ms, 1, self.max_delay_ms)?;
        check_range(
            "delay_ms",
            self.delay_ms,
            self.min_delay_ms,
            self.max_delay_ms,
        )?;
        Ok(())
    }

    /// Map a speed control value to a playback delay.
    ///
    /// `max_delay_ms - speed`, floored at `min_delay_ms` so playback never
    /// spins with a zero delay.
    pub fn delay_for_speed(&self, speed: u64) -> Duration {
        let ms = self
            .max_delay_ms
            .saturating_sub(speed)
            .max(self.min_delay_ms);
        Duration::from_millis(ms)
    }

    /// Store the delay implied by `speed`.
    pub fn set_speed(&mut self, speed: u64) {
        self.delay_ms = self.delay_for_speed(speed).as_millis() as u64;
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
