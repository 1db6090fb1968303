//! Session and engine configuration.

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

use crate::daterange::DateRange;
use crate::types::{Pacing, ScanBand};

/// Everything needed to launch and attach to the browser.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Browser executable. Resolved by detection when the user passes none.
    pub exec_path: PathBuf,
    /// Profile directory; carries cookies so sign-in survives runs.
    pub profile_dir: PathBuf,
    /// Where the browser drops the started downloads.
    pub download_dir: PathBuf,
    /// Outer window size in pixels.
    pub window_size: (u32, u32),
    /// Hard ceiling on the whole session, engine deadline included.
    pub session_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exec_path: PathBuf::from("chromium"),
            profile_dir: crate::detect::default_profile_dir(),
            download_dir: crate::detect::default_download_dir(),
            window_size: (1920, 1080),
            session_timeout: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Bounds that terminate or escalate the traversal loop.
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    /// Consecutive scan rounds with no visible group before the run ends.
    pub max_empty_rounds: u32,
    /// Consecutive failed steps before the session liveness is probed.
    pub max_consecutive_errors: u32,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_empty_rounds: 5,
            max_consecutive_errors: 3,
        }
    }
}

/// Configuration consumed by the traversal engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub range: DateRange,
    pub band: ScanBand,
    pub pacing: Pacing,
    pub limits: EngineLimits,
    /// Progress is logged whenever this many groups have been processed.
    pub batch_size: usize,
    /// Absolute point past which the loop aborts instead of continuing.
    pub deadline: Option<Instant>,
}

impl EngineConfig {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            band: ScanBand::default(),
            pacing: Pacing::default(),
            limits: EngineLimits::default(),
            batch_size: 10,
            deadline: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DateRange::disabled())
    }
}
