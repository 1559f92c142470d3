//! Verbose request/response logging
//!
//! Whether debug output is wanted is decided once, when the provider is
//! configured, and the resulting [`DebugLog`] is handed to every service.

use std::fmt::Debug;
use std::panic::Location;

pub const DEBUG_TARGET: &str = "baiducloud::debug";

const DEBUG_ENV: &str = "DEBUG";
const DEBUG_TOKEN: &str = "terraform";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugLog {
    enabled: bool,
}

impl DebugLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enabled when `DEBUG` contains `terraform`
    pub fn from_env() -> Self {
        let enabled = std::env::var(DEBUG_ENV)
            .map(|v| v.contains(DEBUG_TOKEN))
            .unwrap_or(false);
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Logs `content` together with the calling location
    #[track_caller]
    pub fn add_debug<T: Debug + ?Sized>(&self, action: &str, content: &T) {
        if !self.enabled {
            return;
        }
        let caller = Location::caller();
        tracing::debug!(
            target: DEBUG_TARGET,
            "[{}:{}] {} => {:?}",
            caller.file(),
            caller.line(),
            action,
            content
        );
    }
}

/// Installs the stderr subscriber; later calls are no-ops.
/// Returns whether this call installed it.
pub fn init_logging(debug: DebugLog) -> bool {
    let level = if debug.enabled() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
