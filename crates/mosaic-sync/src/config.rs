//! Synchronization timing and user preferences.

use std::time::Duration;

/// Background poll period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Quiet time required before a poll may replace local state
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(30);

/// How long a freshly loaded position is shielded from polling
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(20);

/// When the just-loaded grace flag is released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceRelease {
    /// Cleared by a timer after the window
    AfterWindow(Duration),
    /// Cleared only by an explicit manual refresh
    OnManualRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub inactivity_threshold: Duration,
    pub grace: GraceRelease,
    pub auto_sync: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            inactivity_threshold: DEFAULT_INACTIVITY_THRESHOLD,
            grace: GraceRelease::AfterWindow(DEFAULT_GRACE_WINDOW),
            auto_sync: true,
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl SyncConfig {
    /// Defaults overridden by environment:
    ///
    /// - `MOSAIC_POLL_SECS`
    /// - `MOSAIC_INACTIVITY_SECS`
    /// - `MOSAIC_GRACE_SECS` (`0` keeps the flag until a manual refresh)
    /// - `MOSAIC_AUTO_SYNC` (`0`/`false`/`off` disables polling)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let grace = match env_secs("MOSAIC_GRACE_SECS") {
            Some(d) if d.is_zero() => GraceRelease::OnManualRefresh,
            Some(d) => GraceRelease::AfterWindow(d),
            None => defaults.grace,
        };

        let auto_sync = std::env::var("MOSAIC_AUTO_SYNC")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"))
            .unwrap_or(defaults.auto_sync);

        Self {
            poll_interval: env_secs("MOSAIC_POLL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.poll_interval),
            inactivity_threshold: env_secs("MOSAIC_INACTIVITY_SECS")
                .unwrap_or(defaults.inactivity_threshold),
            grace,
            auto_sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.inactivity_threshold, Duration::from_secs(30));
        assert!(config.auto_sync);
    }
}
