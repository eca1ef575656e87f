#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Defaults suit interactive use. Every field can be overridden from the
//! environment through [`SchedulerConfig::from_env`]:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `VIREO_SLOW_TICK_MS` | `slow_tick_threshold` | 16 ms |
//! | `VIREO_IDLE_TICK_LIMIT` | `idle_tick_limit` | 64 |

use std::env;
use std::time::Duration;

/// Tuning for [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Ticks slower than this are logged at `warn`.
    pub slow_tick_threshold: Duration,
    /// Upper bound on ticks drained by `run_until_idle`.
    pub idle_tick_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            slow_tick_threshold: Duration::from_millis(16),
            idle_tick_limit: 64,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_slow_tick_threshold(mut self, threshold: Duration) -> Self {
        self.slow_tick_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_idle_tick_limit(mut self, limit: usize) -> Self {
        self.idle_tick_limit = limit.max(1);
        self
    }

    /// Defaults overridden by `VIREO_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = parse_var::<u64>(&lookup, "VIREO_SLOW_TICK_MS") {
            config.slow_tick_threshold = Duration::from_millis(ms);
        }
        if let Some(limit) = parse_var::<usize>(&lookup, "VIREO_IDLE_TICK_LIMIT") {
            config = config.with_idle_tick_limit(limit);
        }
        config
    }
}

/// Read and parse one variable; shared with downstream config types.
pub fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(target: "vireo::config", variable = name, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn env_overrides_defaults() {
        let config = SchedulerConfig::from_env_with(lookup(&[
            ("VIREO_SLOW_TICK_MS", "5"),
            ("VIREO_IDLE_TICK_LIMIT", "3"),
        ]));
        assert_eq!(config.slow_tick_threshold, Duration::from_millis(5));
        assert_eq!(config.idle_tick_limit, 3);
    }

    #[test]
    fn missing_or_bad_values_keep_defaults() {
        let config = SchedulerConfig::from_env_with(lookup(&[("VIREO_SLOW_TICK_MS", "soon")]));
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn idle_limit_is_at_least_one() {
        assert_eq!(SchedulerConfig::default().with_idle_tick_limit(0).idle_tick_limit, 1);
    }
}
