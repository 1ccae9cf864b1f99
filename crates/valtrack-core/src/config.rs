//! Process-wide tracking configuration.
//!
//! The current [`TrackingConfig`] lives in an [`ArcSwap`], so readers on hot
//! paths never block and [`install`] is visible to every thread immediately.
//!
//! # Environment
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `VALTRACK_CONSISTENCY` | `panic`, `log` | `panic` |
//!
//! `log` exists for fuzzing and diagnostics. A mismatch means the dirty state
//! of the graph is already wrong, and execution continuing past it is not
//! supported in production.

use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

/// Environment variable selecting the [`ConsistencyPolicy`].
pub const CONSISTENCY_ENV: &str = "VALTRACK_CONSISTENCY";

/// What happens when a parent tracker disagrees with a child about whether a
/// mark/clean operation changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsistencyPolicy {
    /// Treat the mismatch as a fatal invariant violation.
    #[default]
    Panic,
    /// Log the mismatch at `ERROR` and count it, then continue.
    ///
    /// Meant for fuzz targets and diagnosing a broken graph. Dirty state read
    /// after a logged mismatch is unreliable; production builds should keep
    /// [`Panic`](Self::Panic).
    Log,
}

impl FromStr for ConsistencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "panic" | "fatal" => Ok(Self::Panic),
            "log" | "warn" => Ok(Self::Log),
            other => Err(format!("unknown consistency policy `{other}`")),
        }
    }
}

/// Tracking configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Handling of parent/child consistency mismatches.
    pub consistency: ConsistencyPolicy,
}

impl TrackingConfig {
    /// Set the consistency policy.
    #[must_use]
    pub fn with_consistency(mut self, policy: ConsistencyPolicy) -> Self {
        self.consistency = policy;
        self
    }

    /// Defaults overridden by environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup(CONSISTENCY_ENV) {
            match val.parse() {
                Ok(ConsistencyPolicy::Log) => {
                    tracing::warn!(
                        message = "config.lenient_consistency",
                        var = CONSISTENCY_ENV
                    );
                    config.consistency = ConsistencyPolicy::Log;
                }
                Ok(policy) => config.consistency = policy,
                Err(err) => tracing::warn!(
                    message = "config.invalid",
                    var = CONSISTENCY_ENV,
                    error = %err
                ),
            }
        }
        config
    }
}

static CURRENT: LazyLock<ArcSwap<TrackingConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(TrackingConfig::from_env()));

/// The configuration currently in effect.
#[must_use]
pub fn current() -> Arc<TrackingConfig> {
    CURRENT.load_full()
}

/// Replace the configuration for all threads.
pub fn install(config: TrackingConfig) {
    CURRENT.store(Arc::new(config));
}
