//! Store and logging configuration.
//!
//! # Invariants
//! - `StoreOptions::default()` reproduces the baseline store contract:
//!   deletions are not audited and history-append failures are swallowed.

use serde::{Deserialize, Serialize};

/// What to do when a history row cannot be written after a successful
/// primary write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditFailurePolicy {
    /// Log at `warn` and report the primary operation as successful.
    #[default]
    Ignore,
    /// Return the append failure to the caller.
    Propagate,
}

/// Behavior switches for `ParcelStore`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Append a final snapshot to `parcel_history` when a parcel is deleted.
    pub record_deletions: bool,
    pub audit_failure_policy: AuditFailurePolicy,
}

/// Logging bootstrap settings consumed by `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of trace|debug|info|warn|error.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: String,
}

impl LoggingConfig {
    pub fn new(log_dir: impl Into<String>) -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: log_dir.into(),
        }
    }
}

/// Returns the default log level for the current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditFailurePolicy, StoreOptions};

    #[test]
    fn default_options_keep_baseline_contract() {
        let options = StoreOptions::default();
        assert!(!options.record_deletions);
        assert_eq!(options.audit_failure_policy, AuditFailurePolicy::Ignore);
    }
}
