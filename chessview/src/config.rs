//! Runtime configuration for the chessview binary.
//!
//! Engine tunables live in [`evaluator::EvaluatorConfig`]; this module only
//! adds what the front end itself needs. Every value has a compile-time
//! default and can be overridden through an environment variable.

use evaluator::EvaluatorConfig;
use std::path::PathBuf;

/// File name prefix for daily log files.
pub const DEFAULT_LOG_FILE_PREFIX: &str = "chessview";

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Get the directory for rolling log files.
///
/// Priority:
/// 1. `CHESSVIEW_LOG_DIR` env variable if set and non-empty
/// 2. `None`, meaning logs go to stderr
pub fn get_log_dir() -> Option<PathBuf> {
    log_dir_from(std::env::var("CHESSVIEW_LOG_DIR").ok())
}

fn log_dir_from(value: Option<String>) -> Option<PathBuf> {
    value
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
}

/// Get the evaluator configuration.
///
/// Priority:
/// 1. `CHESSVIEW_*` env variables (see [`evaluator::config`])
/// 2. compiled-in defaults
pub fn get_evaluator_config() -> EvaluatorConfig {
    EvaluatorConfig::from_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_unset_or_blank() {
        assert_eq!(log_dir_from(None), None);
        assert_eq!(log_dir_from(Some("   ".into())), None);
    }

    #[test]
    fn test_log_dir_set() {
        assert_eq!(
            log_dir_from(Some("/var/log/chessview".into())),
            Some(PathBuf::from("/var/log/chessview"))
        );
    }
}
