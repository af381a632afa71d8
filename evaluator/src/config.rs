//! Evaluator configuration
//!
//! Every tunable has a compiled-in default and can be overridden through a
//! `CHESSVIEW_*` environment variable. Values that fail to parse are logged
//! and ignored.

use engine::EngineOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_STOCKFISH_PATH: &str = "CHESSVIEW_STOCKFISH_PATH";
pub const ENV_SEARCH_DEPTH: &str = "CHESSVIEW_SEARCH_DEPTH";
pub const ENV_HASH_MB: &str = "CHESSVIEW_HASH_MB";
pub const ENV_MIN_DISPATCH_MS: &str = "CHESSVIEW_MIN_DISPATCH_MS";
pub const ENV_READY_TIMEOUT_MS: &str = "CHESSVIEW_READY_TIMEOUT_MS";
pub const ENV_STALE_AFTER_MS: &str = "CHESSVIEW_STALE_AFTER_MS";

const DEFAULT_SEARCH_DEPTH: u8 = 15;
const DEFAULT_HASH_MB: u32 = 16;
const DEFAULT_MIN_DISPATCH: Duration = Duration::from_millis(300);
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    /// Engine binary; `None` searches the usual install locations.
    pub stockfish_path: Option<PathBuf>,
    /// Fixed depth for every search (`go depth N`).
    pub search_depth: u8,
    pub hash_mb: Option<u32>,
    pub threads: u32,
    /// Minimum time between two `go` commands.
    pub min_dispatch_interval: Duration,
    /// How long a (re)started engine may take to answer `readyok`.
    pub ready_timeout: Duration,
    /// Requests older than this are rejected by the sweep.
    pub stale_after: Duration,
    pub sweep_interval: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            stockfish_path: None,
            search_depth: DEFAULT_SEARCH_DEPTH,
            hash_mb: Some(DEFAULT_HASH_MB),
            threads: 1,
            min_dispatch_interval: DEFAULT_MIN_DISPATCH,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl EvaluatorConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |name: &str, default: Duration| {
            parse_var::<u64>(&lookup, name)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            stockfish_path: lookup(ENV_STOCKFISH_PATH)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            search_depth: parse_var::<u8>(&lookup, ENV_SEARCH_DEPTH)
                .filter(|depth| *depth > 0)
                .unwrap_or(defaults.search_depth),
            hash_mb: parse_var::<u32>(&lookup, ENV_HASH_MB).or(defaults.hash_mb),
            threads: defaults.threads,
            min_dispatch_interval: millis(ENV_MIN_DISPATCH_MS, defaults.min_dispatch_interval),
            ready_timeout: millis(ENV_READY_TIMEOUT_MS, defaults.ready_timeout),
            stale_after: millis(ENV_STALE_AFTER_MS, defaults.stale_after),
            sweep_interval: defaults.sweep_interval,
        }
    }

    /// Options for the engine's initialization handshake.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            multipv: 1,
            threads: self.threads,
            hash_mb: self.hash_mb,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid number", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EvaluatorConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EvaluatorConfig::default());
        assert_eq!(config.search_depth, 15);
        assert_eq!(config.min_dispatch_interval, Duration::from_millis(300));
        assert_eq!(config.engine_options().hash_mb, Some(16));
    }

    #[test]
    fn test_overrides() {
        let config = EvaluatorConfig::from_lookup(lookup(&[
            (ENV_STOCKFISH_PATH, "/opt/sf/stockfish"),
            (ENV_SEARCH_DEPTH, "20"),
            (ENV_HASH_MB, "64"),
            (ENV_MIN_DISPATCH_MS, "50"),
            (ENV_READY_TIMEOUT_MS, "2500"),
            (ENV_STALE_AFTER_MS, " 1000 "),
        ]));
        assert_eq!(config.stockfish_path, Some(PathBuf::from("/opt/sf/stockfish")));
        assert_eq!(config.search_depth, 20);
        assert_eq!(config.hash_mb, Some(64));
        assert_eq!(config.min_dispatch_interval, Duration::from_millis(50));
        assert_eq!(config.ready_timeout, Duration::from_millis(2500));
        assert_eq!(config.stale_after, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EvaluatorConfig::from_lookup(lookup(&[
            (ENV_SEARCH_DEPTH, "deep"),
            (ENV_HASH_MB, "-1"),
            (ENV_STOCKFISH_PATH, "  "),
        ]));
        assert_eq!(config.search_depth, 15);
        assert_eq!(config.hash_mb, Some(16));
        assert_eq!(config.stockfish_path, None);

        let zero_depth = EvaluatorConfig::from_lookup(lookup(&[(ENV_SEARCH_DEPTH, "0")]));
        assert_eq!(zero_depth.search_depth, 15);
    }
}
