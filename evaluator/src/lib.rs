//! Asynchronous position evaluation for chessview.
//!
//! The [`EvaluationCoordinator`] sits between a viewer that moves through a
//! game and a single UCI engine worker. It caches results per position,
//! coalesces and supersedes requests, throttles searches and recovers from
//! engine failures, so callers only ever see an [`Evaluation`] or an
//! [`EvaluationError`].

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod evaluation;
pub mod position;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use cache::EvaluationCache;
pub use config::EvaluatorConfig;
pub use coordinator::{EngineSessionState, EvaluationCoordinator};
pub use error::EvaluationError;
pub use evaluation::Evaluation;
pub use position::PositionKey;

pub use engine::Score;
