//! Terminal front end for reviewing games with engine feedback.

pub mod board;
pub mod commands;
pub mod config;
pub mod indicator;
pub mod review;

pub use commands::CliError;
pub use indicator::MoveVerdict;
pub use review::{NavCommand, ReviewSession};
