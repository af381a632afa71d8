/// Why an evaluation request produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Engine failed to start: {0}")]
    EngineStartup(String),
    #[error("Engine did not become ready in time")]
    EngineNotReady,
    #[error("Engine failed during evaluation: {0}")]
    EngineEvaluation(String),
    #[error("Evaluation timed out")]
    EvaluationTimeout,
    #[error("Superseded by a newer position")]
    Superseded,
    #[error("Evaluator is shut down")]
    Closed,
}
