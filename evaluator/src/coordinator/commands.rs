use std::sync::Arc;
use tokio::sync::oneshot;

use crate::{Evaluation, EvaluationError, PositionKey};

pub(crate) type EvaluationReply = oneshot::Sender<Result<Arc<Evaluation>, EvaluationError>>;

/// Commands sent to the coordinator actor. Each embeds a oneshot for the reply.
pub(crate) enum CoordinatorCommand {
    Evaluate {
        key: PositionKey,
        reply: EvaluationReply,
    },
    Cached {
        key: PositionKey,
        reply: oneshot::Sender<Option<Arc<Evaluation>>>,
    },
    ResetGame {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
