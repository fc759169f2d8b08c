use std::time::Duration;

use thiserror::Error;

/// Outcome of a publish attempt that did not end in a broker acknowledgement.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("broker did not acknowledge the message")]
    Rejected,

    #[error("publish not confirmed within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("publish budget {0:?} does not fit a deadline")]
    BudgetOutOfRange(Duration),

    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
}
