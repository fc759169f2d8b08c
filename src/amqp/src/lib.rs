mod channel;
mod error;
mod model;
mod publisher;
mod session;
mod signal;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use channel::PublishChannel;
pub use error::PublishError;
pub use model::{Envelope, Publish, PERSISTENT};
pub use publisher::AmqpPublisher;
pub use session::Session;
pub use signal::LossSignal;

pub use lapin::{BasicProperties, Connection, ConnectionProperties};
