pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;

pub use config::{FailurePolicy, GatewayConfig};
