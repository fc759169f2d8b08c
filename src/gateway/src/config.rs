use std::{fmt, time::Duration};

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// What to do when a publish is nacked, times out or hits a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Answer the request with a 500 and keep serving.
    #[default]
    Respond,
    /// Terminate the process with a non-zero status.
    Halt,
}

#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    pub served_port: u16,
    pub mq_user: String,
    pub mq_password: String,
    /// Broker host.
    pub mq_url: String,
    pub mq_vhost: String,
    #[serde(default = "default_mq_port")]
    pub mq_port: u16,
    #[serde(default = "default_exchange")]
    pub mq_exchange: String,
    #[serde(default = "default_routing_key")]
    pub mq_routing_key: String,
    #[serde(default = "default_publish_timeout_secs")]
    pub publish_timeout_secs: u64,
    #[serde(default)]
    pub publish_failure_policy: FailurePolicy,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Upper bound on the per-attempt publish budget.
pub const MAX_PUBLISH_TIMEOUT_SECS: u64 = 300;

fn default_mq_port() -> u16 {
    5672
}

fn default_exchange() -> String {
    "order-service-exchange".into()
}

fn default_routing_key() -> String {
    "provisioning".into()
}

fn default_publish_timeout_secs() -> u64 {
    5
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl GatewayConfig {
    /// Resolves the configuration from `config/gateway.*`, `.env` and the
    /// process environment, in increasing order of precedence.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config/gateway").required(false))
                .add_source(Environment::default()),
        )
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;

        if !(1..=MAX_PUBLISH_TIMEOUT_SECS).contains(&config.publish_timeout_secs) {
            return Err(ConfigError::Message(format!(
                "publish_timeout_secs must be between 1 and {MAX_PUBLISH_TIMEOUT_SECS}"
            )));
        }

        Ok(config)
    }

    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.mq_user),
            urlencoding::encode(&self.mq_password),
            self.mq_url,
            self.mq_port,
            urlencoding::encode(&self.mq_vhost),
        )
    }

    pub fn publish_budget(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("served_port", &self.served_port)
            .field("mq_user", &self.mq_user)
            .field("mq_password", &"<redacted>")
            .field("mq_url", &self.mq_url)
            .field("mq_vhost", &self.mq_vhost)
            .field("mq_port", &self.mq_port)
            .field("mq_exchange", &self.mq_exchange)
            .field("mq_routing_key", &self.mq_routing_key)
            .field("publish_timeout_secs", &self.publish_timeout_secs)
            .field("publish_failure_policy", &self.publish_failure_policy)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}
