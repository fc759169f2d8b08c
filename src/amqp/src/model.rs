use std::{
    borrow::Cow,
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use uuid::Uuid;

/// AMQP delivery mode asking the broker to write the message to disk.
pub const PERSISTENT: u8 = 2;

pub trait Publish {
    fn exchange(&self) -> &str;

    fn routing_key(&self) -> &str;

    fn properties(&self) -> lapin::BasicProperties;

    fn payload(&self) -> Cow<'_, [u8]>;
}

/// A message body together with its fixed routing information.
///
/// The body is carried as received and is never re-encoded.
#[derive(Debug, Clone)]
pub struct Envelope {
    exchange: String,
    routing_key: String,
    content_type: String,
    message_id: Uuid,
    body: Bytes,
}

impl Envelope {
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            content_type: content_type.into(),
            message_id: Uuid::new_v4(),
            body: body.into(),
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl Publish for Envelope {
    fn exchange(&self) -> &str {
        &self.exchange
    }

    fn routing_key(&self) -> &str {
        &self.routing_key
    }

    fn properties(&self) -> lapin::BasicProperties {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        lapin::BasicProperties::default()
            .with_content_type(self.content_type.as_str().into())
            .with_delivery_mode(PERSISTENT)
            .with_message_id(self.message_id.to_string().into())
            .with_timestamp(timestamp)
    }

    fn payload(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.body[..])
    }
}
