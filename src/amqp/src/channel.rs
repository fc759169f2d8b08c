use std::future::Future;

use lapin::{
    options::BasicPublishOptions,
    publisher_confirm::{Confirmation, PublisherConfirm},
    BasicProperties,
};

/// The part of a broker channel the publisher needs.
///
/// `basic_publish` only emits the frames; the returned confirm resolves once
/// the broker acks or nacks the delivery.
pub trait PublishChannel: Send + Sync + 'static {
    type Confirm: Future<Output = lapin::Result<Confirmation>> + Send;

    fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        properties: BasicProperties,
    ) -> impl Future<Output = lapin::Result<Self::Confirm>> + Send;

    fn close(&self) -> impl Future<Output = lapin::Result<()>> + Send;

    /// Whether the channel can still carry publishes.
    fn is_open(&self) -> bool;
}

impl PublishChannel for lapin::Channel {
    type Confirm = PublisherConfirm;

    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        properties: BasicProperties,
    ) -> lapin::Result<PublisherConfirm> {
        lapin::Channel::basic_publish(
            self,
            exchange,
            routing_key,
            BasicPublishOptions::default(),
            payload,
            properties,
        )
        .await
    }

    async fn close(&self) -> lapin::Result<()> {
        lapin::Channel::close(self, 200, "gateway shutdown").await
    }

    fn is_open(&self) -> bool {
        self.status().connected()
    }
}
