use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

use crate::{LossSignal, Publish, PublishChannel, PublishError, PERSISTENT};

/// Publishes onto a single shared channel.
///
/// Frame emission is serialized through a mutex so concurrent callers never
/// interleave frames on the channel. The guard is released before waiting for
/// the broker confirm, so confirms for several deliveries can be pending at once.
pub struct AmqpPublisher<C = lapin::Channel> {
    channel: Mutex<C>,
    lost: LossSignal,
}

impl<C: PublishChannel> AmqpPublisher<C> {
    /// Wraps a channel that already has publisher confirms enabled.
    pub fn new(channel: C) -> Self {
        Self::with_loss_signal(channel, LossSignal::new())
    }

    /// Like `new`, but raises `lost` when the channel turns out to be unusable.
    pub fn with_loss_signal(channel: C, lost: LossSignal) -> Self {
        Self {
            channel: Mutex::new(channel),
            lost,
        }
    }

    pub fn loss_signal(&self) -> &LossSignal {
        &self.lost
    }

    /// Makes a single publish attempt that must be confirmed within `budget`.
    ///
    /// Waiting for the channel, emitting the frames and awaiting the confirm
    /// all count against the deadline. No retry is made.
    pub async fn publish(
        &self,
        m: &(impl Publish + Sync),
        budget: Duration,
    ) -> Result<(), PublishError> {
        let Some(deadline) = Instant::now().checked_add(budget) else {
            return Err(PublishError::BudgetOutOfRange(budget));
        };

        match tokio::time::timeout_at(deadline, self.publish_confirmed(m)).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::DeadlineExceeded(budget)),
        }
    }

    async fn publish_confirmed(&self, m: &(impl Publish + Sync)) -> Result<(), PublishError> {
        let properties = m.properties().with_delivery_mode(PERSISTENT);

        let confirm = {
            let channel = self.channel.lock().await;
            let published = channel
                .basic_publish(
                    m.exchange(),
                    m.routing_key(),
                    m.payload().as_ref(),
                    properties,
                )
                .await;

            match published {
                Ok(confirm) => confirm,
                Err(e) => {
                    if !channel.is_open() || is_session_gone(&e) {
                        self.channel_lost(&e);
                    }
                    return Err(e.into());
                }
            }
        };

        let confirmation = match confirm.await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                if is_session_gone(&e) {
                    self.channel_lost(&e);
                }
                return Err(e.into());
            }
        };
        if !confirmation.is_ack() {
            return Err(PublishError::Rejected);
        }

        Ok(())
    }

    fn channel_lost(&self, e: &lapin::Error) {
        tracing::error!(error = %e, "publish channel is no longer usable");
        self.lost.trip();
    }

    pub async fn close(&self) -> lapin::Result<()> {
        self.channel.lock().await.close().await
    }
}

fn is_session_gone(e: &lapin::Error) -> bool {
    matches!(
        e,
        lapin::Error::InvalidChannelState(_) | lapin::Error::InvalidConnectionState(_)
    )
}
