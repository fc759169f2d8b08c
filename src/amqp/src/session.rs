use std::{future::Future, sync::Arc};

use anyhow::Context;
use lapin::{options::ConfirmSelectOptions, Connection, ConnectionProperties};

use crate::{AmqpPublisher, LossSignal};

/// One broker connection and the one channel every publish goes through.
///
/// Opened once at startup and closed once at shutdown.
pub struct Session {
    connection: Connection,
    publisher: Arc<AmqpPublisher>,
    lost: LossSignal,
}

impl Session {
    pub async fn open(uri: &str) -> anyhow::Result<Self> {
        let connection = Connection::connect(uri, ConnectionProperties::default())
            .await
            .context("Error connecting to broker")?;

        let lost = LossSignal::new();
        let on_error = lost.clone();
        connection.on_error(move |err| {
            tracing::error!(error = %err, "broker connection lost");
            on_error.trip();
        });

        let channel = connection
            .create_channel()
            .await
            .context("Error creating channel")?;
        channel
            .confirm_select(ConfirmSelectOptions { nowait: false })
            .await
            .context("Error enabling publisher confirms")?;

        tracing::debug!(channel_id = channel.id(), "broker session open");

        Ok(Self {
            connection,
            publisher: Arc::new(AmqpPublisher::with_loss_signal(channel, lost.clone())),
            lost,
        })
    }

    pub fn publisher(&self) -> Arc<AmqpPublisher> {
        self.publisher.clone()
    }

    /// Resolves once the connection has reported an error or the shared
    /// channel has been closed by the broker.
    ///
    /// Does not borrow the session, so the caller may still `close` it afterwards.
    pub fn connection_lost(&self) -> impl Future<Output = ()> + Send + 'static {
        self.lost.tripped()
    }

    /// Closes the channel, then the connection. Failures are logged only.
    pub async fn close(self) {
        if let Err(e) = self.publisher.close().await {
            tracing::warn!(error = %e, "Error closing channel");
        }
        if let Err(e) = self.connection.close(200, "gateway shutdown").await {
            tracing::warn!(error = %e, "Error closing connection");
        }
        tracing::info!("broker session closed");
    }
}
