use std::sync::Arc;

use amqp::Session;
use anyhow::Context;
use order_gateway::{
    api,
    lifecycle::{self, Shutdown},
    logging, GatewayConfig,
};
use tokio::{net::TcpListener, sync::oneshot};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = GatewayConfig::load().context("Error loading configuration")?;
    info!(?config, "configuration loaded");

    let session = Session::open(&config.amqp_uri()).await?;
    info!(
        host = %config.mq_url,
        port = config.mq_port,
        vhost = %config.mq_vhost,
        "connected to broker"
    );

    let state = Arc::new(api::AppState::new(session.publisher(), &config));
    let app = api::create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.served_port))
        .await
        .with_context(|| format!("Error binding port {}", config.served_port))?;
    info!(addr = %listener.local_addr()?, "order gateway listening");

    let broker_lost = session.connection_lost();
    let (reason_tx, reason_rx) = oneshot::channel();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason =
                lifecycle::wait_for_shutdown(lifecycle::shutdown_signal(), broker_lost).await;
            let _ = reason_tx.send(reason);
        })
        .await
        .context("HTTP server error")?;

    let reason = reason_rx.await.unwrap_or(Shutdown::Signal);
    session.close().await;
    info!(?reason, "order gateway stopped");

    reason.into_result()
}
