use std::future::Future;

/// Why the server stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Signal,
    BrokerLost,
}

impl Shutdown {
    /// Graceful stops exit cleanly; losing the broker exits non-zero so the
    /// orchestrator restarts the process.
    pub fn into_result(self) -> anyhow::Result<()> {
        match self {
            Shutdown::Signal => Ok(()),
            Shutdown::BrokerLost => anyhow::bail!("broker connection lost"),
        }
    }
}

/// Waits for whichever comes first. Broker loss wins a tie.
pub async fn wait_for_shutdown(
    signal: impl Future<Output = ()>,
    broker_lost: impl Future<Output = ()>,
) -> Shutdown {
    tokio::select! {
        biased;
        _ = broker_lost => Shutdown::BrokerLost,
        _ = signal => Shutdown::Signal,
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Error installing Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error installing SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
