//! llmops-chat binary.

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use llmops_chat::{run, ChatConfig};
use llmops_core::aws::load_sdk_config;
use llmops_core::SageMakerRuntimeInvoker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("llmops_chat=info".parse()?))
        .init();

    let config = ChatConfig::load()?;
    info!(
        bind_address = %config.server.bind_address,
        endpoint = %config.endpoint.name,
        "configuration loaded"
    );

    let sdk_config = load_sdk_config(config.endpoint.region.as_deref()).await;
    let invoker = Arc::new(SageMakerRuntimeInvoker::new(&sdk_config));

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        cancel_on_signal.cancel();
    });

    if let Err(e) = run(config, invoker, cancel).await {
        error!(error = %e, "chat server error");
        return Err(e.into());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
