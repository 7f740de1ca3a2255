use anyhow::Context;
use myolink::{
    init_logging, AcquisitionConfig, AcquisitionLoop, BridgeConfig, Broadcaster,
    DeviceLinkManager, LinkSettings, OsPortReclaimer, SubscriberRegistry, SystemLinkOpener,
    SystemPortResolver,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging()?;

    let config = match std::env::var("MYOLINK_CONFIG") {
        Ok(path) => BridgeConfig::load(&path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        Err(_) => BridgeConfig::default(),
    };

    tracing::info!("myolink {} (built {})", myolink::VERSION, myolink::BUILD_DATE);

    let registry = Arc::new(SubscriberRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
    let cancel = CancellationToken::new();

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(
        "Subscriber endpoint listening on ws://{}{}",
        listener.local_addr()?,
        config.server.ws_path
    );
    let server = tokio::spawn(myolink::serve(
        listener,
        config.server.ws_path.clone(),
        registry.clone(),
        cancel.clone(),
    ));

    let manager = DeviceLinkManager::new(
        Box::new(SystemLinkOpener),
        Box::new(OsPortReclaimer),
        LinkSettings {
            baud_rate: config.device.baud_rate,
            read_timeout: Duration::from_millis(config.device.read_timeout_ms),
        },
        Duration::from_millis(config.device.reclaim_settle_ms),
    );
    let acquisition = AcquisitionLoop::new(
        Box::new(SystemPortResolver),
        manager,
        broadcaster,
        AcquisitionConfig::from_settings(&config.device),
    )
    .spawn(cancel.clone());

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    acquisition.stop().await;
    let _ = server.await;

    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
