//! The acquisition loop
//!
//! The single long-lived producer task: resolves the sensor port,
//! maintains the device link, frames and decodes sample lines, and
//! publishes each event to the injected [`EventSink`].
//!
//! The loop cycles through four states:
//! - `Disconnected` — nothing bound, about to connect
//! - `Connecting` — resolve (when no port is bound) and open the link
//! - `Streaming` — poll for bytes, decode, publish
//! - `Backoff` — fixed delay after a failure, then reconnect
//!
//! Connection failures increment a consecutive-failure counter; at the
//! configured threshold the bound port is cleared so the next connect
//! performs a full re-resolution. Decode failures are logged and
//! skipped without touching connection state. There is no terminal
//! state: the loop runs until its cancellation token fires, and closes
//! any open handle on the way out.

use crate::decode::{decode_line, LineBuffer};
use crate::link::DeviceLinkManager;
use crate::serial::PortResolver;
use myolink_core::config::DeviceSettings;
use myolink_core::EventSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Timing and retry policy for the acquisition loop
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Idle sleep between read polls
    pub poll_interval: Duration,
    /// Delay before retrying after a connection failure
    pub connect_retry_delay: Duration,
    /// Delay before retrying when no port is visible
    pub resolve_retry_delay: Duration,
    /// Consecutive connection failures before forcing re-resolution
    pub max_consecutive_failures: u32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self::from_settings(&DeviceSettings::default())
    }
}

impl AcquisitionConfig {
    /// Derive loop timing from the device configuration section.
    pub fn from_settings(settings: &DeviceSettings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            connect_retry_delay: Duration::from_millis(settings.connect_retry_delay_ms),
            resolve_retry_delay: Duration::from_millis(settings.resolve_retry_delay_ms),
            max_consecutive_failures: settings.max_consecutive_failures,
        }
    }
}

/// Why the loop is backing off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackoffReason {
    /// Resolution found no candidate port
    NoPort,
    /// Opening or reading the bound port failed
    ConnectionFailed,
}

/// Acquisition loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Disconnected,
    Connecting,
    Streaming,
    Backoff(BackoffReason),
}

/// The device-to-sink pipeline driver.
///
/// Owns the link manager (and with it the one device handle) for its
/// entire life. Construct with [`AcquisitionLoop::new`], then either
/// [`run`](Self::run) it on the current task or [`spawn`](Self::spawn)
/// it onto its own.
pub struct AcquisitionLoop {
    resolver: Box<dyn PortResolver>,
    manager: DeviceLinkManager,
    sink: Arc<dyn EventSink>,
    config: AcquisitionConfig,
    bound_port: Option<String>,
    failures: u32,
    lines: LineBuffer,
}

impl AcquisitionLoop {
    /// Create a loop over an injected resolver, link manager, and sink.
    pub fn new(
        resolver: Box<dyn PortResolver>,
        manager: DeviceLinkManager,
        sink: Arc<dyn EventSink>,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            resolver,
            manager,
            sink,
            config,
            bound_port: None,
            failures: 0,
            lines: LineBuffer::new(),
        }
    }

    /// Drive the loop until `cancel` fires, then close the device link.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut state = LinkState::Connecting;
        while !cancel.is_cancelled() {
            state = match state {
                LinkState::Disconnected => LinkState::Connecting,
                LinkState::Connecting => self.connect().await,
                LinkState::Streaming => self.stream(&cancel).await,
                LinkState::Backoff(reason) => self.backoff(reason, &cancel).await,
            };
        }
        self.manager.close();
        tracing::info!("Acquisition loop stopped");
    }

    /// Spawn the loop onto its own task.
    pub fn spawn(self, cancel: CancellationToken) -> AcquisitionHandle {
        let task = tokio::spawn(self.run(cancel.clone()));
        AcquisitionHandle { cancel, task }
    }

    async fn connect(&mut self) -> LinkState {
        if self.bound_port.is_none() {
            match self.resolver.resolve() {
                Ok(candidate) => {
                    tracing::info!(
                        "Selected sensor port {} ({})",
                        candidate.port_name,
                        candidate.description
                    );
                    self.bound_port = Some(candidate.port_name);
                }
                Err(e) => {
                    tracing::warn!("No sensor port available: {}", e);
                    return LinkState::Backoff(BackoffReason::NoPort);
                }
            }
        }

        let Some(port) = self.bound_port.clone() else {
            return LinkState::Backoff(BackoffReason::NoPort);
        };

        match self.manager.ensure_connected(&port).await {
            Ok(()) => {
                self.failures = 0;
                self.lines.clear();
                tracing::info!("Streaming samples from {}", port);
                LinkState::Streaming
            }
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", port, e);
                self.register_failure();
                LinkState::Backoff(BackoffReason::ConnectionFailed)
            }
        }
    }

    async fn stream(&mut self, cancel: &CancellationToken) -> LinkState {
        loop {
            match self.manager.read_available() {
                Ok(bytes) if bytes.is_empty() => {
                    tokio::select! {
                        _ = cancel.cancelled() => return LinkState::Disconnected,
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                }
                Ok(bytes) => {
                    for line in self.lines.push(&bytes) {
                        match decode_line(&line) {
                            Ok(event) => {
                                tracing::debug!("Decoded sample event {}", event);
                                self.sink.publish(event).await;
                            }
                            Err(e) => tracing::warn!("Dropping sample line: {}", e),
                        }
                    }
                    if cancel.is_cancelled() {
                        return LinkState::Disconnected;
                    }
                }
                Err(e) => {
                    tracing::warn!("Device link lost: {}", e);
                    self.register_failure();
                    return LinkState::Backoff(BackoffReason::ConnectionFailed);
                }
            }
        }
    }

    async fn backoff(&mut self, reason: BackoffReason, cancel: &CancellationToken) -> LinkState {
        let delay = match reason {
            BackoffReason::NoPort => self.config.resolve_retry_delay,
            BackoffReason::ConnectionFailed => self.config.connect_retry_delay,
        };
        tracing::debug!("Retrying in {:?}", delay);
        tokio::select! {
            _ = cancel.cancelled() => LinkState::Disconnected,
            _ = tokio::time::sleep(delay) => LinkState::Connecting,
        }
    }

    fn register_failure(&mut self) {
        self.failures += 1;
        if self.failures >= self.config.max_consecutive_failures {
            tracing::warn!(
                "{} consecutive connection failures, forcing port re-resolution",
                self.failures
            );
            self.bound_port = None;
            self.failures = 0;
        }
    }
}

/// Handle to a spawned acquisition loop.
pub struct AcquisitionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AcquisitionHandle {
    /// Cancel the loop and wait for it to release the device.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Convenience constructor mirroring the process lifecycle hooks:
/// builds the loop and spawns it in one call.
pub fn start(
    resolver: Box<dyn PortResolver>,
    manager: DeviceLinkManager,
    sink: Arc<dyn EventSink>,
    config: AcquisitionConfig,
    cancel: CancellationToken,
) -> AcquisitionHandle {
    AcquisitionLoop::new(resolver, manager, sink, config).spawn(cancel)
}
