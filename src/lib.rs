//! # Myolink
//!
//! A serial EMG acquisition daemon that fans muscle-activation events
//! out to WebSocket subscribers:
//! - Automatic discovery of the sensor's USB-serial port
//! - Self-healing device connection with backoff and forced reclaim of
//!   busy ports
//! - Thresholded binary activation events (`"0"`/`"1"` text frames)
//! - Best-effort fan-out to any number of WebSocket subscribers
//!
//! ## Architecture
//!
//! Myolink is organized as a workspace with multiple crates:
//!
//! 1. **myolink-core** - Errors, events, the sink seam, configuration
//! 2. **myolink-communication** - Port discovery, link management,
//!    decoding, the acquisition loop
//! 3. **myolink-server** - Subscriber registry, broadcast dispatch,
//!    WebSocket endpoint
//! 4. **myolink** - Main binary that integrates all crates
//!
//! One acquisition task owns the single device handle; each subscriber
//! connection runs on its own task; the subscriber registry is the only
//! shared mutable structure between them.

pub use myolink_core::{
    BridgeConfig, ConfigError, DecodeError, DeviceError, DeviceSettings, Error, EventSink, Result,
    ServerSettings, SignalEvent, ACTIVATION_THRESHOLD,
};

pub use myolink_communication::{
    decode_line, list_ports, AcquisitionConfig, AcquisitionHandle, AcquisitionLoop,
    DeviceLinkManager, LineBuffer, LinkOpener, LinkSettings, OsPortReclaimer, PortReclaimer,
    PortResolver, SerialLink, SerialPortInfo, SystemLinkOpener, SystemPortResolver,
};

pub use myolink_server::{serve, Broadcaster, Subscriber, SubscriberId, SubscriberRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
