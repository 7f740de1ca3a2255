//! Device link lifecycle management
//!
//! Owns the single live serial handle for the whole process. All opens,
//! reads, and closes go through [`DeviceLinkManager`]; no other
//! component ever touches the handle.
//!
//! Opening is idempotent, reads are bounded by the configured timeout,
//! and any I/O failure on an open handle is connection-fatal: the
//! manager drops the handle and surfaces the error. Retry policy lives
//! entirely in the acquisition loop.

use crate::reclaim::PortReclaimer;
use myolink_core::DeviceError;
use std::io::{self, Read};
use std::time::Duration;

/// Parameters for opening the serial link
#[derive(Debug, Clone)]
pub struct LinkSettings {
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout
    pub read_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// Low-level serial link interface
pub trait SerialLink: Send {
    /// Number of bytes waiting in the OS receive buffer
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Read pending data into `buf`
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// The port this link is bound to
    fn port_name(&self) -> &str;
}

/// Opens serial links; injected so tests can simulate busy or flaky ports.
pub trait LinkOpener: Send + Sync {
    /// Open-and-drop probe to check whether the port can be acquired.
    fn probe(&self, port: &str) -> Result<(), DeviceError>;

    /// Open the port for real.
    fn open(&self, port: &str, settings: &LinkSettings)
        -> Result<Box<dyn SerialLink>, DeviceError>;
}

/// Real serial link backed by the serialport crate
struct SystemSerialLink {
    name: String,
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink for SystemSerialLink {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}

/// Opener backed by real host serial ports.
pub struct SystemLinkOpener;

impl SystemLinkOpener {
    fn classify_open_error(port: &str, err: serialport::Error) -> DeviceError {
        if is_busy_error(&err) {
            DeviceError::PortBusy {
                port: port.to_string(),
            }
        } else {
            DeviceError::FailedToOpen {
                port: port.to_string(),
                reason: err.description,
            }
        }
    }
}

impl LinkOpener for SystemLinkOpener {
    fn probe(&self, port: &str) -> Result<(), DeviceError> {
        // The probe handle is dropped immediately; only the open matters.
        serialport::new(port, 9600)
            .timeout(Duration::from_millis(100))
            .open()
            .map(drop)
            .map_err(|e| Self::classify_open_error(port, e))
    }

    fn open(
        &self,
        port: &str,
        settings: &LinkSettings,
    ) -> Result<Box<dyn SerialLink>, DeviceError> {
        match serialport::new(port, settings.baud_rate)
            .timeout(settings.read_timeout)
            .open()
        {
            Ok(handle) => Ok(Box::new(SystemSerialLink {
                name: port.to_string(),
                port: handle,
            })),
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", port, e);
                Err(Self::classify_open_error(port, e))
            }
        }
    }
}

/// Check whether an open failure means the device is held elsewhere
fn is_busy_error(err: &serialport::Error) -> bool {
    if let serialport::ErrorKind::Io(kind) = &err.kind {
        if *kind == io::ErrorKind::ResourceBusy {
            return true;
        }
    }
    err.description.to_ascii_lowercase().contains("busy")
}

/// Owner of the one live device handle.
pub struct DeviceLinkManager {
    opener: Box<dyn LinkOpener>,
    reclaimer: Box<dyn PortReclaimer>,
    settings: LinkSettings,
    reclaim_settle: Duration,
    link: Option<Box<dyn SerialLink>>,
}

impl DeviceLinkManager {
    /// Create a manager with an injected opener and reclaimer.
    pub fn new(
        opener: Box<dyn LinkOpener>,
        reclaimer: Box<dyn PortReclaimer>,
        settings: LinkSettings,
        reclaim_settle: Duration,
    ) -> Self {
        Self {
            opener,
            reclaimer,
            settings,
            reclaim_settle,
            link: None,
        }
    }

    /// Whether a link is currently open
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// The port the open link is bound to, if any
    pub fn connected_port(&self) -> Option<&str> {
        self.link.as_deref().map(|link| link.port_name())
    }

    /// Open the link to `port` if not already open.
    ///
    /// A healthy link to the same port makes this a no-op. A busy probe
    /// triggers the reclaimer, a settle wait, then exactly one more open
    /// attempt whose error propagates.
    pub async fn ensure_connected(&mut self, port: &str) -> Result<(), DeviceError> {
        if let Some(link) = &self.link {
            if link.port_name() == port {
                return Ok(());
            }
            // Bound port changed under us; release the old handle first.
            self.close();
        }

        match self.opener.probe(port) {
            Ok(()) => {}
            Err(DeviceError::PortBusy { .. }) => {
                tracing::warn!("Port {} is busy, attempting forced reclaim", port);
                self.reclaimer.reclaim(port)?;
                tokio::time::sleep(self.reclaim_settle).await;
            }
            Err(e) => {
                // Let the real open report the definitive error.
                tracing::debug!("Probe of {} failed: {}", port, e);
            }
        }

        let link = self.opener.open(port, &self.settings)?;
        tracing::info!("Connected to {} at {} baud", port, self.settings.baud_rate);
        self.link = Some(link);
        Ok(())
    }

    /// Read whatever bytes are pending, without blocking past the
    /// configured timeout.
    ///
    /// Returns an empty buffer when nothing is waiting. Any I/O failure
    /// drops the handle and surfaces as [`DeviceError::ConnectionLost`].
    pub fn read_available(&mut self) -> Result<Vec<u8>, DeviceError> {
        let Some(mut link) = self.link.take() else {
            return Err(DeviceError::NotConnected);
        };

        match read_pending(link.as_mut()) {
            Ok(bytes) => {
                self.link = Some(link);
                Ok(bytes)
            }
            Err(e) => {
                tracing::warn!("Read failed on {}, dropping link: {}", link.port_name(), e);
                Err(DeviceError::ConnectionLost {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Drop the handle if one is open. Idempotent.
    pub fn close(&mut self) {
        if let Some(link) = self.link.take() {
            tracing::info!("Closed serial link on {}", link.port_name());
        }
    }
}

fn read_pending(link: &mut dyn SerialLink) -> io::Result<Vec<u8>> {
    let pending = link.bytes_to_read()?;
    if pending == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; pending as usize];
    match link.read(&mut buf) {
        Ok(len) => {
            buf.truncate(len);
            Ok(buf)
        }
        // A timeout between the pending check and the read just means
        // the bytes are not there yet.
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
