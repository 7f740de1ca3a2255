//! Serial port enumeration and device selection
//!
//! Provides port discovery and the heuristic that picks the EMG sensor
//! out of whatever serial-capable devices the host currently exposes.
//!
//! Selection heuristic, in order:
//! 1. First enumerated port whose description contains a known
//!    USB-serial-adapter marker
//! 2. First enumerated port, as a best-effort fallback
//!
//! Enumeration order comes straight from the OS, so when several
//! matching adapters are plugged in the pick is effectively arbitrary.
//! That ambiguity is inherent to the heuristic and left as-is.

use myolink_core::DeviceError;

/// Description substrings that identify common USB-serial adapters.
///
/// Matching is case-sensitive, mirroring how the adapters actually
/// report themselves (FTDI, CH340, CP210x bridges and friends).
pub const USB_SERIAL_MARKERS: &[&str] = &["USB", "Serial", "FTDI", "CH340", "CP210"];

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }
}

/// List available serial ports on the system
///
/// Returns every serial-capable device entry the host reports, with a
/// user-friendly description derived from the port type.
pub fn list_ports() -> Result<Vec<SerialPortInfo>, DeviceError> {
    match serialport::available_ports() {
        Ok(ports) => {
            let port_infos: Vec<SerialPortInfo> = ports
                .iter()
                .map(|port| {
                    let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

                    match &port.port_type {
                        serialport::SerialPortType::UsbPort(usb_info) => {
                            match usb_info.manufacturer {
                                Some(ref mfg) => info.with_manufacturer(mfg),
                                None => info,
                            }
                        }
                        _ => info,
                    }
                })
                .collect();

            Ok(port_infos)
        }
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(DeviceError::PortNotFound)
        }
    }
}

/// Get a user-friendly description for a port
fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Pick the most likely sensor port from an enumeration.
///
/// Returns the first entry whose description carries a known adapter
/// marker, falling back to the first entry when nothing matches.
pub fn select_candidate(ports: &[SerialPortInfo]) -> Option<&SerialPortInfo> {
    ports
        .iter()
        .find(|port| {
            USB_SERIAL_MARKERS
                .iter()
                .any(|marker| port.description.contains(marker))
        })
        .or_else(|| ports.first())
}

/// Resolves the serial port the sensor is attached to.
///
/// Behind a trait so the acquisition loop can be driven by a scripted
/// resolver in tests.
pub trait PortResolver: Send + Sync {
    /// Enumerate and select a candidate port.
    fn resolve(&self) -> Result<SerialPortInfo, DeviceError>;
}

/// Resolver backed by the host's real port enumeration.
pub struct SystemPortResolver;

impl PortResolver for SystemPortResolver {
    fn resolve(&self) -> Result<SerialPortInfo, DeviceError> {
        let ports = list_ports()?;
        for port in &ports {
            tracing::debug!("Available port {}: {}", port.port_name, port.description);
        }
        match select_candidate(&ports) {
            Some(candidate) => Ok(candidate.clone()),
            None => Err(DeviceError::PortNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, description: &str) -> SerialPortInfo {
        SerialPortInfo::new(name, description)
    }

    #[test]
    fn test_marker_match_wins_over_order() {
        let ports = vec![
            port("/dev/ttyS0", "PCI Serial"),
            port("/dev/ttyUSB0", "USB FTDI FT232R"),
            port("/dev/ttyUSB1", "USB CH340 Adapter"),
        ];
        let picked = select_candidate(&ports).expect("candidate");
        assert_eq!(picked.port_name, "/dev/ttyUSB0");
    }

    #[test]
    fn test_fallback_to_first_entry() {
        let ports = vec![
            port("/dev/ttyS0", "Onboard UART"),
            port("/dev/ttyS1", "Onboard UART"),
        ];
        let picked = select_candidate(&ports).expect("candidate");
        assert_eq!(picked.port_name, "/dev/ttyS0");
    }

    #[test]
    fn test_empty_enumeration_yields_none() {
        assert!(select_candidate(&[]).is_none());
    }

    #[test]
    fn test_marker_match_is_case_sensitive() {
        let ports = vec![
            port("/dev/ttyACM0", "usb modem"),
            port("/dev/ttyACM1", "CP2102N USB to UART"),
        ];
        let picked = select_candidate(&ports).expect("candidate");
        assert_eq!(picked.port_name, "/dev/ttyACM1");
    }
}
