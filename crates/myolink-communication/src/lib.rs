//! # Myolink Communication
//!
//! The device side of Myolink: serial port discovery, link lifecycle
//! management, sample decoding, and the long-running acquisition loop.
//!
//! Responsibilities:
//! - Port enumeration and heuristic selection of the sensor device
//! - Opening and owning the single live serial handle
//! - Forced reclaim of ports held by stale processes
//! - Newline framing and decoding of the numeric sample protocol
//! - The connect/stream/backoff state machine driving it all

pub mod acquisition;
pub mod decode;
pub mod link;
pub mod reclaim;
pub mod serial;

pub use acquisition::{start, AcquisitionConfig, AcquisitionHandle, AcquisitionLoop};
pub use decode::{decode_line, LineBuffer};
pub use link::{DeviceLinkManager, LinkOpener, LinkSettings, SerialLink, SystemLinkOpener};
pub use reclaim::{OsPortReclaimer, PortReclaimer};
pub use serial::{list_ports, PortResolver, SerialPortInfo, SystemPortResolver};
