//! # Myolink Core
//!
//! Core types, traits, and utilities for Myolink.
//! Provides the fundamental abstractions shared between the device
//! acquisition side and the subscriber fan-out side:
//! - Error taxonomy for device, decode, and configuration failures
//! - The binary activation event and its wire representation
//! - The `EventSink` seam between acquisition and broadcast
//! - Runtime configuration with file loading and validation

pub mod config;
pub mod error;
pub mod event;

pub use config::{BridgeConfig, DeviceSettings, ServerSettings};
pub use error::{ConfigError, DecodeError, DeviceError, Error, Result};
pub use event::{EventSink, SignalEvent, ACTIVATION_THRESHOLD};
