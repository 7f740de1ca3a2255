//! Activation events and the sink seam between acquisition and fan-out.
//!
//! A raw sample from the device is thresholded into a binary
//! [`SignalEvent`]. Events carry no identity beyond their value; the
//! wire representation is the text frame `"0"` or `"1"`.

use async_trait::async_trait;

/// Samples strictly above this value count as muscle activation.
pub const ACTIVATION_THRESHOLD: i64 = 100;

/// Binary muscle-activation event, the unit of broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalEvent {
    /// Sample at or below the activation threshold.
    Rest,
    /// Sample strictly above the activation threshold.
    Active,
}

impl SignalEvent {
    /// Threshold a raw sample into an event.
    pub fn from_sample(sample: i64) -> Self {
        if sample > ACTIVATION_THRESHOLD {
            SignalEvent::Active
        } else {
            SignalEvent::Rest
        }
    }

    /// The text frame sent to subscribers.
    pub fn frame(&self) -> &'static str {
        match self {
            SignalEvent::Rest => "0",
            SignalEvent::Active => "1",
        }
    }
}

impl std::fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.frame())
    }
}

/// Consumer of decoded events.
///
/// The acquisition side publishes through this trait and never learns
/// who (if anyone) is listening. Delivery is best-effort; implementations
/// must not propagate per-subscriber failures back to the publisher.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event to all current subscribers.
    async fn publish(&self, event: SignalEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(SignalEvent::from_sample(100), SignalEvent::Rest);
        assert_eq!(SignalEvent::from_sample(101), SignalEvent::Active);
        assert_eq!(SignalEvent::from_sample(0), SignalEvent::Rest);
        assert_eq!(SignalEvent::from_sample(-5), SignalEvent::Rest);
        assert_eq!(SignalEvent::from_sample(i64::MAX), SignalEvent::Active);
    }

    #[test]
    fn test_frame_representation() {
        assert_eq!(SignalEvent::Rest.frame(), "0");
        assert_eq!(SignalEvent::Active.frame(), "1");
        assert_eq!(SignalEvent::Active.to_string(), "1");
    }
}
