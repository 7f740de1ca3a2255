//! # Myolink Server
//!
//! The fan-out side of Myolink: tracks live WebSocket subscribers and
//! pushes each activation event to all of them.
//!
//! - [`SubscriberRegistry`] — concurrency-safe membership set
//! - [`Broadcaster`] — snapshot-then-deliver dispatch with pruning of
//!   unreachable subscribers
//! - [`ws::serve`] — the accept loop performing the WebSocket upgrade
//!   and running one task per connection

pub mod broadcast;
pub mod registry;
pub mod ws;

pub use broadcast::Broadcaster;
pub use registry::{Subscriber, SubscriberId, SubscriberRegistry};
pub use ws::serve;
