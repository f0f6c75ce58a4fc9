/// Real-time task event fan-out
///
/// One broadcast channel per team, held in an in-process registry that is
/// safe under concurrent subscribe/publish from many connections. Delivery
/// is best-effort and fire-and-forget: no acknowledgement, no persistence
/// or replay for connections that were offline at publish time, and no
/// ordering guarantee across channels. Within one channel, subscribers see
/// events in publish order.

pub mod events;
pub mod registry;

pub use events::{EventKind, TeamEvent};
pub use registry::ChannelRegistry;
