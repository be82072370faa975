//! Connection handles, the registry, and background liveness loops.

pub mod handle;
pub mod heartbeat;
pub mod registry;

pub use handle::{ConnectionHandle, ConnectionId, ConnectionInfo, TrySendResult};
pub use registry::ConnectionRegistry;
