//! Service layer: everything that talks to the remote origin.
//!
//! - HTTP transport with retry and degraded fallback (`transport`)
//! - Session bootstrap and artifact extraction (`bootstrap`)
//! - The stateful update-protocol client (`protocol`)
//! - serverMemo event extraction (`extract`)

pub mod bootstrap;
pub mod extract;
pub mod protocol;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::SessionBootstrapper;
pub use protocol::ProtocolClient;
pub use transport::{Transport, TransportConfig};
