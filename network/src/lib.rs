//! Point-to-point message transport for a fixed set of numbered parties.
//!
//! Every party establishes exactly one full-duplex TCP channel to every
//! other party (lower ids accept, higher ids dial, so no pair can end up
//! mutually waiting), then runs one send and one receive pipeline per
//! peer. Callers get ordered, reliable delivery per directed pair, a
//! loopback path for self-addressed messages that never touches a socket,
//! and an idempotent, race-free [`Network::close`].
//!
//! The transport moves opaque byte payloads. It does not route, does not
//! multiplex logical streams, does not survive process crashes, and never
//! reorders or deduplicates.

pub mod error;
pub mod logging;
pub mod network;
pub mod wire;

mod bootstrap;
mod link;

pub use error::{Direction, NetworkError};
pub use logging::{init_logging, LogFormat};
pub use network::{Network, DEFAULT_CONNECT_TIMEOUT};
