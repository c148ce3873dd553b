use std::fmt;
use std::time::Duration;

use thiserror::Error;

use conclave_types::PartyId;

/// Which half of a peer link an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Receive => write!(f, "receive"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NetworkError {
    /// Bootstrap did not finish within the configured timeout. Fatal; the
    /// network was never usable.
    #[error("bootstrap timed out after {0:?}")]
    BootstrapTimeout(Duration),

    /// Bootstrap failed outright (bind, accept, or handshake failure).
    /// Fatal; all partially opened sockets have been closed.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    /// A party id outside `1..=N`. Caller bug, never retried.
    #[error("party id {id} out of range 1..={max}")]
    InvalidPartyId { id: PartyId, max: u32 },

    /// The pipeline serving this party has terminated (I/O failure or the
    /// peer went away). Terminal for the session — there is no reconnect.
    #[error("{direction} pipeline for party {party} has terminated")]
    LinkFailed { party: PartyId, direction: Direction },

    /// The network has been closed; sends and receives fail fast.
    #[error("network is closed")]
    Closed,
}
