//! Party identity: a numbered endpoint with a network address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a party within a computation. Always in `1..=N` for a
/// party set of size N; never 0.
pub type PartyId = u32;

/// One numbered endpoint in the computation.
///
/// The id and address are fixed for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub host: String,
    pub port: u16,
}

impl Party {
    pub fn new(id: PartyId, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
        }
    }

    /// `host:port`, suitable for dialing.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}@{}:{}", self.id, self.host, self.port)
    }
}
