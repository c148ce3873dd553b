use thiserror::Error;

use crate::party::PartyId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("party set is empty")]
    Empty,

    #[error("duplicate party id {0}")]
    DuplicateId(PartyId),

    #[error("party ids must cover 1..={expected} exactly, found id {found}")]
    NonContiguousIds { expected: u32, found: PartyId },

    #[error("local party id {0} is not in the party set")]
    UnknownLocalId(PartyId),

    #[error("party set has {0} parties, maximum is 255")]
    TooManyParties(usize),

    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
