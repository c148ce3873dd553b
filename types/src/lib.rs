//! Fundamental types for the conclave transport.
//!
//! This crate defines the types shared by everything that talks over a
//! conclave network: party identities (a numbered endpoint with a network
//! address) and the validated configuration describing the full party set.

pub mod config;
pub mod error;
pub mod party;

pub use config::{NetworkConfig, MAX_PARTIES};
pub use error::ConfigError;
pub use party::{Party, PartyId};
