//! Network configuration with TOML file support.
//!
//! A [`NetworkConfig`] names every party in the computation plus the local
//! party's own id, and is validated once at construction: ids must cover
//! `1..=N` exactly, the local id must be in the set, and the set must fit
//! the one-byte bootstrap handshake. The configuration is immutable for
//! the lifetime of the session.
//!
//! Can be loaded from a TOML file via [`NetworkConfig::from_toml_file`] or
//! built programmatically (e.g. for tests).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::party::{Party, PartyId};

/// Upper bound on the party-set size. The bootstrap handshake identifies
/// the dialing party with a single byte, so ids above 255 cannot be
/// expressed on the wire.
pub const MAX_PARTIES: usize = 255;

/// The full party set plus the local party's id.
///
/// Invariants, enforced by [`NetworkConfig::new`]:
/// - at least one party, at most [`MAX_PARTIES`];
/// - party ids cover `1..=N` exactly, no duplicates;
/// - `my_id` is one of the configured ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile")]
pub struct NetworkConfig {
    my_id: PartyId,
    /// Sorted by id; party `i` lives at index `i - 1`.
    parties: Vec<Party>,
}

/// Raw deserialization target; promoted to [`NetworkConfig`] through the
/// validating constructor.
#[derive(Deserialize)]
struct ConfigFile {
    my_id: PartyId,
    parties: Vec<Party>,
}

impl TryFrom<ConfigFile> for NetworkConfig {
    type Error = ConfigError;

    fn try_from(raw: ConfigFile) -> Result<Self, ConfigError> {
        Self::new(raw.my_id, raw.parties)
    }
}

impl NetworkConfig {
    /// Validate and build a configuration from the local id and the full
    /// party set (in any order).
    pub fn new(my_id: PartyId, mut parties: Vec<Party>) -> Result<Self, ConfigError> {
        if parties.is_empty() {
            return Err(ConfigError::Empty);
        }
        if parties.len() > MAX_PARTIES {
            return Err(ConfigError::TooManyParties(parties.len()));
        }
        parties.sort_by_key(|p| p.id);
        let n = parties.len() as u32;
        for (i, party) in parties.iter().enumerate() {
            let expected = i as u32 + 1;
            if party.id == expected {
                continue;
            }
            if i > 0 && party.id == parties[i - 1].id {
                return Err(ConfigError::DuplicateId(party.id));
            }
            return Err(ConfigError::NonContiguousIds {
                expected: n,
                found: party.id,
            });
        }
        if my_id == 0 || my_id > n {
            return Err(ConfigError::UnknownLocalId(my_id));
        }
        Ok(Self { my_id, parties })
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NetworkConfig is always serializable to TOML")
    }

    /// The local party's id.
    pub fn my_id(&self) -> PartyId {
        self.my_id
    }

    /// The local party.
    pub fn me(&self) -> &Party {
        &self.parties[(self.my_id - 1) as usize]
    }

    /// Look up a party by id. `None` for ids outside `1..=N`.
    pub fn party(&self, id: PartyId) -> Option<&Party> {
        if id == 0 {
            return None;
        }
        self.parties.get((id - 1) as usize)
    }

    /// Size of the party set, N.
    pub fn num_parties(&self) -> u32 {
        self.parties.len() as u32
    }

    /// All parties, sorted by id.
    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    /// Every party except the local one, in ascending id order.
    pub fn remote_parties(&self) -> impl Iterator<Item = &Party> {
        let my_id = self.my_id;
        self.parties.iter().filter(move |p| p.id != my_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parties(n: u32) -> Vec<Party> {
        (1..=n)
            .map(|id| Party::new(id, "127.0.0.1", 9000 + id as u16))
            .collect()
    }

    #[test]
    fn valid_config_accessors() {
        let config = NetworkConfig::new(2, parties(3)).expect("valid config");
        assert_eq!(config.my_id(), 2);
        assert_eq!(config.num_parties(), 3);
        assert_eq!(config.me().port, 9002);
        assert_eq!(config.party(1).map(|p| p.port), Some(9001));
        assert_eq!(config.party(4), None);
        assert_eq!(config.party(0), None);

        let remotes: Vec<PartyId> = config.remote_parties().map(|p| p.id).collect();
        assert_eq!(remotes, vec![1, 3]);
    }

    #[test]
    fn party_order_does_not_matter() {
        let mut set = parties(3);
        set.reverse();
        let config = NetworkConfig::new(1, set).expect("valid config");
        assert_eq!(config.parties()[0].id, 1);
        assert_eq!(config.parties()[2].id, 3);
    }

    #[test]
    fn single_party_config_is_valid() {
        let config = NetworkConfig::new(1, parties(1)).expect("valid config");
        assert_eq!(config.num_parties(), 1);
        assert_eq!(config.remote_parties().count(), 0);
    }

    #[test]
    fn empty_party_set_rejected() {
        let err = NetworkConfig::new(1, vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::Empty));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut set = parties(3);
        set[2].id = 2;
        let err = NetworkConfig::new(1, set).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateId(2)));
    }

    #[test]
    fn gap_in_ids_rejected() {
        let mut set = parties(3);
        set[2].id = 5;
        let err = NetworkConfig::new(1, set).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonContiguousIds {
                expected: 3,
                found: 5
            }
        ));
    }

    #[test]
    fn zero_id_rejected() {
        let mut set = parties(2);
        set[0].id = 0;
        let err = NetworkConfig::new(1, set).unwrap_err();
        assert!(matches!(err, ConfigError::NonContiguousIds { found: 0, .. }));
    }

    #[test]
    fn my_id_must_be_in_set() {
        let err = NetworkConfig::new(4, parties(3)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLocalId(4)));
        let err = NetworkConfig::new(0, parties(3)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLocalId(0)));
    }

    #[test]
    fn oversized_party_set_rejected() {
        let set: Vec<Party> = (1..=256)
            .map(|id| Party::new(id, "127.0.0.1", 10_000))
            .collect();
        let err = NetworkConfig::new(1, set).unwrap_err();
        assert!(matches!(err, ConfigError::TooManyParties(256)));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = NetworkConfig::new(1, parties(3)).expect("valid config");
        let toml_str = config.to_toml_string();
        let parsed = NetworkConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn toml_with_invalid_ids_rejected() {
        let toml = r#"
            my_id = 1

            [[parties]]
            id = 1
            host = "10.0.0.1"
            port = 9001

            [[parties]]
            id = 3
            host = "10.0.0.3"
            port = 9003
        "#;
        let err = NetworkConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_file_round_trip() {
        let config = NetworkConfig::new(2, parties(2)).expect("valid config");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(config.to_toml_string().as_bytes())
            .expect("write config");

        let path = file.path().to_str().expect("utf-8 path");
        let loaded = NetworkConfig::from_toml_file(path).expect("load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_returns_read_error() {
        let result = NetworkConfig::from_toml_file("/nonexistent/conclave.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::Read(_)));
    }
}
