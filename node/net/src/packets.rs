// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

/// Environment variable naming the chain instance served by this process.
pub const BEACON_ID_VAR: &str = "BEACON_ID";
/// The beacon id used when a request names none.
pub const DEFAULT_BEACON_ID: &str = "default";

/// Request metadata disambiguating multi-beacon deployments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub beacon_id: String,
}

impl Metadata {
    pub fn for_beacon(beacon_id: &str) -> Self {
        Self {
            beacon_id: beacon_id.to_owned(),
        }
    }

    /// Metadata for the beacon id named by `$BEACON_ID`; unset or empty
    /// resolves to [`DEFAULT_BEACON_ID`].
    pub fn from_env() -> Self {
        let beacon_id = std::env::var(BEACON_ID_VAR).unwrap_or_default();
        if beacon_id.is_empty() {
            Self::for_beacon(DEFAULT_BEACON_ID)
        } else {
            Self {
                beacon_id,
            }
        }
    }
}

/// Resolves optional metadata to a beacon id; absent or empty means
/// [`DEFAULT_BEACON_ID`].
pub fn beacon_id(metadata: Option<&Metadata>) -> &str {
    match metadata {
        Some(m) if !m.beacon_id.is_empty() => &m.beacon_id,
        _ => DEFAULT_BEACON_ID,
    }
}

/// A partial signature gossiped for one round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialBeaconPacket {
    pub round: u64,
    pub previous_signature: Vec<u8>,
    pub partial_sig: Vec<u8>,
    pub metadata: Option<Metadata>,
}

impl PartialBeaconPacket {
    pub fn beacon_id(&self) -> &str {
        beacon_id(self.metadata.as_ref())
    }
}

/// A full beacon as streamed during chain sync.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconPacket {
    pub round: u64,
    pub previous_signature: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Request to stream all beacons from `from_round` onwards, then follow the
/// chain head.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub from_round: u64,
    pub metadata: Option<Metadata>,
}

impl SyncRequest {
    pub fn beacon_id(&self) -> &str {
        beacon_id(self.metadata.as_ref())
    }
}

/// Public API request for the randomness of one round; `round == 0` asks for
/// the latest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRandRequest {
    pub round: u64,
    pub metadata: Option<Metadata>,
}

/// Public API response carrying a beacon and its derived randomness.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRandResponse {
    pub round: u64,
    pub randomness: Vec<u8>,
    pub signature: Vec<u8>,
    pub previous_signature: Vec<u8>,
}

/// Public API description of the chain, hex-encoded for clients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfoPacket {
    pub public_key: String,
    pub period: u64,
    pub genesis_time: i64,
    pub hash: String,
    pub group_hash: String,
    pub scheme_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_request_defaults_its_beacon_id() {
        let req = SyncRequest {
            from_round: 1,
            metadata: None,
        };
        assert_eq!(req.beacon_id(), "default");

        let req = SyncRequest {
            from_round: 1,
            metadata: Some(Metadata::for_beacon("")),
        };
        assert_eq!(req.beacon_id(), "default");

        let req = SyncRequest {
            from_round: 1,
            metadata: Some(Metadata::for_beacon("someGreatBeacon")),
        };
        assert_eq!(req.beacon_id(), "someGreatBeacon");
    }

    #[test]
    fn partial_packet_defaults_its_beacon_id() {
        let packet = PartialBeaconPacket::default();
        assert_eq!(packet.beacon_id(), "default");
    }

    #[test]
    fn metadata_from_env_defaults() {
        // No other test touches $BEACON_ID.
        std::env::remove_var(BEACON_ID_VAR);
        assert_eq!(Metadata::from_env().beacon_id, DEFAULT_BEACON_ID);
        std::env::set_var(BEACON_ID_VAR, "someGreatBeacon");
        assert_eq!(Metadata::from_env().beacon_id, "someGreatBeacon");
        std::env::remove_var(BEACON_ID_VAR);
    }
}
