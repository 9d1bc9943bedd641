// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Data served to public-API clients. The RPC surface itself lives in the
//! front-end collaborator; the handler only supplies the payloads.

use crate::{Error, Handler};
use pharos_chain::Beacon;
use pharos_net::{ChainInfoPacket, PublicRandResponse};

/// The public randomness payload of one beacon.
pub fn rand_response(beacon: &Beacon) -> PublicRandResponse {
    PublicRandResponse {
        round: beacon.round(),
        randomness: beacon.randomness(),
        signature: beacon.signature().to_vec(),
        previous_signature: beacon.previous_signature().to_vec(),
    }
}

impl Handler {
    /// The randomness of `round`, or of the latest stored beacon when
    /// `round == 0`.
    pub async fn public_rand(&self, round: u64) -> Result<PublicRandResponse, Error> {
        let beacon = if round == 0 {
            self.chain_store().last().await?
        } else {
            self.chain_store()
                .get(round)
                .await?
                .ok_or(pharos_chain::Error::NoBeaconStored)?
        };
        Ok(rand_response(&beacon))
    }

    /// The chain description served to clients.
    pub fn chain_info_packet(&self) -> ChainInfoPacket {
        let info = self.vault().chain_info();
        ChainInfoPacket {
            public_key: hex::encode(info.public_key().to_bytes()),
            period: info.period().as_secs(),
            genesis_time: info.genesis_time(),
            hash: hex::encode(info.hash()),
            group_hash: hex::encode(info.group_hash()),
            scheme_id: info.scheme_id().to_owned(),
        }
    }
}
