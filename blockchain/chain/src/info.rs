// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use byteorder::{BigEndian, ByteOrder};
use pharos_crypto::Point;
use pharos_key::Group;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Contains all the info about a beacon chain that a client needs to verify
/// its randomness. Constant for the life of the chain: epoch rotation swaps
/// the group but never the chain info.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainInfo {
    public_key: Point,
    beacon_id: String,
    period: Duration,
    genesis_time: i64,
    genesis_seed: Vec<u8>,
    scheme_id: String,
    group_hash: Vec<u8>,
}

impl ChainInfo {
    pub fn from_group(group: &Group) -> Self {
        Self {
            public_key: *group.public_key(),
            beacon_id: group.beacon_id().to_owned(),
            period: group.period(),
            genesis_time: group.genesis_time(),
            genesis_seed: group.genesis_seed(),
            scheme_id: group.scheme().id().to_owned(),
            group_hash: group.hash(),
        }
    }

    pub fn public_key(&self) -> &Point {
        &self.public_key
    }

    pub fn beacon_id(&self) -> &str {
        &self.beacon_id
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn genesis_time(&self) -> i64 {
        self.genesis_time
    }

    pub fn genesis_seed(&self) -> &[u8] {
        &self.genesis_seed
    }

    pub fn scheme_id(&self) -> &str {
        &self.scheme_id
    }

    pub fn group_hash(&self) -> &[u8] {
        &self.group_hash
    }

    /// A stable identifier of the chain, hashed over everything a client
    /// pins when it follows this beacon.
    pub fn hash(&self) -> Vec<u8> {
        let mut hasher = blake2b_simd::Params::new().hash_length(32).to_state();
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, self.period.as_secs());
        hasher.update(&buf);
        BigEndian::write_u64(&mut buf, self.genesis_time as u64);
        hasher.update(&buf);
        hasher.update(&self.public_key.to_bytes());
        hasher.update(&self.group_hash);
        hasher.update(self.scheme_id.as_bytes());
        hasher.update(self.beacon_id.as_bytes());
        hasher.finalize().as_bytes().to_vec()
    }
}
