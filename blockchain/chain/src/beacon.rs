// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// One entry of the beacon chain: the recovered group signature over the
/// round's digest, plus the previous signature the digest committed to.
/// Immutable once persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beacon {
    round: u64,
    previous_signature: Vec<u8>,
    signature: Vec<u8>,
}

impl Beacon {
    pub fn new(round: u64, previous_signature: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            round,
            previous_signature,
            signature,
        }
    }

    /// The genesis entry of a chain seeded with `seed`. It is not a signed
    /// beacon; the seed stands in for the signature so that chained schemes
    /// have something to commit to in round 1.
    pub fn genesis(seed: Vec<u8>) -> Self {
        Self {
            round: 0,
            previous_signature: Vec::new(),
            signature: seed,
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn previous_signature(&self) -> &[u8] {
        &self.previous_signature
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The public randomness of this beacon.
    pub fn randomness(&self) -> Vec<u8> {
        Sha256::digest(&self.signature).to_vec()
    }

    // Unchained schemes store beacons without a previous signature.
    pub(crate) fn clear_previous_signature(&mut self) {
        self.previous_signature.clear();
    }
}

impl fmt::Display for Beacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = &self.signature[..self.signature.len().min(4)];
        write!(f, "round {} sig 0x{}…", self.round, hex::encode(prefix))
    }
}
