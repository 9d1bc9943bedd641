// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use pharos_crypto::Point;
use serde::{Deserialize, Serialize};

/// Information about one participant of the beacon network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    index: u32,
    address: String,
    key: Point,
}

impl Node {
    pub fn new(index: u32, address: String, key: Point) -> Self {
        Self {
            index,
            address,
            key,
        }
    }

    /// One-based group index; equals the signer index of the node's partials.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn key(&self) -> &Point {
        &self.key
    }
}
