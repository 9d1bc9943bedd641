// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use pharos_clock::Clock;
use pharos_key::{Group, Node, Share};
use std::sync::Arc;

/// Config used when initializing a beacon [`Handler`](crate::Handler).
pub struct Config {
    /// The working group this node participates in.
    pub group: Arc<Group>,
    /// This node's public identity within the group.
    pub public: Node,
    /// This node's DKG output. A node without a share can follow the chain
    /// but not contribute partials.
    pub share: Option<Share>,
    /// All time reads and round scheduling go through this clock.
    pub clock: Arc<dyn Clock>,
}

impl Config {
    pub fn beacon_id(&self) -> &str {
        self.group.beacon_id()
    }
}
