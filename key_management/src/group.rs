// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{DistPublic, Error, Node};
use byteorder::{BigEndian, ByteOrder};
use pharos_crypto::{Point, Scheme};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The smallest threshold accepted for a group of `n` nodes.
pub fn minimum_threshold(n: usize) -> u32 {
    n as u32 / 2 + 1
}

/// The working group of the beacon network for one epoch: the participants,
/// the threshold, the round schedule and the distributed public key. Shared
/// read-only by every component and replaced atomically on epoch change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GroupConfig", into = "GroupConfig")]
pub struct Group {
    nodes: Vec<Node>,
    threshold: u32,
    period: Duration,
    genesis_time: i64,
    dist_public: DistPublic,
    scheme: Scheme,
    beacon_id: String,
}

impl Group {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nodes: Vec<Node>,
        threshold: u32,
        period: Duration,
        genesis_time: i64,
        dist_public: DistPublic,
        scheme: Scheme,
        beacon_id: String,
    ) -> Result<Self, Error> {
        if nodes.is_empty() {
            return Err(Error::EmptyGroup);
        }
        let n = nodes.len();
        for node in &nodes {
            let index = node.index();
            let in_range = index >= 1 && index <= n as u32;
            let unique = nodes.iter().filter(|o| o.index() == index).count() == 1;
            if !in_range || !unique {
                return Err(Error::InvalidIndex(index));
            }
        }
        if threshold < minimum_threshold(n) || threshold > n as u32 {
            return Err(Error::InvalidThreshold {
                threshold,
                nodes: n,
            });
        }
        if period.is_zero() {
            return Err(Error::ZeroPeriod);
        }
        if genesis_time == 0 {
            return Err(Error::ZeroGenesisTime);
        }
        // The public key accessor relies on a non-empty polynomial.
        dist_public.key()?;
        Ok(Self {
            nodes,
            threshold,
            period,
            genesis_time,
            dist_public,
            scheme,
            beacon_id,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn genesis_time(&self) -> i64 {
        self.genesis_time
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn beacon_id(&self) -> &str {
        &self.beacon_id
    }

    pub fn dist_public(&self) -> &DistPublic {
        &self.dist_public
    }

    /// The group public key.
    pub fn public_key(&self) -> &Point {
        &self.dist_public.coefficients()[0]
    }

    /// The node holding `index`, if it is a member.
    pub fn node(&self, index: u32) -> Option<&Node> {
        self.nodes.iter().find(|n| n.index() == index)
    }

    /// The member listening on `address`.
    pub fn find(&self, address: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.address() == address)
    }

    /// A stable hash over everything the group agrees on.
    pub fn hash(&self) -> Vec<u8> {
        let mut hasher = blake2b_simd::Params::new().hash_length(32).to_state();
        let mut buf = [0u8; 8];

        hasher.update(self.beacon_id.as_bytes());
        hasher.update(self.scheme.id().as_bytes());
        BigEndian::write_u64(&mut buf, u64::from(self.threshold));
        hasher.update(&buf);
        BigEndian::write_u64(&mut buf, self.period.as_secs());
        hasher.update(&buf);
        BigEndian::write_u64(&mut buf, self.genesis_time as u64);
        hasher.update(&buf);
        for node in &self.nodes {
            BigEndian::write_u64(&mut buf, u64::from(node.index()));
            hasher.update(&buf);
            hasher.update(&node.key().to_bytes());
        }
        for commit in self.dist_public.coefficients() {
            hasher.update(&commit.to_bytes());
        }
        hasher.finalize().as_bytes().to_vec()
    }

    /// The seed of the chain: fed into the genesis entry, and through it into
    /// the first digest of chained schemes.
    pub fn genesis_seed(&self) -> Vec<u8> {
        self.hash()
    }
}

/// Wire/config form of a [`Group`]; conversion runs the full validation.
#[derive(Clone, Serialize, Deserialize)]
struct GroupConfig {
    nodes: Vec<Node>,
    threshold: u32,
    period_seconds: u64,
    genesis_time: i64,
    dist_public: DistPublic,
    scheme: Scheme,
    beacon_id: String,
}

impl TryFrom<GroupConfig> for Group {
    type Error = Error;

    fn try_from(config: GroupConfig) -> Result<Self, Self::Error> {
        Group::new(
            config.nodes,
            config.threshold,
            Duration::from_secs(config.period_seconds),
            config.genesis_time,
            config.dist_public,
            config.scheme,
            config.beacon_id,
        )
    }
}

impl From<Group> for GroupConfig {
    fn from(group: Group) -> Self {
        GroupConfig {
            nodes: group.nodes,
            threshold: group.threshold,
            period_seconds: group.period.as_secs(),
            genesis_time: group.genesis_time,
            dist_public: group.dist_public,
            scheme: group.scheme,
            beacon_id: group.beacon_id,
        }
    }
}
