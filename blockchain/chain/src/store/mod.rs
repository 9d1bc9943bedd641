// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The persistence layer is a linear decorator chain, composed bottom up:
//!
//! `BeaconStore` (raw KV) ← `AppendStore` (contiguity) ← `SchemeStore`
//! (previous-signature consistency) ← `DiscrepancyStore` (timing
//! observability) ← `CallbackStore` (notification fan-out).
//!
//! Each layer owns its inner store as a boxed value; there are no cycles.

mod append;
mod callback;
mod discrepancy;
mod kv;
mod scheme;

pub use append::AppendStore;
pub use callback::{BeaconCallback, CallbackStore, CALLBACK_WORKER_QUEUE};
pub use discrepancy::DiscrepancyStore;
pub use kv::BeaconStore;
pub use scheme::SchemeStore;

use crate::{Beacon, Error};
use async_trait::async_trait;

/// Ordered, append-only persistence of beacons keyed by round.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists a beacon. Layers above the raw store enforce that rounds
    /// grow by exactly one and that chain links hold.
    async fn put(&self, beacon: Beacon) -> Result<(), Error>;

    /// The beacon of `round`, if stored.
    async fn get(&self, round: u64) -> Result<Option<Beacon>, Error>;

    /// The highest stored beacon. A freshly opened store always holds at
    /// least the genesis entry.
    async fn last(&self) -> Result<Beacon, Error>;

    /// Number of stored beacons, genesis included.
    async fn len(&self) -> Result<u64, Error>;

    /// Releases the store. Idempotent.
    async fn close(&self) -> Result<(), Error>;
}

/// Streams beacons in ascending round order starting at `from`. Because the
/// chain is contiguous, consecutive `get`s are a complete ascending scan.
pub struct Cursor<'a> {
    store: &'a dyn Store,
    next_round: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(store: &'a dyn Store, from: u64) -> Self {
        Self {
            store,
            next_round: from,
        }
    }

    /// The next stored beacon, or `None` once past the chain head.
    pub async fn next(&mut self) -> Result<Option<Beacon>, Error> {
        match self.store.get(self.next_round).await? {
            Some(beacon) => {
                self.next_round += 1;
                Ok(Some(beacon))
            }
            None => Ok(None),
        }
    }
}
