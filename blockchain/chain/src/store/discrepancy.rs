// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Store;
use crate::{metrics, time, Beacon, Error};
use async_trait::async_trait;
use log::info;
use pharos_clock::Clock;
use pharos_key::Group;
use std::sync::Arc;

/// A store that logs timing information about the rounds. Never alters the
/// beacon passing through it.
pub struct DiscrepancyStore {
    inner: Box<dyn Store>,
    group: Arc<Group>,
    clock: Arc<dyn Clock>,
}

impl DiscrepancyStore {
    pub fn new(inner: Box<dyn Store>, group: Arc<Group>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            group,
            clock,
        }
    }
}

#[async_trait]
impl Store for DiscrepancyStore {
    async fn put(&self, beacon: Beacon) -> Result<(), Error> {
        // Sampled before any storage interaction so the discrepancy does not
        // include the storage latency itself.
        let actual = self.clock.now_nanos();

        self.inner.put(beacon.clone()).await?;

        let stored = self.clock.now_nanos();
        let expected =
            time::time_of_round(self.group.period(), self.group.genesis_time(), beacon.round())
                * 1_000_000_000;
        let discrepancy_ms = (actual - expected) as f64 / 1e6;
        let storage_ms = (stored - actual) as f64 / 1e6;

        let beacon_id = self.group.beacon_id();
        metrics::BEACON_DISCREPANCY_LATENCY
            .with_label_values(&[beacon_id])
            .set(discrepancy_ms);
        metrics::BEACON_STORAGE_LATENCY
            .with_label_values(&[beacon_id])
            .set(storage_ms);
        metrics::LAST_BEACON_ROUND
            .with_label_values(&[beacon_id])
            .set(beacon.round() as i64);
        metrics::GROUP_SIZE
            .with_label_values(&[beacon_id])
            .set(self.group.len() as i64);
        metrics::GROUP_THRESHOLD
            .with_label_values(&[beacon_id])
            .set(i64::from(self.group.threshold()));

        info!(
            "new beacon stored: {beacon}, time discrepancy {discrepancy_ms:.2} ms, storage time {storage_ms:.2} ms"
        );
        Ok(())
    }

    async fn get(&self, round: u64) -> Result<Option<Beacon>, Error> {
        self.inner.get(round).await
    }

    async fn last(&self) -> Result<Beacon, Error> {
        self.inner.last().await
    }

    async fn len(&self) -> Result<u64, Error> {
        self.inner.len().await
    }

    async fn close(&self) -> Result<(), Error> {
        self.inner.close().await
    }
}
