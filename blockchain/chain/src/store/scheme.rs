// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Store;
use crate::{Beacon, Error};
use async_trait::async_trait;
use pharos_crypto::Scheme;
use tokio::sync::Mutex;

/// A store that runs different checks depending on what scheme is being
/// used: unchained beacons are stored without a previous signature, chained
/// beacons must link to their predecessor's signature.
pub struct SchemeStore {
    inner: Box<dyn Store>,
    scheme: Scheme,
    last: Mutex<Beacon>,
}

impl SchemeStore {
    pub async fn new(inner: Box<dyn Store>, scheme: Scheme) -> Result<Self, Error> {
        let last = inner.last().await?;
        Ok(Self {
            inner,
            scheme,
            last: Mutex::new(last),
        })
    }
}

#[async_trait]
impl Store for SchemeStore {
    async fn put(&self, mut beacon: Beacon) -> Result<(), Error> {
        let mut last = self.last.lock().await;
        if self.scheme.decouple_prev_sig() {
            beacon.clear_previous_signature();
        } else if beacon.previous_signature() != last.signature() {
            // The cache may be behind the database, e.g. after an epoch
            // restart; reconcile against the stored predecessor before
            // rejecting.
            let prev = self.inner.get(beacon.round().wrapping_sub(1)).await?;
            match prev {
                Some(p) if p.signature() == beacon.previous_signature() => {}
                _ => return Err(Error::InvalidChainLink(beacon.round())),
            }
        }
        self.inner.put(beacon.clone()).await?;
        *last = beacon;
        Ok(())
    }

    async fn get(&self, round: u64) -> Result<Option<Beacon>, Error> {
        self.inner.get(round).await
    }

    async fn last(&self) -> Result<Beacon, Error> {
        Ok(self.last.lock().await.clone())
    }

    async fn len(&self) -> Result<u64, Error> {
        self.inner.len().await
    }

    async fn close(&self) -> Result<(), Error> {
        self.inner.close().await
    }
}
