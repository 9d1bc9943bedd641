// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Store;
use crate::{Beacon, Error};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A store that only appends a beacon with a round one past the last
/// inserted. The `last` cache advances only after the inner put succeeded,
/// so a failed put never corrupts it.
pub struct AppendStore {
    inner: Box<dyn Store>,
    last: Mutex<Beacon>,
}

impl AppendStore {
    pub async fn new(inner: Box<dyn Store>) -> Result<Self, Error> {
        let last = inner.last().await?;
        Ok(Self {
            inner,
            last: Mutex::new(last),
        })
    }
}

#[async_trait]
impl Store for AppendStore {
    async fn put(&self, beacon: Beacon) -> Result<(), Error> {
        let mut last = self.last.lock().await;
        if beacon.round() != last.round() + 1 {
            return Err(Error::NonContiguous {
                last: last.round(),
                new: beacon.round(),
            });
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
