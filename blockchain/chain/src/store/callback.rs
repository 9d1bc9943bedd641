// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Store;
use crate::{Beacon, Error};
use async_trait::async_trait;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Invoked once per registered id for every stored beacon with `round != 0`.
pub type BeaconCallback = Arc<dyn Fn(&Beacon) + Send + Sync>;

/// Capacity of the job channel feeding the callback workers; a full channel
/// backpressures the put path.
pub const CALLBACK_WORKER_QUEUE: usize = 100;

struct Job {
    callback: BeaconCallback,
    beacon: Arc<Beacon>,
}

/// A store that dispatches every stored beacon to the registered callbacks
/// through a pool of workers sized to the machine's parallelism. Callbacks
/// are not called if the put failed; callbacks for distinct rounds may run
/// out of order across workers.
pub struct CallbackStore {
    inner: Box<dyn Store>,
    callbacks: Mutex<HashMap<String, BeaconCallback>>,
    jobs: flume::Sender<Job>,
    done: CancellationToken,
}

impl CallbackStore {
    pub fn new(inner: Box<dyn Store>) -> Self {
        let (jobs, rx) = flume::bounded::<Job>(CALLBACK_WORKER_QUEUE);
        let done = CancellationToken::new();
        for _ in 0..num_cpus::get() {
            tokio::spawn(Self::run_worker(rx.clone(), done.clone()));
        }
        Self {
            inner,
            callbacks: Mutex::new(HashMap::new()),
            jobs,
            done,
        }
    }

    async fn run_worker(rx: flume::Receiver<Job>, done: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                job = rx.recv_async() => match job {
                    Ok(job) => (job.callback)(&job.beacon),
                    Err(_) => break,
                },
                _ = done.cancelled() => {
                    // Drain what was enqueued before shutdown.
                    while let Ok(job) = rx.try_recv() {
                        (job.callback)(&job.beacon);
                    }
                    break;
                }
            }
        }
    }

    /// Registers a function to call for every new beacon. A second
    /// registration under the same id replaces the first.
    pub async fn add_callback(&self, id: &str, callback: BeaconCallback) {
        self.callbacks.lock().await.insert(id.to_owned(), callback);
    }

    pub async fn remove_callback(&self, id: &str) {
        self.callbacks.lock().await.remove(id);
    }
}

#[async_trait]
impl Store for CallbackStore {
    async fn put(&self, beacon: Beacon) -> Result<(), Error> {
        self.inner.put(beacon.clone()).await?;
        if beacon.round() != 0 {
            let callbacks = self.callbacks.lock().await;
            let beacon = Arc::new(beacon);
            for callback in callbacks.values() {
                let job = Job {
                    callback: callback.clone(),
                    beacon: beacon.clone(),
                };
                if self.jobs.send_async(job).await.is_err() {
                    // The beacon is stored; a torn-down worker pool only
                    // costs notifications.
                    warn!("callback workers are gone, dropping dispatch for {beacon}");
                    break;
                }
            }
        }
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
        // Stop the workers first so in-flight jobs drain while the inner
        // store is still alive.
        self.done.cancel();
        self.inner.close().await
    }
}
