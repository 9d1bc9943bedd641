// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChainStore, Config, Error, Vault};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use pharos_chain::{time, BeaconCallback};
use pharos_crypto::Verifier;
use pharos_net::{Metadata, PartialBeaconPacket, ProtocolClient};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound on any single outbound peer RPC; the effective deadline is
/// the remaining time in the round when that is shorter.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, Default)]
struct HandlerState {
    started: bool,
    running: bool,
    serving: bool,
    stopped: bool,
}

/// Drives the local node through rounds: on each tick of the logical clock
/// it signs the round digest, gossips the partial and feeds the aggregation
/// pipeline; incoming peer partials are validated and fed the same way.
/// One handler serves one beacon chain.
pub struct Handler {
    conf: Config,
    vault: Arc<Vault>,
    chain: Arc<ChainStore>,
    client: Arc<dyn ProtocolClient>,
    verifier: Verifier,
    state: Mutex<HandlerState>,
    stop: CancellationToken,
    syncing: AtomicBool,
    addr: String,
}

impl Handler {
    pub async fn new<DB>(
        client: Arc<dyn ProtocolClient>,
        db: DB,
        conf: Config,
    ) -> Result<Arc<Self>, Error>
    where
        DB: pharos_db::Store + 'static,
    {
        let vault = Arc::new(Vault::new(conf.group.clone(), conf.share.clone())?);
        let chain = Arc::new(ChainStore::new(db, vault.clone(), conf.clock.clone()).await?);
        let verifier = Verifier::new(*conf.group.scheme());
        let addr = conf.public.address().to_owned();
        Ok(Arc::new(Self {
            conf,
            vault,
            chain,
            client,
            verifier,
            state: Mutex::new(HandlerState::default()),
            stop: CancellationToken::new(),
            syncing: AtomicBool::new(false),
            addr,
        }))
    }

    /// Starts the round loop. Callable once per handler.
    pub fn start(self: &Arc<Self>) -> Result<(), Error> {
        self.launch(false)
    }

    /// Starts the round loop and immediately begins syncing the chain from
    /// peers; used by nodes joining late or restarting.
    pub fn catchup(self: &Arc<Self>) -> Result<(), Error> {
        self.launch(true)
    }

    fn launch(self: &Arc<Self>, catchup: bool) -> Result<(), Error> {
        {
            let mut state = self.state.lock();
            if state.started {
                return Err(Error::AlreadyStarted);
            }
            state.started = true;
        }
        let handler = self.clone();
        tokio::spawn(async move { handler.run(catchup).await });
        Ok(())
    }

    /// Stops the round loop and closes the store. Idempotent; partials
    /// received after this point are rejected with `NotRunning`.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
        }
        self.stop.cancel();
        if let Err(err) = self.chain.close().await {
            warn!("{}: closing chain store failed: {err}", self.addr);
        }
        info!("{}: beacon handler stopped", self.addr);
    }

    async fn run(self: Arc<Self>, catchup: bool) {
        info!("{}: beacon loop starting", self.addr);
        self.state.lock().running = true;
        if catchup {
            self.spawn_sync();
        } else if let Ok(last) = self.chain.last().await {
            // A restarted node whose chain lags the schedule starts catching
            // up right away; the loop keeps ticking meanwhile.
            let now = self.conf.clock.now_unix();
            let expected = time::current_round(now, self.period(), self.genesis_time());
            if last.round() + 1 < expected {
                self.spawn_sync();
            }
        }
        loop {
            let now = self.conf.clock.now_unix();
            let (round, at) = time::next_round(now, self.period(), self.genesis_time());
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = self.conf.clock.sleep_until(to_datetime(at)) => {}
            }
            if self.stop.is_cancelled() {
                break;
            }
            self.state.lock().serving = true;
            if let Err(err) = self.do_round(round).await {
                if matches!(&err, Error::Chain(pharos_chain::Error::Db(_))) {
                    error!(
                        "{}: storage failure, shutting the beacon loop down: {err}",
                        self.addr
                    );
                    break;
                }
                warn!("{}: round {round} failed: {err}", self.addr);
            }
        }
        self.state.lock().running = false;
        debug!("{}: beacon loop exited", self.addr);
    }

    /// Produces and gossips this node's partial for `round`. The broadcast
    /// is never gated on catch-up: a lagging node signs over its stale head
    /// (peers discard the mismatched digest), notices it is late and syncs
    /// in the background while the loop keeps ticking.
    async fn do_round(self: &Arc<Self>, round: u64) -> Result<(), Error> {
        let last = self.chain.last().await?;
        if last.round() >= round {
            // Sync already brought this round in from a peer.
            debug!("{}: round {round} already stored, skipping", self.addr);
            return Ok(());
        }
        let decoupled = self.vault.scheme().decouple_prev_sig();
        let previous_signature = if decoupled {
            Vec::new()
        } else {
            last.signature().to_vec()
        };
        let digest = self.verifier.digest(round, &previous_signature);
        let partial_sig = self.vault.sign_partial(&digest)?;
        let packet = PartialBeaconPacket {
            round,
            previous_signature,
            partial_sig,
            metadata: Some(Metadata::for_beacon(self.beacon_id())),
        };

        debug!("{}: broadcasting partial for round {round}", self.addr);
        self.broadcast(packet.clone(), round);
        match self.chain.new_valid_partial(&packet).await {
            Ok(Some(beacon)) => info!("{}: stored beacon {beacon}", self.addr),
            Ok(None) => {}
            Err(err) => warn!(
                "{}: local partial for round {round} rejected: {err}",
                self.addr
            ),
        }

        if last.round() + 1 < round {
            info!(
                "{}: behind by {} rounds at round {round}, syncing",
                self.addr,
                round - last.round() - 1
            );
            self.spawn_sync();
        }
        Ok(())
    }

    // Fire-and-forget fan-out to every other member. A slow or dead peer
    // never blocks the round: each send runs in its own task under a
    // deadline and is cancelled on stop.
    fn broadcast(&self, packet: PartialBeaconPacket, round: u64) {
        let group = self.vault.group();
        let now = self.conf.clock.now_unix();
        let next_tick = time::time_of_round(self.period(), self.genesis_time(), round + 1);
        let remaining = Duration::from_secs(next_tick.saturating_sub(now).max(0) as u64);
        let deadline = remaining.min(DEFAULT_RPC_TIMEOUT);

        for node in group.nodes().iter().filter(|n| n.address() != self.addr) {
            let client = self.client.clone();
            let addr = node.address().to_owned();
            let packet = packet.clone();
            let stop = self.stop.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = stop.cancelled() => {}
                    result = tokio::time::timeout(deadline, client.partial_beacon(&addr, packet)) => {
                        match result {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) => debug!("sending partial to {addr} failed: {err}"),
                            Err(_) => debug!("sending partial to {addr} timed out"),
                        }
                    }
                }
            });
        }
    }

    /// Validates and processes a partial beacon received from a peer.
    pub async fn process_partial_beacon(&self, packet: PartialBeaconPacket) -> Result<(), Error> {
        if !self.is_running() {
            return Err(Error::NotRunning);
        }

        let now = self.conf.clock.now_unix();
        let expected = time::current_round(now, self.period(), self.genesis_time());
        if packet.round > expected + 1 {
            warn!(
                "{}: future partial for round {} while expecting at most {}",
                self.addr,
                packet.round,
                expected + 1
            );
            return Err(Error::FutureRound {
                round: packet.round,
                expected: expected + 1,
            });
        }
        let last = self.chain.last().await?;
        if packet.round <= last.round() {
            debug!(
                "{}: stale partial for round {} at chain head {}",
                self.addr,
                packet.round,
                last.round()
            );
            return Err(Error::StaleRound {
                round: packet.round,
                last: last.round(),
            });
        }

        let tbls = self.vault.scheme().threshold_scheme();
        let index = tbls
            .index_of(&packet.partial_sig)
            .map_err(|_| Error::InvalidPartial(packet.round))?;
        if self.vault.group().node(index).is_none() {
            warn!("{}: partial from unknown signer {index}", self.addr);
            return Err(Error::UnknownSigner(index));
        }

        if let Some(beacon) = self.chain.new_valid_partial(&packet).await? {
            info!("{}: stored beacon {beacon}", self.addr);
        }
        Ok(())
    }

    // At most one catch-up runs at a time; the loop may ask for one on
    // every late tick.
    fn spawn_sync(self: &Arc<Self>) {
        if self.syncing.swap(true, Ordering::SeqCst) {
            return;
        }
        let handler = self.clone();
        tokio::spawn(async move {
            handler.try_sync().await;
            handler.syncing.store(false, Ordering::SeqCst);
        });
    }

    async fn try_sync(&self) {
        // Aim for the round currently due; healthy peers hold its beacon, or
        // will shortly, and the sync stream follows their head.
        let now = self.conf.clock.now_unix();
        let target = time::current_round(now, self.period(), self.genesis_time());
        if let Err(err) = self.sync_to(target).await {
            warn!("{}: chain sync failed: {err}", self.addr);
        }
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    pub fn is_running(&self) -> bool {
        let state = self.state.lock();
        state.running && !state.stopped
    }

    pub fn is_serving(&self) -> bool {
        self.state.lock().serving
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    pub fn address(&self) -> &str {
        &self.addr
    }

    pub fn beacon_id(&self) -> &str {
        self.conf.beacon_id()
    }

    pub fn chain_store(&self) -> &Arc<ChainStore> {
        &self.chain
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Registers a callback invoked for every beacon this node stores.
    pub async fn add_callback(&self, id: &str, callback: BeaconCallback) {
        self.chain.add_callback(id, callback).await;
    }

    pub async fn remove_callback(&self, id: &str) {
        self.chain.remove_callback(id).await;
    }

    pub(crate) fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    pub(crate) fn protocol_client(&self) -> &Arc<dyn ProtocolClient> {
        &self.client
    }

    fn period(&self) -> Duration {
        self.conf.group.period()
    }

    fn genesis_time(&self) -> i64 {
        self.conf.group.genesis_time()
    }
}

fn to_datetime(unix: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
