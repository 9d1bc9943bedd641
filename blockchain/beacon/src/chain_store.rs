// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Error, PartialCache, Vault};
use log::{debug, warn};
use pharos_chain::{
    AppendStore, Beacon, BeaconCallback, BeaconStore, CallbackStore, DiscrepancyStore,
    SchemeStore, Store,
};
use pharos_clock::Clock;
use pharos_crypto::Verifier;
use pharos_net::PartialBeaconPacket;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// The full persistence stack of one beacon chain plus the aggregation state
/// of the live round. Incoming partials flow through [`new_valid_partial`];
/// beacons fetched by the syncer flow through [`put_synced`]. Both end in
/// the same guarded store, and both move the head watch channel.
///
/// [`new_valid_partial`]: ChainStore::new_valid_partial
/// [`put_synced`]: ChainStore::put_synced
pub struct ChainStore {
    store: CallbackStore,
    cache: Mutex<Option<PartialCache>>,
    vault: Arc<Vault>,
    verifier: Verifier,
    head: watch::Sender<Beacon>,
}

impl ChainStore {
    /// Builds the layered store over `db`. An empty database receives the
    /// genesis entry derived from the group.
    pub async fn new<DB>(db: DB, vault: Arc<Vault>, clock: Arc<dyn Clock>) -> Result<Self, Error>
    where
        DB: pharos_db::Store + 'static,
    {
        let group = vault.group();
        let genesis = Beacon::genesis(group.genesis_seed());
        let raw = BeaconStore::open(db, genesis)?;
        let append = AppendStore::new(Box::new(raw)).await?;
        let schemed = SchemeStore::new(Box::new(append), *group.scheme()).await?;
        let observed = DiscrepancyStore::new(Box::new(schemed), group, clock);
        let store = CallbackStore::new(Box::new(observed));

        let last = store.last().await?;
        let verifier = Verifier::new(vault.scheme());
        let (head, _) = watch::channel(last);
        Ok(Self {
            store,
            cache: Mutex::new(None),
            vault,
            verifier,
            head,
        })
    }

    pub fn store(&self) -> &CallbackStore {
        &self.store
    }

    pub async fn last(&self) -> Result<Beacon, Error> {
        Ok(self.store.last().await?)
    }

    pub async fn get(&self, round: u64) -> Result<Option<Beacon>, Error> {
        Ok(self.store.get(round).await?)
    }

    pub async fn len(&self) -> Result<u64, Error> {
        Ok(self.store.len().await?)
    }

    pub async fn close(&self) -> Result<(), Error> {
        Ok(self.store.close().await?)
    }

    pub async fn add_callback(&self, id: &str, callback: BeaconCallback) {
        self.store.add_callback(id, callback).await;
    }

    pub async fn remove_callback(&self, id: &str) {
        self.store.remove_callback(id).await;
    }

    /// Watches the chain head. The receiver holds the latest stored beacon.
    pub fn subscribe(&self) -> watch::Receiver<Beacon> {
        self.head.subscribe()
    }

    /// Persists a beacon fetched from a peer through the full guard stack.
    pub async fn put_synced(&self, beacon: Beacon) -> Result<(), Error> {
        let beacon = self.normalize(beacon);
        self.store.put(beacon.clone()).await?;
        self.advance_head(&beacon).await;
        Ok(())
    }

    // Unchained beacons carry no previous signature, in storage and in
    // every notification; strip it before the stack sees the value.
    fn normalize(&self, beacon: Beacon) -> Beacon {
        if self.verifier.scheme().decouple_prev_sig() {
            Beacon::new(beacon.round(), Vec::new(), beacon.signature().to_vec())
        } else {
            beacon
        }
    }

    /// Feeds one partial into the live round. The partial is verified
    /// against the round digest; on reaching the group threshold the group
    /// signature is recovered, checked and persisted — at most once per
    /// round. Returns the stored beacon when this partial completed the
    /// round.
    pub async fn new_valid_partial(
        &self,
        packet: &PartialBeaconPacket,
    ) -> Result<Option<Beacon>, Error> {
        let group = self.vault.group();
        let tbls = self.vault.scheme().threshold_scheme();
        let threshold = group.threshold() as usize;

        // Verify before touching the round buffer: only valid partials may
        // create one, and the pairing runs outside the cache lock.
        let digest = self.verifier.digest(packet.round, &packet.previous_signature);
        tbls.verify_partial(&self.vault.public_poly(), &digest, &packet.partial_sig)
            .map_err(|_| Error::InvalidPartial(packet.round))?;
        let index = tbls
            .index_of(&packet.partial_sig)
            .map_err(|_| Error::InvalidPartial(packet.round))?;

        let beacon = {
            let mut guard = self.cache.lock().await;
            if guard.as_ref().map_or(true, |c| c.round() < packet.round) {
                *guard = Some(PartialCache::new(
                    packet.round,
                    digest.clone(),
                    packet.previous_signature.clone(),
                ));
            }
            let cache = match guard.as_mut() {
                Some(cache) if cache.round() == packet.round => cache,
                // A newer round superseded this packet while it was in flight.
                _ => return Ok(None),
            };
            if cache.is_done() || cache.is_poisoned() {
                return Ok(None);
            }
            if cache.digest() != digest.as_slice() {
                // Signed over a different previous signature than the live
                // round; it cannot aggregate with the collected partials.
                return Err(Error::InvalidPartial(packet.round));
            }
            if !cache.insert(index, packet.partial_sig.clone()) {
                return Ok(None);
            }
            debug!(
                "round {}: got partial {}/{threshold} from signer {index}",
                packet.round,
                cache.len()
            );
            if cache.len() < threshold {
                return Ok(None);
            }

            let public = self.vault.public_poly();
            let recovered =
                match tbls.recover(&public, cache.digest(), cache.partials(), threshold) {
                    Ok(sig) => sig,
                    Err(err) => {
                        warn!("round {}: recovery failed: {err}", packet.round);
                        cache.poison();
                        return Ok(None);
                    }
                };
            if let Err(err) =
                tbls.verify_recovered(public.commit(), cache.digest(), &recovered)
            {
                warn!("round {}: recovered signature invalid: {err}", packet.round);
                cache.poison();
                return Ok(None);
            }
            cache.mark_done();
            self.normalize(Beacon::new(
                cache.round(),
                cache.previous_signature().to_vec(),
                recovered,
            ))
            // The cache lock drops here: later partials for this round see
            // `done` and are ignored, so the put below runs at most once.
        };

        self.store.put(beacon.clone()).await?;
        self.advance_head(&beacon).await;
        Ok(Some(beacon))
    }

    async fn advance_head(&self, beacon: &Beacon) {
        self.head.send_replace(beacon.clone());
        // Drop aggregation state the new head made obsolete.
        let mut guard = self.cache.lock().await;
        if guard
            .as_ref()
            .map_or(false, |c| c.round() <= beacon.round())
        {
            *guard = None;
        }
    }
}
