// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChainStore, Error, Handler};
use log::{debug, info, warn};
use pharos_chain::{Beacon, Cursor, Store};
use pharos_net::{BeaconPacket, Metadata, SyncRequest};

fn to_packet(beacon: &Beacon) -> BeaconPacket {
    BeaconPacket {
        round: beacon.round(),
        previous_signature: beacon.previous_signature().to_vec(),
        signature: beacon.signature().to_vec(),
    }
}

/// Server side of chain sync: streams every stored beacon with
/// `round >= req.from_round` in ascending order, then keeps following the
/// chain head until the client hangs up. Requests without metadata resolve
/// to the `"default"` beacon id.
pub async fn sync_chain(
    chain: &ChainStore,
    req: &SyncRequest,
    sender: flume::Sender<BeaconPacket>,
) -> Result<(), Error> {
    let beacon_id = req.beacon_id();
    debug!(
        "syncing peer on beacon '{beacon_id}' from round {}",
        req.from_round
    );

    let mut head = chain.subscribe();
    let store: &dyn Store = chain.store();
    let mut cursor = Cursor::new(store, req.from_round);
    loop {
        // Stream the stored suffix, then follow the head. The cursor keeps
        // its position across head changes, so no round is skipped even if
        // several landed at once.
        while let Some(beacon) = cursor.next().await? {
            if sender.send_async(to_packet(&beacon)).await.is_err() {
                return Ok(());
            }
        }
        if head.changed().await.is_err() {
            return Ok(());
        }
    }
}

impl Handler {
    /// Client side of chain sync: fetches missing beacons from peers until
    /// the local head reaches `target`, verifying every received beacon
    /// before it is persisted — the serving peer is untrusted. Peers are
    /// tried in group order, skipping self; a peer serving bad data is
    /// abandoned for the next one.
    pub(crate) async fn sync_to(&self, target: u64) -> Result<(), Error> {
        if target == 0 || self.chain_store().last().await?.round() >= target {
            return Ok(());
        }
        let group = self.vault().group();
        let public_key = self.vault().public_key();
        let chain = self.chain_store();

        for peer in group
            .nodes()
            .iter()
            .filter(|n| n.address() != self.address())
        {
            let last = chain.last().await?;
            if last.round() >= target {
                break;
            }
            let req = SyncRequest {
                from_round: last.round() + 1,
                metadata: Some(Metadata::for_beacon(self.beacon_id())),
            };
            info!(
                "{}: syncing from {} starting at round {}",
                self.address(),
                peer.address(),
                req.from_round
            );
            let stream = match self.protocol_client().sync_chain(peer.address(), req).await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(
                        "{}: opening sync stream to {} failed: {err}",
                        self.address(),
                        peer.address()
                    );
                    continue;
                }
            };

            loop {
                let packet = tokio::select! {
                    _ = self.stop_token().cancelled() => return Ok(()),
                    packet = stream.recv_async() => match packet {
                        Ok(packet) => packet,
                        Err(_) => break,
                    },
                };
                let beacon = Beacon::new(
                    packet.round,
                    packet.previous_signature,
                    packet.signature,
                );
                if let Err(err) = self.verifier().verify_beacon(
                    beacon.round(),
                    beacon.previous_signature(),
                    beacon.signature(),
                    &public_key,
                ) {
                    warn!(
                        "{}: invalid beacon for round {} from {}: {err}",
                        self.address(),
                        beacon.round(),
                        peer.address()
                    );
                    break;
                }
                if let Err(err) = chain.put_synced(beacon.clone()).await {
                    warn!(
                        "{}: could not store synced beacon for round {}: {err}",
                        self.address(),
                        beacon.round()
                    );
                    break;
                }
                if beacon.round() >= target {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
