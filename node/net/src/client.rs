// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::packets::{BeaconPacket, PartialBeaconPacket, SyncRequest};
use crate::Error;
use async_trait::async_trait;

/// Receiver half of a chain-sync stream. The sender side is dropped when the
/// server ends the session, which terminates the stream.
pub type BeaconStream = flume::Receiver<BeaconPacket>;

/// Outbound side of the peer protocol. Implementations wrap the concrete
/// transport; tests use an in-process router.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Delivers a partial beacon to one peer. Best effort: callers treat
    /// failures as lost gossip.
    async fn partial_beacon(&self, addr: &str, packet: PartialBeaconPacket) -> Result<(), Error>;

    /// Opens a beacon stream from a peer, starting at `req.from_round` and
    /// following the peer's chain head until dropped.
    async fn sync_chain(&self, addr: &str, req: SyncRequest) -> Result<BeaconStream, Error>;
}
