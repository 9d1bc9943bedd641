// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Beacon protocol error
#[derive(Debug, Error)]
pub enum Error {
    /// `start` or `catchup` was called on a handler that already ran once.
    #[error("Handler already started")]
    AlreadyStarted,
    /// The handler is not (or no longer) processing rounds.
    #[error("Handler not running")]
    NotRunning,
    /// No share installed; the node cannot sign partial beacons.
    #[error("No share available to sign partial beacons")]
    NoShare,
    /// A partial carried a signer index that is not a group member.
    #[error("Unknown signer index {0}")]
    UnknownSigner(u32),
    /// A partial arrived for a round at or below the locally stored chain head.
    #[error("Stale partial for round {round}, chain head is at {last}")]
    StaleRound { round: u64, last: u64 },
    /// A partial arrived for a round further out than the next expected one.
    #[error("Future partial for round {round}, expected at most {expected}")]
    FutureRound { round: u64, expected: u64 },
    /// A partial failed signature verification for its round digest.
    #[error("Invalid partial signature for round {0}")]
    InvalidPartial(u64),
    /// Error originating from the cryptographic scheme
    #[error(transparent)]
    Crypto(#[from] pharos_crypto::Error),
    /// Error indicating a chain store error
    #[error(transparent)]
    Chain(#[from] pharos_chain::Error),
    /// Error originating from key material handling
    #[error(transparent)]
    Key(#[from] pharos_key::Error),
    /// Error originating from the peer protocol
    #[error(transparent)]
    Net(#[from] pharos_net::Error),
}
