// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Beacon chain error
#[derive(Debug, Error)]
pub enum Error {
    /// A put skipped or repeated a round; the chain only ever grows by one.
    #[error("Invalid round inserted: last {last}, new {new}")]
    NonContiguous { last: u64, new: u64 },
    /// A chained beacon does not carry its predecessor's signature.
    #[error("Invalid previous signature for round {0} or previous beacon not found in database")]
    InvalidChainLink(u64),
    /// The store holds nothing, not even a genesis entry.
    #[error("No beacon stored yet")]
    NoBeaconStored,
    /// Error originating from encoding arbitrary data
    #[error("{0}")]
    Encoding(String),
    /// Error indicating a database error
    #[error(transparent)]
    Db(#[from] pharos_db::Error),
}
