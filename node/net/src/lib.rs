// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod client;
mod packets;

pub use client::{BeaconStream, ProtocolClient};
pub use packets::*;

use thiserror::Error;

/// Peer protocol error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Peer {0} is unreachable")]
    Unreachable(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Peer rejected the request: {0}")]
    Rejected(String),
    #[error("{0}")]
    Other(String),
}
