// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Key material error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Group has no nodes")]
    EmptyGroup,
    #[error("Node indices must be unique and within [1, n]: {0}")]
    InvalidIndex(u32),
    #[error("Invalid threshold {threshold} for group of {nodes} nodes")]
    InvalidThreshold { threshold: u32, nodes: usize },
    #[error("Group period cannot be zero")]
    ZeroPeriod,
    #[error("Group genesis time cannot be zero")]
    ZeroGenesisTime,
    #[error(transparent)]
    Crypto(#[from] pharos_crypto::Error),
}
