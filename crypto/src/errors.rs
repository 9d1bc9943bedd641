// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::point::Curve;
use thiserror::Error;

/// Crypto error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid point encoding on {0}")]
    InvalidPoint(Curve),
    #[error("Invalid scalar encoding")]
    InvalidScalar,
    #[error("Pairing over mismatched curves")]
    CurveMismatch,
    #[error("Partial signature too short to carry a signer index")]
    TruncatedPartial,
    #[error("Signer index {0} cannot be encoded")]
    IndexOutOfRange(u32),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Not enough valid partial signatures: got {0}, need {1}")]
    NotEnoughPartials(usize, usize),
    #[error("Polynomial must have at least one coefficient")]
    EmptyPolynomial,
    #[error("Polynomials of different degree or group cannot be combined")]
    MismatchedPolynomials,
    #[error("Duplicate share index {0}")]
    DuplicateIndex(u32),
    #[error("Scheme '{0}' is not valid")]
    UnknownScheme(String),
}
