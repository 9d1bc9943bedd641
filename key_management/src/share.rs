// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use pharos_crypto::{Point, PriShare, PubPoly};
use serde::{Deserialize, Serialize};

/// The distributed public key of the group: the commitments of the group
/// polynomial, written to the group file by the DKG.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistPublic {
    coefficients: Vec<Point>,
}

impl DistPublic {
    pub fn new(coefficients: Vec<Point>) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[Point] {
        &self.coefficients
    }

    /// The commitment polynomial used to verify partial signatures.
    pub fn pub_poly(&self) -> Result<PubPoly, Error> {
        Ok(PubPoly::new(self.coefficients.clone())?)
    }

    /// The group public key.
    pub fn key(&self) -> Result<Point, Error> {
        self.coefficients
            .first()
            .copied()
            .ok_or(Error::EmptyGroup)
    }
}

/// The local node's output of the DKG: its private share plus the public
/// commitments every node agrees on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Share {
    private: PriShare,
    public: DistPublic,
}

impl Share {
    pub fn new(private: PriShare, public: DistPublic) -> Self {
        Self { private, public }
    }

    /// The share index, matching this node's group index.
    pub fn index(&self) -> u32 {
        self.private.i
    }

    pub fn private(&self) -> &PriShare {
        &self.private
    }

    pub fn public(&self) -> &DistPublic {
        &self.public
    }
}
