// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::point::Point;
use crate::scheme::Scheme;
use crate::Error;
use byteorder::{BigEndian, ByteOrder};
use sha2::{Digest, Sha256};

/// Encodes a round number as the 8 big-endian bytes committed to by digests.
pub fn round_to_bytes(round: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, round);
    buf
}

/// Computes round digests and checks recovered beacon signatures for one
/// scheme.
#[derive(Clone, Copy, Debug)]
pub struct Verifier {
    scheme: Scheme,
}

impl Verifier {
    pub fn new(scheme: Scheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The message signed for a round: `H(prev_sig || round_be)` on chained
    /// schemes, `H(round_be)` when the previous signature is decoupled.
    pub fn digest(&self, round: u64, prev_sig: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        if !self.scheme.decouple_prev_sig() {
            hasher.update(prev_sig);
        }
        hasher.update(round_to_bytes(round));
        hasher.finalize().to_vec()
    }

    /// Whether verification of a beacon needs its previous signature.
    pub fn is_prev_sig_meaningful(&self) -> bool {
        !self.scheme.decouple_prev_sig()
    }

    /// Checks a recovered group signature against the group public key.
    pub fn verify_beacon(
        &self,
        round: u64,
        prev_sig: &[u8],
        signature: &[u8],
        public_key: &Point,
    ) -> Result<(), Error> {
        let msg = self.digest(round, prev_sig);
        self.scheme
            .threshold_scheme()
            .verify_recovered(public_key, &msg, signature)
    }
}
