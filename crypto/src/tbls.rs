// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::point::{pair, Curve, Point};
use crate::poly::{PriShare, PubPoly};
use crate::Error;
use blstrs::{G1Projective, G2Projective, Scalar};
use byteorder::{BigEndian, ByteOrder};
use ff::Field;
use group::Group;

/// Length of the big-endian signer index prefixed to every partial.
pub const INDEX_LEN: usize = 2;

/// Threshold BLS over BLS12-381 with keys and signatures on opposite source
/// groups. A partial signature is `index_be_u16 || compressed_sig`; combining
/// `threshold` partials by Lagrange interpolation in the exponent yields the
/// deterministic group signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tbls {
    key_group: Curve,
    sig_group: Curve,
}

impl Tbls {
    pub fn new(key_group: Curve, sig_group: Curve) -> Self {
        Self {
            key_group,
            sig_group,
        }
    }

    pub fn key_group(&self) -> Curve {
        self.key_group
    }

    pub fn sig_group(&self) -> Curve {
        self.sig_group
    }

    /// Signs `msg` with a single share.
    pub fn sign_partial(&self, share: &PriShare, msg: &[u8]) -> Result<Vec<u8>, Error> {
        let index = u16::try_from(share.i).map_err(|_| Error::IndexOutOfRange(share.i))?;
        let sig = Point::hash_to_curve(self.sig_group, msg).mul(&share.v);
        let mut out = vec![0u8; INDEX_LEN];
        BigEndian::write_u16(&mut out, index);
        out.extend_from_slice(&sig.to_bytes());
        Ok(out)
    }

    /// The signer index carried by a partial. Tolerates arbitrary bytes: a
    /// blob too short to carry an index fails with [`Error::TruncatedPartial`].
    pub fn index_of(&self, partial: &[u8]) -> Result<u32, Error> {
        if partial.len() < INDEX_LEN {
            return Err(Error::TruncatedPartial);
        }
        Ok(u32::from(BigEndian::read_u16(partial)))
    }

    /// Verifies one partial against the public commitment of its share.
    pub fn verify_partial(
        &self,
        public: &PubPoly,
        msg: &[u8],
        partial: &[u8],
    ) -> Result<(), Error> {
        let index = self.index_of(partial)?;
        let sig = Point::from_bytes(self.sig_group, &partial[INDEX_LEN..])?;
        self.verify_point(&public.eval(index), msg, &sig)
    }

    /// Combines the first `threshold` valid, distinct partials in the order
    /// given and returns the group signature.
    pub fn recover(
        &self,
        public: &PubPoly,
        msg: &[u8],
        partials: &[Vec<u8>],
        threshold: usize,
    ) -> Result<Vec<u8>, Error> {
        let mut used: Vec<(u32, Point)> = Vec::with_capacity(threshold);
        for partial in partials {
            if used.len() == threshold {
                break;
            }
            let index = match self.index_of(partial) {
                Ok(i) => i,
                Err(_) => continue,
            };
            if used.iter().any(|(i, _)| *i == index) {
                continue;
            }
            let sig = match Point::from_bytes(self.sig_group, &partial[INDEX_LEN..]) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if self.verify_point(&public.eval(index), msg, &sig).is_err() {
                continue;
            }
            used.push((index, sig));
        }
        if used.len() < threshold {
            return Err(Error::NotEnoughPartials(used.len(), threshold));
        }

        let combined = match self.sig_group {
            Curve::G1 => {
                let shares: Vec<(u32, G1Projective)> = used
                    .iter()
                    .filter_map(|(i, p)| match p {
                        Point::G1(q) => Some((*i, *q)),
                        Point::G2(_) => None,
                    })
                    .collect();
                Point::G1(lagrange(&shares)?)
            }
            Curve::G2 => {
                let shares: Vec<(u32, G2Projective)> = used
                    .iter()
                    .filter_map(|(i, p)| match p {
                        Point::G2(q) => Some((*i, *q)),
                        Point::G1(_) => None,
                    })
                    .collect();
                Point::G2(lagrange(&shares)?)
            }
        };
        Ok(combined.to_bytes())
    }

    /// Verifies a recovered group signature against the group public key.
    pub fn verify_recovered(
        &self,
        public_key: &Point,
        msg: &[u8],
        sig: &[u8],
    ) -> Result<(), Error> {
        let point = Point::from_bytes(self.sig_group, sig)?;
        self.verify_point(public_key, msg, &point)
    }

    // e(key, H(msg)) == e(base, sig), with the pairing orientation resolved
    // by the point curves.
    fn verify_point(&self, key: &Point, msg: &[u8], sig: &Point) -> Result<(), Error> {
        let hashed = Point::hash_to_curve(self.sig_group, msg);
        let lhs = pair(key, &hashed)?;
        let rhs = pair(&Point::generator(self.key_group), sig)?;
        if lhs == rhs {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }
}

/// Lagrange interpolation at zero over group elements.
fn lagrange<P>(shares: &[(u32, P)]) -> Result<P, Error>
where
    P: Group<Scalar = Scalar>,
{
    let mut acc = P::identity();
    for (i, (xi, point)) in shares.iter().enumerate() {
        let mut num = Scalar::ONE;
        let mut den = Scalar::ONE;
        for (j, (xj, _)) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            num *= Scalar::from(u64::from(*xj));
            den *= Scalar::from(u64::from(*xj)) - Scalar::from(u64::from(*xi));
        }
        let inv = Option::<Scalar>::from(den.invert()).ok_or(Error::DuplicateIndex(*xi))?;
        acc += *point * (num * inv);
    }
    Ok(acc)
}
