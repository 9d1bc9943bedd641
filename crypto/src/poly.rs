// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::point::{Curve, Point};
use crate::Error;
use blstrs::{G1Projective, G2Projective, Scalar};
use ff::Field;
use group::Group as _;
use rand_core::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A secret polynomial of degree `threshold - 1`. The constant term is the
/// group secret; evaluations at `1..=n` are the node shares. Produced by the
/// DKG collaborator, and by tests standing in for it.
#[derive(Clone, Debug)]
pub struct PriPoly {
    coeffs: Vec<Scalar>,
}

/// One evaluation of a [`PriPoly`]: the share of node `i`. Indices are
/// one-based; evaluation happens at `x = i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriShare {
    pub i: u32,
    pub v: Scalar,
}

impl PriPoly {
    /// Samples a fresh polynomial with `threshold` random coefficients.
    pub fn random(threshold: usize, mut rng: impl RngCore) -> Result<Self, Error> {
        if threshold == 0 {
            return Err(Error::EmptyPolynomial);
        }
        let coeffs = (0..threshold)
            .map(|_| Scalar::random(&mut rng))
            .collect();
        Ok(Self { coeffs })
    }

    /// The group secret.
    pub fn secret(&self) -> &Scalar {
        &self.coeffs[0]
    }

    pub fn threshold(&self) -> usize {
        self.coeffs.len()
    }

    /// Evaluates the polynomial at `x = i`.
    pub fn eval(&self, i: u32) -> PriShare {
        let x = Scalar::from(u64::from(i));
        let mut v = Scalar::ZERO;
        for c in self.coeffs.iter().rev() {
            v = v * x + c;
        }
        PriShare { i, v }
    }

    /// The shares of nodes `1..=n`.
    pub fn shares(&self, n: usize) -> Vec<PriShare> {
        (1..=n as u32).map(|i| self.eval(i)).collect()
    }

    /// The public commitments of every coefficient on the key group `curve`.
    pub fn commit(&self, curve: Curve) -> PubPoly {
        let base = Point::generator(curve);
        let commits = self.coeffs.iter().map(|c| base.mul(c)).collect();
        // The commits are uniform by construction.
        PubPoly { curve, commits }
    }

    /// Coefficient-wise sum, used by the DKG to combine dealer polynomials.
    pub fn add(&self, other: &PriPoly) -> Result<PriPoly, Error> {
        if self.coeffs.len() != other.coeffs.len() {
            return Err(Error::MismatchedPolynomials);
        }
        let coeffs = self
            .coeffs
            .iter()
            .zip(other.coeffs.iter())
            .map(|(a, b)| a + b)
            .collect();
        Ok(PriPoly { coeffs })
    }
}

/// The public counterpart of a [`PriPoly`]: commitments to its coefficients
/// on the scheme's key group. `commit()` is the group public key; `eval(i)`
/// is the public key of share `i`, used to verify partial signatures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PubPoly {
    curve: Curve,
    commits: Vec<Point>,
}

impl PubPoly {
    pub fn new(commits: Vec<Point>) -> Result<Self, Error> {
        let first = commits.first().ok_or(Error::EmptyPolynomial)?;
        let curve = first.curve();
        if commits.iter().any(|c| c.curve() != curve) {
            return Err(Error::MismatchedPolynomials);
        }
        Ok(Self { curve, commits })
    }

    /// The group public key (the commitment of the constant term).
    pub fn commit(&self) -> &Point {
        &self.commits[0]
    }

    pub fn commits(&self) -> &[Point] {
        &self.commits
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn threshold(&self) -> usize {
        self.commits.len()
    }

    /// Evaluates the commitment polynomial at `x = i`.
    pub fn eval(&self, i: u32) -> Point {
        let x = Scalar::from(u64::from(i));
        match self.curve {
            Curve::G1 => {
                let mut acc = G1Projective::identity();
                for c in self.commits.iter().rev() {
                    if let Point::G1(p) = c {
                        acc = acc * x + p;
                    }
                }
                Point::G1(acc)
            }
            Curve::G2 => {
                let mut acc = G2Projective::identity();
                for c in self.commits.iter().rev() {
                    if let Point::G2(p) = c {
                        acc = acc * x + p;
                    }
                }
                Point::G2(acc)
            }
        }
    }

    /// Commitment-wise sum, the public side of [`PriPoly::add`].
    pub fn add(&self, other: &PubPoly) -> Result<PubPoly, Error> {
        if self.curve != other.curve || self.commits.len() != other.commits.len() {
            return Err(Error::MismatchedPolynomials);
        }
        let commits = self
            .commits
            .iter()
            .zip(other.commits.iter())
            .map(|(a, b)| a.add(b))
            .collect::<Result<Vec<_>, _>>()?;
        PubPoly::new(commits)
    }
}

impl Serialize for PriShare {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.i, hex::encode(self.v.to_bytes_be())).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PriShare {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (i, encoded): (u32, String) = Deserialize::deserialize(deserializer)?;
        let data = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = data
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom(Error::InvalidScalar))?;
        let v = Option::<Scalar>::from(Scalar::from_bytes_be(&bytes))
            .ok_or_else(|| serde::de::Error::custom(Error::InvalidScalar))?;
        Ok(PriShare { i, v })
    }
}
