// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use blstrs::{G1Affine, G1Projective, G2Affine, G2Projective, Gt, Scalar};
use group::{Curve as _, Group as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Compressed size of a G1 element.
pub const G1_POINT_SIZE: usize = 48;
/// Compressed size of a G2 element.
pub const G2_POINT_SIZE: usize = 96;

/// One of the two source groups of BLS12-381.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    G1,
    G2,
}

impl Curve {
    /// Compressed encoding size of a point on this curve.
    pub fn point_size(&self) -> usize {
        match self {
            Curve::G1 => G1_POINT_SIZE,
            Curve::G2 => G2_POINT_SIZE,
        }
    }

    /// The other source group.
    pub fn swapped(&self) -> Curve {
        match self {
            Curve::G1 => Curve::G2,
            Curve::G2 => Curve::G1,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curve::G1 => write!(f, "G1"),
            Curve::G2 => write!(f, "G2"),
        }
    }
}

// Hash-to-curve domain separation tags of the ciphersuites used for BLS
// signatures on either group.
const DST_G1: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";
const DST_G2: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// A point on either source group. Schemes fix which curve carries keys and
/// which carries signatures; this type keeps the arithmetic uniform across
/// both orientations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Point {
    G1(G1Projective),
    G2(G2Projective),
}

impl Point {
    /// The group generator of `curve`.
    pub fn generator(curve: Curve) -> Point {
        match curve {
            Curve::G1 => Point::G1(G1Projective::generator()),
            Curve::G2 => Point::G2(G2Projective::generator()),
        }
    }

    /// The identity element of `curve`.
    pub fn identity(curve: Curve) -> Point {
        match curve {
            Curve::G1 => Point::G1(G1Projective::identity()),
            Curve::G2 => Point::G2(G2Projective::identity()),
        }
    }

    /// Hashes `msg` onto `curve` with the matching signature ciphersuite.
    pub fn hash_to_curve(curve: Curve, msg: &[u8]) -> Point {
        match curve {
            Curve::G1 => Point::G1(G1Projective::hash_to_curve(msg, DST_G1, &[])),
            Curve::G2 => Point::G2(G2Projective::hash_to_curve(msg, DST_G2, &[])),
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            Point::G1(_) => Curve::G1,
            Point::G2(_) => Curve::G2,
        }
    }

    pub fn mul(&self, scalar: &Scalar) -> Point {
        match self {
            Point::G1(p) => Point::G1(p * scalar),
            Point::G2(p) => Point::G2(p * scalar),
        }
    }

    pub fn add(&self, other: &Point) -> Result<Point, Error> {
        match (self, other) {
            (Point::G1(a), Point::G1(b)) => Ok(Point::G1(a + b)),
            (Point::G2(a), Point::G2(b)) => Ok(Point::G2(a + b)),
            _ => Err(Error::CurveMismatch),
        }
    }

    /// Compressed encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Point::G1(p) => p.to_affine().to_compressed().to_vec(),
            Point::G2(p) => p.to_affine().to_compressed().to_vec(),
        }
    }

    /// Decodes a compressed point, checking the encoding and subgroup
    /// membership. Fails with [`Error::InvalidPoint`] on any malformed input.
    pub fn from_bytes(curve: Curve, data: &[u8]) -> Result<Point, Error> {
        match curve {
            Curve::G1 => {
                let bytes: [u8; G1_POINT_SIZE] =
                    data.try_into().map_err(|_| Error::InvalidPoint(curve))?;
                let affine = Option::<G1Affine>::from(G1Affine::from_compressed(&bytes))
                    .ok_or(Error::InvalidPoint(curve))?;
                Ok(Point::G1(affine.into()))
            }
            Curve::G2 => {
                let bytes: [u8; G2_POINT_SIZE] =
                    data.try_into().map_err(|_| Error::InvalidPoint(curve))?;
                let affine = Option::<G2Affine>::from(G2Affine::from_compressed(&bytes))
                    .ok_or(Error::InvalidPoint(curve))?;
                Ok(Point::G2(affine.into()))
            }
        }
    }
}

/// Pairs a key-group point with a signature-group point, in either
/// orientation. The underlying pairing always takes (G1, G2).
pub(crate) fn pair(key: &Point, sig: &Point) -> Result<Gt, Error> {
    match (key, sig) {
        (Point::G1(k), Point::G2(s)) => Ok(blstrs::pairing(&k.to_affine(), &s.to_affine())),
        (Point::G2(k), Point::G1(s)) => Ok(blstrs::pairing(&s.to_affine(), &k.to_affine())),
        _ => Err(Error::CurveMismatch),
    }
}

impl Serialize for Point {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.curve(), hex::encode(self.to_bytes())).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (curve, encoded): (Curve, String) = Deserialize::deserialize(deserializer)?;
        let data = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
        Point::from_bytes(curve, &data).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_round_trip() {
        for curve in [Curve::G1, Curve::G2] {
            let p = Point::generator(curve).mul(&Scalar::from(42u64));
            let bytes = p.to_bytes();
            assert_eq!(bytes.len(), curve.point_size());
            assert_eq!(Point::from_bytes(curve, &bytes).unwrap(), p);
        }
    }

    #[test]
    fn rejects_malformed_encodings() {
        assert_eq!(
            Point::from_bytes(Curve::G1, b"junk"),
            Err(Error::InvalidPoint(Curve::G1))
        );
        let not_a_point = [0xffu8; G2_POINT_SIZE];
        assert_eq!(
            Point::from_bytes(Curve::G2, &not_a_point),
            Err(Error::InvalidPoint(Curve::G2))
        );
        // A valid G1 encoding is not a valid G2 encoding.
        let g1 = Point::generator(Curve::G1).to_bytes();
        assert!(Point::from_bytes(Curve::G2, &g1).is_err());
    }

    #[test]
    fn mismatched_addition_fails() {
        let a = Point::generator(Curve::G1);
        let b = Point::generator(Curve::G2);
        assert_eq!(a.add(&b), Err(Error::CurveMismatch));
    }
}
