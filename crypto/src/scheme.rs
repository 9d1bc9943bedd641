// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::point::Curve;
use crate::tbls::Tbls;
use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The default scheme: chained beacons, G1 keys, G2 signatures.
pub const DEFAULT_SCHEME_ID: &str = "pedersen-bls-chained";
/// Unchained randomness: the round digest no longer commits to the previous
/// signature.
pub const UNCHAINED_SCHEME_ID: &str = "pedersen-bls-unchained";
/// Unchained with the groups swapped: 48-byte signatures, G2 keys.
pub const SHORT_SIG_SCHEME_ID: &str = "bls-unchained-shortsig";

/// Environment variable selecting the scheme at startup.
pub const SCHEME_ID_VAR: &str = "SCHEME_ID";

/// A bundle of cryptographic parameters the beacon protocol runs on: which
/// curve carries keys, which carries signatures, and whether the round digest
/// is decoupled from the previous signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheme {
    id: &'static str,
    key_group: Curve,
    sig_group: Curve,
    decouple_prev_sig: bool,
}

impl Scheme {
    pub fn chained() -> Self {
        Self {
            id: DEFAULT_SCHEME_ID,
            key_group: Curve::G1,
            sig_group: Curve::G2,
            decouple_prev_sig: false,
        }
    }

    pub fn unchained() -> Self {
        Self {
            id: UNCHAINED_SCHEME_ID,
            key_group: Curve::G1,
            sig_group: Curve::G2,
            decouple_prev_sig: true,
        }
    }

    pub fn short_sig() -> Self {
        Self {
            id: SHORT_SIG_SCHEME_ID,
            key_group: Curve::G2,
            sig_group: Curve::G1,
            decouple_prev_sig: true,
        }
    }

    /// Looks a scheme up by its stable identifier. An empty id resolves to
    /// the default scheme.
    pub fn from_name(id: &str) -> Result<Self, Error> {
        match id {
            "" | DEFAULT_SCHEME_ID => Ok(Self::chained()),
            UNCHAINED_SCHEME_ID => Ok(Self::unchained()),
            SHORT_SIG_SCHEME_ID => Ok(Self::short_sig()),
            other => Err(Error::UnknownScheme(other.to_owned())),
        }
    }

    /// Reads the scheme id from `$SCHEME_ID`; unset or empty selects the
    /// default scheme.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_name(&std::env::var(SCHEME_ID_VAR).unwrap_or_default())
    }

    /// The ids of every valid scheme.
    pub fn list() -> [&'static str; 3] {
        [DEFAULT_SCHEME_ID, UNCHAINED_SCHEME_ID, SHORT_SIG_SCHEME_ID]
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn key_group(&self) -> Curve {
        self.key_group
    }

    pub fn sig_group(&self) -> Curve {
        self.sig_group
    }

    /// Whether beacons of this scheme ignore the previous signature.
    pub fn decouple_prev_sig(&self) -> bool {
        self.decouple_prev_sig
    }

    /// The threshold signature implementation for this scheme's groups.
    pub fn threshold_scheme(&self) -> Tbls {
        Tbls::new(self.key_group, self.sig_group)
    }
}

impl Serialize for Scheme {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.id)
    }
}

impl<'de> Deserialize<'de> for Scheme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = String::deserialize(deserializer)?;
        Scheme::from_name(&id).map_err(serde::de::Error::custom)
    }
}
