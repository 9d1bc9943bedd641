// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
pub mod point;
pub mod poly;
pub mod scheme;
pub mod tbls;
pub mod verifier;

pub use self::errors::Error;
pub use self::point::{Curve, Point};
pub use self::poly::{PriPoly, PriShare, PubPoly};
pub use self::scheme::{
    Scheme, DEFAULT_SCHEME_ID, SCHEME_ID_VAR, SHORT_SIG_SCHEME_ID, UNCHAINED_SCHEME_ID,
};
pub use self::tbls::Tbls;
pub use self::verifier::{round_to_bytes, Verifier};
