// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod group;
mod identity;
mod share;

pub use errors::Error;
pub use group::{minimum_threshold, Group};
pub use identity::Node;
pub use share::{DistPublic, Share};
