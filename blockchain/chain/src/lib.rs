// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod beacon;
mod errors;
mod info;
pub mod metrics;
pub mod store;
pub mod time;

pub use beacon::Beacon;
pub use errors::Error;
pub use info::ChainInfo;
pub use store::{
    AppendStore, BeaconCallback, BeaconStore, CallbackStore, Cursor, DiscrepancyStore,
    SchemeStore, Store,
};
