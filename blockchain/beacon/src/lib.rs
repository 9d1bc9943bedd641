// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod cache;
mod chain_store;
mod config;
mod errors;
mod handler;
mod public;
mod sync;
mod vault;

pub use cache::PartialCache;
pub use chain_store::ChainStore;
pub use config::Config;
pub use errors::Error;
pub use handler::{Handler, DEFAULT_RPC_TIMEOUT};
pub use public::rand_response;
pub use sync::sync_chain;
pub use vault::Vault;
