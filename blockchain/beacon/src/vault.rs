// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use parking_lot::Mutex;
use pharos_chain::ChainInfo;
use pharos_crypto::{Point, PubPoly, Scheme};
use pharos_key::{Group, Share};
use std::sync::Arc;

/// Holds the cryptographic material needed to produce and validate partial
/// beacons: the local share, the group, its public polynomial and the chain
/// info. Thread safe; the share is only ever read or swapped under the lock,
/// and signing is serialized through it.
pub struct Vault {
    inner: Mutex<Inner>,
}

struct Inner {
    group: Arc<Group>,
    share: Option<Share>,
    public: PubPoly,
    info: ChainInfo,
}

impl Vault {
    pub fn new(group: Arc<Group>, share: Option<Share>) -> Result<Self, Error> {
        let public = group.dist_public().pub_poly()?;
        let info = ChainInfo::from_group(&group);
        Ok(Self {
            inner: Mutex::new(Inner {
                group,
                share,
                public,
                info,
            }),
        })
    }

    /// Produces a partial signature over `msg` with the local share.
    pub fn sign_partial(&self, msg: &[u8]) -> Result<Vec<u8>, Error> {
        let inner = self.inner.lock();
        let share = inner.share.as_ref().ok_or(Error::NoShare)?;
        let tbls = inner.group.scheme().threshold_scheme();
        Ok(tbls.sign_partial(share.private(), msg)?)
    }

    /// The local share index.
    pub fn index(&self) -> Result<u32, Error> {
        let inner = self.inner.lock();
        inner
            .share
            .as_ref()
            .map(Share::index)
            .ok_or(Error::NoShare)
    }

    pub fn group(&self) -> Arc<Group> {
        self.inner.lock().group.clone()
    }

    pub fn scheme(&self) -> Scheme {
        *self.inner.lock().group.scheme()
    }

    /// The public polynomial partials are verified against.
    pub fn public_poly(&self) -> PubPoly {
        self.inner.lock().public.clone()
    }

    /// The group public key.
    pub fn public_key(&self) -> Point {
        *self.inner.lock().public.commit()
    }

    pub fn chain_info(&self) -> ChainInfo {
        self.inner.lock().info.clone()
    }

    /// Atomically installs the group and share of a new epoch. The chain
    /// info is constant and deliberately not updated.
    pub fn set_info(&self, group: Arc<Group>, share: Share) -> Result<(), Error> {
        let public = group.dist_public().pub_poly()?;
        let mut inner = self.inner.lock();
        inner.group = group;
        inner.share = Some(share);
        inner.public = public;
        Ok(())
    }
}
