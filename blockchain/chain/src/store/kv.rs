// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Store;
use crate::{Beacon, Error};
use async_trait::async_trait;
use byteorder::{BigEndian, ByteOrder};
use std::sync::atomic::{AtomicU64, Ordering};

// Rounds are keyed by their 8-byte big-endian encoding; the head pointer
// lives under its own key and is only a hint (see `open`).
const HEAD_KEY: &[u8] = b"beacon-head";

fn round_key(round: u64) -> [u8; 8] {
    let mut key = [0u8; 8];
    BigEndian::write_u64(&mut key, round);
    key
}

/// Raw beacon persistence over a key/value store. Beacons are CBOR-encoded;
/// crash safety is inherited from the KV store's single-write atomicity.
pub struct BeaconStore<DB> {
    db: DB,
    head: AtomicU64,
}

impl<DB: pharos_db::Store> BeaconStore<DB> {
    /// Opens the store. An empty database receives the genesis entry; this
    /// is the only insertion path that bypasses the guard layers, and it
    /// only ever runs against an empty chain.
    ///
    /// The head pointer is reconciled by probing forward: a crash between a
    /// beacon write and the head write leaves the pointer one behind, never
    /// wrong in content.
    pub fn open(db: DB, genesis: Beacon) -> Result<Self, Error> {
        let head = match read_head(&db)? {
            None => {
                db.write(round_key(genesis.round()), encode(&genesis)?)?;
                let head = genesis.round();
                db.write(HEAD_KEY, round_key(head))?;
                head
            }
            Some(mut head) => {
                while db.exists(round_key(head + 1))? {
                    head += 1;
                }
                db.write(HEAD_KEY, round_key(head))?;
                head
            }
        };
        Ok(Self {
            db,
            head: AtomicU64::new(head),
        })
    }
}

fn read_head<DB: pharos_db::Store>(db: &DB) -> Result<Option<u64>, Error> {
    match db.read(HEAD_KEY)? {
        Some(data) if data.len() == 8 => Ok(Some(BigEndian::read_u64(&data))),
        Some(_) | None => Ok(None),
    }
}

fn encode(beacon: &Beacon) -> Result<Vec<u8>, Error> {
    cbor4ii::serde::to_vec(Vec::new(), beacon).map_err(|e| Error::Encoding(e.to_string()))
}

fn decode(data: &[u8]) -> Result<Beacon, Error> {
    cbor4ii::serde::from_slice(data).map_err(|e| Error::Encoding(e.to_string()))
}

#[async_trait]
impl<DB: pharos_db::Store> Store for BeaconStore<DB> {
    async fn put(&self, beacon: Beacon) -> Result<(), Error> {
        self.db.write(round_key(beacon.round()), encode(&beacon)?)?;
        let head = self.head.load(Ordering::SeqCst).max(beacon.round());
        self.db.write(HEAD_KEY, round_key(head))?;
        self.head.store(head, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, round: u64) -> Result<Option<Beacon>, Error> {
        match self.db.read(round_key(round))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    async fn last(&self) -> Result<Beacon, Error> {
        let head = self.head.load(Ordering::SeqCst);
        self.get(head).await?.ok_or(Error::NoBeaconStored)
    }

    async fn len(&self) -> Result<u64, Error> {
        Ok(self.head.load(Ordering::SeqCst) + 1)
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}
