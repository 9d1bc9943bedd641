// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use pharos_chain::{
    AppendStore, Beacon, BeaconStore, CallbackStore, Cursor, DiscrepancyStore, Error,
    SchemeStore, Store,
};
use pharos_clock::TestClock;
use pharos_crypto::{Point, PriPoly, Scheme};
use pharos_db::MemoryDB;
use pharos_key::{DistPublic, Group, Node};
use rand::thread_rng;
use std::sync::Arc;
use std::time::Duration;

fn make_group(scheme: Scheme) -> Arc<Group> {
    let pri = PriPoly::random(2, thread_rng()).unwrap();
    let commits = pri.commit(scheme.key_group()).commits().to_vec();
    let nodes = (1..=3u32)
        .map(|i| {
            Node::new(
                i,
                format!("node-{i}"),
                Point::generator(scheme.key_group()),
            )
        })
        .collect();
    Arc::new(
        Group::new(
            nodes,
            2,
            Duration::from_secs(2),
            1_600_000_100,
            DistPublic::new(commits),
            scheme,
            "default".to_owned(),
        )
        .unwrap(),
    )
}

async fn stack(scheme: Scheme, db: MemoryDB) -> (CallbackStore, Arc<Group>) {
    let group = make_group(scheme);
    let genesis = Beacon::genesis(group.genesis_seed());
    let raw = BeaconStore::open(db, genesis).unwrap();
    let append = AppendStore::new(Box::new(raw)).await.unwrap();
    let schemed = SchemeStore::new(Box::new(append), *group.scheme())
        .await
        .unwrap();
    let observed = DiscrepancyStore::new(
        Box::new(schemed),
        group.clone(),
        Arc::new(TestClock::new()),
    );
    (CallbackStore::new(Box::new(observed)), group)
}

fn linked(round: u64, prev: &[u8]) -> Beacon {
    Beacon::new(round, prev.to_vec(), vec![round as u8; 96])
}

#[tokio::test(flavor = "multi_thread")]
async fn rejects_non_contiguous_rounds() {
    let (store, group) = stack(Scheme::chained(), MemoryDB::default()).await;
    let seed = group.genesis_seed();

    store.put(linked(1, &seed)).await.unwrap();
    let skipped = linked(3, store.last().await.unwrap().signature());
    assert!(matches!(
        store.put(skipped).await,
        Err(Error::NonContiguous { last: 1, new: 3 })
    ));
    // Replaying an already stored round is rejected the same way.
    assert!(matches!(
        store.put(linked(1, &seed)).await,
        Err(Error::NonContiguous { last: 1, new: 1 })
    ));
    store.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn enforces_chain_links_on_chained_schemes() {
    let (store, group) = stack(Scheme::chained(), MemoryDB::default()).await;
    let seed = group.genesis_seed();

    store.put(linked(1, &seed)).await.unwrap();
    let bad = Beacon::new(2, b"not the previous signature".to_vec(), vec![2; 96]);
    assert!(matches!(
        store.put(bad).await,
        Err(Error::InvalidChainLink(2))
    ));

    let prev = store.last().await.unwrap().signature().to_vec();
    store.put(linked(2, &prev)).await.unwrap();
    assert_eq!(store.last().await.unwrap().round(), 2);
    store.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn unchained_schemes_store_an_empty_previous_signature() {
    let (store, _) = stack(Scheme::unchained(), MemoryDB::default()).await;

    store
        .put(Beacon::new(1, b"whatever the gossip said".to_vec(), vec![1; 96]))
        .await
        .unwrap();
    let stored = store.get(1).await.unwrap().unwrap();
    assert!(stored.previous_signature().is_empty());
    store.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn callbacks_fire_exactly_once_per_stored_round() {
    let (store, group) = stack(Scheme::chained(), MemoryDB::default()).await;
    let seed = group.genesis_seed();

    let (tx_a, rx_a) = flume::unbounded();
    let (tx_b, rx_b) = flume::unbounded();
    store
        .add_callback(
            "a",
            Arc::new(move |b: &Beacon| {
                let _ = tx_a.send(b.round());
            }),
        )
        .await;
    store
        .add_callback(
            "b",
            Arc::new(move |b: &Beacon| {
                let _ = tx_b.send(b.round());
            }),
        )
        .await;

    let mut prev = seed;
    for round in 1..=3u64 {
        let beacon = linked(round, &prev);
        prev = beacon.signature().to_vec();
        store.put(beacon).await.unwrap();
    }
    // A failed put must not notify anyone.
    let _ = store.put(linked(9, &prev)).await.unwrap_err();

    for rx in [rx_a, rx_b] {
        let mut rounds = Vec::new();
        for _ in 0..3 {
            let round = tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
                .await
                .expect("callback should fire")
                .unwrap();
            rounds.push(round);
        }
        rounds.sort_unstable();
        assert_eq!(rounds, vec![1, 2, 3]);
        assert!(rx.try_recv().is_err());
    }
    store.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn removed_callbacks_stay_silent() {
    let (store, group) = stack(Scheme::chained(), MemoryDB::default()).await;
    let seed = group.genesis_seed();

    let (tx, rx) = flume::unbounded();
    store
        .add_callback(
            "gone",
            Arc::new(move |b: &Beacon| {
                let _ = tx.send(b.round());
            }),
        )
        .await;
    store.remove_callback("gone").await;

    store.put(linked(1, &seed)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
    store.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn cursor_streams_the_chain_in_order() {
    let (store, group) = stack(Scheme::chained(), MemoryDB::default()).await;
    let mut prev = group.genesis_seed();
    for round in 1..=4u64 {
        let beacon = linked(round, &prev);
        prev = beacon.signature().to_vec();
        store.put(beacon).await.unwrap();
    }

    let mut cursor = Cursor::new(&store, 2);
    let mut rounds = Vec::new();
    while let Some(beacon) = cursor.next().await.unwrap() {
        rounds.push(beacon.round());
    }
    assert_eq!(rounds, vec![2, 3, 4]);
    store.close().await.unwrap();
}
