// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Multi-node beacon tests driven by a shared deterministic clock and an
//! in-process router standing in for the transport.

use async_trait::async_trait;
use parking_lot::RwLock;
use pharos_beacon::{Config, Error, Handler};
use pharos_chain::Beacon;
use pharos_clock::{Clock, TestClock};
use pharos_crypto::{Point, PriPoly, Scheme};
use pharos_db::MemoryDB;
use pharos_key::{DistPublic, Group, Node, Share};
use pharos_net::{
    BeaconStream, Metadata, PartialBeaconPacket, ProtocolClient, SyncRequest,
};
use rand::thread_rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PERIOD: Duration = Duration::from_secs(2);
const GENESIS_OFFSET: i64 = 2;
const WAIT: Duration = Duration::from_secs(10);

/// Stand-in for the DKG: every node deals a polynomial, the sum is the
/// group polynomial, its evaluations are the shares.
fn dkg_shares(n: usize, threshold: usize, scheme: &Scheme) -> (Vec<Share>, DistPublic) {
    let mut pri = PriPoly::random(threshold, thread_rng()).unwrap();
    for _ in 1..n {
        let dealt = PriPoly::random(threshold, thread_rng()).unwrap();
        pri = pri.add(&dealt).unwrap();
    }
    let public = pri.commit(scheme.key_group());
    let dist = DistPublic::new(public.commits().to_vec());
    let shares = pri
        .shares(n)
        .into_iter()
        .map(|s| Share::new(s, dist.clone()))
        .collect();
    (shares, dist)
}

#[derive(Clone)]
struct Peer {
    handler: Arc<Handler>,
    reception: Arc<AtomicBool>,
}

/// Routes peer calls straight into the target handler. Serves as the
/// `ProtocolClient` of every node; reception can be toggled per node to
/// simulate partitions.
#[derive(Default)]
struct LocalRouter {
    peers: RwLock<HashMap<String, Peer>>,
}

impl LocalRouter {
    fn register(&self, handler: Arc<Handler>) {
        self.peers.write().insert(
            handler.address().to_owned(),
            Peer {
                handler,
                reception: Arc::new(AtomicBool::new(true)),
            },
        );
    }

    fn set_reception(&self, addr: &str, enabled: bool) {
        if let Some(peer) = self.peers.read().get(addr) {
            peer.reception.store(enabled, Ordering::SeqCst);
        }
    }

    fn peer(&self, addr: &str) -> Result<Peer, pharos_net::Error> {
        let peer = self
            .peers
            .read()
            .get(addr)
            .cloned()
            .ok_or_else(|| pharos_net::Error::Unreachable(addr.to_owned()))?;
        if !peer.reception.load(Ordering::SeqCst) {
            return Err(pharos_net::Error::Rejected("reception disabled".into()));
        }
        Ok(peer)
    }
}

#[async_trait]
impl ProtocolClient for LocalRouter {
    async fn partial_beacon(
        &self,
        addr: &str,
        packet: PartialBeaconPacket,
    ) -> Result<(), pharos_net::Error> {
        let peer = self.peer(addr)?;
        peer.handler
            .process_partial_beacon(packet)
            .await
            .map_err(|e| pharos_net::Error::Rejected(e.to_string()))
    }

    async fn sync_chain(
        &self,
        addr: &str,
        req: SyncRequest,
    ) -> Result<BeaconStream, pharos_net::Error> {
        let peer = self.peer(addr)?;
        let (tx, rx) = flume::bounded(32);
        let chain = peer.handler.chain_store().clone();
        tokio::spawn(async move {
            let _ = pharos_beacon::sync_chain(&chain, &req, tx).await;
        });
        Ok(rx)
    }
}

struct BeaconTest {
    group: Arc<Group>,
    clock: TestClock,
    router: Arc<LocalRouter>,
    handlers: Vec<Arc<Handler>>,
    receivers: Vec<flume::Receiver<Beacon>>,
    // Callbacks for distinct rounds may be delivered out of order across the
    // worker pool; stashed here until a test asks for them.
    seen: Vec<tokio::sync::Mutex<HashMap<u64, Beacon>>>,
}

impl BeaconTest {
    async fn new(n: usize, threshold: u32, scheme: Scheme) -> Self {
        let _ = pretty_env_logger::try_init();
        let clock = TestClock::new();
        let genesis_time = clock.now().timestamp() + GENESIS_OFFSET;

        let (shares, dist) = dkg_shares(n, threshold as usize, &scheme);
        let nodes = (1..=n as u32)
            .map(|i| {
                Node::new(
                    i,
                    format!("node-{i}"),
                    Point::generator(scheme.key_group()),
                )
            })
            .collect();
        let group = Arc::new(
            Group::new(
                nodes,
                threshold,
                PERIOD,
                genesis_time,
                dist,
                scheme,
                "default".to_owned(),
            )
            .unwrap(),
        );

        let router = Arc::new(LocalRouter::default());
        let mut handlers = Vec::with_capacity(n);
        let mut receivers = Vec::with_capacity(n);
        for i in 0..n {
            let conf = Config {
                group: group.clone(),
                public: group.node(i as u32 + 1).unwrap().clone(),
                share: Some(shares[i].clone()),
                clock: Arc::new(clock.clone()),
            };
            let client: Arc<dyn ProtocolClient> = router.clone();
            let handler = Handler::new(client, MemoryDB::default(), conf)
                .await
                .unwrap();
            let (tx, rx) = flume::unbounded();
            handler
                .add_callback(
                    "test-collector",
                    Arc::new(move |b: &Beacon| {
                        let _ = tx.send(b.clone());
                    }),
                )
                .await;
            handlers.push(handler);
            receivers.push(rx);
        }
        let seen = (0..n).map(|_| tokio::sync::Mutex::new(HashMap::new())).collect();
        Self {
            group,
            clock,
            router,
            handlers,
            receivers,
            seen,
        }
    }

    fn serve(&self, i: usize) {
        self.router.register(self.handlers[i].clone());
    }

    async fn start(&self, i: usize, catchup: bool) {
        if catchup {
            self.handlers[i].catchup().unwrap();
        } else {
            self.handlers[i].start().unwrap();
        }
        self.wait_running(i).await;
    }

    async fn wait_running(&self, i: usize) {
        let handler = self.handlers[i].clone();
        tokio::time::timeout(WAIT, async move {
            while !handler.is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("handler should reach the running state");
    }

    /// Gives spawned loops time to arm their next round timer before the
    /// clock jumps.
    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    async fn advance(&self, duration: Duration) {
        self.settle().await;
        self.clock.advance(duration);
    }

    /// Waits on node `i`'s callbacks until `round` shows up, stashing any
    /// other rounds (synced replays, out-of-order worker deliveries) for
    /// later waits.
    async fn wait_beacon(&self, i: usize, round: u64) -> Beacon {
        let mut seen = self.seen[i].lock().await;
        if let Some(beacon) = seen.remove(&round) {
            return beacon;
        }
        let rx = self.receivers[i].clone();
        tokio::time::timeout(WAIT, async {
            loop {
                let beacon = rx.recv_async().await.expect("callback channel closed");
                if beacon.round() == round {
                    return beacon;
                }
                seen.insert(beacon.round(), beacon);
            }
        })
        .await
        .unwrap_or_else(|_| panic!("node {i} never saw round {round}"))
    }

    async fn stop_all(&self) {
        for handler in &self.handlers {
            handler.stop().await;
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn simple_round_succession() {
    let bt = BeaconTest::new(3, 2, Scheme::chained()).await;
    for i in 0..3 {
        bt.serve(i);
    }
    for i in 0..3 {
        bt.start(i, false).await;
    }

    // Before genesis the handlers run but do not serve rounds yet.
    bt.advance(Duration::from_secs(1)).await;
    for handler in &bt.handlers {
        assert!(handler.is_started());
        assert!(handler.is_running());
        assert!(!handler.is_serving());
        assert!(!handler.is_stopped());
    }

    // Reach genesis: round 1 everywhere, chained to the genesis seed.
    bt.advance(Duration::from_secs(1)).await;
    let seed = bt.group.genesis_seed();
    for i in 0..3 {
        let beacon = bt.wait_beacon(i, 1).await;
        assert_eq!(beacon.previous_signature(), seed.as_slice());
        bt.handlers[i]
            .verifier()
            .verify_beacon(
                beacon.round(),
                beacon.previous_signature(),
                beacon.signature(),
                bt.group.public_key(),
            )
            .unwrap();
    }
    for handler in &bt.handlers {
        assert!(handler.is_serving());
    }

    // One more period: round 2, linked to round 1.
    bt.advance(PERIOD).await;
    let round_one_sig = bt.handlers[0]
        .chain_store()
        .get(1)
        .await
        .unwrap()
        .unwrap()
        .signature()
        .to_vec();
    for i in 0..3 {
        let beacon = bt.wait_beacon(i, 2).await;
        assert_eq!(beacon.previous_signature(), round_one_sig.as_slice());
    }
    bt.stop_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn threshold_of_nodes_keeps_producing_and_the_last_one_catches_up() {
    let bt = BeaconTest::new(3, 2, Scheme::chained()).await;
    // Only nodes 1 and 2 join the network at first.
    bt.serve(0);
    bt.serve(1);
    bt.start(0, false).await;
    bt.start(1, false).await;

    bt.advance(Duration::from_secs(GENESIS_OFFSET as u64)).await;
    for i in 0..2 {
        bt.wait_beacon(i, 1).await;
    }
    for round in 2..=3u64 {
        bt.advance(PERIOD).await;
        for i in 0..2 {
            bt.wait_beacon(i, round).await;
        }
    }

    // Node 3 joins late and catches up from its peers.
    bt.serve(2);
    bt.start(2, true).await;
    for round in 1..=3u64 {
        let synced = bt.wait_beacon(2, round).await;
        let original = bt.handlers[0]
            .chain_store()
            .get(round)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(synced.signature(), original.signature());
    }
    assert_eq!(
        bt.handlers[2].chain_store().last().await.unwrap().round(),
        3
    );

    // With all three online the next round works as usual.
    bt.advance(PERIOD).await;
    for i in 0..3 {
        bt.wait_beacon(i, 4).await;
    }
    bt.stop_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn partitioned_node_rejoins_and_catches_up() {
    let bt = BeaconTest::new(4, 3, Scheme::chained()).await;
    for i in 0..4 {
        bt.serve(i);
    }
    for i in 0..4 {
        bt.start(i, false).await;
    }

    bt.advance(Duration::from_secs(GENESIS_OFFSET as u64)).await;
    for i in 0..4 {
        bt.wait_beacon(i, 1).await;
    }
    for round in 2..=3u64 {
        bt.advance(PERIOD).await;
        for i in 0..4 {
            bt.wait_beacon(i, round).await;
        }
    }

    // Cut inbound reception of node 1: the other three still clear the
    // threshold, the cut node stalls at round 3.
    bt.router.set_reception("node-1", false);
    bt.advance(PERIOD).await;
    for i in 1..4 {
        bt.wait_beacon(i, 4).await;
    }
    assert!(bt.receivers[0].is_empty());
    assert!(bt.seen[0].lock().await.is_empty());
    assert_eq!(
        bt.handlers[0].chain_store().last().await.unwrap().round(),
        3
    );

    // Heal the partition: on the next tick the node syncs round 4 from a
    // peer and participates in round 5 again.
    bt.router.set_reception("node-1", true);
    bt.advance(PERIOD).await;
    for i in 0..4 {
        bt.wait_beacon(i, 5).await;
    }
    assert_eq!(
        bt.handlers[0].chain_store().last().await.unwrap().round(),
        5
    );
    bt.stop_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_partial_is_rejected_without_breaking_the_handler() {
    let bt = BeaconTest::new(3, 2, Scheme::chained()).await;
    for i in 0..3 {
        bt.serve(i);
    }
    for i in 0..3 {
        bt.start(i, false).await;
    }

    // Signer index 25958 (0x6566) is far outside the group.
    let mut partial_sig = vec![0x65, 0x66];
    partial_sig.extend_from_slice(&[0xab; 96]);
    let bogus = PartialBeaconPacket {
        round: 1,
        previous_signature: b"deadbeef".to_vec(),
        partial_sig,
        metadata: Some(Metadata::for_beacon("default")),
    };
    match bt.handlers[0].process_partial_beacon(bogus).await {
        Err(Error::UnknownSigner(25958)) => {}
        other => panic!("expected UnknownSigner(25958), got {other:?}"),
    }

    // The handler keeps accepting valid partials afterwards.
    let digest = bt.handlers[0].verifier().digest(1, &bt.group.genesis_seed());
    let valid = PartialBeaconPacket {
        round: 1,
        previous_signature: bt.group.genesis_seed(),
        partial_sig: bt.handlers[1].vault().sign_partial(&digest).unwrap(),
        metadata: Some(Metadata::for_beacon("default")),
    };
    bt.handlers[0].process_partial_beacon(valid).await.unwrap();

    // And rounds still complete end to end.
    bt.advance(Duration::from_secs(GENESIS_OFFSET as u64)).await;
    for i in 0..3 {
        bt.wait_beacon(i, 1).await;
    }
    bt.stop_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unchained_scheme_stores_no_previous_signature() {
    let bt = BeaconTest::new(3, 2, Scheme::unchained()).await;
    for i in 0..3 {
        bt.serve(i);
    }
    for i in 0..3 {
        bt.start(i, false).await;
    }

    bt.advance(Duration::from_secs(GENESIS_OFFSET as u64)).await;
    for i in 0..3 {
        let beacon = bt.wait_beacon(i, 1).await;
        assert!(beacon.previous_signature().is_empty());
        bt.handlers[i]
            .verifier()
            .verify_beacon(beacon.round(), b"", beacon.signature(), bt.group.public_key())
            .unwrap();
    }
    bt.stop_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_handler_rejects_partials_and_restarts_are_refused() {
    let bt = BeaconTest::new(3, 2, Scheme::chained()).await;
    bt.serve(0);
    bt.start(0, false).await;

    assert!(matches!(
        bt.handlers[0].start(),
        Err(Error::AlreadyStarted)
    ));

    bt.handlers[0].stop().await;
    // stop is idempotent
    bt.handlers[0].stop().await;
    assert!(bt.handlers[0].is_stopped());

    let digest = bt.handlers[0].verifier().digest(1, &bt.group.genesis_seed());
    let packet = PartialBeaconPacket {
        round: 1,
        previous_signature: bt.group.genesis_seed(),
        partial_sig: bt.handlers[1].vault().sign_partial(&digest).unwrap(),
        metadata: None,
    };
    assert!(matches!(
        bt.handlers[0].process_partial_beacon(packet).await,
        Err(Error::NotRunning)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn public_rand_serves_stored_rounds() {
    let bt = BeaconTest::new(3, 2, Scheme::chained()).await;
    for i in 0..3 {
        bt.serve(i);
    }
    for i in 0..3 {
        bt.start(i, false).await;
    }
    bt.advance(Duration::from_secs(GENESIS_OFFSET as u64)).await;
    let beacon = bt.wait_beacon(0, 1).await;

    let by_round = bt.handlers[0].public_rand(1).await.unwrap();
    assert_eq!(by_round.round, 1);
    assert_eq!(by_round.signature, beacon.signature().to_vec());
    assert_eq!(by_round.randomness, beacon.randomness());

    let latest = bt.handlers[0].public_rand(0).await.unwrap();
    assert_eq!(latest.round, 1);

    let info = bt.handlers[0].chain_info_packet();
    assert_eq!(info.period, PERIOD.as_secs());
    assert_eq!(info.scheme_id, "pedersen-bls-chained");
    assert_eq!(
        info.public_key,
        hex::encode(bt.group.public_key().to_bytes())
    );
    bt.stop_all().await;
}
