// SPDX short identifier: Unlicense

use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, SeedableRng};

use ringvrm::{
    common::*,
    config::MixerConfig,
    pool::*,
    signature::RingSignature
};

const START: u64 = 1_700_000_000_000;
const DAY_MS: u64 = 24 * 60 * 60 * 1000;

fn manager() -> (MixPoolManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let manager = MixPoolManager::with_store(
        MixerConfig::default(), Arc::new(PoolStore::new()), clock.clone()
    );
    return (manager, clock)
}

///A participant with their own key, signing in a ring of `size` with random decoys.
struct Participant {
    key: SigningKey,
    address: String
}

impl Participant {
    fn new(address: &str) -> Self {
        return Self{key: SigningKey::generate(), address: address.to_string()}
    }

    fn request(&self, pool_id: &PoolId, outputs: &[&str], amount: u64, ring_size: usize) -> MixRequest {
        let outputs: Vec<String> = outputs.iter().map(|output| output.to_string()).collect();
        let mut ring = Ring::new();
        for i in 0..ring_size - 1 {
            ring.push(SigningKey::generate().to_member(format!("{}-decoy-{i}", self.address)));
        }
        let index = ring_size / 2;
        ring.insert(index, self.key.to_member(self.address.clone()));

        let message = MixRequest::signing_message(pool_id, &self.address, &outputs, amount);
        let ring_signature = RingSignature::generate(&message, &self.key, &ring, index).unwrap();
        return MixRequest{
            pool_id: pool_id.clone(),
            input_address: self.address.clone(),
            output_addresses: outputs,
            amount,
            mix_depth: 3,
            delay_range: Some(DelayRange::new(100, 500)),
            ring_signature
        }
    }
}

#[test]
fn pool_lifecycle() {
    let (manager, _) = manager();
    let pool = manager.create_mix_pool("ETH", 100, 10_000, 3).unwrap();
    assert_eq!(pool.state, PoolState::Open);
    assert!(pool.anonymity_set.is_empty());
    assert_eq!(pool.expires_at(), START + DAY_MS);

    let alice = Participant::new("alice");
    let bob = Participant::new("bob");

    let tx_a = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1", "a2", "a3"], 1_000, 4)).unwrap();
    let tx_b = manager.join_mix_pool(&pool.id, bob.request(&pool.id, &["b1"], 5_000, 5)).unwrap();
    assert_eq!(tx_a.status, TransactionStatus::Pending);
    assert_eq!(tx_b.status, TransactionStatus::Pending);
    assert_eq!(manager.get_pool(&pool.id).unwrap().anonymity_set.len(), 9);

    let mut rng = StdRng::seed_from_u64(1);
    let executed = manager.execute_mix_with_rng(&mut rng, &pool.id).unwrap();
    assert_eq!(executed.len(), 2);
    assert_eq!(manager.get_pool(&pool.id).unwrap().state, PoolState::Completed);

    let tx_a = manager.get_transaction(&tx_a.id).unwrap();
    assert_eq!(tx_a.status, TransactionStatus::Completed);
    assert_eq!(tx_a.transfers.len(), 3);
    //0.1% fee, the rest split across outputs
    assert_eq!(tx_a.net_amount(), 999);
    assert_eq!(tx_a.transfers.iter().map(|t| t.amount).collect::<Vec<u64>>(), vec!(333, 333, 333));
    assert!(tx_a.scheduled_delays().iter().all(|delay| (100..=500).contains(delay)));

    let tx_b = manager.get_transaction(&tx_b.id).unwrap();
    assert_eq!(tx_b.net_amount(), 4_995);
    assert_eq!(tx_b.transfers[0].address, "b1");

    //executing twice is refused, not repeated
    assert_eq!(manager.execute_mix(&pool.id), Err(MixError::Rejected(RejectReason::PoolNotOpen)));

    //and the pool no longer takes requests
    let carol = Participant::new("carol");
    let rejected = manager.join_mix_pool(&pool.id, carol.request(&pool.id, &["c1"], 1_000, 3)).unwrap();
    assert_eq!(rejected.status, TransactionStatus::Failed);
    assert_eq!(rejected.failure, Some(RejectReason::PoolNotOpen));

    let stats = manager.get_pool_stats(&pool.id).unwrap();
    assert_eq!(stats.transaction_count, 3);
    assert_eq!(stats.completed_count, 2);
    assert_eq!(stats.failed_count, 1);
    assert_eq!(stats.total_volume, 6_000);
    assert_eq!(stats.total_mixed, 5_994);
    assert_eq!(stats.total_fees, 6);
    assert_eq!(stats.anonymity_set_size, 9);
}

#[test]
fn invalid_pools_are_refused() {
    let (manager, _) = manager();
    assert!(matches!(manager.create_mix_pool("", 1, 2, 1), Err(MixError::InvalidPool(_))));
    assert!(matches!(manager.create_mix_pool("ETH", 0, 2, 1), Err(MixError::InvalidPool(_))));
    assert!(matches!(manager.create_mix_pool("ETH", 3, 2, 1), Err(MixError::InvalidPool(_))));
    assert!(manager.create_mix_pool("ETH", 2, 2, 1).is_ok());

    let missing = PoolId::from("pool-missing");
    assert_eq!(manager.execute_mix(&missing), Err(MixError::PoolNotFound(missing.clone())));
    assert!(matches!(manager.get_pool_stats(&missing), Err(MixError::PoolNotFound(_))));
}

#[test]
fn rejections_leave_the_pool_untouched() {
    let (manager, _) = manager();
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let alice = Participant::new("alice");

    //amount out of range
    let tx = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1"], 5_000, 3)).unwrap();
    assert_eq!(tx.failure, Some(RejectReason::AmountOutOfRange));

    //signature over a different request
    let mut request = alice.request(&pool.id, &["a1"], 500, 3);
    request.output_addresses = vec!("thief".to_string());
    let tx = manager.join_mix_pool(&pool.id, request).unwrap();
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert_eq!(tx.failure, Some(RejectReason::InvalidSignature));

    //tampered signature
    let mut request = alice.request(&pool.id, &["a1"], 500, 3);
    request.ring_signature.s[1] += Scalar::one();
    let tx = manager.join_mix_pool(&pool.id, request).unwrap();
    assert_eq!(tx.failure, Some(RejectReason::InvalidSignature));

    let pool_now = manager.get_pool(&pool.id).unwrap();
    assert_eq!(pool_now, pool);
    let stats = manager.get_pool_stats(&pool.id).unwrap();
    assert_eq!(stats.failed_count, 3);
    assert_eq!(stats.total_volume, 0);

    //a rejected attempt does not burn the key image
    let tx = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1"], 500, 3)).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
}

#[test]
fn double_mix_is_detected() {
    let (manager, _) = manager();
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let other = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let alice = Participant::new("alice");

    let first = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1"], 500, 3)).unwrap();
    assert_eq!(first.status, TransactionStatus::Pending);

    //a new ring and new outputs, but the same key
    let second = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a2", "a3"], 600, 6)).unwrap();
    assert_eq!(second.failure, Some(RejectReason::DuplicateKeyImage));
    assert_eq!(manager.get_pool(&pool.id).unwrap().anonymity_set.len(), 3);

    //key images are tracked per pool
    let elsewhere = manager.join_mix_pool(&other.id, alice.request(&other.id, &["a2"], 600, 3)).unwrap();
    assert_eq!(elsewhere.status, TransactionStatus::Pending);
}

#[test]
fn rings_below_the_minimum_are_rejected() {
    let clock = Arc::new(ManualClock::new(START));
    let config = MixerConfig{min_ring_size: 4, ..MixerConfig::default()};
    let manager = MixPoolManager::with_store(config, Arc::new(PoolStore::new()), clock);
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();

    let alice = Participant::new("alice");
    let tx = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1"], 500, 3)).unwrap();
    assert_eq!(tx.failure, Some(RejectReason::RingTooSmall));
    let tx = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1"], 500, 4)).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
}

#[test]
fn malformed_requests_are_errors() {
    let (manager, _) = manager();
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let other = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let alice = Participant::new("alice");

    let request = alice.request(&pool.id, &[], 500, 3);
    assert!(matches!(manager.join_mix_pool(&pool.id, request), Err(MixError::MalformedRequest(_))));

    let outputs: Vec<String> = (0..17).map(|i| format!("out-{i}")).collect();
    let outputs: Vec<&str> = outputs.iter().map(|output| output.as_str()).collect();
    let request = alice.request(&pool.id, &outputs, 500, 3);
    assert!(matches!(manager.join_mix_pool(&pool.id, request), Err(MixError::MalformedRequest(_))));

    let request = alice.request(&other.id, &["a1"], 500, 3);
    assert!(matches!(manager.join_mix_pool(&pool.id, request), Err(MixError::MalformedRequest(_))));

    let mut request = alice.request(&pool.id, &["a1"], 500, 3);
    request.delay_range = Some(DelayRange::new(10, 5));
    assert!(matches!(manager.join_mix_pool(&pool.id, request), Err(MixError::MalformedRequest(_))));

    let request = alice.request(&pool.id, &["a1"], 500, 3);
    let missing = PoolId::from("pool-missing");
    assert_eq!(manager.join_mix_pool(&missing, request), Err(MixError::PoolNotFound(missing.clone())));

    //none of that touched the pool
    assert_eq!(manager.get_pool_stats(&pool.id).unwrap().transaction_count, 0);
}

#[test]
fn cleanup_expires_only_overdue_pools() {
    let (manager, clock) = manager();
    let early = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    clock.advance(DAY_MS / 2);
    let late = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();

    let alice = Participant::new("alice");
    let pending = manager.join_mix_pool(&early.id, alice.request(&early.id, &["a1"], 500, 3)).unwrap();

    //not yet due
    clock.set(START + DAY_MS - 1);
    assert_eq!(manager.cleanup_expired_pools(), 0);
    assert_eq!(manager.get_pool(&early.id).unwrap().state, PoolState::Open);

    //exactly at the deadline
    clock.set(START + DAY_MS);
    assert_eq!(manager.cleanup_expired_pools(), 1);
    assert_eq!(manager.get_pool(&early.id).unwrap().state, PoolState::Expired);
    assert_eq!(manager.get_pool(&late.id).unwrap().state, PoolState::Open);

    let pending = manager.get_transaction(&pending.id).unwrap();
    assert_eq!(pending.status, TransactionStatus::Failed);
    assert_eq!(pending.failure, Some(RejectReason::PoolExpired));

    //nothing was mixed, so nothing counts as volume
    let stats = manager.get_pool_stats(&early.id).unwrap();
    assert_eq!(stats.failed_count, 1);
    assert_eq!(stats.total_volume, 0);
    assert_eq!(manager.get_ring_vrm_stats().total_volume, 0);

    //expired pools stay expired
    assert_eq!(manager.cleanup_expired_pools(), 0);
    assert_eq!(manager.execute_mix(&early.id), Err(MixError::Rejected(RejectReason::PoolExpired)));
    let tx = manager.join_mix_pool(&early.id, alice.request(&early.id, &["a1"], 500, 3)).unwrap();
    assert_eq!(tx.failure, Some(RejectReason::PoolExpired));
}

#[test]
fn overdue_pools_refuse_work_before_the_sweep() {
    let (manager, clock) = manager();
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    clock.advance(DAY_MS);

    let alice = Participant::new("alice");
    let tx = manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1"], 500, 3)).unwrap();
    assert_eq!(tx.failure, Some(RejectReason::PoolExpired));
    assert_eq!(manager.execute_mix(&pool.id), Err(MixError::Rejected(RejectReason::PoolExpired)));
    assert!(manager.find_eligible_pools("ETH", 500).is_empty());

    //the pool itself is only moved by the sweep
    assert_eq!(manager.get_pool(&pool.id).unwrap().state, PoolState::Open);
    assert_eq!(manager.cleanup_expired_pools(), 1);
}

#[test]
fn eligible_pools() {
    let (manager, clock) = manager();
    let small = manager.create_mix_pool("ETH", 10, 100, 2).unwrap();
    clock.advance(1);
    let large = manager.create_mix_pool("ETH", 50, 10_000, 2).unwrap();
    clock.advance(1);
    manager.create_mix_pool("BTC", 10, 100, 2).unwrap();
    clock.advance(1);
    let done = manager.create_mix_pool("ETH", 10, 100, 2).unwrap();
    manager.execute_mix(&done.id).unwrap();

    let ids = |pools: Vec<MixPool>| pools.into_iter().map(|pool| pool.id).collect::<Vec<PoolId>>();
    assert_eq!(ids(manager.find_eligible_pools("ETH", 60)), vec!(small.id.clone(), large.id.clone()));
    assert_eq!(ids(manager.find_eligible_pools("ETH", 500)), vec!(large.id.clone()));
    assert_eq!(ids(manager.find_eligible_pools("ETH", 5)), Vec::<PoolId>::new());
    assert_eq!(manager.find_eligible_pools("DOGE", 50).len(), 0);
}

#[test]
fn global_stats() {
    let (manager, clock) = manager();
    let first = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let second = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();

    let alice = Participant::new("alice");
    let bob = Participant::new("bob");
    manager.join_mix_pool(&first.id, alice.request(&first.id, &["a1"], 1_000, 3)).unwrap();
    manager.join_mix_pool(&second.id, bob.request(&second.id, &["b1"], 500, 4)).unwrap();
    //rejected
    manager.join_mix_pool(&second.id, bob.request(&second.id, &["b1"], 500, 4)).unwrap();

    let stats = manager.get_ring_vrm_stats();
    assert_eq!(stats.active_pools, 2);
    assert_eq!(stats.current_anonymity_set, 7);
    assert_eq!(stats.total_transactions, 3);
    assert_eq!(stats.total_volume, 1_500);
    assert_eq!(stats.total_mixed, 0);
    assert_eq!(stats.mix_success_rate, 0.0);

    clock.advance(2_000);
    manager.execute_mix_with_rng(&mut StdRng::seed_from_u64(5), &first.id).unwrap();
    let stats = manager.get_ring_vrm_stats();
    assert_eq!(stats.active_pools, 1);
    assert_eq!(stats.current_anonymity_set, 4);
    assert_eq!(stats.total_mixed, 999);
    assert_eq!(stats.mix_success_rate, 50.0);
    //two seconds waiting, plus a delay of at most 500ms
    assert!((2_100..=2_500).contains(&stats.average_mix_time_ms));
}

#[test]
fn concurrent_joins_accept_a_key_once() {
    let (manager, _) = manager();
    let manager = Arc::new(manager);
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let alice = Participant::new("alice");
    let requests: Vec<MixRequest> = (0..8)
        .map(|i| alice.request(&pool.id, &[format!("out-{i}").as_str()], 500, 3))
        .collect();

    let handles: Vec<_> = requests.into_iter()
        .map(|request| {
            let manager = Arc::clone(&manager);
            let pool_id = pool.id.clone();
            std::thread::spawn(move || manager.join_mix_pool(&pool_id, request).unwrap())
        })
        .collect();
    let results: Vec<MixTransaction> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    let accepted = results.iter().filter(|tx| tx.status == TransactionStatus::Pending).count();
    assert_eq!(accepted, 1);
    assert!(results.iter()
        .filter(|tx| tx.status == TransactionStatus::Failed)
        .all(|tx| tx.failure == Some(RejectReason::DuplicateKeyImage)));
}

#[test]
fn fees_never_exceed_the_amount() {
    let clock = Arc::new(ManualClock::new(START));
    let config = MixerConfig{fee_basis_points: 20_000, ..MixerConfig::default()};
    let manager = MixPoolManager::with_store(config, Arc::new(PoolStore::new()), clock);
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    assert_eq!(pool.fee_for(500), 500);

    let alice = Participant::new("alice");
    manager.join_mix_pool(&pool.id, alice.request(&pool.id, &["a1", "a2"], 500, 3)).unwrap();
    let executed = manager.execute_mix(&pool.id).unwrap();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].status, TransactionStatus::Completed);
    assert_eq!(executed[0].net_amount(), 0);
    assert_eq!(executed[0].transfers.len(), 2);

    let stats = manager.get_pool_stats(&pool.id).unwrap();
    assert_eq!(stats.state, PoolState::Completed);
    assert_eq!(stats.total_fees, 500);
    assert_eq!(stats.total_mixed, 0);
}

#[test]
fn closed_pools_are_evicted() {
    let clock = Arc::new(ManualClock::new(START));
    let config = MixerConfig{closed_pool_retention_secs: 60, ..MixerConfig::default()};
    let manager = MixPoolManager::with_store(config, Arc::new(PoolStore::new()), clock.clone());
    let done = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    let expiring = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();
    clock.advance(DAY_MS / 2);
    let open = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();

    let alice = Participant::new("alice");
    let bob = Participant::new("bob");
    let mixed = manager.join_mix_pool(&done.id, alice.request(&done.id, &["a1"], 500, 3)).unwrap();
    let pending = manager.join_mix_pool(&expiring.id, bob.request(&expiring.id, &["b1"], 500, 3)).unwrap();
    manager.execute_mix(&done.id).unwrap();
    assert_eq!(manager.get_pool(&done.id).unwrap().closed_at, Some(START + DAY_MS / 2));

    //still within the retention period
    clock.advance(59_999);
    assert_eq!(manager.evict_closed_pools(), 0);
    assert!(manager.get_transaction(&mixed.id).is_some());

    //expires one pool, evicts the one completed a day earlier
    clock.set(START + DAY_MS);
    assert_eq!(manager.cleanup_expired_pools(), 1);
    assert!(matches!(manager.get_pool(&done.id), Err(MixError::PoolNotFound(_))));
    assert!(manager.get_transaction(&mixed.id).is_none());
    assert_eq!(manager.get_pool(&expiring.id).unwrap().state, PoolState::Expired);
    assert!(manager.get_transaction(&pending.id).is_some());
    assert_eq!(manager.store().len(), 2);

    //the expired pool follows after its own retention period
    clock.advance(60_000);
    assert_eq!(manager.cleanup_expired_pools(), 0);
    assert!(manager.get_transaction(&pending.id).is_none());
    assert!(matches!(manager.join_mix_pool(&expiring.id, bob.request(&expiring.id, &["b1"], 500, 3)),
        Err(MixError::PoolNotFound(_))));
    assert_eq!(manager.store().pool_ids(), vec!(open.id.clone()));
    assert!(!manager.store().remove(&expiring.id));
    assert_eq!(manager.get_ring_vrm_stats().total_transactions, 0);
}

#[tokio::test]
async fn cleanup_task_expires_pools() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (manager, clock) = manager();
    let manager = Arc::new(manager);
    let pool = manager.create_mix_pool("ETH", 100, 1_000, 2).unwrap();

    let handle = spawn_cleanup_task(Arc::clone(&manager), Duration::from_millis(10));
    clock.advance(DAY_MS);
    for _ in 0..100 {
        if manager.get_pool(&pool.id).unwrap().state == PoolState::Expired {
            break
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();
    assert_eq!(manager.get_pool(&pool.id).unwrap().state, PoolState::Expired);
}

#[test]
fn config_from_toml() {
    let config = MixerConfig::from_toml_str("").unwrap();
    assert_eq!(config, MixerConfig::default());

    let config = MixerConfig::from_toml_str(r#"
        pool_ttl_secs = 3600
        fee_basis_points = 25

        [default_delay_range]
        min_ms = 5
        max_ms = 50
    "#).unwrap();
    assert_eq!(config.pool_ttl_ms(), 3_600_000);
    assert_eq!(config.fee_basis_points, 25);
    assert_eq!(config.default_delay_range, DelayRange::new(5, 50));
    assert_eq!(config.cleanup_interval(), Duration::from_secs(60));
    assert_eq!(config.min_ring_size, 2);
    assert_eq!(config.closed_pool_retention_ms(), 86_400_000);

    assert_eq!(MixerConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap(), config);

    assert!(MixerConfig::from_toml_str("fee_basis_points = 10000").is_err());
    assert!(MixerConfig::from_toml_str("min_ring_size = 1").is_err());
    assert!(MixerConfig::from_toml_str("pool_ttl_secs = \"soon\"").is_err());
    assert!(MixerConfig::load(std::path::Path::new("/nonexistent/ringvrm.toml")).is_err());
}
