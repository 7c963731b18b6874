//! Number pool integration tests
//!
//! Quota, cooldown and exclusivity across concurrent callers.

use std::collections::HashSet;
use std::sync::Arc;

use smsgw::pool::{NumberPool, NumberState};

async fn pool_with(limit: u32, count: usize) -> NumberPool {
    let pool = NumberPool::new(limit);
    pool.add_numbers_bulk((0..count).map(|i| (format!("+1437784{:04}", i), "telnyx")))
        .await;
    pool
}

#[tokio::test]
async fn test_daily_lifecycle() {
    let pool = pool_with(2, 1).await;
    let number = "+14377840000";

    // Two assignments use the quota
    assert_eq!(pool.assign_number("A", None).await.as_deref(), Some(number));
    assert!(pool.release_number(number, false).await);
    assert_eq!(pool.assign_number("B", None).await.as_deref(), Some(number));
    assert!(pool.release_number(number, true).await);

    // Cooldown and quota both block until the reset
    assert_eq!(pool.assign_number("C", None).await, None);
    assert_eq!(pool.get(number).await.unwrap().state, NumberState::Cooldown);

    assert_eq!(pool.reset_daily_counts().await, 1);
    let entry = pool.get(number).await.unwrap();
    assert_eq!(entry.state, NumberState::Available);
    assert_eq!(entry.daily_send_count, 0);
    assert_eq!(entry.total_send_count, 2);

    assert_eq!(pool.assign_number("C", None).await.as_deref(), Some(number));
}

#[tokio::test]
async fn test_concurrent_batches_never_share_numbers() {
    let pool = Arc::new(pool_with(5, 40).await);

    let mut handles = Vec::new();
    for worker in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let targets: Vec<String> = (0..10).map(|i| format!("w{worker}-t{i}")).collect();
            pool.assign_batch(targets.as_slice(), Some("batch")).await
        }));
    }

    let mut numbers = HashSet::new();
    let mut total = 0;
    for handle in handles {
        let assignments = handle.await.unwrap();
        total += assignments.len();
        for number in assignments.into_values() {
            assert!(numbers.insert(number), "number assigned twice");
        }
    }

    assert_eq!(total, 40);
    let stats = pool.stats().await;
    assert_eq!(stats.assigned, 40);
    assert_eq!(stats.available, 0);
}

#[tokio::test]
async fn test_partial_batch_rollback() {
    let pool = pool_with(5, 3).await;
    let targets = ["A", "B", "C", "D", "E"];

    let assignments = pool.assign_batch(targets.as_slice(), None).await;
    assert_eq!(assignments.len(), 3);

    assert_eq!(pool.undo_assignments(&assignments).await, 3);
    let stats = pool.stats().await;
    assert_eq!(stats.available, 3);
    assert_eq!(stats.assigned, 0);
    for number in pool.numbers().await {
        assert_eq!(number.daily_send_count, 0);
        assert!(number.assigned_target.is_none());
    }
}

#[tokio::test]
async fn test_disabled_numbers_are_skipped() {
    let pool = pool_with(5, 2).await;
    assert!(pool.disable_number("+14377840000").await);

    assert_eq!(
        pool.assign_number("A", None).await.as_deref(),
        Some("+14377840001")
    );
    assert_eq!(pool.assign_number("B", None).await, None);

    assert!(pool.enable_number("+14377840000").await);
    assert_eq!(
        pool.assign_number("B", None).await.as_deref(),
        Some("+14377840000")
    );
}
