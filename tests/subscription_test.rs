mod common;

use classboard::{spawn_store_with_capacity, Database, NewDailyUpdate};
use common::{within, TestApp};
use serde_json::json;

#[tokio::test]
async fn dropping_a_subscription_unsubscribes_it() {
    let app = TestApp::new();
    assert_eq!(app.store.subscriber_count().await.unwrap(), 0);

    let feed = app.data.subscribe_updates().await.unwrap();
    let reviews = app.data.subscribe_reviews(None).await.unwrap();
    assert_eq!(app.store.subscriber_count().await.unwrap(), 2);

    drop(feed);
    drop(reviews);
    assert_eq!(app.store.subscriber_count().await.unwrap(), 0);

    app.shutdown().await;
}

/// A subscriber that falls behind the change feed refreshes from current
/// state instead of replaying: snapshots are whole-state, so one read heals
/// the lag.
#[tokio::test]
async fn a_lagged_subscriber_recovers_with_the_current_snapshot() {
    common::init_tracing();
    let db = Database::open_in_memory().unwrap();
    let store = spawn_store_with_capacity(db, 2);

    let mut sub = store.watch("updates").await.unwrap();
    let _ = within(sub.next()).await.unwrap().unwrap();

    // Far more writes than the feed buffers.
    for n in 0..20 {
        store.push("updates", json!({ "n": n })).await.unwrap();
    }

    let snapshot = within(sub.next()).await.unwrap().unwrap();
    let entries: Vec<(classboard::RecordKey, serde_json::Value)> =
        snapshot.entries().unwrap();
    assert_eq!(entries.len(), 20);

    store.shutdown().await;
}

#[tokio::test]
async fn feeds_end_when_the_store_shuts_down() {
    let app = TestApp::new();

    let mut feed = app.data.subscribe_updates().await.unwrap();
    let _ = within(feed.next()).await.unwrap().unwrap();

    app.shutdown().await;

    assert!(within(feed.next()).await.is_none());
}

#[tokio::test]
async fn two_subscribers_both_see_the_same_write() {
    let app = TestApp::new();

    let mut first = app.data.subscribe_updates().await.unwrap();
    let mut second = app.data.subscribe_updates().await.unwrap();
    assert!(within(first.next()).await.unwrap().unwrap().is_empty());
    assert!(within(second.next()).await.unwrap().unwrap().is_empty());

    app.data
        .add_daily_update(NewDailyUpdate::new("English", "Mrs. Dutta", "Sonnets").unwrap())
        .await
        .unwrap();

    let seen_by_first = within(first.next()).await.unwrap().unwrap();
    let seen_by_second = within(second.next()).await.unwrap().unwrap();
    assert_eq!(seen_by_first.len(), 1);
    assert_eq!(seen_by_first[0].id, seen_by_second[0].id);

    app.shutdown().await;
}
