mod common;

use classboard::{spawn_store, DataAccess, Database, NewDailyUpdate};
use common::within;

/// Records survive a store restart: the collections are rebuilt from the
/// database file, in the same order, with the same keys.
#[tokio::test]
async fn records_survive_reopening_the_store() {
    common::init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("records.db");

    let first_key = {
        let store = spawn_store(Database::open(&path).unwrap());
        let data = DataAccess::new(store.clone());

        let key = data
            .add_daily_update(
                NewDailyUpdate::new("Mathematics", "Mr. Rao", "Covered quadratic equations")
                    .unwrap(),
            )
            .await
            .unwrap();
        data.add_daily_update(NewDailyUpdate::new("Science", "Dr. Bose", "Cells").unwrap())
            .await
            .unwrap();

        store.shutdown().await;
        key
    };

    let store = spawn_store(Database::open(&path).unwrap());
    let data = DataAccess::new(store.clone());

    let mut feed = data.subscribe_updates().await.unwrap();
    let updates = within(feed.next()).await.unwrap().unwrap();
    assert_eq!(updates.len(), 2);
    // Newest first; the earlier post keeps its original key.
    assert_eq!(updates[1].id, first_key);
    assert_eq!(updates[1].teacher_name, "Mr. Rao");

    store.shutdown().await;
}
