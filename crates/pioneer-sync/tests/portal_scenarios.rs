//! End-to-end portal behavior over the in-memory store

use pioneer_store::{MemoryAuth, MemoryStore, RemoteStore, StoreCall, StoreEvent, StorePath};
use pioneer_sync::{
    paths, Field, LiveStatus, Modal, Pioneer, PioneerInput, PioneerStatus, Portal, PortalConfig,
    Reason, RemoveOutcome, RoadmapInput, SdkError, Session, SyncErrorKind, SyncState, ViewState,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

async fn signed_in_session() -> Session {
    let auth = MemoryAuth::new().with_account("admin@example.com", "secret");
    let session = Session::start(Arc::new(auth));
    session.sign_in("admin@example.com", "secret").await.unwrap();
    session
}

async fn open(store: &MemoryStore) -> Portal {
    let session = signed_in_session().await;
    Portal::open(&session, Arc::new(store.clone()), &PortalConfig::default())
        .await
        .unwrap()
}

/// Wait until the published state satisfies `pred`
async fn wait_until<T>(mut rx: watch::Receiver<SyncState<T>>, pred: impl Fn(&T) -> bool) -> Arc<T> {
    let wait = async {
        loop {
            if let SyncState::Ready(value) = &*rx.borrow_and_update() {
                if pred(value) {
                    return Arc::clone(value);
                }
            }
            rx.changed().await.unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("state did not converge")
}

fn ids(list: &[Pioneer]) -> Vec<&str> {
    list.iter().map(|p| p.id.as_str()).collect()
}

fn scenario_a_store() -> MemoryStore {
    MemoryStore::with_value(json!({
        "pioneers": {
            "p1": {"name": "Ann", "page": "ann.page", "status": "PIONEER"},
            "p2": {"name": "Bo", "page": "bo.shop", "status": "FROZEN"}
        },
        "liveStatus": {"totalPioneers": 0, "totalCapacity": 100}
    }))
}

#[tokio::test]
async fn test_scenario_a_reversed_list_and_active_count() {
    let store = scenario_a_store();
    let mut portal = open(&store).await;

    let list = portal.pioneers().wait_ready().await.unwrap();
    assert_eq!(ids(&list), vec!["p2", "p1"]);

    let live = wait_until(portal.live_status().observe(), |s: &LiveStatus| s.total_pioneers == 1).await;
    assert_eq!(live.total_capacity, 100);
    assert_eq!(store.value_at(&paths::total_pioneers()), Some(json!(1)));

    portal.close().await;
}

#[tokio::test]
async fn test_scenario_b_capacity_below_active_count_rejected() {
    let store = MemoryStore::with_value(json!({
        "pioneers": {"p1": {"name": "Ann", "page": "ann.page", "status": "PIONEER"}},
        "liveStatus": {"totalPioneers": 1, "totalCapacity": 100}
    }));
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();

    let err = portal.gateway().update_capacity("0").await.unwrap_err();
    match err {
        SdkError::Validation(v) => {
            assert_eq!(v.field, Field::Capacity);
            assert_eq!(v.reason, Reason::BelowActiveCount { active: 1 });
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.value_at(&paths::total_capacity()), Some(json!(100)));
    assert!(!store
        .writes()
        .iter()
        .any(|call| call.path() == &paths::total_capacity()));

    portal.close().await;
}

#[tokio::test]
async fn test_scenario_c_empty_name_never_reaches_store() {
    let store = MemoryStore::new();
    let mut portal = open(&store).await;

    let err = portal
        .gateway()
        .add_pioneer(&PioneerInput::new("", "page", "PIONEER"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::Validation(ref v) if v.field == Field::Name && v.reason == Reason::Empty
    ));
    assert!(!store
        .calls()
        .iter()
        .any(|call| matches!(call, StoreCall::Append { .. })));

    portal.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_scenario_d_missing_first_snapshot_times_out() {
    let store = MemoryStore::new();
    store.mute_subscriptions_under(paths::pioneers());
    let mut portal = open(&store).await;

    assert!(portal.pioneers().current().is_loading());
    let err = portal.pioneers().wait_ready().await.unwrap_err();
    assert_eq!(err.kind, SyncErrorKind::Timeout);
    assert_eq!(err.path, "pioneers");

    // Other paths are unaffected
    assert!(portal.live_status().wait_ready().await.is_ok());

    // The deriver stops with the failed synchronizer and never writes
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert!(!portal.deriver().is_running());
    assert!(store.writes().is_empty());

    portal.close().await;
}

#[tokio::test]
async fn test_scenario_e_remove_requires_confirmation() {
    let store = scenario_a_store();
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();

    let outcome = portal
        .gateway()
        .remove_pioneer("p1", &|_: &str| false)
        .await
        .unwrap();
    assert_eq!(outcome, RemoveOutcome::Cancelled);
    assert!(!store
        .calls()
        .iter()
        .any(|call| matches!(call, StoreCall::Delete { .. })));

    let outcome = portal
        .gateway()
        .remove_pioneer("p1", &|_: &str| true)
        .await
        .unwrap();
    assert_eq!(outcome, RemoveOutcome::Removed);
    let deletes: Vec<_> = store
        .calls()
        .into_iter()
        .filter(|call| matches!(call, StoreCall::Delete { .. }))
        .collect();
    assert_eq!(
        deletes,
        vec![StoreCall::Delete {
            path: StorePath::parse("pioneers/p1").unwrap()
        }]
    );

    let list = wait_until(portal.pioneers().observe(), |l: &Vec<Pioneer>| l.len() == 1).await;
    assert_eq!(ids(&list), vec!["p2"]);

    portal.close().await;
}

#[tokio::test]
async fn test_derived_count_follows_every_change() {
    let store = MemoryStore::new();
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();
    let gateway = portal.gateway().clone();

    let ann = gateway
        .add_pioneer(&PioneerInput::new("Ann", "ann.page", "PIONEER"))
        .await
        .unwrap();
    wait_until(portal.live_status().observe(), |s: &LiveStatus| s.total_pioneers == 1).await;

    gateway
        .add_pioneer(&PioneerInput::new("Bo", "bo.shop", "PARTNER"))
        .await
        .unwrap();
    wait_until(portal.live_status().observe(), |s: &LiveStatus| s.total_pioneers == 2).await;

    gateway
        .update_pioneer(&ann, &PioneerInput::new("Ann", "ann.page", "FROZEN"))
        .await
        .unwrap();
    wait_until(portal.live_status().observe(), |s: &LiveStatus| s.total_pioneers == 1).await;

    // Capacity 1 is now allowed, 0 is not
    assert!(gateway.update_capacity("0").await.is_err());
    gateway.update_capacity("1").await.unwrap();
    let live = wait_until(portal.live_status().observe(), |s: &LiveStatus| s.total_capacity == 1).await;
    assert_eq!(live.available(), 0);

    portal.close().await;
}

#[tokio::test]
async fn test_display_order_of_appended_entities() {
    let store = MemoryStore::new();
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();
    let gateway = portal.gateway();

    for name in ["First", "Second", "Third"] {
        gateway
            .add_pioneer(&PioneerInput::new(name, format!("{name}.page"), "PIONEER"))
            .await
            .unwrap();
        gateway
            .add_roadmap_item(&RoadmapInput::new(name, "step", "engine"))
            .await
            .unwrap();
    }

    let pioneers = wait_until(portal.pioneers().observe(), |l: &Vec<Pioneer>| l.len() == 3).await;
    let names: Vec<&str> = pioneers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Third", "Second", "First"]);

    let roadmap = wait_until(portal.roadmap().observe(), |l| l.len() == 3).await;
    let titles: Vec<&str> = roadmap.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);

    portal.close().await;
}

#[tokio::test]
async fn test_stale_id_update_creates_entry() {
    let store = MemoryStore::new();
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();

    portal
        .gateway()
        .update_pioneer("gone", &PioneerInput::new("Ghost", "ghost.page", "PIONEER"))
        .await
        .unwrap();
    let list = wait_until(portal.pioneers().observe(), |l: &Vec<Pioneer>| !l.is_empty()).await;
    assert_eq!(ids(&list), vec!["gone"]);

    portal.close().await;
}

#[tokio::test]
async fn test_edit_modal_closes_only_after_success() {
    let store = scenario_a_store();
    store.reject_writes_under(paths::pioneers());
    let mut portal = open(&store).await;
    let list = portal.pioneers().wait_ready().await.unwrap();

    let mut view = ViewState::<Pioneer>::new();
    view.open_edit(&list[1]);
    view.form_mut().status = "FROZEN".into();
    let submission = view.submission().unwrap();

    let result = portal.gateway().submit_pioneer(&submission).await;
    assert!(matches!(result, Err(SdkError::Store(_))));
    view.finish(&result);
    assert_eq!(view.modal(), &Modal::Edit { id: "p1".into() });

    portal.close().await;
}

#[tokio::test]
async fn test_open_requires_signed_in_user() {
    let session = Session::start(Arc::new(MemoryAuth::new()));
    let result = Portal::open(&session, Arc::new(MemoryStore::new()), &PortalConfig::default()).await;
    assert!(matches!(result, Err(SdkError::Unauthenticated)));
}

#[tokio::test]
async fn test_close_is_idempotent_and_releases_subscriptions() {
    let store = MemoryStore::new();
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();
    assert_eq!(store.active_subscriptions(), 4);

    portal.close().await;
    portal.close().await;
    assert!(portal.is_closed());
    assert_eq!(store.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_double_unsubscribe_is_silent() {
    let store = MemoryStore::new();
    let mut subscription = store.subscribe(&paths::pioneers()).await.unwrap();
    assert!(matches!(subscription.next_event().await, Some(StoreEvent::Snapshot(_))));

    subscription.unsubscribe();
    subscription.unsubscribe();
    store
        .append(&paths::pioneers(), json!({"name": "Ann", "page": "ann.page", "status": "PIONEER"}))
        .await
        .unwrap();
    assert!(subscription.next_event().await.is_none());
    assert_eq!(store.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_revoked_access_fails_synchronizer() {
    let store = scenario_a_store();
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();

    store.fail_subscriptions_under(
        &StorePath::root(),
        pioneer_store::SubscriptionFault::PermissionDenied,
    );
    let mut rx = portal.roadmap().observe();
    let err = loop {
        if let Some(err) = rx.borrow_and_update().error().cloned() {
            break err;
        }
        rx.changed().await.unwrap();
    };
    assert_eq!(err.kind, SyncErrorKind::PermissionDenied);

    portal.close().await;
}

#[tokio::test]
async fn test_one_shot_write_publishes_count_before_close() {
    let store = scenario_a_store();
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();
    let gateway = portal.gateway().clone();

    let key = gateway
        .add_pioneer(&PioneerInput::new("Cy", "cy.page", "PARTNER"))
        .await
        .unwrap();
    let count = portal
        .settle_pioneers(|list| list.iter().any(|p| p.id == key))
        .await
        .unwrap();
    assert_eq!(count, 2);

    gateway
        .update_pioneer("p1", &PioneerInput::new("Ann", "ann.page", "FROZEN"))
        .await
        .unwrap();
    let count = portal
        .settle_pioneers(|list| {
            list.iter()
                .any(|p| p.id == "p1" && p.status == PioneerStatus::Frozen)
        })
        .await
        .unwrap();
    assert_eq!(count, 1);

    gateway.remove_pioneer(&key, &|_: &str| true).await.unwrap();
    let count = portal
        .settle_pioneers(|list| !list.iter().any(|p| p.id == key))
        .await
        .unwrap();
    assert_eq!(count, 0);

    portal.close().await;
    assert_eq!(store.value_at(&paths::total_pioneers()), Some(json!(0)));
}

#[tokio::test(start_paused = true)]
async fn test_settle_times_out_when_count_cannot_be_written() {
    let store = scenario_a_store();
    store.reject_writes_under(paths::live_status());
    let mut portal = open(&store).await;
    portal.pioneers().wait_ready().await.unwrap();

    let err = portal.settle_pioneers(|_| true).await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::Sync(ref e) if e.kind == SyncErrorKind::Timeout && e.path == "liveStatus/totalPioneers"
    ));

    portal.close().await;
}
