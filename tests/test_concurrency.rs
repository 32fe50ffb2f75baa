mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use almoner::api::http::HttpResourceApi;
use almoner::capabilities::AutoConfirm;
use almoner::models::Event;
use almoner::{ControllerError, Phase, RecordId, Removal, ResourceController};

fn seed(env: &common::TestEnv) {
    env.seed(
        "events",
        vec![
            json!({"_id": "a", "title": "Autumn Fair", "category": "fundraiser", "date": "2024-10-05", "isActive": true}),
            json!({"_id": "b", "title": "Bake Sale", "category": "fundraiser", "date": "2024-11-02", "isActive": true}),
            json!({"_id": "c", "title": "Coat Drive", "category": "drive", "date": "2024-12-01", "isActive": true}),
        ],
    );
}

fn controller(env: &common::TestEnv, timeout_secs: u64) -> ResourceController<Event> {
    let mut config = env.config();
    config.request_timeout_secs = timeout_secs;
    let client = HttpResourceApi::build_client(&config).unwrap();
    ResourceController::from_config(&config, client, env.session()).unwrap()
}

fn ids(controller: &ResourceController<Event>) -> Vec<String> {
    controller
        .records()
        .iter()
        .map(|e| e.id.to_string())
        .collect()
}

#[tokio::test]
async fn toggle_and_remove_on_different_records_both_apply() {
    let env = common::TestEnv::start().await;
    seed(&env);
    let events = controller(&env, 5);
    events.load().await.unwrap();
    env.delay_responses(Duration::from_millis(50));

    let b = RecordId::from("b");
    let c = RecordId::from("c");
    let (toggled, removed) = tokio::join!(events.toggle_flag(&b), events.remove(&c, &AutoConfirm));

    assert!(!toggled.unwrap().is_active);
    assert_eq!(removed.unwrap(), Removal::Removed);
    assert_eq!(ids(&events), vec!["a", "b"]);
    assert!(events.records()[0].is_active);
    assert!(!events.records()[1].is_active);
}

#[tokio::test]
async fn second_mutation_on_pending_record_is_refused() {
    let env = common::TestEnv::start().await;
    seed(&env);
    let events = controller(&env, 5);
    events.load().await.unwrap();
    env.delay_responses(Duration::from_millis(200));

    let a = RecordId::from("a");
    let (first, second) = tokio::join!(events.toggle_flag(&a), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        events.toggle_flag(&a).await
    });

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), ControllerError::Busy("a".into()));
    let toggles = env
        .requests()
        .iter()
        .filter(|r| r.starts_with("PATCH"))
        .count();
    assert_eq!(toggles, 1);
}

#[tokio::test]
async fn slow_backend_surfaces_network_error() {
    let env = common::TestEnv::start().await;
    seed(&env);
    let events = controller(&env, 1);
    events.load().await.unwrap();
    env.delay_responses(Duration::from_secs(3));

    let err = events.load().await.unwrap_err();

    assert!(matches!(err, ControllerError::Network(_)), "got {err:?}");
    assert_eq!(events.phase(), Phase::Errored);
    assert_eq!(ids(&events), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn detached_controller_drops_late_response() {
    let env = common::TestEnv::start().await;
    seed(&env);
    let events = Arc::new(controller(&env, 5));
    events.load().await.unwrap();
    env.delay_responses(Duration::from_millis(200));

    let pending = {
        let events = events.clone();
        tokio::spawn(async move { events.remove(&RecordId::from("c"), &AutoConfirm).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    events.detach();

    let result = pending.await.unwrap();

    assert_eq!(result, Err(ControllerError::Detached));
    // The server processed the delete; the detached cache did not follow.
    assert_eq!(env.stored("events").len(), 2);
    assert_eq!(ids(&events), vec!["a", "b", "c"]);
}
