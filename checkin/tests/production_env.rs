//! Production environment against a mock ticketing server.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vybeme_api::TicketingClient;
use vybeme_checkin::types::GENERIC_REJECTION;
use vybeme_checkin::{
    CameraPermission, CheckInAction, CheckInEnvironment, CheckInReducer, CheckInState,
    EventContext, Notice, OperatorSession, ProductionCheckInEnvironment, ScanStatus, ScanVerdict,
};
use vybeme_core::environment::SystemClock;
use vybeme_runtime::Store;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type ProductionStore = Store<
    CheckInState,
    CheckInAction,
    ProductionCheckInEnvironment,
    CheckInReducer<ProductionCheckInEnvironment>,
>;

fn environment(server: &MockServer, session: OperatorSession) -> ProductionCheckInEnvironment {
    ProductionCheckInEnvironment::new(
        TicketingClient::new(format!("{}/api", server.uri())),
        session,
        Arc::new(SystemClock),
    )
}

async fn mount_roster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/plans/evt_1/attendees"))
        .and(query_param("user_id", "op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "attendees": [],
                "statistics": { "total": 0, "checked_in": 0, "pending": 0 }
            }
        })))
        .mount(server)
        .await;
}

async fn until<F>(store: &ProductionStore, done: F)
where
    F: Fn(&CheckInState) -> bool + Copy,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !store.state(done).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn session_token_authenticates_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans/organizer/op-1"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "plan_id": "evt_1", "title": "Launch party", "type": "business" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let env = environment(&server, OperatorSession::new("op-1").with_access_token("secret"));
    let plans = env.list_organizer_plans().await.unwrap();

    assert_eq!(plans.len(), 1);
    assert!(!format!("{env:?}").contains("secret"));
}

#[tokio::test]
async fn session_without_token_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/plans/organizer/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let env = environment(&server, OperatorSession::new("op-1"));
    env.list_organizer_plans().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn proxy_error_page_is_shown_as_generic_rejection() {
    vybeme_testing::init_test_tracing();
    let server = MockServer::start().await;
    mount_roster(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/tickets/scan"))
        .respond_with(
            ResponseTemplate::new(502)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body><h1>502 Bad Gateway</h1>nginx</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store: ProductionStore = Store::new(
        CheckInState::default(),
        CheckInReducer::new(),
        environment(&server, OperatorSession::new("op-1")),
    );
    store
        .send(CheckInAction::Open {
            preselected: Some(EventContext::new("evt_1", "Launch party")),
        })
        .await
        .unwrap();
    until(&store, |s| s.camera == CameraPermission::Granted && !s.roster.loading).await;

    store
        .send(CheckInAction::CodeDecoded {
            payload: "ABC123".to_string(),
        })
        .await
        .unwrap();
    until(&store, |s| s.scan.status() == ScanStatus::Rejected).await;

    let (verdict, notice) = store
        .state(|s| (s.scan.verdict().cloned(), s.notice.clone()))
        .await;
    assert_eq!(
        verdict,
        Some(ScanVerdict::Rejected {
            reason: GENERIC_REJECTION.to_string()
        })
    );
    assert_eq!(
        notice,
        Some(Notice::ScanRejected {
            reason: GENERIC_REJECTION.to_string()
        })
    );
}
