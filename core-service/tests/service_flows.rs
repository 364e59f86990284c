//! End-to-end flows through `CoreService` against a local mock server.

use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};
use bridge_traits::http::RetryPolicy;
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::{Clock, FixedClock};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use core_auth::{AuthError, AuthSession, TokenStore, User, SESSION_STORAGE_KEY};
use core_network::decode_payload;
use core_runtime::config::{AppMetadata, CoreConfig};
use core_runtime::events::{AuthEvent, CoreEvent};
use core_service::{CoreError, CoreService, DocumentFile, DocumentUploadResponse};
use futures::StreamExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    settings: Arc<SqliteSettingsStore>,
    clock: Arc<FixedClock>,
}

impl Harness {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            settings: Arc::new(SqliteSettingsStore::in_memory().await.unwrap()),
            clock: Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            )),
        }
    }

    async fn core(&self) -> CoreService {
        let config = CoreConfig::builder()
            .base_url(format!("{}/api/", self.server.uri()))
            .app_metadata(AppMetadata::new("3.0.0", "test", "en_US"))
            .http_client(Arc::new(ReqwestHttpClient::new().unwrap()))
            .settings_store(self.settings.clone())
            .clock(self.clock.clone())
            .retry_policy(RetryPolicy::new(2, Duration::from_millis(1)))
            .build()
            .unwrap();
        CoreService::bootstrap(config).await.unwrap()
    }
}

fn member() -> User {
    User {
        id: "u-1".to_string(),
        name: "Sokha".to_string(),
        email: "sokha@example.com".to_string(),
        token: "acc-0".to_string(),
        phone: Some("012345678".to_string()),
        refresh_token: Some("ref-0".to_string()),
    }
}

#[tokio::test]
async fn verify_otp_starts_a_one_hour_session() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/otp/verify"))
        .and(body_partial_json(json!({
            "base": {"appVersion": "3.0.0", "platform": "test", "locale": "en_US"},
            "payload": {"token_verify": "123456"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": {
                "user": {"id": "u-1", "name": "Sokha", "email": "sokha@example.com", "token": "acc-1"},
                "accessToken": "acc-1",
                "refreshToken": "ref-1"
            }
        })))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/gyms"))
        .and(header("Authorization", "Basic acc-1"))
        .and(header("Accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "g1", "name": "Gym A"}])),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    let core = harness.core().await;
    let mut events = core.subscribe_events();

    let response = core.auth().verify_otp("123456").await.unwrap();
    assert_eq!(response.access_token, "acc-1");

    let session = core.session().current_session().unwrap();
    assert_eq!(
        session.expires_at,
        harness.clock.now() + ChronoDuration::hours(1)
    );
    assert!(harness
        .settings
        .get_string(SESSION_STORAGE_KEY)
        .await
        .unwrap()
        .is_some());
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Auth(AuthEvent::SignedIn {
            user_id: "u-1".to_string()
        })
    );

    let gyms = core.gyms().fetch_gyms().await.unwrap();
    assert_eq!(gyms.len(), 1);
    assert_eq!(gyms[0].name, "Gym A");
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("Authorization", "Basic acc-0"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&harness.server)
        .await;

    let core = harness.core().await;
    core.session()
        .save_session(AuthSession::starting_at(
            member(),
            "acc-0",
            "ref-0",
            harness.clock.now(),
        ))
        .await;

    let err = core.auth().logout().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(!core.session().is_authenticated());
    assert_eq!(core.token_store().access_token().await, None);
    assert_eq!(core.token_store().refresh_token().await, None);
    assert_eq!(
        harness.settings.get_string(SESSION_STORAGE_KEY).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn refresh_requires_a_session() {
    let harness = Harness::new().await;
    let core = harness.core().await;

    let err = core.auth().refresh_session().await.unwrap_err();

    assert!(matches!(err, CoreError::Auth(AuthError::NotAuthenticated)));
}

#[tokio::test]
async fn refresh_swaps_access_token_and_extends_expiry() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(header("Authorization", "Basic acc-0"))
        .and(body_partial_json(json!({"payload": {"refreshToken": "ref-0"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"accessToken": "acc-2"}})),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    let core = harness.core().await;
    let start = harness.clock.now();
    core.session()
        .save_session(AuthSession::starting_at(member(), "acc-0", "ref-0", start))
        .await;

    let later = start + ChronoDuration::minutes(50);
    harness.clock.set(later);
    let refreshed = core.auth().refresh_session().await.unwrap();

    assert_eq!(refreshed.access_token, "acc-2");
    assert_eq!(refreshed.refresh_token, "ref-0");
    assert_eq!(refreshed.expires_at, later + ChronoDuration::hours(1));
    assert_eq!(
        core.token_store().access_token().await.as_deref(),
        Some("acc-2")
    );
}

#[tokio::test]
async fn expired_record_is_discarded_at_startup() {
    let harness = Harness::new().await;
    let yesterday = harness.clock.now() - ChronoDuration::days(1);
    let stale = AuthSession::starting_at(member(), "acc-0", "ref-0", yesterday);
    harness
        .settings
        .set_string(SESSION_STORAGE_KEY, &stale.to_record().unwrap())
        .await
        .unwrap();

    let core = harness.core().await;

    assert!(!core.session().is_authenticated());
    assert_eq!(core.token_store().access_token().await, None);
    assert_eq!(
        harness.settings.get_string(SESSION_STORAGE_KEY).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn restored_session_authorizes_requests() {
    let harness = Harness::new().await;
    let fresh = AuthSession::starting_at(
        member(),
        "acc-9",
        "ref-9",
        harness.clock.now() - ChronoDuration::minutes(10),
    );
    harness
        .settings
        .set_string(SESSION_STORAGE_KEY, &fresh.to_record().unwrap())
        .await
        .unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v1/subscriptions"))
        .and(header("Authorization", "Basic acc-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": [{"id": "s1", "name": "Monthly"}]
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let core = harness.core().await;

    assert!(core.session().is_authenticated());
    let subscriptions = core.subscriptions().fetch_subscriptions().await.unwrap();
    assert_eq!(subscriptions[0].name, "Monthly");
}

#[tokio::test]
async fn check_in_error_carries_server_message() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/api/checkin"))
        .and(body_partial_json(json!({"payload": {"qrCode": "QR-404"}})))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": 404, "message": "Unknown venue code"})),
        )
        .mount(&harness.server)
        .await;

    let core = harness.core().await;
    let err = core.check_in().check_in("QR-404").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Unknown venue code");
}

#[tokio::test]
async fn multi_file_upload_sends_array_parts() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/dms/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "doc-7", "url": "https://cdn.example.com/doc-7"}
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let core = harness.core().await;
    let mut meta = BTreeMap::new();
    meta.insert("kind".to_string(), "id-card".to_string());

    let response = core
        .documents()
        .upload_many(
            vec![
                DocumentFile::new("front.jpg", "image/jpeg", vec![0xFF, 0xD8]),
                DocumentFile::new("back.jpg", "image/jpeg", vec![0xFF, 0xD9]),
            ],
            meta,
        )
        .await
        .unwrap();

    assert_eq!(response.id, "doc-7");
    let requests = harness.server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert_eq!(body.matches("name=\"files[]\"").count(), 2);
    assert!(body.contains("filename=\"back.jpg\""));
    assert!(body.contains("name=\"kind\"\r\n\r\nid-card\r\n"));
}

#[tokio::test]
async fn upload_with_progress_retries_server_errors() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/dms/upload"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/dms/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "doc-8"}})),
        )
        .mount(&harness.server)
        .await;

    let core = harness.core().await;
    let events: Vec<_> = core
        .documents()
        .upload_with_progress(
            DocumentFile::new("scan.pdf", "application/pdf", vec![b'%'; 50_000]),
            BTreeMap::new(),
        )
        .collect()
        .await;

    let last = events.last().unwrap().as_ref().unwrap();
    assert_eq!(last.fraction, 1.0);
    let stored: DocumentUploadResponse =
        decode_payload(last.response.as_ref().unwrap()).unwrap();
    assert_eq!(stored.id, "doc-8");
    assert_eq!(stored.url, None);
    assert_eq!(harness.server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn download_lands_at_destination() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/files/receipt.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("paid in full"))
        .mount(&harness.server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("receipt.txt");
    let core = harness.core().await;

    let last = core
        .downloads()
        .download(
            Url::parse(&format!("{}/files/receipt.txt", harness.server.uri())).unwrap(),
            Some(destination.clone()),
        )
        .collect::<Vec<_>>()
        .await
        .pop()
        .unwrap()
        .unwrap();

    assert_eq!(last.file.as_deref(), Some(destination.as_path()));
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "paid in full");
}
