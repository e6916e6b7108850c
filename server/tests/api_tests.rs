use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use upfesto_server::auth::issue_token;
use upfesto_server::config::Config;
use upfesto_server::mail::RecordingMailer;
use upfesto_server::revalidate::RecordingRevalidator;
use upfesto_server::routes::create_routes;
use upfesto_server::state::AppState;
use upfesto_server::store::MemoryStore;
use upfesto_server::webhook::{
    WebhookSecret, ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, TIMESTAMP_TOLERANCE_SECS,
};

const WEBHOOK_SECRET: &str = "whsec_dXBmZXN0by10ZXN0LXNlY3JldA==";

struct TestApp {
    router: Router,
    mailer: Arc<RecordingMailer>,
    revalidator: Arc<RecordingRevalidator>,
    jwt_secret: String,
}

impl TestApp {
    fn new() -> Self {
        let config = Config {
            identity_webhook_secret: Some(WebhookSecret::parse(WEBHOOK_SECRET).unwrap()),
            ..Config::default()
        };
        let jwt_secret = config.auth_jwt_secret.clone();
        let mailer = Arc::new(RecordingMailer::new());
        let revalidator = Arc::new(RecordingRevalidator::new());
        let state = AppState::new(
            MemoryStore::new(),
            mailer.clone(),
            revalidator.clone(),
            config,
        );
        Self {
            router: create_routes(state),
            mailer,
            revalidator,
            jwt_secret,
        }
    }

    fn token(&self, user_id: &str) -> String {
        issue_token(user_id, &self.jwt_secret, Duration::hours(1)).unwrap()
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send(&self.router, request).await
    }

    async fn sync_user(&self, id: &str) {
        let payload = json!({
            "type": "user.created",
            "data": {
                "id": id,
                "first_name": id,
                "last_name": "Tester",
                "email_addresses": [{ "email_address": format!("{id}@example.com") }]
            }
        })
        .to_string();
        let request = webhook_request(&payload, Utc::now().timestamp(), None);
        let (status, _) = send(&self.router, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn create_event(&self, host: &str) -> String {
        let (status, body) = self
            .request(Method::POST, "/api/events", Some(host), Some(event_form("Prague", "2030-06-01", "18:00")))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// A delivery signed at `sent_at`; `signed_body` lets the signature cover
/// different bytes than the ones sent.
fn webhook_request(body: &str, sent_at: i64, signed_body: Option<&str>) -> Request<Body> {
    let secret = WebhookSecret::parse(WEBHOOK_SECRET).unwrap();
    let signature = secret
        .sign("msg_1", sent_at, signed_body.unwrap_or(body).as_bytes())
        .unwrap();
    Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/identity")
        .header(header::CONTENT_TYPE, "application/json")
        .header(ID_HEADER, "msg_1")
        .header(TIMESTAMP_HEADER, sent_at.to_string())
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn event_form(location: &str, date: &str, time: &str) -> Value {
    json!({
        "title": "Summer Party",
        "description": "Bring friends",
        "location_address": location,
        "date_from": date,
        "time_from": time
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_host_attends_new_event() {
    let app = TestApp::new();
    app.sync_user("host").await;
    let event_id = app.create_event("host").await;

    let (status, body) = app
        .request(Method::GET, &format!("/api/events/{event_id}"), Some("host"), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["attendance"][0]["user_id"], "host");
    assert_eq!(body["data"]["attendance"][0]["response"], "YES");
    assert_eq!(body["data"]["viewer"]["is_host"], true);
    assert_eq!(body["data"]["host"].get("email"), None);
}

#[tokio::test]
async fn test_attendance_round_trip() {
    let app = TestApp::new();
    app.sync_user("host").await;
    app.sync_user("guest").await;
    let event_id = app.create_event("host").await;
    let uri = format!("/api/events/{event_id}/attendance");

    let (status, body) = app
        .request(Method::PUT, &uri, Some("guest"), Some(json!({ "response": "MAYBE" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["response"], "MAYBE");

    let (_, body) = app
        .request(Method::PUT, &uri, Some("guest"), Some(json!({ "response": "YES" })))
        .await;
    assert_eq!(body["data"]["response"], "YES");

    let (status, body) = app
        .request(Method::PUT, &uri, Some("guest"), Some(json!({ "response": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], Value::Null);

    let (_, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_location_change_notifies_subscribers() {
    let app = TestApp::new();
    app.sync_user("host").await;
    app.sync_user("guest").await;
    let event_id = app.create_event("host").await;

    let (_, body) = app
        .request(
            Method::POST,
            &format!("/api/events/{event_id}/subscription"),
            Some("guest"),
            None,
        )
        .await;
    assert_eq!(body["data"]["subscribed"], true);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/events/{event_id}"),
            Some("host"),
            Some(event_form("Brno", "2030-06-01", "18:00")),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let announcement = &body["data"]["announcement"];
    assert_eq!(announcement["post"]["post_type"], "AUTO");
    assert_eq!(announcement["post"]["message"], "Location was changed to Brno");
    assert_eq!(announcement["notification"]["status"], "sent");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Important changes in Summer Party");
    assert_eq!(sent[0].bcc, vec!["guest@example.com".to_string()]);
    assert_ne!(sent[0].to, "guest@example.com");
    assert!(app
        .revalidator
        .paths()
        .contains(&format!("/event/{event_id}")));
}

#[tokio::test]
async fn test_guest_cannot_post() {
    let app = TestApp::new();
    app.sync_user("host").await;
    app.sync_user("guest").await;
    let event_id = app.create_event("host").await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/events/{event_id}/posts"),
            Some("guest"),
            Some(json!({ "message": "Hello" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_anonymous_create_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/events",
            None,
            Some(event_form("Prague", "2030-06-01", "18:00")),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_bad_time_is_a_validation_error() {
    let app = TestApp::new();
    app.sync_user("host").await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/events",
            Some("host"),
            Some(event_form("Prague", "2030-06-01", "6pm")),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Time must be in format HH:MM");
}

#[tokio::test]
async fn test_malformed_id_uses_error_envelope() {
    let app = TestApp::new();
    let (status, body) = app
        .request(Method::GET, "/api/events/not-a-uuid", None, None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::GET,
            "/api/events/00000000-0000-0000-0000-000000000000",
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_webhook_requires_signature() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/identity")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"type":"user.deleted","data":{"id":"x"}}"#))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_webhook_rejects_tampered_body() {
    let app = TestApp::new();
    app.sync_user("host").await;

    let signed = r#"{"type":"user.deleted","data":{"id":"someone-else"}}"#;
    let sent = r#"{"type":"user.deleted","data":{"id":"host"}}"#;
    let request = webhook_request(sent, Utc::now().timestamp(), Some(signed));

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.request(Method::GET, "/api/users/host", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_rejects_replayed_delivery() {
    let app = TestApp::new();
    let sent_at = Utc::now().timestamp() - TIMESTAMP_TOLERANCE_SECS - 60;
    let request = webhook_request(
        r#"{"type":"user.deleted","data":{"id":"x"}}"#,
        sent_at,
        None,
    );

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_body_without_json_content_type_is_415() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/events")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", app.token("host")),
        )
        .body(Body::from(event_form("Prague", "2030-06-01", "18:00").to_string()))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let app = TestApp::new();
    let message = "x".repeat(3 * 1024 * 1024);
    let (status, body) = app
        .request(
            Method::POST,
            "/api/events",
            Some("host"),
            Some(json!({ "title": message })),
        )
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}
