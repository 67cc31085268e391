use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use helix_client::webhook::events::RevocationReason;
use helix_client::webhook::message::{MESSAGE_ID, MESSAGE_SIGNATURE, MESSAGE_TIMESTAMP, MESSAGE_TYPE};
use helix_client::webhook::{sign_message, DispatchEvent, Event, WebhookAdapter, WebhookConfig};
use helix_client::{json, Config, HttpClient, OAuth, Scopes, Time};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "this-is-a-test-secret";

fn adapter_with(config: WebhookConfig, oauth: Option<OAuth>) -> (Router, UnboundedReceiver<DispatchEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let adapter = WebhookAdapter::new(config, Arc::new(tx), oauth).expect("invalid adapter config");
    (adapter.router(), rx)
}

fn adapter() -> (Router, UnboundedReceiver<DispatchEvent>) {
    adapter_with(WebhookConfig::default().with_eventsub_secret(SECRET), None)
}

fn subscription(kind: &str, status: &str) -> Value {
    json!({
        "id": "f1c2a387-161a-49f9-a165-0f21d7a4e1c4",
        "status": status,
        "type": kind,
        "version": "1",
        "cost": 1,
        "condition": {"broadcaster_user_id": "12826"},
        "transport": {"method": "webhook", "callback": "https://example.com/callback"},
        "created_at": "2019-11-16T10:11:12.634234626Z"
    })
}

fn follow_notification() -> Value {
    json!({
        "subscription": subscription("channel.follow", "enabled"),
        "event": {
            "user_id": "1234",
            "user_login": "cool_user",
            "user_name": "Cool_User",
            "broadcaster_user_id": "1337",
            "broadcaster_user_login": "cooler_user",
            "broadcaster_user_name": "Cooler_User",
            "followed_at": "2020-07-15T18:16:11.17106713Z"
        }
    })
}

/// Build a correctly signed EventSub request sent `age` ago
fn signed_request(kind: &str, id: &str, age: Duration, body: &Value) -> Request<Body> {
    let body = serde_json::to_vec(body).unwrap();
    let timestamp = Time(Utc::now() - age).to_rfc3339();
    let signature = sign_message(SECRET, id, &timestamp, &body).unwrap();

    Request::builder()
        .method("POST")
        .uri("/callback")
        .header(MESSAGE_TYPE, kind)
        .header(MESSAGE_ID, id)
        .header(MESSAGE_TIMESTAMP, timestamp)
        .header(MESSAGE_SIGNATURE, signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

/// Log sink shared between a scoped subscriber and the test body
#[derive(Clone, Default)]
struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_verification_challenge_is_echoed() {
    let (router, _rx) = adapter();
    let request = signed_request(
        "webhook_callback_verification",
        "challenge-1",
        Duration::zero(),
        &json!({"challenge": "abc123", "subscription": subscription("channel.follow", "webhook_callback_verification_pending")}),
    );

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_text(response).await, "abc123");
}

#[tokio::test]
async fn test_notification_is_dispatched() {
    let (router, mut rx) = adapter();
    let response = send(&router, signed_request("notification", "n-1", Duration::zero(), &follow_notification())).await;
    assert_eq!(response.status(), StatusCode::OK);

    match rx.try_recv().expect("nothing was dispatched") {
        DispatchEvent::Notification { name, subscription, event } => {
            assert_eq!(name, "channel_follow");
            assert_eq!(subscription.kind, "channel.follow");
            assert!(matches!(event, Event::ChannelFollow(ref f) if f.user_login == "cool_user"));
        }
        other => panic!("unexpected dispatch {:?}", other),
    }
}

#[tokio::test]
async fn test_replayed_message_is_rejected() {
    let (router, mut rx) = adapter();

    let first = send(&router, signed_request("notification", "dup", Duration::zero(), &follow_notification())).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = send(&router, signed_request("notification", "dup", Duration::zero(), &follow_notification())).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(second).await.contains("Previously responded"));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err(), "replayed message must not be dispatched");
}

#[tokio::test]
async fn test_message_freshness() {
    let (router, _rx) = adapter();

    let stale = send(&router, signed_request("notification", "old", Duration::minutes(11), &follow_notification())).await;
    assert_eq!(stale.status(), StatusCode::BAD_REQUEST);

    let fresh = send(&router, signed_request("notification", "recent", Duration::minutes(9), &follow_notification())).await;
    assert_eq!(fresh.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_event_is_acknowledged() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    // the current-thread test runtime polls the handler on this thread
    let _guard = tracing::subscriber::set_default(subscriber);

    let (router, mut rx) = adapter();
    let body = json!({
        "subscription": subscription("channel.something_new", "enabled"),
        "event": {"broadcaster_user_id": "1"}
    });

    let response = send(&router, signed_request("notification", "u-1", Duration::zero(), &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(rx.try_recv().is_err());

    let output = logs.contents();
    let line = output
        .lines()
        .find(|line| line.contains("received an unhandled eventsub event"))
        .unwrap_or_else(|| panic!("no warning logged, got {:?}", output));
    assert!(line.contains("WARN"));
    assert!(line.contains("channel.something_new"));
}

#[tokio::test]
async fn test_unknown_event_with_sparse_subscription() {
    let (router, mut rx) = adapter();
    let body = json!({
        "subscription": {"type": "channel.something_new"},
        "event": {}
    });

    let response = send(&router, signed_request("notification", "u-2", Duration::zero(), &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_revocation() {
    let (router, mut rx) = adapter();
    let body = json!({"subscription": subscription("channel.follow", "authorization_revoked")});

    let response = send(&router, signed_request("revocation", "r-1", Duration::zero(), &body)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    match rx.try_recv().expect("nothing was dispatched") {
        DispatchEvent::SubscriptionRevoked(revoked) => {
            assert_eq!(revoked.reason, RevocationReason::AuthorizationRevoked);
        }
        other => panic!("unexpected dispatch {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_signature() {
    let (router, mut rx) = adapter();
    let mut request = signed_request("notification", "s-1", Duration::zero(), &follow_notification());
    request
        .headers_mut()
        .insert(MESSAGE_SIGNATURE, "sha256=deadbeef".parse().unwrap());

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_tampered_body() {
    let (router, _rx) = adapter();
    let request = signed_request("notification", "t-1", Duration::zero(), &follow_notification());
    let (parts, _) = request.into_parts();
    let request = Request::from_parts(parts, Body::from(r#"{"subscription":{}}"#));

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_secret() {
    let (router, _rx) = adapter_with(WebhookConfig::default(), None);
    let response = send(&router, signed_request("notification", "m-1", Duration::zero(), &follow_notification())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_headers_and_unknown_type() {
    let (router, _rx) = adapter();

    let mut request = signed_request("notification", "h-1", Duration::zero(), &follow_notification());
    request.headers_mut().remove(MESSAGE_ID);
    assert_eq!(send(&router, request).await.status(), StatusCode::BAD_REQUEST);

    let mut request = signed_request("notification", "h-2", Duration::zero(), &follow_notification());
    request.headers_mut().remove(MESSAGE_TIMESTAMP);
    assert_eq!(send(&router, request).await.status(), StatusCode::BAD_REQUEST);

    let request = signed_request("something_else", "h-3", Duration::zero(), &follow_notification());
    assert_eq!(send(&router, request).await.status(), StatusCode::BAD_REQUEST);
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn oauth(server: Option<&MockServer>) -> OAuth {
    let mut config = Config::new("cid").with_client_secret("csecret");
    if let Some(server) = server {
        config = config.with_base_urls(server.uri(), server.uri());
    }
    OAuth::new(HttpClient::new(config))
}

#[tokio::test]
async fn test_oauth_redirect() {
    let (router, _rx) = adapter_with(
        WebhookConfig::default().with_domain("example.com"),
        Some(oauth(None)),
    );

    let response = send(&router, get("/oauth?scopes=chat:read+user:read:email&force_verify=true")).await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://id.twitch.tv/oauth2/authorize?client_id=cid"));
    assert!(location.contains("redirect_uri=https%3A%2F%2Fexample.com%2Foauth%2Fcallback"));
    assert!(location.contains("scope=chat%3Aread+user%3Aread%3Aemail"));
    assert!(location.contains("force_verify=true"));
}

#[tokio::test]
async fn test_oauth_redirect_default_scopes() {
    let helper = oauth(None).with_default_scopes(Scopes::parse("chat:read"));
    let (router, _rx) = adapter_with(WebhookConfig::default(), Some(helper));

    let response = send(&router, get("/oauth")).await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
}

#[tokio::test]
async fn test_oauth_redirect_errors() {
    let (router, _rx) = adapter_with(WebhookConfig::default(), Some(oauth(None)));
    assert_eq!(send(&router, get("/oauth")).await.status(), StatusCode::BAD_REQUEST);

    let (router, _rx) = adapter_with(WebhookConfig::default(), None);
    assert_eq!(send(&router, get("/oauth")).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        send(&router, get("/oauth?scopes=chat:read")).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_oauth_callback_exchanges_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(query_param("code", "the-code"))
        .and(query_param("grant_type", "authorization_code"))
        .and(query_param("redirect_uri", "http://localhost:4343/oauth/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "refresh_token": "refresh",
            "expires_in": 14124,
            "scope": ["chat:read"],
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (router, mut rx) = adapter_with(WebhookConfig::default(), Some(oauth(Some(&server))));

    let response = send(&router, get("/oauth/callback?code=the-code")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Success. You can leave this page.");

    match rx.try_recv().expect("nothing was dispatched") {
        DispatchEvent::OAuthAuthorized(token) => {
            assert_eq!(token.access_token, "user-token");
            assert_eq!(token.scope, ["chat:read"]);
        }
        other => panic!("unexpected dispatch {:?}", other),
    }
}

#[tokio::test]
async fn test_oauth_callback_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"status":400,"message":"Invalid authorization code"}"#))
        .mount(&server)
        .await;

    let (router, mut rx) = adapter_with(WebhookConfig::default(), Some(oauth(Some(&server))));
    assert_eq!(send(&router, get("/oauth/callback")).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        send(&router, get("/oauth/callback?code=bad")).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert!(rx.try_recv().is_err());

    let (router, _rx) = adapter_with(WebhookConfig::default(), None);
    assert_eq!(
        send(&router, get("/oauth/callback?code=x")).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_run_and_close() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = WebhookConfig::new("127.0.0.1", 0).with_eventsub_secret(SECRET);
    let adapter = WebhookAdapter::new(config, Arc::new(tx), None).unwrap();

    let addr = adapter.run().await.expect("failed to bind");
    assert!(adapter.is_running());

    let body = serde_json::to_vec(&follow_notification()).unwrap();
    let timestamp = Time(Utc::now()).to_rfc3339();
    let signature = sign_message(SECRET, "live-1", &timestamp, &body).unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{}/callback", addr))
        .header(MESSAGE_TYPE, "notification")
        .header(MESSAGE_ID, "live-1")
        .header(MESSAGE_TIMESTAMP, timestamp)
        .header(MESSAGE_SIGNATURE, signature)
        .body(body)
        .send()
        .await
        .expect("request to running adapter failed");
    assert_eq!(response.status().as_u16(), 200);
    assert!(rx.recv().await.is_some());

    adapter.close().await;
    assert!(!adapter.is_running());
    // closing twice is a no-op
    adapter.close().await;
}
