use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use tourdesk::config::AppConfig;
use tourdesk::db::{self, queries};
use tourdesk::models::{BookingStatus, Role};
use tourdesk::services::access::DenialLog;
use tourdesk::services::ai::{LlmProvider, Message};
use tourdesk::services::identity::{AuthSession, IdentityError, IdentityProvider, IdentityUser};
use tourdesk::services::payments::{CreatedIntent, GatewayError, PaymentGateway, ProcessorStatus};
use tourdesk::state::AppState;

const WEBHOOK_SECRET: &str = "whsec_integration";

// ── Mock Providers ──

#[derive(Default)]
struct GatewayLog {
    created: Vec<(i64, String, BTreeMap<String, String>)>,
    statuses: HashMap<String, ProcessorStatus>,
    status_calls: usize,
    /// Hand out this id for every intent instead of a fresh one.
    fixed_intent: Option<String>,
    unavailable: bool,
}

struct MockGateway {
    log: Arc<Mutex<GatewayLog>>,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<CreatedIntent, GatewayError> {
        let mut log = self.log.lock().unwrap();
        if log.unavailable {
            return Err(GatewayError::Unavailable("connection reset".to_string()));
        }
        let intent_id = log
            .fixed_intent
            .clone()
            .unwrap_or_else(|| format!("pi_test{}", log.created.len() + 1));
        log.created
            .push((amount_minor, currency.to_string(), metadata.clone()));
        log.statuses
            .entry(intent_id.clone())
            .or_insert(ProcessorStatus::RequiresPaymentMethod);
        Ok(CreatedIntent {
            client_secret: format!("{intent_id}_secret_abc"),
            intent_id,
        })
    }

    async fn get_intent_status(&self, intent_id: &str) -> Result<ProcessorStatus, GatewayError> {
        let mut log = self.log.lock().unwrap();
        log.status_calls += 1;
        if log.unavailable {
            return Err(GatewayError::Unavailable("connection reset".to_string()));
        }
        log.statuses
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::InvalidIntent(format!("no such payment_intent: {intent_id}")))
    }
}

#[derive(Default)]
struct IdentityBook {
    /// email -> (user id, password)
    accounts: HashMap<String, (String, String)>,
    tokens: HashMap<String, IdentityUser>,
}

struct MockIdentity {
    book: Arc<Mutex<IdentityBook>>,
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _full_name: Option<&str>,
    ) -> Result<IdentityUser, IdentityError> {
        let mut book = self.book.lock().unwrap();
        if book.accounts.contains_key(email) {
            return Err(IdentityError::Rejected("User already registered".to_string()));
        }
        let id = format!("user-{}", book.accounts.len() + 1);
        book.accounts
            .insert(email.to_string(), (id.clone(), password.to_string()));
        Ok(IdentityUser {
            id,
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let mut book = self.book.lock().unwrap();
        let (id, stored) = book
            .accounts
            .get(email)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected("Invalid login credentials".to_string()))?;
        if stored != password {
            return Err(IdentityError::Rejected("Invalid login credentials".to_string()));
        }
        let user = IdentityUser {
            id: id.clone(),
            email: email.to_string(),
        };
        let token = format!("token-{id}");
        book.tokens.insert(token.clone(), user.clone());
        Ok(AuthSession {
            access_token: token,
            expires_in: 3600,
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.book.lock().unwrap().tokens.remove(access_token);
        Ok(())
    }

    async fn user_for_token(&self, access_token: &str) -> Result<Option<IdentityUser>, IdentityError> {
        Ok(self.book.lock().unwrap().tokens.get(access_token).cloned())
    }
}

struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        if last.contains("explode") {
            anyhow::bail!("upstream timeout");
        }
        if system_prompt.contains("reply in French") {
            Ok("Les permis s'achètent auprès du RDB.".to_string())
        } else {
            Ok("Permits are sold by the Rwanda Development Board.".to_string())
        }
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        currency: "usd".to_string(),
        cors_origin: "*".to_string(),
        stripe_secret_key: "sk_test".to_string(),
        stripe_api_base: "http://localhost:12111".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        auth_url: "http://localhost:54321".to_string(),
        auth_api_key: "anon".to_string(),
        openai_api_key: "sk-test".to_string(),
        openai_api_base: "http://localhost:8080/v1".to_string(),
        openai_model: "test-model".to_string(),
        bootstrap_admin: None,
    }
}

struct Harness {
    state: Arc<AppState>,
    gateway: Arc<Mutex<GatewayLog>>,
    identity: Arc<Mutex<IdentityBook>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: AppConfig) -> Self {
        let conn = db::init_db(":memory:").unwrap();
        let gateway = Arc::new(Mutex::new(GatewayLog::default()));
        let identity = Arc::new(Mutex::new(IdentityBook::default()));
        let state = Arc::new(AppState {
            db: Arc::new(Mutex::new(conn)),
            config,
            payments: Box::new(MockGateway {
                log: Arc::clone(&gateway),
            }),
            identity: Box::new(MockIdentity {
                book: Arc::clone(&identity),
            }),
            llm: Box::new(MockLlm),
            denials: DenialLog::new(),
        });
        Self {
            state,
            gateway,
            identity,
        }
    }

    fn app(&self) -> Router {
        tourdesk::build_router(Arc::clone(&self.state))
    }

    /// Register a principal with a live token and a stored role.
    fn principal(&self, token: &str, user_id: &str, role: Role) {
        let email = format!("{user_id}@example.com");
        self.identity.lock().unwrap().tokens.insert(
            token.to_string(),
            IdentityUser {
                id: user_id.to_string(),
                email: email.clone(),
            },
        );
        let db = self.state.db().unwrap();
        queries::ensure_profile(&db, user_id, &email, None).unwrap();
        queries::set_role(&db, user_id, role).unwrap();
    }

    fn staff(&self) {
        self.principal("admin-token", "admin-1", Role::Admin);
        self.principal("manager-token", "manager-1", Role::Manager);
        self.principal("user-token", "user-1", Role::User);
    }

    fn set_processor_status(&self, intent_id: &str, status: ProcessorStatus) {
        self.gateway
            .lock()
            .unwrap()
            .statuses
            .insert(intent_id.to_string(), status);
    }

    fn booking_status(&self, booking_id: &str) -> BookingStatus {
        let db = self.state.db().unwrap();
        queries::get_booking_by_id(&db, booking_id)
            .unwrap()
            .expect("booking row")
            .status
    }

    fn booking_count(&self) -> usize {
        let db = self.state.db().unwrap();
        queries::list_bookings(&db, &queries::BookingFilter::default())
            .unwrap()
            .len()
    }

    fn intents_created(&self) -> usize {
        self.gateway.lock().unwrap().created.len()
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, json)
}

fn gorilla_booking() -> Value {
    json!({
        "serviceId": "gorilla-trekking",
        "serviceName": "Mountain Gorilla Trekking",
        "bookingDate": "2024-09-07",
        "guests": 2,
        "totalCost": 3000,
        "customerName": "Jane Doe",
        "customerEmail": "jane@example.com"
    })
}

async fn create_booking(h: &Harness, body: Value) -> (String, String) {
    let (status, json) = send(h.app(), request("POST", "/api/bookings", None, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    (
        json["bookingId"].as_str().unwrap().to_string(),
        json["paymentIntentId"].as_str().unwrap().to_string(),
    )
}

async fn confirm(h: &Harness, intent_id: &str) -> (StatusCode, Value) {
    send(
        h.app(),
        request(
            "POST",
            "/api/bookings/confirm",
            None,
            Some(json!({ "paymentIntentId": intent_id })),
        ),
    )
    .await
}

fn signed_webhook(payload: &Value) -> Request<Body> {
    let body = payload.to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{body}").as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Request::builder()
        .method("POST")
        .uri("/webhook/stripe")
        .header("content-type", "application/json")
        .header("stripe-signature", format!("t={timestamp},v1={signature}"))
        .body(Body::from(body))
        .unwrap()
}

fn intent_event(event_type: &str, intent_id: &str, status: &str) -> Value {
    json!({
        "id": "evt_1",
        "type": event_type,
        "data": { "object": { "id": intent_id, "object": "payment_intent", "status": status } }
    })
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let (status, body) = send(h.app(), request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ── Booking Orchestrator ──

#[tokio::test]
async fn test_happy_path_creates_pending_then_confirms() {
    let h = Harness::new();

    let (status, body) = send(h.app(), request("POST", "/api/bookings", None, Some(gorilla_booking()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["clientSecret"].as_str().unwrap().contains("_secret_"));
    let booking_id = body["bookingId"].as_str().unwrap().to_string();
    let intent_id = body["paymentIntentId"].as_str().unwrap().to_string();

    assert_eq!(h.booking_status(&booking_id), BookingStatus::Pending);
    {
        let log = h.gateway.lock().unwrap();
        let (amount, currency, metadata) = &log.created[0];
        assert_eq!(*amount, 300000);
        assert_eq!(currency, "usd");
        assert_eq!(metadata["service_id"], "gorilla-trekking");
        assert_eq!(metadata["customer_email"], "jane@example.com");
    }

    h.set_processor_status(&intent_id, ProcessorStatus::Succeeded);
    let (status, body) = confirm(&h, &intent_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(body["paymentStatus"], "succeeded");
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_confirm_is_idempotent() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;
    h.set_processor_status(&intent_id, ProcessorStatus::Succeeded);

    for _ in 0..3 {
        let (status, body) = confirm(&h, &intent_id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["booking"]["status"], "confirmed");
    }
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Confirmed);
    assert_eq!(h.intents_created(), 1);
    assert_eq!(h.booking_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_agree() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;
    h.set_processor_status(&intent_id, ProcessorStatus::Succeeded);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = h.app();
            let req = request(
                "POST",
                "/api/bookings/confirm",
                None,
                Some(json!({ "paymentIntentId": intent_id })),
            );
            tokio::spawn(send(app, req))
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["booking"]["status"], "confirmed");
    }
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Confirmed);
    assert_eq!(h.booking_count(), 1);
    assert_eq!(h.intents_created(), 1);
}

#[tokio::test]
async fn test_overflowing_total_is_invalid_request() {
    let h = Harness::new();
    let mut body = gorilla_booking();
    body["totalCost"] = json!("79228162514264337593543950335");

    let (status, json) = send(h.app(), request("POST", "/api/bookings", None, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("too large"));
    assert_eq!(h.intents_created(), 0);
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_amount_converted_to_minor_units_once() {
    let h = Harness::new();
    let mut body = gorilla_booking();
    body["totalCost"] = json!("125.00");
    let (_, intent_id) = create_booking(&h, body).await;

    h.set_processor_status(&intent_id, ProcessorStatus::Succeeded);
    let (_, confirmed) = confirm(&h, &intent_id).await;

    assert_eq!(h.gateway.lock().unwrap().created[0].0, 12500);
    assert_eq!(confirmed["booking"]["total_cost"], "125.00");
    assert_eq!(h.intents_created(), 1);
}

#[tokio::test]
async fn test_cancellation_scenario() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;
    h.set_processor_status(&intent_id, ProcessorStatus::Canceled);

    let (_, first) = confirm(&h, &intent_id).await;
    assert_eq!(first["booking"]["status"], "cancelled");
    let (_, second) = confirm(&h, &intent_id).await;
    assert_eq!(second["booking"]["status"], "cancelled");
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_unsettled_payment_leaves_booking_pending() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;
    h.set_processor_status(&intent_id, ProcessorStatus::Processing);

    let (status, body) = confirm(&h, &intent_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "processing");
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Pending);
}

#[tokio::test]
async fn test_missing_email_creates_nothing() {
    let h = Harness::new();
    let mut body = gorilla_booking();
    body.as_object_mut().unwrap().remove("customerEmail");

    let (status, json) = send(h.app(), request("POST", "/api/bookings", None, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("customerEmail"));
    assert_eq!(h.intents_created(), 0);
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_zero_total_never_reaches_gateway() {
    let h = Harness::new();
    let mut body = gorilla_booking();
    body["totalCost"] = json!(0);

    let (status, _) = send(h.app(), request("POST", "/api/bookings", None, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.intents_created(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_request() {
    let h = Harness::new();
    let req = Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(h.app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_gateway_outage_writes_no_booking() {
    let h = Harness::new();
    h.gateway.lock().unwrap().unavailable = true;

    let (status, body) = send(h.app(), request("POST", "/api/bookings", None, Some(gorilla_booking()))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_store_failure_after_intent_is_partial_failure() {
    let h = Harness::new();
    h.gateway.lock().unwrap().fixed_intent = Some("pi_duplicate".to_string());

    create_booking(&h, gorilla_booking()).await;
    let (status, body) = send(h.app(), request("POST", "/api/bookings", None, Some(gorilla_booking()))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("contact support"));
    assert!(!message.contains("pi_duplicate"));
    assert_eq!(h.intents_created(), 2);
    assert_eq!(h.booking_count(), 1);
}

#[tokio::test]
async fn test_confirm_unknown_intent_is_not_found() {
    let h = Harness::new();
    let (status, _) = confirm(&h, "pi_unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.gateway.lock().unwrap().status_calls, 0);
}

#[tokio::test]
async fn test_confirm_malformed_intent_is_rejected() {
    let h = Harness::new();
    let (status, _) = confirm(&h, "../v1/charges").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_confirm_gateway_outage_keeps_status() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;
    h.gateway.lock().unwrap().unavailable = true;

    let (status, _) = confirm(&h, &intent_id).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Pending);
}

#[tokio::test]
async fn test_signed_in_booking_records_user() {
    let h = Harness::new();
    h.staff();

    let (status, body) = send(
        h.app(),
        request("POST", "/api/bookings", Some("user-token"), Some(gorilla_booking())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let db = h.state.db().unwrap();
    let booking = queries::get_booking_by_id(&db, body["bookingId"].as_str().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(booking.user_id.as_deref(), Some("user-1"));
}

// ── Processor Webhook ──

#[tokio::test]
async fn test_webhook_confirms_booking() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;

    let event = intent_event("payment_intent.succeeded", &intent_id, "succeeded");
    let (status, body) = send(h.app(), signed_webhook(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Confirmed);

    // Redelivery changes nothing.
    let (status, _) = send(h.app(), signed_webhook(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_webhook_failed_payment_stays_pending() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;

    let event = intent_event("payment_intent.payment_failed", &intent_id, "requires_payment_method");
    let (status, _) = send(h.app(), signed_webhook(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Pending);
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let h = Harness::new();
    let (booking_id, intent_id) = create_booking(&h, gorilla_booking()).await;

    let event = intent_event("payment_intent.succeeded", &intent_id, "succeeded");
    let req = Request::builder()
        .method("POST")
        .uri("/webhook/stripe")
        .header("stripe-signature", format!("t={},v1=deadbeef", chrono::Utc::now().timestamp()))
        .body(Body::from(event.to_string()))
        .unwrap();

    let (status, _) = send(h.app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Pending);
}

#[tokio::test]
async fn test_webhook_unknown_intent_is_acknowledged() {
    let h = Harness::new();
    let event = intent_event("payment_intent.succeeded", "pi_elsewhere", "succeeded");
    let (status, _) = send(h.app(), signed_webhook(&event)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_disabled_without_secret() {
    let mut config = test_config();
    config.stripe_webhook_secret = String::new();
    let h = Harness::with_config(config);

    let event = intent_event("payment_intent.succeeded", "pi_test1", "succeeded");
    let (status, _) = send(h.app(), signed_webhook(&event)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ── Admin Visibility Gate ──

#[tokio::test]
async fn test_listing_requires_session() {
    let h = Harness::new();
    create_booking(&h, gorilla_booking()).await;

    let (status, body) = send(h.app(), request("GET", "/api/admin/bookings", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(h.app(), request("GET", "/api/admin/bookings", Some("expired"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_plain_user_cannot_list_bookings() {
    let h = Harness::new();
    h.staff();
    create_booking(&h, gorilla_booking()).await;

    let (status, body) = send(h.app(), request("GET", "/api/admin/bookings", Some("user-token"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(body.get("customer_email").is_none());
}

#[tokio::test]
async fn test_staff_can_list_bookings() {
    let h = Harness::new();
    h.staff();
    create_booking(&h, gorilla_booking()).await;

    for token in ["admin-token", "manager-token"] {
        let (status, body) = send(h.app(), request("GET", "/api/admin/bookings", Some(token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["service_name"], "Mountain Gorilla Trekking");
    }
}

#[tokio::test]
async fn test_profile_without_row_is_plain_user() {
    let h = Harness::new();
    h.identity.lock().unwrap().tokens.insert(
        "ghost-token".to_string(),
        IdentityUser {
            id: "ghost".to_string(),
            email: "ghost@example.com".to_string(),
        },
    );

    let (status, _) = send(h.app(), request("GET", "/api/admin/stats", Some("ghost-token"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_booking_filters() {
    let h = Harness::new();
    h.staff();
    let (_, paid_intent) = create_booking(&h, gorilla_booking()).await;
    let mut other = gorilla_booking();
    other["customerName"] = json!("Amani Uwase");
    other["customerEmail"] = json!("amani@example.com");
    other["serviceName"] = json!("Twin Lakes Boat Ride");
    create_booking(&h, other).await;

    h.set_processor_status(&paid_intent, ProcessorStatus::Succeeded);
    confirm(&h, &paid_intent).await;

    let (_, confirmed) = send(
        h.app(),
        request("GET", "/api/admin/bookings?status=confirmed", Some("manager-token"), None),
    )
    .await;
    assert_eq!(confirmed.as_array().unwrap().len(), 1);
    assert_eq!(confirmed[0]["customer_name"], "Jane Doe");

    let (_, searched) = send(
        h.app(),
        request("GET", "/api/admin/bookings?search=LAKES", Some("manager-token"), None),
    )
    .await;
    assert_eq!(searched.as_array().unwrap().len(), 1);
    assert_eq!(searched[0]["customer_email"], "amani@example.com");

    let (status, _) = send(
        h.app(),
        request("GET", "/api/admin/bookings?status=refunded", Some("manager-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_staff_status_change_is_audited() {
    let h = Harness::new();
    h.staff();
    let (booking_id, _) = create_booking(&h, gorilla_booking()).await;
    let uri = format!("/api/admin/bookings/{booking_id}/status");

    let (status, _) = send(
        h.app(),
        request("POST", &uri, Some("user-token"), Some(json!({"status": "confirmed"}))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.booking_status(&booking_id), BookingStatus::Pending);

    let (status, body) = send(
        h.app(),
        request("POST", &uri, Some("manager-token"), Some(json!({"status": "confirmed"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, audit) = send(h.app(), request("GET", "/api/admin/audit", Some("admin-token"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit[0]["actor_id"], "manager-1");
    assert_eq!(audit[0]["action"], "booking.status");
    assert_eq!(audit[0]["detail"], "pending -> confirmed");

    let (status, _) = send(h.app(), request("GET", "/api/admin/audit", Some("manager-token"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_booking() {
    let h = Harness::new();
    h.staff();
    let (booking_id, _) = create_booking(&h, gorilla_booking()).await;
    let uri = format!("/api/admin/bookings/{booking_id}");

    let (status, _) = send(h.app(), request("DELETE", &uri, Some("user-token"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.booking_count(), 1);

    let (status, _) = send(h.app(), request("DELETE", &uri, Some("admin-token"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(h.app(), request("GET", &uri, Some("admin-token"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_change_requires_admin() {
    let h = Harness::new();
    h.staff();

    for token in ["user-token", "manager-token"] {
        let (status, _) = send(
            h.app(),
            request(
                "POST",
                "/api/admin/users/manager-1/role",
                Some(token),
                Some(json!({"role": "admin"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{token}");
    }
    {
        let db = h.state.db().unwrap();
        let target = queries::get_profile(&db, "manager-1").unwrap().unwrap();
        assert_eq!(target.role, Role::Manager);
    }

    let (status, body) = send(
        h.app(),
        request(
            "POST",
            "/api/admin/users/user-1/role",
            Some("admin-token"),
            Some(json!({"role": "manager"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "manager");

    // Promotion takes effect on the next request.
    let (status, _) = send(h.app(), request("GET", "/api/admin/bookings", Some("user-token"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_last_admin_cannot_be_demoted() {
    let h = Harness::new();
    h.staff();

    let (status, body) = send(
        h.app(),
        request(
            "POST",
            "/api/admin/users/admin-1/role",
            Some("admin-token"),
            Some(json!({"role": "user"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("last admin"));
}

#[tokio::test]
async fn test_users_list_filters_by_role() {
    let h = Harness::new();
    h.staff();

    let (status, body) = send(
        h.app(),
        request("GET", "/api/admin/users?role=manager", Some("manager-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["user_id"], "manager-1");

    let (status, _) = send(h.app(), request("GET", "/api/admin/users", Some("user-token"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dashboard_stats() {
    let h = Harness::new();
    h.staff();
    let (_, intent_id) = create_booking(&h, gorilla_booking()).await;
    create_booking(&h, gorilla_booking()).await;
    h.set_processor_status(&intent_id, ProcessorStatus::Succeeded);
    confirm(&h, &intent_id).await;

    let (status, body) = send(h.app(), request("GET", "/api/admin/stats", Some("manager-token"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookings"]["total"], 2);
    assert_eq!(body["bookings"]["confirmed"], 1);
    assert_eq!(body["bookings"]["pending"], 1);
    assert_eq!(body["bookings"]["confirmed_revenue"], "3000");
    assert_eq!(body["users"]["admin"], 1);
    assert_eq!(body["catalog"]["tours"], 0);
}

#[tokio::test]
async fn test_payments_export() {
    let h = Harness::new();
    h.staff();
    let (_, intent_id) = create_booking(&h, gorilla_booking()).await;

    let res = h
        .app()
        .oneshot(request("GET", "/api/admin/payments/export.csv", Some("admin-token"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/csv; charset=utf-8");

    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("date,customer,email,service,amount,status,payment_intent_id")
    );
    let row = lines.next().unwrap();
    assert!(row.ends_with(&format!(",Jane Doe,jane@example.com,Mountain Gorilla Trekking,3000,pending,{intent_id}")));

    let (status, _) = send(
        h.app(),
        request("GET", "/api/admin/payments/export.csv", Some("user-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Catalog & Checkout ──

#[tokio::test]
async fn test_catalog_crud() {
    let h = Harness::new();
    h.staff();
    let tour = json!({
        "name": "Golden Monkey Tracking",
        "location": "Volcanoes National Park",
        "duration": "4 hours",
        "price": "100.00",
        "max_guests": 6
    });

    let (status, _) = send(
        h.app(),
        request("POST", "/api/admin/catalog/tours", Some("user-token"), Some(tour.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(
        h.app(),
        request("POST", "/api/admin/catalog/tours", Some("manager-token"), Some(tour.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["kind"], "tours");
    assert_eq!(created["name"], "Golden Monkey Tracking");
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/admin/catalog/tours/{id}");

    let mut updated = tour.clone();
    updated["price"] = json!("110.00");
    let (status, body) = send(h.app(), request("PUT", &uri, Some("manager-token"), Some(updated))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "110.00");

    let (_, list) = send(h.app(), request("GET", "/api/admin/catalog/tours", Some("admin-token"), None)).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(h.app(), request("DELETE", &uri, Some("admin-token"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(h.app(), request("GET", &uri, Some("admin-token"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_validation() {
    let h = Harness::new();
    h.staff();

    let (status, body) = send(
        h.app(),
        request(
            "POST",
            "/api/admin/catalog/guides",
            Some("admin-token"),
            Some(json!({"name": "Jean", "specialization": "Birding", "hourly_rate": "-5"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hourly_rate"));

    let (status, _) = send(h.app(), request("GET", "/api/admin/catalog/spas", Some("admin-token"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_prices_from_catalog() {
    let h = Harness::new();
    h.staff();
    let (_, created) = send(
        h.app(),
        request(
            "POST",
            "/api/admin/catalog/tours",
            Some("admin-token"),
            Some(json!({
                "name": "Mountain Gorilla Trekking",
                "location": "Volcanoes National Park",
                "duration": "1 day",
                "price": "1500",
                "max_guests": 8
            })),
        ),
    )
    .await;
    let tour_id = created["id"].as_str().unwrap().to_string();

    let (status, quote) = send(
        h.app(),
        request(
            "POST",
            "/api/bookings/quote",
            None,
            Some(json!({"kind": "tour", "serviceId": tour_id, "guests": 2})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["totalCost"], "3000");

    let (status, body) = send(
        h.app(),
        request(
            "POST",
            "/api/bookings/checkout",
            None,
            Some(json!({
                "kind": "tour",
                "serviceId": tour_id,
                "guests": 2,
                "bookingDate": "2024-09-07",
                "customerName": "Jane Doe",
                "customerEmail": "jane@example.com",
                "totalCost": 1
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["quote"]["serviceName"], "Mountain Gorilla Trekking");
    assert!(body["bookingId"].is_string());
    assert_eq!(h.gateway.lock().unwrap().created[0].0, 300000);

    let (status, _) = send(
        h.app(),
        request(
            "POST",
            "/api/bookings/checkout",
            None,
            Some(json!({
                "kind": "tour",
                "serviceId": tour_id,
                "guests": 9,
                "bookingDate": "2024-09-07",
                "customerName": "Jane Doe",
                "customerEmail": "jane@example.com"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.intents_created(), 1);
}

// ── Identity ──

#[tokio::test]
async fn test_signup_signin_me() {
    let h = Harness::new();

    let (status, body) = send(
        h.app(),
        request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"email": "Visitor@Example.com", "password": "hunter2hunter2", "fullName": "Visitor"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, session) = send(
        h.app(),
        request(
            "POST",
            "/api/auth/signin",
            None,
            Some(json!({"email": "visitor@example.com", "password": "hunter2hunter2"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["capabilities"]["role"], "user");
    assert_eq!(session["capabilities"]["can_access"], false);
    let token = session["access_token"].as_str().unwrap().to_string();

    let (status, me) = send(h.app(), request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["profile"]["user_id"], user_id);
    assert_eq!(me["profile"]["full_name"], "Visitor");

    let (status, _) = send(h.app(), request("POST", "/api/auth/signout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(h.app(), request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signin_with_wrong_password() {
    let h = Harness::new();
    send(
        h.app(),
        request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"email": "a@example.com", "password": "correct-horse"})),
        ),
    )
    .await;

    let (status, _) = send(
        h.app(),
        request(
            "POST",
            "/api/auth/signin",
            None,
            Some(json!({"email": "a@example.com", "password": "wrong-horse"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bootstrap_admin_is_one_time() {
    use tourdesk::config::BootstrapAdmin;
    use tourdesk::services::bootstrap::{provision_admin, BootstrapOutcome};

    let h = Harness::new();
    let admin = BootstrapAdmin {
        email: "root@example.com".to_string(),
        password: "a-long-enough-secret".to_string(),
        full_name: "Root".to_string(),
    };

    let outcome = provision_admin(&h.state, &admin).await.unwrap();
    let BootstrapOutcome::Provisioned { user_id } = outcome else {
        panic!("expected provisioning");
    };
    {
        let db = h.state.db().unwrap();
        assert_eq!(
            queries::get_profile(&db, &user_id).unwrap().unwrap().role,
            Role::Admin
        );
    }

    assert_eq!(
        provision_admin(&h.state, &admin).await.unwrap(),
        BootstrapOutcome::Skipped
    );
}

#[tokio::test]
async fn test_bootstrap_rejects_short_password() {
    use tourdesk::config::BootstrapAdmin;
    use tourdesk::services::bootstrap::provision_admin;

    let h = Harness::new();
    let admin = BootstrapAdmin {
        email: "root@example.com".to_string(),
        password: "admin123".to_string(),
        full_name: "Root".to_string(),
    };
    assert!(provision_admin(&h.state, &admin).await.is_err());
    assert!(h.identity.lock().unwrap().accounts.is_empty());
}

// ── Virtual Guide ──

#[tokio::test]
async fn test_guide_answers_in_requested_language() {
    let h = Harness::new();
    let (status, body) = send(
        h.app(),
        request(
            "POST",
            "/api/guide/ask",
            None,
            Some(json!({"message": "Where do I buy permits?", "language": "fr"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["language"], "fr");
    assert!(body["response"].as_str().unwrap().contains("permis"));
}

#[tokio::test]
async fn test_guide_failure_apologises() {
    let h = Harness::new();
    let (status, body) = send(
        h.app(),
        request("POST", "/api/guide/ask", None, Some(json!({"message": "explode please"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().starts_with("I'm sorry"));

    let (status, _) = send(
        h.app(),
        request("POST", "/api/guide/ask", None, Some(json!({"message": "  "}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
