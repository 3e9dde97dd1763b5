mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storefront_api::{
    auth::{AuthService, OtpService},
    config::AppConfig,
    entities::UserRole,
    handlers::AppServices,
    mailer::MailQueue,
    notifications::NotificationHub,
    services,
    AppState,
};
use tower::ServiceExt;

use common::{recording_mail_queue, RecordingMailer, TestApp};

const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 3600,
        refresh_token_expiration: 86400,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "error".to_string(),
        log_json: false,
        auto_migrate: false,
        cors_allowed_origins: None,
        cors_allow_any_origin: true,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
        admin_email: "admin@example.com".to_string(),
        mail_from: "noreply@example.com".to_string(),
        otp_ttl_secs: 300,
        mail_queue_capacity: 16,
        notification_channel_capacity: 16,
        event_channel_capacity: 16,
    }
}

struct HttpHarness {
    router: Router,
    app: TestApp,
    auth: Arc<AuthService>,
    mailer: RecordingMailer,
}

async fn spawn_harness() -> HttpHarness {
    let app = TestApp::new().await;
    let cfg = test_config();

    let (mail_queue, mailer): (MailQueue, RecordingMailer) = recording_mail_queue();
    let notifications = NotificationHub::new(cfg.notification_channel_capacity);
    let auth = Arc::new(AuthService::new(
        &cfg.jwt_secret,
        cfg.jwt_expiration,
        cfg.refresh_token_expiration,
    ));

    let db = app.db.clone();
    let events = app.event_sender.clone();
    let app_services = AppServices {
        categories: services::CategoryService::new(db.clone(), events.clone()),
        catalog: services::CatalogService::new(db.clone(), events.clone()),
        offers: services::OfferService::new(db.clone(), events.clone()),
        coupons: services::CouponService::new(db.clone(), events.clone()),
        cart: services::CartService::new(db.clone(), events.clone()),
        orders: services::OrderService::new(db.clone(), events.clone()),
        wishlist: services::WishlistService::new(db.clone(), events.clone()),
        addresses: services::AddressService::new(db.clone()),
        reviews: services::ReviewService::new(db.clone()),
        testimonials: services::TestimonialService::new(db.clone()),
        messages: services::MessageService::new(
            db.clone(),
            events.clone(),
            notifications.clone(),
            mail_queue.clone(),
            cfg.admin_email.clone(),
        ),
        otp: OtpService::new(
            db.clone(),
            auth.clone(),
            mail_queue.clone(),
            events.clone(),
            cfg.otp_ttl_secs,
        ),
    };

    let state = Arc::new(AppState {
        db: Arc::new(db),
        config: cfg,
        event_sender: events,
        services: app_services,
        auth: auth.clone(),
        notifications,
        mail_queue,
    });

    let injected = auth.clone();
    let router = storefront_api::api_v1_routes()
        .layer(axum::middleware::from_fn_with_state(
            injected,
            |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
             mut req: Request<Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .with_state(state);

    HttpHarness {
        router,
        app,
        auth,
        mailer,
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer(request: Request<Body>, token: &str) -> Request<Body> {
    let (mut parts, body) = request.into_parts();
    parts.headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    Request::from_parts(parts, body)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn status_endpoint_reports_service() {
    let harness = spawn_harness().await;

    let response = harness
        .router
        .oneshot(
            Request::builder()
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["service"], json!("storefront-api"));
}

#[tokio::test]
async fn cart_requires_authentication() {
    let harness = spawn_harness().await;

    let response = harness
        .router
        .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn otp_login_grants_access_to_protected_routes() {
    let harness = spawn_harness().await;

    let response = harness
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/request",
            json!({ "email": "shopper@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = harness.mailer.wait_for(1).await;
    let code: String = sent[0]
        .body
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    let response = harness
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            json!({ "email": "shopper@example.com", "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login = read_json(response).await;
    assert_eq!(login["email"], json!("shopper@example.com"));
    let access = login["access"].as_str().unwrap().to_string();

    let response = harness
        .router
        .clone()
        .oneshot(bearer(
            Request::builder()
                .uri("/auth/me")
                .body(Body::empty())
                .unwrap(),
            &access,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = read_json(response).await;
    assert_eq!(me["email"], json!("shopper@example.com"));
    assert_eq!(me["role"], json!("customer"));

    let response = harness
        .router
        .oneshot(bearer(
            Request::builder().uri("/cart").body(Body::empty()).unwrap(),
            &access,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn category_creation_is_staff_only() {
    let harness = spawn_harness().await;

    let customer = harness
        .app
        .seed_user("customer@example.com", UserRole::Customer)
        .await;
    let staff = harness.app.seed_user("staff@example.com", UserRole::Staff).await;

    let customer_token = harness
        .auth
        .issue_token_pair(customer.id, &customer.email, customer.role)
        .unwrap()
        .access;
    let staff_token = harness
        .auth
        .issue_token_pair(staff.id, &staff.email, staff.role)
        .unwrap()
        .access;

    let payload = json!({ "name": "Apparel" });

    let response = harness
        .router
        .clone()
        .oneshot(bearer(
            json_request("POST", "/categories", payload.clone()),
            &customer_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = harness
        .router
        .oneshot(bearer(json_request("POST", "/categories", payload), &staff_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn product_listing_shows_offer_adjusted_prices() {
    let harness = spawn_harness().await;
    let staff = harness.app.seed_user("staff@example.com", UserRole::Staff).await;
    let token = harness
        .auth
        .issue_token_pair(staff.id, &staff.email, staff.role)
        .unwrap()
        .access;

    let category = harness.app.seed_category("Audio", None).await;
    let product = harness
        .app
        .seed_product(category.id, "Headphones", dec!(200.00))
        .await;

    let response = harness
        .router
        .clone()
        .oneshot(bearer(
            json_request(
                "POST",
                "/offers",
                json!({
                    "scope": { "kind": "product", "id": product.id },
                    "discount_type": "percentage",
                    "discount_value": "10",
                    "start_date": (Utc::now() - Duration::hours(1)).to_rfc3339(),
                    "end_date": (Utc::now() + Duration::hours(1)).to_rfc3339(),
                }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = read_json(response).await;
    assert_eq!(listing["items"][0]["effective_price"], json!("180.00"));
    assert_eq!(listing["items"][0]["current_price"], json!("200.00"));

    let uri = format!("/products/{}", product.id);
    let response = harness
        .router
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = read_json(response).await;
    assert_eq!(detail["effective_price"], json!("180.00"));
}
