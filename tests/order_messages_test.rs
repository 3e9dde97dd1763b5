mod common;

use common::{recording_mail_queue, TestApp};
use rust_decimal_macros::dec;
use storefront_api::entities::UserRole;
use storefront_api::errors::ServiceError;
use storefront_api::notifications::{NotificationGroup, NotificationHub};
use storefront_api::services::messages::MessageService;
use storefront_api::services::orders::OrderService;
use uuid::Uuid;

const ADMIN: &str = "admin@example.com";

async fn setup(app: &TestApp) -> (MessageService, NotificationHub, common::RecordingMailer, Uuid, Uuid) {
    let (queue, mailer) = recording_mail_queue();
    let hub = NotificationHub::new(16);
    let svc = MessageService::new(
        app.db.clone(),
        app.event_sender.clone(),
        hub.clone(),
        queue,
        ADMIN.to_string(),
    );

    let customer = app.seed_user("customer@example.com", UserRole::Customer).await;
    let category = app.seed_category("Plants", None).await;
    let product = app.seed_product(category.id, "Monstera", dec!(25.00)).await;
    let orders = OrderService::new(app.db.clone(), app.event_sender.clone());
    let order = orders
        .buy_now(customer.id, product.id, None, 1)
        .await
        .expect("order");

    (svc, hub, mailer, order.order.id, customer.id)
}

#[tokio::test]
async fn customer_message_notifies_staff_and_admin() {
    let app = TestApp::new().await;
    let (svc, hub, mailer, order_id, customer_id) = setup(&app).await;

    let mut staff_rx = hub.subscribe(NotificationGroup::Staff);
    let mut admin_rx = hub.subscribe(NotificationGroup::Admin);

    let message = svc
        .post(order_id, customer_id, "Where is my plant?")
        .await
        .expect("post");
    assert_eq!(message.sender_role, UserRole::Customer);

    let staff_note = staff_rx.recv().await.expect("staff notification");
    assert!(staff_note.message.contains("Where is my plant?"));
    admin_rx.recv().await.expect("admin notification");

    // Admin inbox mail plus the first-message acknowledgement.
    let sent = mailer.wait_for(2).await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|m| m.to == ADMIN));
    assert!(sent.iter().any(|m| m.to == "customer@example.com"));
}

#[tokio::test]
async fn second_message_within_a_day_skips_the_acknowledgement() {
    let app = TestApp::new().await;
    let (svc, _hub, mailer, order_id, customer_id) = setup(&app).await;

    svc.post(order_id, customer_id, "First question")
        .await
        .expect("first");
    svc.post(order_id, customer_id, "Second question")
        .await
        .expect("second");

    // First post: admin mail + ack. Second post: admin mail only.
    let sent = mailer.wait_for(3).await;
    assert_eq!(sent.len(), 3);
    assert_eq!(
        sent.iter().filter(|m| m.to == "customer@example.com").count(),
        1
    );
}

#[tokio::test]
async fn staff_reply_is_mailed_to_the_customer() {
    let app = TestApp::new().await;
    let (svc, _hub, mailer, order_id, _customer_id) = setup(&app).await;
    let staff = app.seed_user("support@example.com", UserRole::Staff).await;

    let message = svc
        .post(order_id, staff.id, "It ships tomorrow.")
        .await
        .expect("post");
    assert_eq!(message.sender_role, UserRole::Staff);

    let sent = mailer.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "customer@example.com");
    assert!(sent[0].body.contains("It ships tomorrow."));
}

#[tokio::test]
async fn strangers_cannot_read_or_post() {
    let app = TestApp::new().await;
    let (svc, _hub, _mailer, order_id, _customer_id) = setup(&app).await;
    let stranger = app.seed_user("stranger@example.com", UserRole::Customer).await;

    let read = svc.list(order_id, stranger.id, false).await;
    assert!(matches!(read, Err(ServiceError::NotFound(_))));

    let write = svc.post(order_id, stranger.id, "Hello?").await;
    assert!(matches!(write, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn thread_lists_in_chronological_order() {
    let app = TestApp::new().await;
    let (svc, _hub, _mailer, order_id, customer_id) = setup(&app).await;
    let staff = app.seed_user("helper@example.com", UserRole::Staff).await;

    svc.post(order_id, customer_id, "One").await.expect("one");
    svc.post(order_id, staff.id, "Two").await.expect("two");
    svc.post(order_id, customer_id, "Three").await.expect("three");

    let thread = svc.list(order_id, staff.id, true).await.expect("list");
    let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["One", "Two", "Three"]);
}
