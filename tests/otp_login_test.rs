mod common;

use common::{recording_mail_queue, TestApp};
use std::sync::Arc;
use storefront_api::auth::{AuthService, OtpService};
use storefront_api::entities::UserRole;
use storefront_api::errors::ServiceError;

fn auth() -> Arc<AuthService> {
    Arc::new(AuthService::new(
        "integration_test_secret_key_32_chars!",
        3600,
        86_400,
    ))
}

#[tokio::test]
async fn otp_round_trip_registers_and_logs_in() {
    let app = TestApp::new().await;
    let (queue, mailer) = recording_mail_queue();
    let svc = OtpService::new(app.db.clone(), auth(), queue, app.event_sender.clone(), 300);

    svc.request("New.User@Example.com").await.expect("request");

    let sent = mailer.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "new.user@example.com");
    assert_eq!(sent[0].subject, "Your OTP Code");

    // Pull the code out of the delivery body.
    let code: String = sent[0]
        .body
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    let login = svc
        .verify("new.user@example.com", &code)
        .await
        .expect("verify");
    assert!(login.created);
    assert_eq!(login.role, UserRole::Customer);
    assert!(!login.tokens.access.is_empty());

    // The access token round-trips through the auth service.
    let claims = auth()
        .verify_access_token(&login.tokens.access)
        .expect("claims");
    assert_eq!(claims.email, "new.user@example.com");
}

#[tokio::test]
async fn existing_user_is_not_recreated() {
    let app = TestApp::new().await;
    let (queue, mailer) = recording_mail_queue();
    let svc = OtpService::new(app.db.clone(), auth(), queue, app.event_sender.clone(), 300);
    let user = app.seed_user("regular@example.com", UserRole::Staff).await;

    svc.request("regular@example.com").await.expect("request");
    let sent = mailer.wait_for(1).await;
    let code: String = sent[0]
        .body
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    let login = svc.verify("regular@example.com", &code).await.expect("verify");
    assert!(!login.created);
    assert_eq!(login.user_id, user.id);
    // Role carries through from the stored user, not a default.
    assert_eq!(login.role, UserRole::Staff);
}

#[tokio::test]
async fn wrong_code_is_rejected_and_codes_are_single_use() {
    let app = TestApp::new().await;
    let (queue, mailer) = recording_mail_queue();
    let svc = OtpService::new(app.db.clone(), auth(), queue, app.event_sender.clone(), 300);

    svc.request("once@example.com").await.expect("request");
    let sent = mailer.wait_for(1).await;
    let code: String = sent[0]
        .body
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    let wrong = svc.verify("once@example.com", "0000").await;
    assert!(matches!(wrong, Err(ServiceError::Unauthorized(_))));

    svc.verify("once@example.com", &code).await.expect("verify");

    // Replaying the same code fails once consumed.
    let replay = svc.verify("once@example.com", &code).await;
    assert!(matches!(replay, Err(ServiceError::Unauthorized(_))));
}

#[tokio::test]
async fn expired_code_is_rejected() {
    let app = TestApp::new().await;
    let (queue, mailer) = recording_mail_queue();
    // Zero TTL: every code is already expired.
    let svc = OtpService::new(app.db.clone(), auth(), queue, app.event_sender.clone(), 0);

    svc.request("late@example.com").await.expect("request");
    let sent = mailer.wait_for(1).await;
    let code: String = sent[0]
        .body
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let result = svc.verify("late@example.com", &code).await;
    assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
}
