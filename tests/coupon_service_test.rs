mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::entities::{DiscountType, UserRole};
use storefront_api::errors::ServiceError;
use storefront_api::services::coupons::{CouponService, CreateCouponInput};

fn service(app: &TestApp) -> CouponService {
    CouponService::new(app.db.clone(), app.event_sender.clone())
}

fn save10(limit: i32) -> CreateCouponInput {
    CreateCouponInput {
        code: "SAVE10".to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        start_date: Utc::now() - Duration::hours(1),
        end_date: Utc::now() + Duration::hours(1),
        usage_limit_per_user: limit,
        minimum_order_amount: Some(dec!(100.00)),
    }
}

#[tokio::test]
async fn redeem_discounts_and_records_usage() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("shopper@example.com", UserRole::Customer).await;

    let coupon = svc.create_coupon(save10(1)).await.expect("create");

    let application = svc
        .redeem("save10", user.id, dec!(200.00))
        .await
        .expect("redeem");
    assert_eq!(application.discounted_total, dec!(180.00));

    let usages = svc.list_usages(coupon.id).await.expect("usages");
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].user_id, user.id);
}

#[tokio::test]
async fn second_redemption_over_limit_is_ineligible() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("repeat@example.com", UserRole::Customer).await;

    svc.create_coupon(save10(1)).await.expect("create");
    svc.redeem("SAVE10", user.id, dec!(150.00))
        .await
        .expect("first redemption");

    let second = svc.redeem("SAVE10", user.id, dec!(150.00)).await;
    assert!(matches!(second, Err(ServiceError::Ineligible(_))));
}

#[tokio::test]
async fn below_minimum_order_is_ineligible() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("small@example.com", UserRole::Customer).await;

    svc.create_coupon(save10(1)).await.expect("create");
    let result = svc.redeem("SAVE10", user.id, dec!(99.99)).await;
    assert!(matches!(result, Err(ServiceError::Ineligible(_))));

    // A failed redemption must not burn a use.
    let retry = svc.redeem("SAVE10", user.id, dec!(100.00)).await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn preview_does_not_record_usage() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("lookie@example.com", UserRole::Customer).await;

    let coupon = svc.create_coupon(save10(1)).await.expect("create");

    let preview = svc
        .preview("SAVE10", user.id, dec!(200.00))
        .await
        .expect("preview");
    assert_eq!(preview.discounted_total, dec!(180.00));
    assert!(svc.list_usages(coupon.id).await.expect("usages").is_empty());
}

#[tokio::test]
async fn duplicate_code_conflicts() {
    let app = TestApp::new().await;
    let svc = service(&app);

    svc.create_coupon(save10(1)).await.expect("create");
    // Codes are case-insensitive.
    let mut again = save10(1);
    again.code = "save10".to_string();
    let result = svc.create_coupon(again).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("nobody@example.com", UserRole::Customer).await;

    let result = svc.redeem("NOPE", user.id, dec!(50.00)).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn minimum_order_is_checked_before_the_usage_cap() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("shopper@example.com", UserRole::Customer).await;

    svc.create_coupon(save10(1)).await.expect("create");
    svc.redeem("SAVE10", user.id, dec!(150.00)).await.expect("first redeem");

    // Both rules fail here; the minimum-order rule must be the one reported.
    let result = svc.redeem("SAVE10", user.id, dec!(50.00)).await;
    match result {
        Err(ServiceError::Ineligible(message)) => {
            assert!(message.contains("minimum order"), "got: {message}")
        }
        other => panic!("expected Ineligible, got {other:?}"),
    }
}
