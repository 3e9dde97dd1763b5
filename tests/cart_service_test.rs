mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::entities::UserRole;
use storefront_api::errors::ServiceError;
use storefront_api::services::cart::CartService;
use uuid::Uuid;

fn service(app: &TestApp) -> CartService {
    CartService::new(app.db.clone(), app.event_sender.clone())
}

#[tokio::test]
async fn positive_delta_creates_a_line() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("cart@example.com", UserRole::Customer).await;
    let category = app.seed_category("Pantry", None).await;
    let product = app.seed_product(category.id, "Olive Oil", dec!(12.50)).await;

    let line = svc
        .add_or_update(user.id, product.id, None, 2)
        .await
        .expect("add")
        .expect("line should exist");
    assert_eq!(line.quantity, 2);

    // A second delta accumulates on the same line.
    let line = svc
        .add_or_update(user.id, product.id, None, 3)
        .await
        .expect("add")
        .expect("line should exist");
    assert_eq!(line.quantity, 5);

    let cart = svc.get_cart(user.id).await.expect("cart");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.total, dec!(62.50));
}

#[tokio::test]
async fn delta_to_zero_or_below_removes_the_line() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("cart2@example.com", UserRole::Customer).await;
    let category = app.seed_category("Pantry", None).await;
    let product = app.seed_product(category.id, "Flour", dec!(3.00)).await;

    svc.add_or_update(user.id, product.id, None, 2)
        .await
        .expect("add");
    let removed = svc
        .add_or_update(user.id, product.id, None, -5)
        .await
        .expect("remove");
    assert!(removed.is_none());
    assert!(svc.get_cart(user.id).await.expect("cart").lines.is_empty());
}

#[tokio::test]
async fn negative_delta_on_missing_line_is_a_noop() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("cart3@example.com", UserRole::Customer).await;
    let category = app.seed_category("Pantry", None).await;
    let product = app.seed_product(category.id, "Sugar", dec!(2.00)).await;

    let result = svc
        .add_or_update(user.id, product.id, None, -1)
        .await
        .expect("noop");
    assert!(result.is_none());
    assert!(svc.get_cart(user.id).await.expect("cart").lines.is_empty());
}

#[tokio::test]
async fn variant_lines_are_kept_separate_and_use_variant_price() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("cart4@example.com", UserRole::Customer).await;
    let category = app.seed_category("Shirts", None).await;
    let product = app.seed_product(category.id, "Oxford Shirt", dec!(40.00)).await;
    let variant = app.seed_variant(product.id, dec!(45.00)).await;

    svc.add_or_update(user.id, product.id, None, 1)
        .await
        .expect("base line");
    svc.add_or_update(user.id, product.id, Some(variant.id), 1)
        .await
        .expect("variant line");

    let cart = svc.get_cart(user.id).await.expect("cart");
    assert_eq!(cart.lines.len(), 2);
    assert_eq!(cart.total, dec!(85.00));
}

#[tokio::test]
async fn set_quantity_is_absolute() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("cart5@example.com", UserRole::Customer).await;
    let category = app.seed_category("Pantry", None).await;
    let product = app.seed_product(category.id, "Rice", dec!(5.00)).await;

    svc.add_or_update(user.id, product.id, None, 4)
        .await
        .expect("add");
    let line = svc
        .set_quantity(user.id, product.id, None, 1)
        .await
        .expect("set")
        .expect("line");
    assert_eq!(line.quantity, 1);

    let removed = svc
        .set_quantity(user.id, product.id, None, 0)
        .await
        .expect("set zero");
    assert!(removed.is_none());
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("cart6@example.com", UserRole::Customer).await;

    let result = svc.add_or_update(user.id, Uuid::new_v4(), None, 1).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn mismatched_variant_is_rejected() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let user = app.seed_user("cart7@example.com", UserRole::Customer).await;
    let category = app.seed_category("Shoes", None).await;
    let product_a = app.seed_product(category.id, "Runner A", dec!(90.00)).await;
    let product_b = app.seed_product(category.id, "Runner B", dec!(95.00)).await;
    let variant_b = app.seed_variant(product_b.id, dec!(99.00)).await;

    let result = svc
        .add_or_update(user.id, product_a.id, Some(variant_b.id), 1)
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}
