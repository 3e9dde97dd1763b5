mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::entities::{DiscountType, OfferScope};
use storefront_api::errors::ServiceError;
use storefront_api::services::offers::{CreateOfferInput, OfferService, UpdateOfferInput};

fn service(app: &TestApp) -> OfferService {
    OfferService::new(app.db.clone(), app.event_sender.clone())
}

fn window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    (Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
}

#[tokio::test]
async fn product_offer_discounts_the_price() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Audio", None).await;
    let product = app.seed_product(category.id, "Headphones", dec!(200.00)).await;

    let (start, end) = window();
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Product(product.id),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("offer");

    let resolved = svc.resolve_price(&product).await.expect("resolve");
    assert_eq!(resolved.effective_price, dec!(180.00));
    assert!(resolved.applied_offer.is_some());
}

#[tokio::test]
async fn category_offer_reaches_products_in_subcategories() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let root = app.seed_category("Music", None).await;
    let sub = app.seed_category("Vinyl", Some(root.id)).await;
    let product = app.seed_product(sub.id, "Blue Note LP", dec!(50.00)).await;

    let (start, end) = window();
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Category(root.id),
        discount_type: DiscountType::Fixed,
        discount_value: dec!(5.00),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("offer");

    let resolved = svc.resolve_price(&product).await.expect("resolve");
    assert_eq!(resolved.effective_price, dec!(45.00));
}

#[tokio::test]
async fn product_offer_beats_category_offer() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Cameras", None).await;
    let product = app.seed_product(category.id, "Rangefinder", dec!(100.00)).await;

    let (start, end) = window();
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Category(category.id),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(50),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("category offer");
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Product(product.id),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("product offer");

    // The weaker product offer still wins over the stronger category one.
    let resolved = svc.resolve_price(&product).await.expect("resolve");
    assert_eq!(resolved.effective_price, dec!(90.00));
}

#[tokio::test]
async fn expired_and_inactive_offers_are_ignored() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Watches", None).await;
    let product = app.seed_product(category.id, "Field Watch", dec!(80.00)).await;

    let offer = svc
        .create_offer(CreateOfferInput {
            scope: OfferScope::Product(product.id),
            discount_type: DiscountType::Percentage,
            discount_value: dec!(25),
            start_date: Utc::now() - Duration::hours(1),
            end_date: Utc::now() + Duration::hours(1),
        })
        .await
        .expect("offer");

    svc.update_offer(
        offer.id,
        UpdateOfferInput {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .expect("deactivate");

    let resolved = svc.resolve_price(&product).await.expect("resolve");
    assert_eq!(resolved.effective_price, dec!(80.00));
    assert!(resolved.applied_offer.is_none());
}

#[tokio::test]
async fn overlapping_offer_on_same_target_conflicts() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Games", None).await;
    let product = app.seed_product(category.id, "Board Game", dec!(40.00)).await;

    let (start, end) = window();
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Product(product.id),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("first offer");

    let second = svc
        .create_offer(CreateOfferInput {
            scope: OfferScope::Product(product.id),
            discount_type: DiscountType::Fixed,
            discount_value: dec!(2.00),
            start_date: start,
            end_date: end,
        })
        .await;
    assert!(matches!(second, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn percentage_over_hundred_is_rejected() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Outdoor", None).await;
    let product = app.seed_product(category.id, "Tent", dec!(300.00)).await;

    let (start, end) = window();
    let result = svc
        .create_offer(CreateOfferInput {
            scope: OfferScope::Product(product.id),
            discount_type: DiscountType::Percentage,
            discount_value: dec!(120),
            start_date: start,
            end_date: end,
        })
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn newest_offer_wins_when_several_are_valid() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Gaming", None).await;
    let product = app.seed_product(category.id, "Controller", dec!(200.00)).await;

    let (start, end) = window();
    let older = svc
        .create_offer(CreateOfferInput {
            scope: OfferScope::Product(product.id),
            discount_type: DiscountType::Percentage,
            discount_value: dec!(10),
            start_date: start,
            end_date: end,
        })
        .await
        .expect("first offer");

    // Park the first offer so the second can be created, then bring it back
    // to get two simultaneously valid offers on the same product.
    svc.update_offer(
        older.id,
        UpdateOfferInput {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .expect("deactivate");

    let newer = svc
        .create_offer(CreateOfferInput {
            scope: OfferScope::Product(product.id),
            discount_type: DiscountType::Percentage,
            discount_value: dec!(25),
            start_date: start,
            end_date: end,
        })
        .await
        .expect("second offer");

    svc.update_offer(
        older.id,
        UpdateOfferInput {
            is_active: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("reactivate");

    let resolved = svc.resolve_price(&product).await.expect("resolve");
    assert_eq!(resolved.applied_offer.expect("offer applied").id, newer.id);
    assert_eq!(resolved.effective_price, dec!(150.00));
}

#[tokio::test]
async fn variant_prices_resolve_through_the_product_offer() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Footwear", None).await;
    let product = app.seed_product(category.id, "Runner", dec!(100.00)).await;
    let variant = app.seed_variant(product.id, dec!(120.00)).await;

    let (start, end) = window();
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Product(product.id),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("offer");

    // The discount applies to the variant's own price, not the product's.
    let resolved = svc
        .resolve_variant_price(&product, &variant)
        .await
        .expect("resolve");
    assert_eq!(resolved.current_price, dec!(120.00));
    assert_eq!(resolved.effective_price, dec!(108.00));

    let other = app.seed_product(category.id, "Walker", dec!(80.00)).await;
    let mismatch = svc.resolve_variant_price(&other, &variant).await;
    assert!(matches!(mismatch, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn ancestor_and_direct_category_offers_compete_by_recency() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let root = app.seed_category("Kitchen", None).await;
    let sub = app.seed_category("Knives", Some(root.id)).await;
    let product = app.seed_product(sub.id, "Chef Knife", dec!(100.00)).await;

    let (start, end) = window();
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Category(sub.id),
        discount_type: DiscountType::Fixed,
        discount_value: dec!(5.00),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("direct category offer");

    // Offers anywhere along the category chain compete; among valid ones the
    // newest wins, whatever its depth.
    svc.create_offer(CreateOfferInput {
        scope: OfferScope::Category(root.id),
        discount_type: DiscountType::Fixed,
        discount_value: dec!(20.00),
        start_date: start,
        end_date: end,
    })
    .await
    .expect("ancestor category offer");

    let resolved = svc.resolve_price(&product).await.expect("resolve");
    assert_eq!(resolved.effective_price, dec!(80.00));
}
