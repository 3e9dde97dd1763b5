mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::errors::ServiceError;
use storefront_api::services::catalog::{
    CatalogService, CreateProductInput, CreateVariantInput,
};

fn service(app: &TestApp) -> CatalogService {
    CatalogService::new(app.db.clone(), app.event_sender.clone())
}

fn basic_product(category_id: uuid::Uuid, name: &str, sku: &str) -> CreateProductInput {
    CreateProductInput {
        category_id,
        name: name.to_string(),
        description: "A product".to_string(),
        sku: sku.to_string(),
        original_price: dec!(20.00),
        current_price: dec!(18.00),
        stock: 10,
        tags: None,
        image_url: None,
        variants: Vec::new(),
    }
}

#[tokio::test]
async fn create_product_with_variants_and_options() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Shirts", None).await;

    let size = svc.create_variant_type("Size").await.expect("type");
    let medium = svc
        .create_variant_option(size.id, "M")
        .await
        .expect("option");

    let mut input = basic_product(category.id, "Linen Shirt", "LIN-1");
    input.variants.push(CreateVariantInput {
        original_price: dec!(25.00),
        current_price: dec!(22.00),
        stock: 5,
        option_ids: vec![medium.id],
    });

    let detail = svc.create_product(input).await.expect("create");
    assert_eq!(detail.variants.len(), 1);
    assert_eq!(detail.variants[0].options.len(), 1);
    assert_eq!(detail.variants[0].options[0].value, "M");

    let fetched = svc.get_product_detail(detail.product.id).await.expect("detail");
    assert_eq!(fetched.variants.len(), 1);
}

#[tokio::test]
async fn duplicate_sku_conflicts() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Socks", None).await;

    svc.create_product(basic_product(category.id, "Wool Socks", "SOCK-1"))
        .await
        .expect("first");
    let result = svc
        .create_product(basic_product(category.id, "Other Socks", "SOCK-1"))
        .await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn current_price_above_original_is_rejected() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Hats", None).await;

    let mut input = basic_product(category.id, "Felt Hat", "HAT-1");
    input.current_price = dec!(30.00);
    let result = svc.create_product(input).await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn listing_paginates() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Mugs", None).await;

    for i in 0..5 {
        app.seed_product(category.id, &format!("Mug {i}"), dec!(9.00)).await;
    }

    let page = svc.list_products(1, 2).await.expect("page 1");
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);

    let last = svc.list_products(3, 2).await.expect("page 3");
    assert_eq!(last.items.len(), 1);
}

#[tokio::test]
async fn duplicate_variant_type_conflicts() {
    let app = TestApp::new().await;
    let svc = service(&app);

    svc.create_variant_type("Color").await.expect("first");
    let result = svc.create_variant_type("Color").await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn money_columns_hold_large_prices() {
    let app = TestApp::new().await;
    let svc = service(&app);
    let category = app.seed_category("Industrial", None).await;

    // Twelve integer digits plus four of scale fills the column exactly.
    let mut input = basic_product(category.id, "Turbine", "SKU-TURBINE");
    input.original_price = dec!(999999999999.9999);
    input.current_price = dec!(999999999999.9999);
    let product = svc.create_product(input).await.expect("create");

    let fetched = svc.get_product(product.product.id).await.expect("fetch");
    assert_eq!(fetched.current_price, dec!(999999999999.9999));
}
