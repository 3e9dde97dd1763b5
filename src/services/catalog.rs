//! Product catalog: products, variant types and options, and product
//! variants. Pricing fields carry both the original and the current price so
//! strike-through displays never need a second lookup.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, PaginatorTrait, QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    category, product, product_variant, variant_option, variant_option_assignment, variant_type,
    ProductModel, ProductVariantModel, VariantOptionModel, VariantTypeModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    pub category_id: Uuid,
    #[validate(length(min = 3, message = "product name must be at least 3 characters"))]
    pub name: String,
    pub description: String,
    #[validate(length(min = 1, message = "sku must not be empty"))]
    pub sku: String,
    pub original_price: Decimal,
    pub current_price: Decimal,
    pub stock: i32,
    pub tags: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub variants: Vec<CreateVariantInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVariantInput {
    pub original_price: Decimal,
    pub current_price: Decimal,
    pub stock: i32,
    /// Variant option ids describing this variant (e.g. Size=M, Color=Red).
    #[serde(default)]
    pub option_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 3, message = "product name must be at least 3 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub original_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub tags: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

/// A product with its variants, as served by detail endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductModel,
    pub variants: Vec<VariantDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantDetail {
    #[serde(flatten)]
    pub variant: ProductVariantModel,
    pub options: Vec<VariantOptionModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub items: Vec<ProductModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct CatalogService {
    db: DatabaseConnection,
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        input.validate()?;
        validate_price_pair(input.original_price, input.current_price)?;
        for variant in &input.variants {
            validate_price_pair(variant.original_price, variant.current_price)?;
        }

        category::Entity::find_by_id(input.category_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("category {} not found", input.category_id))
            })?;

        let existing_sku = product::Entity::find()
            .filter(product::Column::Sku.eq(input.sku.clone()))
            .one(&self.db)
            .await?;
        if existing_sku.is_some() {
            return Err(ServiceError::Conflict(format!(
                "sku '{}' is already in use",
                input.sku
            )));
        }

        let txn = self.db.begin().await?;

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(input.category_id),
            name: Set(input.name),
            description: Set(input.description),
            sku: Set(input.sku),
            original_price: Set(input.original_price),
            current_price: Set(input.current_price),
            stock: Set(input.stock),
            tags: Set(input.tags),
            image_url: Set(input.image_url),
        }
        .insert(&txn)
        .await?;

        let mut variants = Vec::with_capacity(input.variants.len());
        for variant_input in input.variants {
            let variant = insert_variant(&txn, model.id, variant_input).await?;
            variants.push(variant);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(model.id))
            .await;

        Ok(ProductDetail {
            product: model,
            variants,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let existing = self.get_product(id).await?;

        let original = input.original_price.unwrap_or(existing.original_price);
        let current = input.current_price.unwrap_or(existing.current_price);
        validate_price_pair(original, current)?;

        if let Some(category_id) = input.category_id {
            category::Entity::find_by_id(category_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("category {category_id} not found"))
                })?;
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(price) = input.original_price {
            active.original_price = Set(price);
        }
        if let Some(price) = input.current_price {
            active.current_price = Set(price);
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        if let Some(tags) = input.tags {
            active.tags = Set(Some(tags));
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }

        Ok(active.update(&self.db).await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {id} not found")))
    }

    pub async fn get_variant(
        &self,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<ProductVariantModel, ServiceError> {
        product_variant::Entity::find_by_id(variant_id)
            .filter(product_variant::Column::ProductId.eq(product_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("variant {variant_id} not found on this product"))
            })
    }

    pub async fn get_product_detail(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let model = self.get_product(id).await?;
        let variants = self.list_variants(id).await?;
        Ok(ProductDetail {
            product: model,
            variants,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self, page: u64, per_page: u64) -> Result<ProductPage, ServiceError> {
        let paginator = product::Entity::find()
            .order_by_asc(product::Column::Name)
            .paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        // Pages are 1-based at the API surface.
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(ProductPage {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Products in the category and all of its active descendants.
    pub async fn list_products_by_category(
        &self,
        category_ids: &[Uuid],
    ) -> Result<Vec<ProductModel>, ServiceError> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(product::Entity::find()
            .filter(product::Column::CategoryId.is_in(category_ids.iter().copied()))
            .order_by_asc(product::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_product(id).await?;
        existing.delete(&self.db).await?;
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn add_variant(
        &self,
        product_id: Uuid,
        input: CreateVariantInput,
    ) -> Result<VariantDetail, ServiceError> {
        validate_price_pair(input.original_price, input.current_price)?;
        self.get_product(product_id).await?;

        let txn = self.db.begin().await?;
        let detail = insert_variant(&txn, product_id, input).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::VariantCreated {
                product_id,
                variant_id: detail.variant.id,
            })
            .await;
        Ok(detail)
    }

    pub async fn list_variants(&self, product_id: Uuid) -> Result<Vec<VariantDetail>, ServiceError> {
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .all(&self.db)
            .await?;

        let mut result = Vec::with_capacity(variants.len());
        for variant in variants {
            let options = variant
                .find_related(variant_option::Entity)
                .all(&self.db)
                .await?;
            result.push(VariantDetail { variant, options });
        }
        Ok(result)
    }

    pub async fn create_variant_type(&self, name: &str) -> Result<VariantTypeModel, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "variant type name must not be empty".to_string(),
            ));
        }
        let clash = variant_type::Entity::find()
            .filter(variant_type::Column::Name.eq(name))
            .one(&self.db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(format!(
                "variant type '{name}' already exists"
            )));
        }
        Ok(variant_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn list_variant_types(&self) -> Result<Vec<VariantTypeModel>, ServiceError> {
        Ok(variant_type::Entity::find()
            .order_by_asc(variant_type::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn create_variant_option(
        &self,
        variant_type_id: Uuid,
        value: &str,
    ) -> Result<VariantOptionModel, ServiceError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ServiceError::ValidationError(
                "variant option value must not be empty".to_string(),
            ));
        }
        variant_type::Entity::find_by_id(variant_type_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("variant type {variant_type_id} not found"))
            })?;

        Ok(variant_option::ActiveModel {
            id: Set(Uuid::new_v4()),
            variant_type_id: Set(variant_type_id),
            value: Set(value.to_string()),
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn list_variant_options(
        &self,
        variant_type_id: Uuid,
    ) -> Result<Vec<VariantOptionModel>, ServiceError> {
        Ok(variant_option::Entity::find()
            .filter(variant_option::Column::VariantTypeId.eq(variant_type_id))
            .order_by_asc(variant_option::Column::Value)
            .all(&self.db)
            .await?)
    }
}

async fn insert_variant<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    input: CreateVariantInput,
) -> Result<VariantDetail, ServiceError> {
    let mut options = Vec::with_capacity(input.option_ids.len());
    for option_id in &input.option_ids {
        let option = variant_option::Entity::find_by_id(*option_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("variant option {option_id} not found"))
            })?;
        options.push(option);
    }

    let variant = product_variant::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        original_price: Set(input.original_price),
        current_price: Set(input.current_price),
        stock: Set(input.stock),
    }
    .insert(conn)
    .await?;

    for option in &options {
        variant_option_assignment::ActiveModel {
            variant_id: Set(variant.id),
            option_id: Set(option.id),
        }
        .insert(conn)
        .await?;
    }

    Ok(VariantDetail { variant, options })
}

fn validate_price_pair(original: Decimal, current: Decimal) -> Result<(), ServiceError> {
    if original < Decimal::ZERO || current < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "prices must not be negative".to_string(),
        ));
    }
    if current > original {
        return Err(ServiceError::ValidationError(
            "current price must not exceed the original price".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn current_price_above_original_is_rejected() {
        assert!(validate_price_pair(dec!(10.00), dec!(12.00)).is_err());
        assert!(validate_price_pair(dec!(10.00), dec!(10.00)).is_ok());
        assert!(validate_price_pair(dec!(10.00), dec!(8.00)).is_ok());
    }

    #[test]
    fn negative_prices_are_rejected() {
        assert!(validate_price_pair(dec!(-1.00), dec!(-2.00)).is_err());
        assert!(validate_price_pair(dec!(5.00), dec!(-0.01)).is_err());
    }
}
