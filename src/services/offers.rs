//! Offers and effective-price resolution.
//!
//! An offer targets exactly one product or one category. When resolving the
//! price of a product, an offer on the product itself always beats an offer
//! inherited through its category chain; among several valid offers at the
//! same level the most recently created one wins.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, Condition, DatabaseConnection, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{
    category, offer, DiscountType, OfferModel, OfferScope, ProductModel, ProductVariantModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOfferInput {
    pub scope: OfferScope,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOfferInput {
    pub discount_value: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Resolved pricing for a product: the stored price plus the offer-adjusted
/// price and the offer that produced it, if any applied.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPrice {
    pub current_price: Decimal,
    pub effective_price: Decimal,
    pub applied_offer: Option<OfferModel>,
}

#[derive(Clone)]
pub struct OfferService {
    db: DatabaseConnection,
    event_sender: EventSender,
}

impl OfferService {
    pub fn new(db: DatabaseConnection, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_offer(&self, input: CreateOfferInput) -> Result<OfferModel, ServiceError> {
        validate_discount(input.discount_type, input.discount_value)?;
        if input.end_date <= input.start_date {
            return Err(ServiceError::ValidationError(
                "offer end date must be after its start date".to_string(),
            ));
        }

        let (product_id, category_id) = match input.scope {
            OfferScope::Product(id) => {
                crate::entities::product::Entity::find_by_id(id)
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("product {id} not found")))?;
                (Some(id), None)
            }
            OfferScope::Category(id) => {
                category::Entity::find_by_id(id)
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("category {id} not found")))?;
                (None, Some(id))
            }
        };

        // One live offer per target at a time.
        let overlapping = offer::Entity::find()
            .filter(scope_condition(product_id, category_id))
            .filter(offer::Column::IsActive.eq(true))
            .filter(offer::Column::StartDate.lt(input.end_date))
            .filter(offer::Column::EndDate.gt(input.start_date))
            .one(&self.db)
            .await?;
        if overlapping.is_some() {
            return Err(ServiceError::Conflict(
                "an active offer already covers this target in that period".to_string(),
            ));
        }

        let model = offer::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            category_id: Set(category_id),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::OfferCreated(model.id))
            .await;
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_offer(
        &self,
        id: Uuid,
        input: UpdateOfferInput,
    ) -> Result<OfferModel, ServiceError> {
        let existing = self.get_offer(id).await?;

        let value = input.discount_value.unwrap_or(existing.discount_value);
        validate_discount(existing.discount_type, value)?;

        let start = input.start_date.unwrap_or(existing.start_date);
        let end = input.end_date.unwrap_or(existing.end_date);
        if end <= start {
            return Err(ServiceError::ValidationError(
                "offer end date must be after its start date".to_string(),
            ));
        }

        let mut active: offer::ActiveModel = existing.into();
        if let Some(v) = input.discount_value {
            active.discount_value = Set(v);
        }
        if let Some(v) = input.start_date {
            active.start_date = Set(v);
        }
        if let Some(v) = input.end_date {
            active.end_date = Set(v);
        }
        if let Some(v) = input.is_active {
            active.is_active = Set(v);
        }
        Ok(active.update(&self.db).await?)
    }

    pub async fn get_offer(&self, id: Uuid) -> Result<OfferModel, ServiceError> {
        offer::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("offer {id} not found")))
    }

    pub async fn list_offers(&self) -> Result<Vec<OfferModel>, ServiceError> {
        Ok(offer::Entity::find()
            .order_by_desc(offer::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn delete_offer(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_offer(id).await?;
        existing.delete(&self.db).await?;
        Ok(())
    }

    /// Effective price for a product right now.
    ///
    /// Product offers take precedence over category offers; category offers
    /// are searched along the product's category chain up to the root.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn resolve_price(&self, product: &ProductModel) -> Result<ResolvedPrice, ServiceError> {
        let applied = self.applicable_offer(product).await?;
        Ok(priced(product.current_price, applied))
    }

    /// Effective price for a specific variant: the variant's own price with
    /// the product's applicable offer applied to it.
    #[instrument(skip(self, product, variant), fields(variant_id = %variant.id))]
    pub async fn resolve_variant_price(
        &self,
        product: &ProductModel,
        variant: &ProductVariantModel,
    ) -> Result<ResolvedPrice, ServiceError> {
        if variant.product_id != product.id {
            return Err(ServiceError::ValidationError(
                "variant does not belong to this product".to_string(),
            ));
        }
        let applied = self.applicable_offer(product).await?;
        Ok(priced(variant.current_price, applied))
    }

    /// The offer governing a product right now, if any. A product offer
    /// always beats a category offer.
    async fn applicable_offer(
        &self,
        product: &ProductModel,
    ) -> Result<Option<OfferModel>, ServiceError> {
        let now = Utc::now();

        let product_offer = self
            .best_valid_offer(offer::Column::ProductId.eq(product.id), now)
            .await?;

        match product_offer {
            Some(o) => Ok(Some(o)),
            None => {
                let chain = self.category_chain(product.category_id).await?;
                self.best_valid_offer(offer::Column::CategoryId.is_in(chain), now)
                    .await
            }
        }
    }

    async fn best_valid_offer(
        &self,
        scope_filter: impl sea_orm::sea_query::IntoCondition,
        now: DateTime<Utc>,
    ) -> Result<Option<OfferModel>, ServiceError> {
        Ok(offer::Entity::find()
            .filter(scope_filter)
            .filter(offer::Column::IsActive.eq(true))
            .filter(offer::Column::StartDate.lte(now))
            .filter(offer::Column::EndDate.gte(now))
            .order_by_desc(offer::Column::CreatedAt)
            .order_by_desc(offer::Column::Id)
            .one(&self.db)
            .await?)
    }

    /// Category ids from the product's own category up to the root.
    async fn category_chain(&self, category_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let mut chain = Vec::new();
        let mut cursor = category::Entity::find_by_id(category_id).one(&self.db).await?;
        while let Some(current) = cursor {
            if chain.contains(&current.id) {
                break;
            }
            chain.push(current.id);
            cursor = match current.parent_id {
                Some(pid) => category::Entity::find_by_id(pid).one(&self.db).await?,
                None => None,
            };
        }
        Ok(chain)
    }
}

fn priced(base_price: Decimal, applied: Option<OfferModel>) -> ResolvedPrice {
    let effective_price = match &applied {
        Some(o) => apply_discount(base_price, o.discount_type, o.discount_value),
        None => base_price,
    };
    ResolvedPrice {
        current_price: base_price,
        effective_price,
        applied_offer: applied,
    }
}

fn scope_condition(product_id: Option<Uuid>, category_id: Option<Uuid>) -> Condition {
    match (product_id, category_id) {
        (Some(p), _) => Condition::all().add(offer::Column::ProductId.eq(p)),
        (_, Some(c)) => Condition::all().add(offer::Column::CategoryId.eq(c)),
        _ => Condition::all(),
    }
}

/// Applies a discount to a price, rounding to cents and never going negative.
pub fn apply_discount(price: Decimal, discount_type: DiscountType, value: Decimal) -> Decimal {
    let discounted = match discount_type {
        DiscountType::Percentage => price * (Decimal::ONE - value / Decimal::from(100)),
        DiscountType::Fixed => price - value,
    };
    discounted.max(Decimal::ZERO).round_dp(2)
}

pub fn validate_discount(
    discount_type: DiscountType,
    value: Decimal,
) -> Result<(), ServiceError> {
    match discount_type {
        DiscountType::Percentage => {
            if value < Decimal::ZERO || value > Decimal::from(100) {
                return Err(ServiceError::ValidationError(
                    "percentage discount must be between 0 and 100".to_string(),
                ));
            }
        }
        DiscountType::Fixed => {
            if value < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "fixed discount must not be negative".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentage_discount_rounds_to_cents() {
        assert_eq!(
            apply_discount(dec!(200.00), DiscountType::Percentage, dec!(10)),
            dec!(180.00)
        );
        assert_eq!(
            apply_discount(dec!(19.99), DiscountType::Percentage, dec!(33)),
            dec!(13.39)
        );
    }

    #[test]
    fn fixed_discount_clamps_at_zero() {
        assert_eq!(
            apply_discount(dec!(15.00), DiscountType::Fixed, dec!(5.00)),
            dec!(10.00)
        );
        assert_eq!(
            apply_discount(dec!(5.00), DiscountType::Fixed, dec!(9.00)),
            dec!(0.00)
        );
    }

    #[test]
    fn hundred_percent_discount_is_free() {
        assert_eq!(
            apply_discount(dec!(42.00), DiscountType::Percentage, dec!(100)),
            dec!(0.00)
        );
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        assert!(validate_discount(DiscountType::Percentage, dec!(101)).is_err());
        assert!(validate_discount(DiscountType::Percentage, dec!(-1)).is_err());
        assert!(validate_discount(DiscountType::Percentage, dec!(0)).is_ok());
        assert!(validate_discount(DiscountType::Percentage, dec!(100)).is_ok());
    }

    #[test]
    fn negative_fixed_discount_is_rejected() {
        assert!(validate_discount(DiscountType::Fixed, dec!(-5)).is_err());
        assert!(validate_discount(DiscountType::Fixed, dec!(0)).is_ok());
    }
}
