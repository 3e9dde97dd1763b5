//! Per-user cart lines.
//!
//! The cart has no header row: a line is keyed by (user, product, variant).
//! Quantity updates are deltas; a line whose quantity drops to zero or below
//! is removed, and a negative delta against a missing line is a no-op.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder, TransactionTrait};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{
    cart_item, product, product_variant, CartItemModel, ProductModel, ProductVariantModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// A cart line joined with its product data, priced at current catalog prices.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: CartItemModel,
    pub product: ProductModel,
    pub variant: Option<ProductVariantModel>,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
}

#[derive(Clone)]
pub struct CartService {
    db: DatabaseConnection,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: DatabaseConnection, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Applies a quantity delta to the (product, variant) line.
    ///
    /// Returns the resulting line, or `None` when the line was removed or
    /// never existed.
    #[instrument(skip(self))]
    pub async fn add_or_update(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        delta: i32,
    ) -> Result<Option<CartItemModel>, ServiceError> {
        self.check_target(product_id, variant_id).await?;

        let txn = self.db.begin().await?;
        let existing = find_line(&txn, user_id, product_id, variant_id).await?;

        let result = match existing {
            Some(line) => {
                let new_quantity = line.quantity + delta;
                if new_quantity <= 0 {
                    line.delete(&txn).await?;
                    None
                } else {
                    let mut active: cart_item::ActiveModel = line.into();
                    active.quantity = Set(new_quantity);
                    active.updated_at = Set(Utc::now());
                    Some(active.update(&txn).await?)
                }
            }
            None if delta > 0 => Some(
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    variant_id: Set(variant_id),
                    quantity: Set(delta),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?,
            ),
            None => None,
        };
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated {
                user_id,
                product_id,
            })
            .await;
        Ok(result)
    }

    /// Sets a line to an absolute quantity; zero or less removes it.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<Option<CartItemModel>, ServiceError> {
        self.check_target(product_id, variant_id).await?;

        let txn = self.db.begin().await?;
        let existing = find_line(&txn, user_id, product_id, variant_id).await?;

        let result = match (existing, quantity) {
            (Some(line), q) if q <= 0 => {
                line.delete(&txn).await?;
                None
            }
            (Some(line), q) => {
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(q);
                active.updated_at = Set(Utc::now());
                Some(active.update(&txn).await?)
            }
            (None, q) if q > 0 => Some(
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    variant_id: Set(variant_id),
                    quantity: Set(q),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?,
            ),
            (None, _) => None,
        };
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated {
                user_id,
                product_id,
            })
            .await;
        Ok(result)
    }

    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let line = cart_item::Entity::find_by_id(item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cart item {item_id} not found")))?;
        line.delete(&self.db).await?;
        Ok(())
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// The user's cart with lines priced at current catalog prices, variant
    /// price taking precedence over the product price.
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let items = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut lines = Vec::with_capacity(items.len());
        let mut total = Decimal::ZERO;
        for item in items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("product {} not found", item.product_id))
                })?;
            let variant = match item.variant_id {
                Some(vid) => product_variant::Entity::find_by_id(vid).one(&self.db).await?,
                None => None,
            };
            let unit_price = variant
                .as_ref()
                .map(|v| v.current_price)
                .unwrap_or(product.current_price);
            let line_total = unit_price * Decimal::from(item.quantity);
            total += line_total;
            lines.push(CartLine {
                item,
                product,
                variant,
                unit_price,
                line_total,
            });
        }

        Ok(CartView { lines, total })
    }

    async fn check_target(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {product_id} not found")))?;
        if let Some(vid) = variant_id {
            let variant = product_variant::Entity::find_by_id(vid)
                .one(&self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("variant {vid} not found")))?;
            if variant.product_id != product_id {
                return Err(ServiceError::ValidationError(
                    "variant does not belong to that product".to_string(),
                ));
            }
        }
        Ok(())
    }
}

async fn find_line<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
) -> Result<Option<CartItemModel>, ServiceError> {
    let mut query = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ProductId.eq(product_id));
    query = match variant_id {
        Some(vid) => query.filter(cart_item::Column::VariantId.eq(vid)),
        None => query.filter(cart_item::Column::VariantId.is_null()),
    };
    Ok(query.one(conn).await?)
}
