//! Order creation and lifecycle.
//!
//! Totals are computed from stored catalog prices (variant price when the
//! line has one, product price otherwise). Promotional pricing is a display
//! concern and never feeds the order total; coupons adjust the charged
//! amount downstream of this module.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder, TransactionTrait};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{
    cart_item, order, order_item, product, product_variant, OrderItemModel, OrderModel,
    OrderStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

#[derive(Clone)]
pub struct OrderService {
    db: DatabaseConnection,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: DatabaseConnection, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Places an order for a single product line, bypassing the cart.
    #[instrument(skip(self))]
    pub async fn buy_now(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<OrderDetail, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        self.create_order(user_id, vec![(product_id, variant_id, quantity)])
            .await
    }

    /// Places an order for everything currently in the user's cart.
    ///
    /// The cart is left untouched; the client clears it once it has shown
    /// the confirmation.
    #[instrument(skip(self))]
    pub async fn create_from_cart(&self, user_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let cart = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&self.db)
            .await?;
        if cart.is_empty() {
            return Err(ServiceError::ValidationError(
                "cannot place an order from an empty cart".to_string(),
            ));
        }

        let lines = cart
            .into_iter()
            .map(|item| (item.product_id, item.variant_id, item.quantity))
            .collect();
        self.create_order(user_id, lines).await
    }

    async fn create_order(
        &self,
        user_id: Uuid,
        lines: Vec<(Uuid, Option<Uuid>, i32)>,
    ) -> Result<OrderDetail, ServiceError> {
        let txn = self.db.begin().await?;

        let mut total = Decimal::ZERO;
        let mut priced_lines = Vec::with_capacity(lines.len());
        for (product_id, variant_id, quantity) in lines {
            let unit_price = line_unit_price(&txn, product_id, variant_id).await?;
            total += unit_price * Decimal::from(quantity);
            priced_lines.push((product_id, variant_id, quantity));
        }

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            order_number: Set(generate_order_number()),
            status: Set(OrderStatus::Pending),
            total_price: Set(total.round_dp(2)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(priced_lines.len());
        for (product_id, variant_id, quantity) in priced_lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(product_id),
                variant_id: Set(variant_id),
                quantity: Set(quantity),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;
        Ok(OrderDetail { order, items })
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Fetches an order, limited to its owner unless the caller is staff.
    pub async fn get_for_user(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        is_staff: bool,
    ) -> Result<OrderDetail, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;
        if !is_staff && order.user_id != user_id {
            return Err(ServiceError::NotFound(format!("order {order_id} not found")));
        }
        let items = order
            .find_related(order_item::Entity)
            .all(&self.db)
            .await?;
        Ok(OrderDetail { order, items })
    }

    pub async fn list_all(&self) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let existing = order::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;

        let old_status = existing.status;
        if old_status == new_status {
            return Ok(existing);
        }
        if matches!(old_status, OrderStatus::Delivered | OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidOperation(format!(
                "order is already {old_status} and cannot change status"
            )));
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
            })
            .await;
        Ok(updated)
    }

    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let existing = order::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;

        let txn = self.db.begin().await?;
        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        existing.delete(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

async fn line_unit_price<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variant_id: Option<Uuid>,
) -> Result<Decimal, ServiceError> {
    if let Some(vid) = variant_id {
        let variant = product_variant::Entity::find_by_id(vid)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("variant {vid} not found")))?;
        if variant.product_id != product_id {
            return Err(ServiceError::ValidationError(
                "variant does not belong to that product".to_string(),
            ));
        }
        return Ok(variant.current_price);
    }
    let product = product::Entity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("product {product_id} not found")))?;
    Ok(product.current_price)
}

fn generate_order_number() -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("ORD-{}-{:04X}", Utc::now().timestamp(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_have_the_expected_shape() {
        let number = generate_order_number();
        assert!(number.starts_with("ORD-"));
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 4);
    }
}
