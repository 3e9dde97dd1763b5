//! Per-user wishlist. A product appears at most once per user.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{product, wishlist_item, ProductModel, WishlistItemModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntry {
    pub item: WishlistItemModel,
    pub product: ProductModel,
}

#[derive(Clone)]
pub struct WishlistService {
    db: DatabaseConnection,
    event_sender: EventSender,
}

impl WishlistService {
    pub fn new(db: DatabaseConnection, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistItemModel, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {product_id} not found")))?;

        let existing = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "product is already on the wishlist".to_string(),
            ));
        }

        let model = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::WishlistItemAdded {
                user_id,
                product_id,
            })
            .await;
        Ok(model)
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        let existing = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("product is not on the wishlist".to_string())
            })?;
        existing.delete(&self.db).await?;
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>, ServiceError> {
        let items = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .order_by_desc(wishlist_item::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("product {} not found", item.product_id))
                })?;
            entries.push(WishlistEntry { item, product });
        }
        Ok(entries)
    }
}
