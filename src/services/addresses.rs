//! Shipping addresses. All operations are scoped to the owning user; at
//! most one address per user is flagged as the default.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder, TransactionTrait};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{address, AddressModel};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAddressInput {
    #[validate(length(min = 1, message = "address line must not be empty"))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, message = "city must not be empty"))]
    pub city: String,
    #[validate(length(min = 1, message = "state must not be empty"))]
    pub state: String,
    #[validate(length(min = 1, message = "postal code must not be empty"))]
    pub postal_code: String,
    #[validate(length(min = 2, message = "country must not be empty"))]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAddressInput {
    #[validate(length(min = 1, message = "address line must not be empty"))]
    pub line1: Option<String>,
    pub line2: Option<String>,
    #[validate(length(min = 1, message = "city must not be empty"))]
    pub city: Option<String>,
    #[validate(length(min = 1, message = "state must not be empty"))]
    pub state: Option<String>,
    #[validate(length(min = 1, message = "postal code must not be empty"))]
    pub postal_code: Option<String>,
    #[validate(length(min = 2, message = "country must not be empty"))]
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Clone)]
pub struct AddressService {
    db: DatabaseConnection,
}

impl AddressService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateAddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        if input.is_default {
            clear_default(&txn, user_id).await?;
        }
        let model = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            line1: Set(input.line1),
            line2: Set(input.line2),
            city: Set(input.city),
            state: Set(input.state),
            postal_code: Set(input.postal_code),
            country: Set(input.country),
            is_default: Set(input.is_default),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: UpdateAddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;

        let existing = self.get(user_id, address_id).await?;

        let txn = self.db.begin().await?;
        if input.is_default == Some(true) && !existing.is_default {
            clear_default(&txn, user_id).await?;
        }

        let mut active: address::ActiveModel = existing.into();
        if let Some(v) = input.line1 {
            active.line1 = Set(v);
        }
        if let Some(v) = input.line2 {
            active.line2 = Set(Some(v));
        }
        if let Some(v) = input.city {
            active.city = Set(v);
        }
        if let Some(v) = input.state {
            active.state = Set(v);
        }
        if let Some(v) = input.postal_code {
            active.postal_code = Set(v);
        }
        if let Some(v) = input.country {
            active.country = Set(v);
        }
        if let Some(v) = input.is_default {
            active.is_default = Set(v);
        }
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn get(&self, user_id: Uuid, address_id: Uuid) -> Result<AddressModel, ServiceError> {
        address::Entity::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("address {address_id} not found")))
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<AddressModel>, ServiceError> {
        Ok(address::Entity::find()
            .filter(address::Column::UserId.eq(user_id))
            .order_by_desc(address::Column::IsDefault)
            .order_by_desc(address::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn delete(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(user_id, address_id).await?;
        existing.delete(&self.db).await?;
        Ok(())
    }
}

async fn clear_default<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<(), ServiceError> {
    use sea_orm::sea_query::Expr;
    address::Entity::update_many()
        .col_expr(address::Column::IsDefault, Expr::value(false))
        .filter(address::Column::UserId.eq(user_id))
        .filter(address::Column::IsDefault.eq(true))
        .exec(conn)
        .await?;
    Ok(())
}
