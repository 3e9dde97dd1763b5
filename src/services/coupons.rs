//! Coupon codes and their redemption ledger.
//!
//! Redemption is a single transaction that re-checks the per-user cap with
//! the coupon row locked (on backends that support row locks), prices the
//! order total, and appends the usage row. Two concurrent redemptions of a
//! limit-1 coupon therefore cannot both succeed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, DbBackend, PaginatorTrait, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{coupon, coupon_usage, CouponModel, CouponUsageModel, DiscountType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::offers::{apply_discount, validate_discount};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCouponInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit_per_user: i32,
    pub minimum_order_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCouponInput {
    pub discount_value: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub usage_limit_per_user: Option<i32>,
    pub minimum_order_amount: Option<Option<Decimal>>,
}

/// Outcome of applying a coupon to an order total.
#[derive(Debug, Clone, Serialize)]
pub struct CouponApplication {
    pub coupon_id: Uuid,
    pub code: String,
    pub original_total: Decimal,
    pub discounted_total: Decimal,
}

#[derive(Clone)]
pub struct CouponService {
    db: DatabaseConnection,
    event_sender: EventSender,
}

impl CouponService {
    pub fn new(db: DatabaseConnection, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_coupon(&self, input: CreateCouponInput) -> Result<CouponModel, ServiceError> {
        validate_discount(input.discount_type, input.discount_value)?;
        let code = input.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ServiceError::ValidationError(
                "coupon code must not be empty".to_string(),
            ));
        }
        if input.end_date <= input.start_date {
            return Err(ServiceError::ValidationError(
                "coupon end date must be after its start date".to_string(),
            ));
        }
        if input.usage_limit_per_user < 1 {
            return Err(ServiceError::ValidationError(
                "usage limit per user must be at least 1".to_string(),
            ));
        }
        if let Some(min) = input.minimum_order_amount {
            if min < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "minimum order amount must not be negative".to_string(),
                ));
            }
        }

        let clash = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&self.db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(format!(
                "coupon code '{code}' already exists"
            )));
        }

        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_active: Set(true),
            usage_limit_per_user: Set(input.usage_limit_per_user),
            minimum_order_amount: Set(input.minimum_order_amount),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::CouponCreated(model.id))
            .await;
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<CouponModel, ServiceError> {
        let existing = self.get_coupon(id).await?;

        let value = input.discount_value.unwrap_or(existing.discount_value);
        validate_discount(existing.discount_type, value)?;
        let start = input.start_date.unwrap_or(existing.start_date);
        let end = input.end_date.unwrap_or(existing.end_date);
        if end <= start {
            return Err(ServiceError::ValidationError(
                "coupon end date must be after its start date".to_string(),
            ));
        }
        if let Some(limit) = input.usage_limit_per_user {
            if limit < 1 {
                return Err(ServiceError::ValidationError(
                    "usage limit per user must be at least 1".to_string(),
                ));
            }
        }

        let mut active: coupon::ActiveModel = existing.into();
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
        if let Some(v) = input.usage_limit_per_user {
            active.usage_limit_per_user = Set(v);
        }
        if let Some(v) = input.minimum_order_amount {
            active.minimum_order_amount = Set(v);
        }
        Ok(active.update(&self.db).await?)
    }

    pub async fn get_coupon(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        coupon::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("coupon {id} not found")))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<CouponModel, ServiceError> {
        let code = code.trim().to_uppercase();
        coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("coupon '{code}' not found")))
    }

    pub async fn list_coupons(&self) -> Result<Vec<CouponModel>, ServiceError> {
        Ok(coupon::Entity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn list_usages(&self, coupon_id: Uuid) -> Result<Vec<CouponUsageModel>, ServiceError> {
        self.get_coupon(coupon_id).await?;
        Ok(coupon_usage::Entity::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon_id))
            .order_by_asc(coupon_usage::Column::UsedAt)
            .all(&self.db)
            .await?)
    }

    /// Checks the coupon against an order total without recording a usage.
    pub async fn preview(
        &self,
        code: &str,
        user_id: Uuid,
        order_total: Decimal,
    ) -> Result<CouponApplication, ServiceError> {
        let coupon = self.find_by_code(code).await?;
        let used = coupon_usage::Entity::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon.id))
            .filter(coupon_usage::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        check_eligibility(&coupon, used, order_total)?;
        Ok(application(&coupon, order_total))
    }

    /// Validates, prices, and records a redemption in one transaction.
    #[instrument(skip(self), fields(code = %code, %user_id))]
    pub async fn redeem(
        &self,
        code: &str,
        user_id: Uuid,
        order_total: Decimal,
    ) -> Result<CouponApplication, ServiceError> {
        let code = code.trim().to_uppercase();
        let txn = self.db.begin().await?;

        let mut query = coupon::Entity::find().filter(coupon::Column::Code.eq(code.clone()));
        // sqlite serializes writers on its own; only postgres needs the lock.
        if self.db.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        let coupon = query
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("coupon '{code}' not found")))?;

        let used = coupon_usage::Entity::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon.id))
            .filter(coupon_usage::Column::UserId.eq(user_id))
            .count(&txn)
            .await?;
        check_eligibility(&coupon, used, order_total)?;

        coupon_usage::ActiveModel {
            id: Set(Uuid::new_v4()),
            coupon_id: Set(coupon.id),
            user_id: Set(user_id),
            used_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponRedeemed {
                coupon_id: coupon.id,
                user_id,
            })
            .await;
        Ok(application(&coupon, order_total))
    }
}

fn check_eligibility(
    coupon: &CouponModel,
    prior_uses: u64,
    order_total: Decimal,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    if !coupon.is_active || now < coupon.start_date || now > coupon.end_date {
        return Err(ServiceError::Ineligible(
            "this coupon is not currently valid".to_string(),
        ));
    }
    if let Some(min) = coupon.minimum_order_amount {
        if order_total < min {
            return Err(ServiceError::Ineligible(format!(
                "this coupon requires a minimum order of {min}"
            )));
        }
    }
    if prior_uses >= coupon.usage_limit_per_user as u64 {
        return Err(ServiceError::Ineligible(
            "you have already used this coupon the maximum number of times".to_string(),
        ));
    }
    Ok(())
}

fn application(coupon: &CouponModel, order_total: Decimal) -> CouponApplication {
    CouponApplication {
        coupon_id: coupon.id,
        code: coupon.code.clone(),
        original_total: order_total,
        discounted_total: apply_discount(order_total, coupon.discount_type, coupon.discount_value),
    }
}
