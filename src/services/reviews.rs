//! Product reviews with staff moderation. New reviews start unapproved and
//! only approved ones appear in the public listing.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{product, review, ReviewModel};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewInput {
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewInput {
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

#[derive(Clone)]
pub struct ReviewService {
    db: DatabaseConnection,
}

impl ReviewService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: CreateReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        check_rating(input.rating)?;
        if input.comment.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "review comment must not be empty".to_string(),
            ));
        }
        product::Entity::find_by_id(product_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {product_id} not found")))?;

        let existing = review::Entity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "you have already reviewed this product".to_string(),
            ));
        }

        Ok(review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            user_id: Set(user_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            approved: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?)
    }

    /// Public listing: approved reviews only, newest first.
    pub async fn list_approved(&self, product_id: Uuid) -> Result<Vec<ReviewModel>, ServiceError> {
        Ok(review::Entity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::Approved.eq(true))
            .order_by_desc(review::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Moderation listing: everything, newest first.
    pub async fn list_all(&self, product_id: Uuid) -> Result<Vec<ReviewModel>, ServiceError> {
        Ok(review::Entity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Authors can amend their own review; doing so sends it back through
    /// moderation.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        user_id: Uuid,
        review_id: Uuid,
        input: UpdateReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        if let Some(rating) = input.rating {
            check_rating(rating)?;
        }
        let existing = review::Entity::find_by_id(review_id)
            .filter(review::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("review {review_id} not found")))?;

        let mut active: review::ActiveModel = existing.into();
        if let Some(rating) = input.rating {
            active.rating = Set(rating);
        }
        if let Some(comment) = input.comment {
            if comment.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "review comment must not be empty".to_string(),
                ));
            }
            active.comment = Set(comment);
        }
        active.approved = Set(false);
        Ok(active.update(&self.db).await?)
    }

    pub async fn approve(&self, review_id: Uuid) -> Result<ReviewModel, ServiceError> {
        let existing = review::Entity::find_by_id(review_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("review {review_id} not found")))?;
        let mut active: review::ActiveModel = existing.into();
        active.approved = Set(true);
        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, review_id: Uuid) -> Result<(), ServiceError> {
        let existing = review::Entity::find_by_id(review_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("review {review_id} not found")))?;
        existing.delete(&self.db).await?;
        Ok(())
    }
}

fn check_rating(rating: i16) -> Result<(), ServiceError> {
    if !(1..=5).contains(&rating) {
        return Err(ServiceError::ValidationError(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(check_rating(0).is_err());
        assert!(check_rating(1).is_ok());
        assert!(check_rating(5).is_ok());
        assert!(check_rating(6).is_err());
    }
}
