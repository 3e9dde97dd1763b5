//! Site testimonials, managed by staff and listed publicly.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{testimonial, TestimonialModel};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTestimonialInput {
    pub author_name: String,
    pub content: String,
    pub rating: Option<i16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTestimonialInput {
    pub author_name: Option<String>,
    pub content: Option<String>,
    pub rating: Option<Option<i16>>,
}

#[derive(Clone)]
pub struct TestimonialService {
    db: DatabaseConnection,
}

impl TestimonialService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        input: CreateTestimonialInput,
    ) -> Result<TestimonialModel, ServiceError> {
        if input.author_name.trim().is_empty() || input.content.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "author name and content must not be empty".to_string(),
            ));
        }
        if let Some(rating) = input.rating {
            if !(1..=5).contains(&rating) {
                return Err(ServiceError::ValidationError(
                    "rating must be between 1 and 5".to_string(),
                ));
            }
        }
        Ok(testimonial::ActiveModel {
            id: Set(Uuid::new_v4()),
            author_name: Set(input.author_name),
            content: Set(input.content),
            rating: Set(input.rating),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<TestimonialModel, ServiceError> {
        testimonial::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("testimonial {id} not found")))
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateTestimonialInput,
    ) -> Result<TestimonialModel, ServiceError> {
        let existing = self.get(id).await?;

        if let Some(name) = &input.author_name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "author name must not be empty".to_string(),
                ));
            }
        }
        if let Some(content) = &input.content {
            if content.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "content must not be empty".to_string(),
                ));
            }
        }
        if let Some(Some(rating)) = input.rating {
            if !(1..=5).contains(&rating) {
                return Err(ServiceError::ValidationError(
                    "rating must be between 1 and 5".to_string(),
                ));
            }
        }

        let mut active: testimonial::ActiveModel = existing.into();
        if let Some(name) = input.author_name {
            active.author_name = Set(name);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(rating) = input.rating {
            active.rating = Set(rating);
        }
        Ok(active.update(&self.db).await?)
    }

    pub async fn list(&self) -> Result<Vec<TestimonialModel>, ServiceError> {
        Ok(testimonial::Entity::find()
            .order_by_desc(testimonial::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = testimonial::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("testimonial {id} not found")))?;
        existing.delete(&self.db).await?;
        Ok(())
    }
}
