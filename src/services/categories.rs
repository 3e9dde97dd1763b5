//! Category tree management.
//!
//! Categories form a forest: each category optionally points at a parent.
//! Reparenting is validated against cycles by walking the ancestor chain of
//! the proposed parent before committing.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{category, CategoryModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 3, message = "category name must be at least 3 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 3, message = "category name must be at least 3 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` detaches the category to the root level.
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// A category together with its (recursively nested) children.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: CategoryModel,
    pub children: Vec<CategoryNode>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: DatabaseConnection,
    event_sender: EventSender,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        if let Some(parent_id) = input.parent_id {
            category::Entity::find_by_id(parent_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("parent category {parent_id} not found"))
                })?;
        } else {
            // Root names are unique; nested names are free to repeat.
            let clash = category::Entity::find()
                .filter(category::Column::ParentId.is_null())
                .filter(category::Column::Name.eq(input.name.clone()))
                .one(&self.db)
                .await?;
            if clash.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "a root category named '{}' already exists",
                    input.name
                )));
            }
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            parent_id: Set(input.parent_id),
            is_active: Set(true),
        }
        .insert(&self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(model.id))
            .await;
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        let existing = self.get_category(id).await?;

        if let Some(new_parent) = input.parent_id {
            self.check_reparent(id, new_parent).await?;
        }

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(parent_id) = input.parent_id {
            active.parent_id = Set(parent_id);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        Ok(active.update(&self.db).await?)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<CategoryModel, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {id} not found")))
    }

    /// Parent chain from the category up to its root, nearest parent first.
    /// The category itself is not part of the chain, so a root yields an
    /// empty list. Bails out if a pre-existing cycle is encountered.
    pub async fn get_ancestors(&self, id: Uuid) -> Result<Vec<CategoryModel>, ServiceError> {
        let start = self.get_category(id).await?;

        let mut chain = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();
        seen.insert(start.id);
        let mut cursor = match start.parent_id {
            Some(pid) => category::Entity::find_by_id(pid).one(&self.db).await?,
            None => None,
        };

        while let Some(current) = cursor {
            if !seen.insert(current.id) {
                return Err(ServiceError::Conflict(
                    "category hierarchy contains a cycle".to_string(),
                ));
            }
            let parent_id = current.parent_id;
            chain.push(current);
            cursor = match parent_id {
                Some(pid) => category::Entity::find_by_id(pid).one(&self.db).await?,
                None => None,
            };
        }
        Ok(chain)
    }

    /// All active categories beneath the given one, depth-first, excluding
    /// the category itself.
    pub async fn get_descendants(&self, id: Uuid) -> Result<Vec<CategoryModel>, ServiceError> {
        self.get_category(id).await?;

        let mut result = Vec::new();
        let mut stack = vec![id];
        let mut seen: HashSet<Uuid> = HashSet::new();
        seen.insert(id);

        while let Some(current) = stack.pop() {
            let children = category::Entity::find()
                .filter(category::Column::ParentId.eq(current))
                .filter(category::Column::IsActive.eq(true))
                .order_by_asc(category::Column::Name)
                .all(&self.db)
                .await?;
            for child in children {
                if seen.insert(child.id) {
                    stack.push(child.id);
                    result.push(child);
                }
            }
        }
        Ok(result)
    }

    /// The full active forest as nested nodes, roots ordered by name.
    pub async fn list_tree(&self) -> Result<Vec<CategoryNode>, ServiceError> {
        let all = category::Entity::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?;

        let mut by_parent: std::collections::HashMap<Option<Uuid>, Vec<CategoryModel>> =
            std::collections::HashMap::new();
        for cat in all {
            by_parent.entry(cat.parent_id).or_default().push(cat);
        }

        fn build(
            parent: Option<Uuid>,
            by_parent: &std::collections::HashMap<Option<Uuid>, Vec<CategoryModel>>,
        ) -> Vec<CategoryNode> {
            by_parent
                .get(&parent)
                .map(|cats| {
                    cats.iter()
                        .map(|cat| CategoryNode {
                            category: cat.clone(),
                            children: build(Some(cat.id), by_parent),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }

        Ok(build(None, &by_parent))
    }

    async fn check_reparent(
        &self,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let Some(parent_id) = new_parent else {
            return Ok(());
        };
        if parent_id == id {
            return Err(ServiceError::Conflict(
                "a category cannot be its own parent".to_string(),
            ));
        }
        let parent_chain = self.get_ancestors(parent_id).await?;
        if parent_chain.iter().any(|c| c.id == id) {
            return Err(ServiceError::Conflict(
                "reparenting would create a cycle in the category tree".to_string(),
            ));
        }
        Ok(())
    }
}
