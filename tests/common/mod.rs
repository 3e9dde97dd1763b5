use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use storefront_api::{
    db::{establish_connection_with_config, DbConfig},
    entities::{category, product, product_variant, user, UserRole},
    events::EventSender,
    mailer::{EmailMessage, MailError, MailQueue, Mailer},
    schema,
};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with the full schema.
pub struct TestApp {
    pub db: DatabaseConnection,
    pub event_sender: EventSender,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = establish_connection_with_config(&config)
            .await
            .expect("failed to create test database");
        schema::create_all_tables(&db)
            .await
            .expect("failed to create schema");

        let (tx, rx) = mpsc::channel(64);
        let event_task = tokio::spawn(storefront_api::events::process_events(rx));

        Self {
            db,
            event_sender: EventSender::new(tx),
            _event_task: event_task,
        }
    }

    pub async fn seed_user(&self, email: &str, role: UserRole) -> user::Model {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            username: Set(email.to_string()),
            phone: Set(None),
            role: Set(role),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .expect("failed to seed user")
    }

    pub async fn seed_category(&self, name: &str, parent_id: Option<Uuid>) -> category::Model {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            parent_id: Set(parent_id),
            is_active: Set(true),
        }
        .insert(&self.db)
        .await
        .expect("failed to seed category")
    }

    pub async fn seed_product(
        &self,
        category_id: Uuid,
        name: &str,
        price: Decimal,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(category_id),
            name: Set(name.to_string()),
            description: Set(format!("{name} description")),
            sku: Set(format!("SKU-{}", Uuid::new_v4())),
            original_price: Set(price),
            current_price: Set(price),
            stock: Set(100),
            tags: Set(None),
            image_url: Set(None),
        }
        .insert(&self.db)
        .await
        .expect("failed to seed product")
    }

    #[allow(dead_code)]
    pub async fn seed_variant(&self, product_id: Uuid, price: Decimal) -> product_variant::Model {
        product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            original_price: Set(price),
            current_price: Set(price),
            stock: Set(50),
        }
        .insert(&self.db)
        .await
        .expect("failed to seed variant")
    }
}

/// Mailer that records every message for assertions.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

#[allow(dead_code)]
impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    /// Polls until at least `count` messages have been delivered.
    pub async fn wait_for(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            let sent = self.sent.lock().await;
            if sent.len() >= count {
                return sent.clone();
            }
            drop(sent);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Spawns a mail queue backed by a recording mailer.
#[allow(dead_code)]
pub fn recording_mail_queue() -> (MailQueue, RecordingMailer) {
    let mailer = RecordingMailer::new();
    let queue = MailQueue::start(Arc::new(mailer.clone()), 64);
    (queue, mailer)
}
