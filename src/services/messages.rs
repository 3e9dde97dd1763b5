//! Conversation threads attached to orders.
//!
//! A customer message fans out to the staff and admin notification groups
//! and to the shop inbox; the customer gets a courtesy acknowledgement on
//! their first message of a thread, throttled to once per day after that.
//! Replies from staff are mailed to the order's customer. All delivery is
//! best-effort and never fails the post itself.

use chrono::{Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, QueryOrder};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{order, order_message, user, OrderMessageModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::mailer::{EmailMessage, MailQueue};
use crate::notifications::{Notification, NotificationGroup, NotificationHub};

const ACK_THROTTLE_HOURS: i64 = 24;

#[derive(Clone)]
pub struct MessageService {
    db: DatabaseConnection,
    event_sender: EventSender,
    hub: NotificationHub,
    mail_queue: MailQueue,
    admin_email: String,
}

impl MessageService {
    pub fn new(
        db: DatabaseConnection,
        event_sender: EventSender,
        hub: NotificationHub,
        mail_queue: MailQueue,
        admin_email: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            hub,
            mail_queue,
            admin_email,
        }
    }

    pub async fn list(
        &self,
        order_id: Uuid,
        caller_id: Uuid,
        caller_is_staff: bool,
    ) -> Result<Vec<OrderMessageModel>, ServiceError> {
        self.load_order_for(order_id, caller_id, caller_is_staff)
            .await?;
        Ok(order_message::Entity::find()
            .filter(order_message::Column::OrderId.eq(order_id))
            .order_by_asc(order_message::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    #[instrument(skip(self, content))]
    pub async fn post(
        &self,
        order_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<OrderMessageModel, ServiceError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::ValidationError(
                "message content must not be empty".to_string(),
            ));
        }

        // The stored role comes from the user row, not the token, so a role
        // change takes effect on the next message.
        let sender = user::Entity::find_by_id(sender_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {sender_id} not found")))?;

        let order = self
            .load_order_for(order_id, sender_id, sender.role.is_staff())
            .await?;

        let is_first_or_stale = self.customer_ack_due(order_id, sender_id).await?;

        let message = order_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            sender_id: Set(sender_id),
            sender_role: Set(sender.role),
            content: Set(content.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        if sender.role.is_staff() {
            self.notify_customer(&order, content).await;
        } else {
            self.notify_shop(&order, &sender, content, is_first_or_stale);
        }

        self.event_sender
            .send_or_log(Event::OrderMessagePosted {
                order_id,
                sender_id,
            })
            .await;
        Ok(message)
    }

    async fn load_order_for(
        &self,
        order_id: Uuid,
        caller_id: Uuid,
        caller_is_staff: bool,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;
        if !caller_is_staff && order.user_id != caller_id {
            return Err(ServiceError::NotFound(format!("order {order_id} not found")));
        }
        Ok(order)
    }

    /// True when the sender has not messaged on this order within the
    /// acknowledgement throttle window.
    async fn customer_ack_due(
        &self,
        order_id: Uuid,
        sender_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let last = order_message::Entity::find()
            .filter(order_message::Column::OrderId.eq(order_id))
            .filter(order_message::Column::SenderId.eq(sender_id))
            .order_by_desc(order_message::Column::CreatedAt)
            .one(&self.db)
            .await?;
        Ok(match last {
            Some(msg) => Utc::now() - msg.created_at > Duration::hours(ACK_THROTTLE_HOURS),
            None => true,
        })
    }

    fn notify_shop(
        &self,
        order: &order::Model,
        sender: &user::Model,
        content: &str,
        ack_due: bool,
    ) {
        let summary = format!(
            "New message on order {} from {}: {}",
            order.order_number, sender.email, content
        );
        self.hub
            .publish(NotificationGroup::Staff, Notification::new(summary.clone()));
        self.hub
            .publish(NotificationGroup::Admin, Notification::new(summary.clone()));

        self.mail_queue.enqueue_or_log(EmailMessage {
            to: self.admin_email.clone(),
            subject: format!("New message on order {}", order.order_number),
            body: summary,
        });

        if ack_due {
            self.mail_queue.enqueue_or_log(EmailMessage {
                to: sender.email.clone(),
                subject: format!("We received your message about order {}", order.order_number),
                body: "Thanks for reaching out. Our team has received your message and will \
                       get back to you shortly."
                    .to_string(),
            });
        }
    }

    async fn notify_customer(&self, order: &order::Model, content: &str) {
        match user::Entity::find_by_id(order.user_id).one(&self.db).await {
            Ok(Some(customer)) => {
                self.mail_queue.enqueue_or_log(EmailMessage {
                    to: customer.email,
                    subject: format!("Update on your order {}", order.order_number),
                    body: content.to_string(),
                });
            }
            Ok(None) => {
                tracing::warn!(order_id = %order.id, "order customer no longer exists");
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, "customer lookup failed: {e}");
            }
        }
    }
}
