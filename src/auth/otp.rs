//! One-time-passcode login. A four digit code is mailed to the address and a
//! successful verification mints a token pair, creating the user on first login.

use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::{AuthService, TokenPair};
use crate::entities::{otp_code, user, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::mailer::{EmailMessage, MailQueue};

const OTP_MIN: u32 = 1000;
const OTP_MAX: u32 = 9999;

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedLogin {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub created: bool,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct OtpService {
    db: DatabaseConnection,
    auth: std::sync::Arc<AuthService>,
    mail_queue: MailQueue,
    event_sender: EventSender,
    ttl_secs: i64,
}

impl OtpService {
    pub fn new(
        db: DatabaseConnection,
        auth: std::sync::Arc<AuthService>,
        mail_queue: MailQueue,
        event_sender: EventSender,
        ttl_secs: u64,
    ) -> Self {
        Self {
            db,
            auth,
            mail_queue,
            event_sender,
            ttl_secs: ttl_secs as i64,
        }
    }

    /// Issues a fresh code for the address, replacing any previous one, and
    /// queues the delivery email. The code itself never reaches the logs.
    #[instrument(skip(self))]
    pub async fn request(&self, email: &str) -> Result<(), ServiceError> {
        let email = normalize_email(email)?;
        let code = generate_code();

        if let Some(existing) = otp_code::Entity::find()
            .filter(otp_code::Column::Email.eq(email.clone()))
            .one(&self.db)
            .await?
        {
            let mut active: otp_code::ActiveModel = existing.into();
            active.code = Set(code.clone());
            active.created_at = Set(Utc::now());
            active.update(&self.db).await?;
        } else {
            otp_code::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(email.clone()),
                code: Set(code.clone()),
                created_at: Set(Utc::now()),
            }
            .insert(&self.db)
            .await?;
        }

        self.mail_queue.enqueue_or_log(EmailMessage {
            to: email.clone(),
            subject: "Your OTP Code".to_string(),
            body: format!(
                "Your OTP code is {code}. It is valid for the next 5 minutes."
            ),
        });
        self.event_sender
            .send_or_log(Event::OtpIssued { email })
            .await;
        Ok(())
    }

    /// Checks the code against the stored one, then logs the user in,
    /// registering them first if the address is new.
    #[instrument(skip(self, code))]
    pub async fn verify(&self, email: &str, code: &str) -> Result<VerifiedLogin, ServiceError> {
        let email = normalize_email(email)?;

        let stored = otp_code::Entity::find()
            .filter(otp_code::Column::Email.eq(email.clone()))
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("invalid or expired code".to_string()))?;

        let expired = Utc::now() - stored.created_at > Duration::seconds(self.ttl_secs);
        if expired || stored.code != code {
            return Err(ServiceError::Unauthorized(
                "invalid or expired code".to_string(),
            ));
        }

        // Single use: consume the row whether or not the user exists yet.
        otp_code::Entity::delete_by_id(stored.id)
            .exec(&self.db)
            .await?;

        let (user, created) = self.get_or_create_user(&email).await?;
        if created {
            self.event_sender
                .send_or_log(Event::UserRegistered(user.id))
                .await;
        }

        let tokens = self
            .auth
            .issue_token_pair(user.id, &user.email, user.role.clone())?;
        Ok(VerifiedLogin {
            user_id: user.id,
            email: user.email,
            role: user.role,
            created,
            tokens,
        })
    }

    async fn get_or_create_user(&self, email: &str) -> Result<(user::Model, bool), ServiceError> {
        if let Some(existing) = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
        {
            return Ok((existing, false));
        }

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            username: Set(email.to_string()),
            phone: Set(None),
            role: Set(UserRole::Customer),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok((created, true))
    }
}

fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::ValidationError(
            "a valid email address is required".to_string(),
        ));
    }
    Ok(email)
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX).to_string()
}
