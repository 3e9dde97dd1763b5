//! Outbound mail. Delivery is behind the [`Mailer`] trait; OTP and
//! notification mail is pushed onto a bounded queue drained by a background
//! worker, so requests never wait on the mail provider.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Default mailer: logs the delivery. Stands in for an SMTP/provider client
/// behind the same trait.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "email delivered (log transport)");
        Ok(())
    }
}

/// Handle for enqueueing mail jobs; cheap to clone.
#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::Sender<EmailMessage>,
}

impl MailQueue {
    /// Creates the queue and spawns the worker draining it.
    pub fn start(mailer: std::sync::Arc<dyn Mailer>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(run_mail_worker(rx, mailer));
        Self { sender: tx }
    }

    /// Fire-and-forget enqueue; a full or closed queue is logged, never
    /// surfaced to the caller.
    pub fn enqueue_or_log(&self, message: EmailMessage) {
        if let Err(e) = self.sender.try_send(message) {
            warn!("mail job dropped: {e}");
        }
    }
}

async fn run_mail_worker(
    mut rx: mpsc::Receiver<EmailMessage>,
    mailer: std::sync::Arc<dyn Mailer>,
) {
    info!("mail worker started");
    while let Some(job) = rx.recv().await {
        if let Err(e) = mailer.send(&job).await {
            error!(to = %job.to, "mail delivery failed: {e}");
        }
    }
    warn!("mail worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct RecordingMailer {
        sent: Arc<Mutex<Vec<EmailMessage>>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn queued_mail_reaches_the_mailer() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let queue = MailQueue::start(
            Arc::new(RecordingMailer { sent: sent.clone() }),
            8,
        );

        queue.enqueue_or_log(EmailMessage {
            to: "user@example.com".into(),
            subject: "Your OTP Code".into(),
            body: "Your OTP code is 1234.".into(),
        });

        // Worker runs on the same runtime; yield until it drains the job.
        for _ in 0..50 {
            if !sent.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let sent = sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "user@example.com");
    }
}
