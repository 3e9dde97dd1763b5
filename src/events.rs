use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events emitted by the service layer. Consumers are best-effort; a full
/// channel or missing receiver never fails the triggering request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog
    CategoryCreated(Uuid),
    ProductCreated(Uuid),
    VariantCreated { product_id: Uuid, variant_id: Uuid },
    OfferCreated(Uuid),

    // Identity
    OtpIssued { email: String },
    UserRegistered(Uuid),

    // Cart / wishlist
    CartUpdated { user_id: Uuid, product_id: Uuid },
    WishlistItemAdded { user_id: Uuid, product_id: Uuid },

    // Orders
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderMessagePosted { order_id: Uuid, sender_id: Uuid },

    // Coupons
    CouponCreated(Uuid),
    CouponRedeemed { coupon_id: Uuid, user_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {e}"))
    }

    /// Sends an event, logging instead of propagating failure.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("event dropped: {e}");
        }
    }
}

/// Drains the event channel, logging each event. Domain side effects that
/// must not fail the request (e.g. audit trails) hang off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(%order_id, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::CouponRedeemed { coupon_id, user_id } => {
                info!(%coupon_id, %user_id, "coupon redeemed");
            }
            Event::OtpIssued { email } => {
                // Never log the code itself.
                debug!(%email, "otp issued");
            }
            other => {
                debug!(?other, "event processed");
            }
        }
    }

    warn!("event processing loop has ended");
}
