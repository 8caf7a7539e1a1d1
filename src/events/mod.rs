use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Domain events emitted after a mutating operation commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),

    StockReceived {
        product_id: Uuid,
        quantity: i32,
        new_quantity: i32,
    },
    StockIssued {
        product_id: Uuid,
        quantity: i32,
        new_quantity: i32,
        total_value: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Background task draining the event channel. Downstream consumers
/// (notifications, sync jobs) would hang off this loop; for now every event
/// is logged.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::StockReceived {
                product_id,
                quantity,
                new_quantity,
            } => {
                info!(
                    %product_id,
                    quantity,
                    new_quantity,
                    "stock received"
                );
            }
            Event::StockIssued {
                product_id,
                quantity,
                new_quantity,
                total_value,
            } => {
                info!(
                    %product_id,
                    quantity,
                    new_quantity,
                    %total_value,
                    "stock issued"
                );
            }
            other => info!(event = ?other, "domain event"),
        }
    }
    info!("Event channel closed; event processor exiting");
}
