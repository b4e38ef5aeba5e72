//! In-process event channel. Services emit domain events after a
//! successful mutation; a background task consumes and logs them. The
//! channel is fire-and-forget: a full or closed channel never fails the
//! originating request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    OrderArchived(Uuid),
    StockImported {
        warehouse_id: Uuid,
        cell_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    },
    StockExported {
        warehouse_id: Uuid,
        cell_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    },
    BatchReconciled {
        batch_id: Uuid,
        current_quantity: Decimal,
    },
    CellPurged(Uuid),
    ProductCleared {
        cell_id: Uuid,
    },
    WarehouseResized {
        warehouse_id: Uuid,
        width: i32,
        height: i32,
    },
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
}

/// Background consumer. Runs until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                order_number,
            } => {
                info!(%order_id, %order_number, "order created");
            }
            Event::BatchReconciled {
                batch_id,
                current_quantity,
            } => {
                info!(%batch_id, %current_quantity, "batch reconciled");
            }
            other => {
                info!(event = ?other, "event processed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender.send(Event::OrderArchived(Uuid::new_v4())).await.unwrap();
        assert!(matches!(rx.recv().await, Some(Event::OrderArchived(_))));
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender
            .send(Event::CellPurged(Uuid::new_v4()))
            .await
            .is_err());
    }
}
