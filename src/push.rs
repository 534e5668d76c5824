//! One-way event delivery to connected clients.
//!
//! The engine publishes through the `PushChannel` trait; the bundled
//! implementation fans events out over per-client unbounded channels. Events
//! are only ever delivered to the client that owns the scan session.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tracing::debug;

use crate::storage::{ArbitrageSettings, EnrichedOpportunity};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum PushEvent {
    ArbitrageScannerStarted(ArbitrageSettings),
    ArbitrageOpportunities(Vec<EnrichedOpportunity>),
    NewArbitrageOpportunity(Box<EnrichedOpportunity>),
    ArbitrageScannerStopped,
    Error { message: String },
}

#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn send(&self, client_id: &str, event: PushEvent);
}

/// In-process push channel: one subscriber stream per client id
#[derive(Default)]
pub struct ClientPushChannel {
    senders: RwLock<HashMap<String, UnboundedSender<PushEvent>>>,
}

impl ClientPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the subscriber stream for a client
    pub async fn subscribe(&self, client_id: &str) -> UnboundedReceiver<PushEvent> {
        let (tx, rx) = unbounded_channel();
        let mut senders = self.senders.write().await;
        senders.insert(client_id.to_string(), tx);
        rx
    }

    pub async fn unsubscribe(&self, client_id: &str) {
        let mut senders = self.senders.write().await;
        senders.remove(client_id);
    }
}

#[async_trait]
impl PushChannel for ClientPushChannel {
    async fn send(&self, client_id: &str, event: PushEvent) {
        let senders = self.senders.read().await;
        match senders.get(client_id) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("Client {} subscriber is gone, event dropped", client_id);
                }
            }
            None => debug!("No subscriber for client {}, event dropped", client_id),
        }
    }
}
