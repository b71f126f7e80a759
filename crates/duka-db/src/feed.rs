//! # Change Feed
//!
//! In-process notifications of committed writes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository write ──► COMMIT ──► ChangeFeed::publish(event)             │
//! │                                        │                                │
//! │                          tokio::sync::broadcast                         │
//! │                     ┌──────────────────┼──────────────────┐             │
//! │                     ▼                  ▼                  ▼             │
//! │            subscribe("shop-a")  subscribe("shop-a")  subscribe("shop-b")│
//! │            catalog cache        report view          (other shop)      │
//! │                                                                         │
//! │  Subscribers re-run `list` for the entity; events carry no payload.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are only published after the write is durable, so a subscriber
//! that re-lists always sees the change.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Buffered events per subscriber before it starts lagging.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Product,
    Sale,
    Expense,
    DailyRecord,
    /// Every entity; used when a subscriber has missed events.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Events were dropped; re-list everything.
    Resync,
}

/// One committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub shop_id: String,
    pub entity: Entity,
    pub kind: ChangeKind,
    pub id: String,
}

impl ChangeEvent {
    pub fn new(shop_id: impl Into<String>, entity: Entity, kind: ChangeKind, id: impl Into<String>) -> Self {
        ChangeEvent {
            shop_id: shop_id.into(),
            entity,
            kind,
            id: id.into(),
        }
    }

    fn resync(shop_id: &str) -> Self {
        ChangeEvent::new(shop_id, Entity::All, ChangeKind::Resync, "")
    }

    /// Whether a subscriber interested in `entity` should re-list.
    pub fn touches(&self, entity: Entity) -> bool {
        self.entity == entity || self.entity == Entity::All
    }
}

/// Publisher side, shared by every repository of a [`crate::Database`].
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        ChangeFeed { tx }
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        debug!(
            shop_id = %event.shop_id,
            entity = ?event.entity,
            kind = ?event.kind,
            id = %event.id,
            "Change published"
        );
        let _ = self.tx.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Subscribes to the changes of one shop.
    pub fn subscribe(&self, shop_id: impl Into<String>) -> ChangeSubscription {
        ChangeSubscription {
            shop_id: shop_id.into(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(DEFAULT_FEED_CAPACITY)
    }
}

/// Receiver side, filtered to one shop.
#[derive(Debug)]
pub struct ChangeSubscription {
    shop_id: String,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn shop_id(&self) -> &str {
        &self.shop_id
    }

    /// Waits for the next change of this shop.
    ///
    /// Returns `None` once the feed is gone. After a lag, yields one
    /// [`ChangeKind::Resync`] event instead of the dropped ones.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.shop_id == self.shop_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(shop_id = %self.shop_id, missed, "Change subscriber lagged, resyncing");
                    return Some(ChangeEvent::resync(&self.shop_id));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
