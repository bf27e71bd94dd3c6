//! Live event hub.
//!
//! A process-wide publish/subscribe component held in `AppState` and
//! injected into whatever issues mutations and whatever serves live
//! subscriptions. Delivery is best-effort broadcast: slow subscribers
//! may miss events, and duplicates are tolerated by the reconciler's
//! idempotent merge rules rather than prevented here.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::like::LikeDetail;
use crate::domain::post::PostView;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    PostCreated { post: PostView },
    LikeCreated { like: LikeDetail },
}

#[derive(Clone)]
pub struct LiveHub {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to all current subscribers. Publishing with no
    /// subscribers is not an error.
    pub fn publish(&self, event: LiveEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::debug!(receivers, "published live event");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
