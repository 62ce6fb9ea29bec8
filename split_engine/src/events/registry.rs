use std::{collections::HashMap, sync::Arc};

use log::trace;
use tokio::sync::{mpsc, RwLock};

use crate::{db_types::UserId, events::EngineEvent};

/// An addressable-subscriber registry keyed by user identity.
///
/// A real-time transport (websocket session, SSE stream) subscribes on behalf of a connected user and receives every
/// event addressed to that user. A user can hold several live subscriptions at once (multiple devices); closed
/// subscriptions are pruned on the next delivery attempt. The registry knows nothing about the settlement core — it
/// only routes events.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<RwLock<HashMap<UserId, Vec<mpsc::UnboundedSender<EngineEvent>>>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscription for the user and returns its receiving end.
    pub async fn subscribe(&self, user_id: &UserId) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut map = self.inner.write().await;
        map.entry(user_id.clone()).or_default().push(sender);
        receiver
    }

    /// Delivers the event to every live subscription of the user. Dead subscriptions are dropped as they are found.
    pub async fn notify(&self, user_id: &UserId, event: EngineEvent) {
        let mut map = self.inner.write().await;
        let Some(senders) = map.get_mut(user_id) else {
            return;
        };
        senders.retain(|sender| sender.send(event.clone()).is_ok());
        if senders.is_empty() {
            map.remove(user_id);
        }
        trace!("📡️ Delivered event to subscribers of {user_id}");
    }

    /// Fans one event out to a set of users.
    pub async fn notify_many(&self, users: &[UserId], event: EngineEvent) {
        for user in users {
            self.notify(user, event.clone()).await;
        }
    }

    /// The number of users with at least one live subscription.
    pub async fn subscriber_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
