use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::SessionEvent;

pub type SubscriberId = String;

/// A live subscription to one session's event stream.
///
/// Dropping it (or calling [`Broadcaster::unsubscribe`]) ends delivery.
pub struct Subscription {
    pub id: SubscriberId,
    pub session_id: String,
    receiver: mpsc::Receiver<SessionEvent>,
}

impl Subscription {
    /// Next event, or `None` once the channel is closed or this subscriber was dropped
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Default)]
struct SessionChannel {
    subscribers: Vec<(SubscriberId, mpsc::Sender<SessionEvent>)>,
}

/// Fans session events out to subscribers.
///
/// Each session has its own channel and lock, so sessions never wait on each
/// other. Events reach every subscriber in publish order.
#[derive(Clone)]
pub struct Broadcaster {
    channels: Arc<RwLock<HashMap<String, Arc<Mutex<SessionChannel>>>>>,
    subscriber_buffer: usize,
}

impl Broadcaster {
    pub fn new(subscriber_buffer: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    /// Creates the session's channel. Idempotent.
    pub async fn open(&self, session_id: &str) {
        self.channel(session_id).await;
    }

    /// Subscribes, opening the channel if needed
    pub async fn subscribe(&self, session_id: &str) -> Subscription {
        let channel = self.channel(session_id).await;
        self.attach(session_id, &channel).await
    }

    /// Subscribes only while the session's channel is open. A closed
    /// channel stays closed.
    pub async fn subscribe_existing(&self, session_id: &str) -> Option<Subscription> {
        let channel = self.existing_channel(session_id).await?;
        Some(self.attach(session_id, &channel).await)
    }

    async fn attach(&self, session_id: &str, channel: &Mutex<SessionChannel>) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);
        let id = Uuid::new_v4().to_string();

        channel.lock().await.subscribers.push((id.clone(), sender));
        debug!(session_id = %session_id, subscriber = %id, "Subscribed to session");

        Subscription {
            id,
            session_id: session_id.to_string(),
            receiver,
        }
    }

    pub async fn unsubscribe(&self, session_id: &str, subscriber_id: &str) -> bool {
        let Some(channel) = self.existing_channel(session_id).await else {
            return false;
        };

        let mut channel = channel.lock().await;
        let before = channel.subscribers.len();
        channel.subscribers.retain(|(id, _)| id != subscriber_id);
        let removed = channel.subscribers.len() < before;

        if removed {
            debug!(session_id = %session_id, subscriber = %subscriber_id, "Unsubscribed from session");
        }
        removed
    }

    /// Delivers `event` to every current subscriber and returns how many got it.
    ///
    /// A subscriber whose buffer is full or whose receiver is gone is dropped.
    pub async fn publish(&self, session_id: &str, event: SessionEvent) -> usize {
        let Some(channel) = self.existing_channel(session_id).await else {
            debug!(session_id = %session_id, "Session event published with no channel");
            return 0;
        };

        let mut channel = channel.lock().await;
        channel.subscribers.retain(|(id, sender)| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %session_id, subscriber = %id, "Subscriber lagging, dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id = %session_id, subscriber = %id, "Subscriber gone, dropped");
                false
            }
        });

        channel.subscribers.len()
    }

    pub async fn subscriber_count(&self, session_id: &str) -> usize {
        match self.existing_channel(session_id).await {
            Some(channel) => channel.lock().await.subscribers.len(),
            None => 0,
        }
    }

    /// Removes the session's channel. Open subscriptions see the stream end.
    pub async fn close(&self, session_id: &str) {
        if self.channels.write().await.remove(session_id).is_some() {
            debug!(session_id = %session_id, "Session channel closed");
        }
    }

    async fn existing_channel(&self, session_id: &str) -> Option<Arc<Mutex<SessionChannel>>> {
        self.channels.read().await.get(session_id).cloned()
    }

    async fn channel(&self, session_id: &str) -> Arc<Mutex<SessionChannel>> {
        if let Some(channel) = self.existing_channel(session_id).await {
            return channel;
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionChannel::default())))
            .clone()
    }
}
