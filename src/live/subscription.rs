//! Scoped topic subscriptions
//!
//! A [`Subscription`] registers one trampoline with the multiplexer and
//! forwards to whatever handler is current, so replacing the handler never
//! churns the server-side subscription.

use crate::live::multiplexer::{Handler, Multiplexer, ReadyState, SubscriberId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Registration that lives as long as this value
pub struct Subscription {
    mux: Multiplexer,
    topic: String,
    id: SubscriberId,
    slot: Arc<RwLock<Handler>>,
}

impl Subscription {
    /// Subscribe `handler` to `topic`
    pub fn new<F>(mux: &Multiplexer, topic: &str, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let slot: Arc<RwLock<Handler>> = Arc::new(RwLock::new(Arc::new(handler)));
        let id = register(mux, topic, &slot);
        Self {
            mux: mux.clone(),
            topic: topic.to_string(),
            id,
            slot,
        }
    }

    /// Replace the handler; later messages go to the new one only
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(handler);
    }

    /// Point this subscription at `topic` with `handler`
    ///
    /// Same topic only swaps the handler. A new topic unregisters from the
    /// old one first.
    pub fn use_topic<F>(&mut self, topic: &str, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.set_handler(handler);
        if topic == self.topic {
            return;
        }

        self.mux.unsubscribe(&self.topic, self.id);
        self.id = register(&self.mux, topic, &self.slot);
        self.topic = topic.to_string();
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn ready_state(&self) -> ReadyState {
        self.mux.ready_state()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.mux.unsubscribe(&self.topic, self.id);
    }
}

fn register(mux: &Multiplexer, topic: &str, slot: &Arc<RwLock<Handler>>) -> SubscriberId {
    let slot = Arc::clone(slot);
    mux.subscribe(topic, move |payload| {
        let current = slot.read().unwrap_or_else(PoisonError::into_inner).clone();
        current(payload);
    })
}

/// Adapt a typed handler; payloads that fail to decode are logged and skipped
pub fn typed<T, F>(handler: F) -> impl Fn(&Value) + Send + Sync + 'static
where
    T: DeserializeOwned + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    move |payload: &Value| match T::deserialize(payload) {
        Ok(value) => handler(value),
        Err(e) => warn!("Ignoring payload that failed to decode: {}", e),
    }
}
