//! Live-update multiplexer
//!
//! One connection per process, many topic subscribers. The first subscriber
//! of a topic sends `subscribe`, the last one to leave sends `unsubscribe`.
//! The connection reconnects on its own; every reconnect re-subscribes all
//! registered topics because the server keeps subscriptions per connection.

use crate::live::message::{ControlMessage, InboundFrame, ServerControl};
use crate::live::transport::{Link, Transport};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval};
use tracing::{debug, error, info, warn};

/// Subscriber callback
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies one registration; needed to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Connection readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Connection task not started yet
    Uninstantiated,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninstantiated => "uninstantiated",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Connection tuning
#[derive(Debug, Clone)]
pub struct MultiplexerOptions {
    /// Wait between a close and the next connection attempt
    pub reconnect_delay: Duration,
    /// Keepalive ping period; `None` disables pings
    pub ping_interval: Option<Duration>,
}

impl Default for MultiplexerOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            ping_interval: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Default)]
struct Registry {
    /// Subscribers per topic, in registration order
    topics: HashMap<String, Vec<(SubscriberId, Handler)>>,
    next_id: u64,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the shared live connection
///
/// Cheap to clone; the connection task stops once every clone is dropped.
#[derive(Clone)]
pub struct Multiplexer {
    registry: Arc<Mutex<Registry>>,
    control: mpsc::UnboundedSender<ControlMessage>,
    ready: watch::Receiver<ReadyState>,
}

impl Multiplexer {
    /// Start the connection task on the current tokio runtime
    pub fn connect(transport: Arc<dyn Transport>, options: MultiplexerOptions) -> Self {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let (control, control_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready) = watch::channel(ReadyState::Uninstantiated);

        tokio::spawn(run_connection(
            transport,
            Arc::clone(&registry),
            control_rx,
            ready_tx,
            options,
        ));

        Self {
            registry,
            control,
            ready,
        }
    }

    /// Register `handler` for `topic`
    ///
    /// Accepted in any readiness state; the server learns about the topic
    /// once the connection is open.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> SubscriberId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = SubscriberId(registry.next_id);
        registry.next_id += 1;

        let subscribers = registry.topics.entry(topic.to_string()).or_default();
        let first = subscribers.is_empty();
        subscribers.push((id, Arc::new(handler)));

        // Sent under the registry lock so control frames keep registry order
        if first {
            debug!("First subscriber for topic {}", topic);
            self.send_control(ControlMessage::Subscribe {
                topic: topic.to_string(),
            });
        }
        id
    }

    /// Remove a registration; returns `false` if it was not registered
    pub fn unsubscribe(&self, topic: &str, id: SubscriberId) -> bool {
        let mut registry = lock(&self.registry);
        let Some(subscribers) = registry.topics.get_mut(topic) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            registry.topics.remove(topic);
            debug!("Last subscriber left topic {}", topic);
            self.send_control(ControlMessage::Unsubscribe {
                topic: topic.to_string(),
            });
        }
        removed
    }

    /// Deliver a raw inbound frame to local subscribers
    pub fn dispatch(&self, raw: &str) {
        dispatch(&self.registry, raw);
    }

    /// Current readiness
    pub fn ready_state(&self) -> ReadyState {
        *self.ready.borrow()
    }

    /// Receiver that observes readiness transitions
    pub fn watch_ready(&self) -> watch::Receiver<ReadyState> {
        self.ready.clone()
    }

    /// Topics with at least one subscriber, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = lock(&self.registry).topics.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Number of subscribers for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.registry).topics.get(topic).map_or(0, Vec::len)
    }

    fn send_control(&self, message: ControlMessage) {
        if self.control.send(message).is_err() {
            debug!("Connection task has stopped; control message dropped");
        }
    }
}

/// Drop queued control messages and snapshot the registered topics
///
/// Both happen under the registry lock. Control messages are queued under
/// the same lock, so every subscribe is either in the snapshot or still
/// queued, never both. Returns `None` once every handle is gone.
fn resync_topics(
    registry: &Mutex<Registry>,
    control: &mut mpsc::UnboundedReceiver<ControlMessage>,
) -> Option<Vec<String>> {
    let registry = lock(registry);
    loop {
        match control.try_recv() {
            Ok(_) => continue,
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => return None,
        }
    }

    let mut topics: Vec<String> = registry.topics.keys().cloned().collect();
    topics.sort();
    Some(topics)
}

fn dispatch(registry: &Mutex<Registry>, raw: &str) {
    let message = match InboundFrame::parse(raw) {
        Ok(InboundFrame::Message(message)) => message,
        Ok(InboundFrame::Control(ServerControl::Pong)) => {
            debug!("Received pong");
            return;
        }
        Err(e) => {
            warn!("Dropping malformed live message: {}", e);
            return;
        }
    };

    // Snapshot so handlers may (un)subscribe without deadlocking
    let handlers: Vec<Handler> = lock(registry)
        .topics
        .get(&message.topic)
        .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
        .unwrap_or_default();

    if handlers.is_empty() {
        debug!("No subscribers for topic {}", message.topic);
        return;
    }

    for handler in handlers {
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| handler(&message.payload)));
        if delivered.is_err() {
            error!(
                "Subscriber for topic {} panicked; continuing delivery",
                message.topic
            );
        }
    }
}

/// How a served connection ended
enum Ended {
    /// Every handle is gone
    Shutdown,
    /// The connection closed underneath us
    Dropped,
}

async fn run_connection(
    transport: Arc<dyn Transport>,
    registry: Arc<Mutex<Registry>>,
    mut control: mpsc::UnboundedReceiver<ControlMessage>,
    ready: watch::Sender<ReadyState>,
    options: MultiplexerOptions,
) {
    loop {
        ready.send_replace(ReadyState::Connecting);

        match transport.connect().await {
            Ok(link) => {
                info!("Live connection open ({})", transport.endpoint());
                ready.send_replace(ReadyState::Open);

                match serve(link, &registry, &mut control, &options).await {
                    Ended::Shutdown => {
                        ready.send_replace(ReadyState::Closing);
                        break;
                    }
                    Ended::Dropped => warn!(
                        "Live connection closed, reconnecting in {:?}",
                        options.reconnect_delay
                    ),
                }
            }
            Err(e) => warn!(
                "Live connection to {} failed: {}, retrying in {:?}",
                transport.endpoint(),
                e,
                options.reconnect_delay
            ),
        }

        ready.send_replace(ReadyState::Closed);

        // Control traffic while disconnected is superseded by the resync
        tokio::select! {
            _ = tokio::time::sleep(options.reconnect_delay) => {}
            _ = discard_until_closed(&mut control) => break,
        }
    }

    ready.send_replace(ReadyState::Closed);
    debug!("Live connection task stopped");
}

async fn discard_until_closed(control: &mut mpsc::UnboundedReceiver<ControlMessage>) {
    while control.recv().await.is_some() {}
}

async fn serve(
    link: Link,
    registry: &Mutex<Registry>,
    control: &mut mpsc::UnboundedReceiver<ControlMessage>,
    options: &MultiplexerOptions,
) -> Ended {
    let Link {
        outbound,
        mut inbound,
    } = link;

    let Some(topics) = resync_topics(registry, control) else {
        return Ended::Shutdown;
    };

    for topic in topics {
        debug!("Re-subscribing to topic {}", topic);
        if !send_frame(&outbound, &ControlMessage::Subscribe { topic }) {
            return Ended::Dropped;
        }
    }

    let mut ping = options
        .ping_interval
        .map(|period| tokio::time::interval_at(Instant::now() + period, period));

    loop {
        tokio::select! {
            message = control.recv() => match message {
                Some(message) => {
                    if !send_frame(&outbound, &message) {
                        return Ended::Dropped;
                    }
                }
                None => return Ended::Shutdown,
            },
            frame = inbound.recv() => match frame {
                Some(Ok(text)) => dispatch(registry, &text),
                Some(Err(e)) => {
                    warn!("Live connection error: {}", e);
                    return Ended::Dropped;
                }
                None => return Ended::Dropped,
            },
            _ = tick(&mut ping) => {
                if !send_frame(&outbound, &ControlMessage::Ping) {
                    return Ended::Dropped;
                }
            }
        }
    }
}

async fn tick(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn send_frame(outbound: &mpsc::UnboundedSender<String>, message: &ControlMessage) -> bool {
    match message.to_text() {
        Ok(text) => {
            debug!("Sending {}", text);
            outbound.send(text).is_ok()
        }
        Err(e) => {
            warn!("Failed to encode control message: {}", e);
            true
        }
    }
}
