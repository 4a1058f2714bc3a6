//! Typed publish/subscribe for engine state changes.
//!
//! Delivery is synchronous and in subscription order per topic. A handler
//! that fails or panics is logged and skipped; the remaining handlers for
//! the same event still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use pg_ir::{ChannelKind, PatternId};

/// Event topics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    ChangedBpm,
    ChangedCurrentPattern,
    ToggledChannel,
    CellChanged,
    StartedPlayback,
    PlayedRow,
    PausedPlayback,
    ResumedPlayback,
    StoppedPlayback,
    ChangedLooping,
    ChangedMasterVolume,
    AddedPattern,
    DeletedPattern,
    RenamedPattern,
    ChangedPatternOrder,
}

/// An engine notification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    ChangedBpm { bpm: f64 },
    ChangedCurrentPattern { pattern: PatternId },
    ToggledChannel { channel: ChannelKind, enabled: bool },
    CellChanged { pattern: PatternId, channel: ChannelKind, row: usize },
    StartedPlayback { row: usize, pattern: PatternId },
    /// The output clock reached `row`; `time` is its scheduled time in
    /// seconds on that clock.
    PlayedRow { row: usize, pattern: PatternId, time: f64 },
    PausedPlayback { row: usize, pattern: PatternId },
    ResumedPlayback { row: usize, pattern: PatternId },
    StoppedPlayback,
    ChangedLooping { looping: bool },
    ChangedMasterVolume { volume: f32 },
    AddedPattern { pattern: PatternId },
    DeletedPattern { pattern: PatternId },
    RenamedPattern { pattern: PatternId },
    ChangedPatternOrder,
}

impl EngineEvent {
    pub fn topic(&self) -> Topic {
        match self {
            EngineEvent::ChangedBpm { .. } => Topic::ChangedBpm,
            EngineEvent::ChangedCurrentPattern { .. } => Topic::ChangedCurrentPattern,
            EngineEvent::ToggledChannel { .. } => Topic::ToggledChannel,
            EngineEvent::CellChanged { .. } => Topic::CellChanged,
            EngineEvent::StartedPlayback { .. } => Topic::StartedPlayback,
            EngineEvent::PlayedRow { .. } => Topic::PlayedRow,
            EngineEvent::PausedPlayback { .. } => Topic::PausedPlayback,
            EngineEvent::ResumedPlayback { .. } => Topic::ResumedPlayback,
            EngineEvent::StoppedPlayback => Topic::StoppedPlayback,
            EngineEvent::ChangedLooping { .. } => Topic::ChangedLooping,
            EngineEvent::ChangedMasterVolume { .. } => Topic::ChangedMasterVolume,
            EngineEvent::AddedPattern { .. } => Topic::AddedPattern,
            EngineEvent::DeletedPattern { .. } => Topic::DeletedPattern,
            EngineEvent::RenamedPattern { .. } => Topic::RenamedPattern,
            EngineEvent::ChangedPatternOrder => Topic::ChangedPatternOrder,
        }
    }
}

/// Error a handler may return; it is logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscribed callback.
pub type Handler = Arc<dyn Fn(&EngineEvent) -> Result<(), HandlerError> + Send + Sync>;

struct Entry {
    id: u64,
    topic: Topic,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // Handlers never run under this lock, so a poisoned registry is intact.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Multi-subscriber event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &lock(&self.registry).entries.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`. It stays registered until the
    /// returned guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&EngineEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry { id, topic, handler: Arc::new(handler) });
        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
            topic,
        }
    }

    /// Deliver `event` to every handler of its topic. Returns how many
    /// handlers completed without error.
    pub fn publish(&self, event: &EngineEvent) -> usize {
        let topic = event.topic();
        let handlers: Vec<Handler> = lock(&self.registry)
            .entries
            .iter()
            .filter(|e| e.topic == topic)
            .map(|e| e.handler.clone())
            .collect();

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => log::warn!("{:?} handler failed: {}", topic, err),
                Err(_) => log::error!("{:?} handler panicked", topic),
            }
        }
        delivered
    }

    /// Number of live subscriptions to `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        lock(&self.registry).entries.iter().filter(|e| e.topic == topic).count()
    }
}

/// Keeps a handler registered. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
    topic: Topic,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|e| e.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(bus: &EventBus, topic: Topic) -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = bus.subscribe(topic, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (sub, count)
    }

    #[test]
    fn delivers_only_to_matching_topic() {
        let bus = EventBus::new();
        let (_a, stopped) = counter(&bus, Topic::StoppedPlayback);
        let (_b, looping) = counter(&bus, Topic::ChangedLooping);

        assert_eq!(bus.publish(&EngineEvent::StoppedPlayback), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert_eq!(looping.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn delivery_follows_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let log = log.clone();
                bus.subscribe(Topic::ChangedPatternOrder, move |_| {
                    log.lock().unwrap().push(i);
                    Ok(())
                })
            })
            .collect();

        bus.publish(&EngineEvent::ChangedPatternOrder);
        assert_eq!(*log.lock().unwrap(), [0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn failing_and_panicking_handlers_do_not_block_others() {
        let bus = EventBus::new();
        let _err = bus.subscribe(Topic::StoppedPlayback, |_| Err("nope".into()));
        let _panic = bus.subscribe(Topic::StoppedPlayback, |_| panic!("handler bug"));
        let (_ok, count) = counter(&bus, Topic::StoppedPlayback);

        assert_eq!(bus.publish(&EngineEvent::StoppedPlayback), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = EventBus::new();
        let (sub, count) = counter(&bus, Topic::ChangedBpm);
        assert_eq!(bus.subscriber_count(Topic::ChangedBpm), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(Topic::ChangedBpm), 0);
        bus.publish(&EngineEvent::ChangedBpm { bpm: 90.0 });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let bus = EventBus::new();
        let (sub, _) = counter(&bus, Topic::PlayedRow);
        drop(bus);
        drop(sub);
    }

    #[test]
    fn handlers_may_subscribe_during_delivery() {
        let bus = EventBus::new();
        let inner = bus.clone();
        let nested = Arc::new(Mutex::new(Vec::new()));
        let store = nested.clone();
        let _sub = bus.subscribe(Topic::AddedPattern, move |_| {
            let sub = inner.subscribe(Topic::DeletedPattern, |_| Ok(()));
            store.lock().unwrap().push(sub);
            Ok(())
        });

        let mut table = pg_ir::PatternTable::new();
        let pattern = table.insert(None).unwrap();
        bus.publish(&EngineEvent::AddedPattern { pattern });
        assert_eq!(bus.subscriber_count(Topic::DeletedPattern), 1);
    }
}
