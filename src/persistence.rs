//! Durable-event persistence boundary.
//!
//! The dispatch core has no dependency on this module. Event-sourced actor
//! layers consume it from `on_activated` (replay the stream into state) and
//! from their handlers (append before mutating). [`InMemoryEventStore`]
//! exists so such layers can be exercised without a real backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures_util::{
    future::BoxFuture,
    stream::{self, BoxStream, StreamExt},
};

use crate::{Error, Result};

/// A not-yet-persisted event: type tag plus opaque payload bytes.
#[derive(Debug, Clone)]
pub struct EventData {
    pub event_type: String,
    pub data: Vec<u8>,
}

/// An event read back from the store, with its global position.
#[derive(Debug, Clone)]
pub struct PersistedEvent {
    pub position: u64,
    pub actor_type: String,
    pub key: String,
    pub event_type: String,
    pub data: Vec<u8>,
}

/// Pluggable log-structured event store.
pub trait EventSourcePersistence: Send + Sync {
    /// Append `events` to the `(actor_type, key)` stream. `expected_version`
    /// is the number of events already in that stream (`None` skips the
    /// concurrency check); a mismatch fails with
    /// [`Error::VersionConflict`] and persists nothing.
    fn persist_events<'a>(
        &'a self,
        actor_type: &'a str,
        key: &'a str,
        expected_version: Option<u64>,
        events: Vec<EventData>,
    ) -> BoxFuture<'a, Result<()>>;

    /// Replay one stream from the beginning. Finite; consumed once at
    /// activation.
    fn observe_persisted_events(
        &self,
        actor_type: &str,
        key: &str,
    ) -> BoxStream<'static, PersistedEvent>;

    /// Events across all streams with a position greater than
    /// `from_position` (from the beginning when `None`). Conceptually
    /// infinite and restartable from a position token; implementations
    /// without live tailing may end the stream at the current head.
    fn observe_all_events(&self, from_position: Option<u64>) -> BoxStream<'static, PersistedEvent>;
}

/// Non-durable [`EventSourcePersistence`] for tests and examples. Observe
/// streams are snapshots taken at call time.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<MemoryStreams>,
}

#[derive(Default)]
struct MemoryStreams {
    all: Vec<PersistedEvent>,
    // Indices into `all`, per stream.
    streams: HashMap<(String, String), Vec<usize>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStreams> {
        self.inner.lock().expect("event store lock poisoned")
    }
}

impl EventSourcePersistence for InMemoryEventStore {
    fn persist_events<'a>(
        &'a self,
        actor_type: &'a str,
        key: &'a str,
        expected_version: Option<u64>,
        events: Vec<EventData>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut inner = self.lock();
            let stream_key = (actor_type.to_owned(), key.to_owned());
            let actual = inner.streams.get(&stream_key).map_or(0, Vec::len) as u64;
            if let Some(expected) = expected_version {
                if expected != actual {
                    return Err(Error::VersionConflict { expected, actual });
                }
            }
            for event in events {
                let position = inner.all.len() as u64;
                inner.all.push(PersistedEvent {
                    position,
                    actor_type: actor_type.to_owned(),
                    key: key.to_owned(),
                    event_type: event.event_type,
                    data: event.data,
                });
                let index = inner.all.len() - 1;
                inner.streams.entry(stream_key.clone()).or_default().push(index);
            }
            Ok(())
        })
    }

    fn observe_persisted_events(
        &self,
        actor_type: &str,
        key: &str,
    ) -> BoxStream<'static, PersistedEvent> {
        let inner = self.lock();
        let stream_key = (actor_type.to_owned(), key.to_owned());
        let events: Vec<PersistedEvent> = inner
            .streams
            .get(&stream_key)
            .into_iter()
            .flatten()
            .map(|&index| inner.all[index].clone())
            .collect();
        stream::iter(events).boxed()
    }

    fn observe_all_events(&self, from_position: Option<u64>) -> BoxStream<'static, PersistedEvent> {
        let inner = self.lock();
        let events: Vec<PersistedEvent> = inner
            .all
            .iter()
            .filter(|event| from_position.is_none_or(|position| event.position > position))
            .cloned()
            .collect();
        stream::iter(events).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str) -> EventData {
        EventData {
            event_type: event_type.to_owned(),
            data: Vec::new(),
        }
    }

    #[tokio::test]
    async fn persists_and_replays_a_stream() {
        let store = InMemoryEventStore::new();
        store
            .persist_events("Counter", "a", Some(0), vec![event("Incremented")])
            .await
            .unwrap();
        store
            .persist_events("Counter", "a", Some(1), vec![event("Incremented")])
            .await
            .unwrap();
        store
            .persist_events("Counter", "b", Some(0), vec![event("Reset")])
            .await
            .unwrap();

        let replayed: Vec<_> = store.observe_persisted_events("Counter", "a").collect().await;
        assert_eq!(replayed.len(), 2);
        assert!(replayed.iter().all(|e| e.event_type == "Incremented" && e.key == "a"));
    }

    #[tokio::test]
    async fn rejects_wrong_expected_version() {
        let store = InMemoryEventStore::new();
        store
            .persist_events("Counter", "a", Some(0), vec![event("Incremented")])
            .await
            .unwrap();

        let conflict = store
            .persist_events("Counter", "a", Some(0), vec![event("Incremented")])
            .await;
        assert!(matches!(
            conflict,
            Err(Error::VersionConflict { expected: 0, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn observe_all_restarts_from_a_position() {
        let store = InMemoryEventStore::new();
        store
            .persist_events("Counter", "a", None, vec![event("One"), event("Two")])
            .await
            .unwrap();
        store
            .persist_events("Counter", "b", None, vec![event("Three")])
            .await
            .unwrap();

        let all: Vec<_> = store.observe_all_events(None).collect().await;
        assert_eq!(all.len(), 3);

        let tail: Vec<_> = store.observe_all_events(Some(0)).collect().await;
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].event_type, "Two");
        assert_eq!(tail[1].event_type, "Three");
    }
}
