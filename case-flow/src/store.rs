use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::Result;

/// Capacity of the change-event channel. Slow observers that fall further
/// behind than this miss events; they can always re-read the store.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notification emitted by a [`StateStore`].
///
/// `state` is `None` when the key was deleted.
#[derive(Debug, Clone)]
pub struct StateEvent<S> {
    pub key: String,
    pub state: Option<S>,
}

/// Keyed store for per-run state, readable by observers and written only by
/// the component driving the runs.
///
/// Published states are immutable snapshots: `get` hands out clones, and a
/// writer replaces the whole value rather than mutating in place.
#[async_trait]
pub trait StateStore<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<S>>;
    async fn put(&self, key: String, state: S) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    /// Subscribe to change events for all keys.
    fn subscribe(&self) -> broadcast::Receiver<StateEvent<S>>;
}

/// In-memory implementation of [`StateStore`]
pub struct InMemoryStateStore<S> {
    states: Arc<DashMap<String, S>>,
    events: broadcast::Sender<StateEvent<S>>,
}

impl<S> InMemoryStateStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            states: Arc::new(DashMap::new()),
            events,
        }
    }

    fn notify(&self, key: &str, state: Option<S>) {
        // Send fails only when nobody is subscribed.
        let _ = self.events.send(StateEvent {
            key: key.to_string(),
            state,
        });
    }
}

impl<S> Default for InMemoryStateStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> StateStore<S> for InMemoryStateStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<S>> {
        Ok(self.states.get(key).map(|entry| entry.clone()))
    }

    async fn put(&self, key: String, state: S) -> Result<()> {
        self.states.insert(key.clone(), state.clone());
        self.notify(&key, Some(state));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.states.remove(key);
        self.notify(key, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StateEvent<S>> {
        self.events.subscribe()
    }
}
