use dashmap::DashMap;
use std::sync::Arc;

/// Issues run-generation tokens per key.
///
/// Each `begin` bumps the key's generation and hands back a [`RunToken`] for
/// the new run. A token from an earlier run observes `is_current() == false`
/// from that point on, so a superseded run can detect that its results must
/// be discarded instead of overwriting newer state. In-flight work is never
/// interrupted, only its writes are fenced off.
#[derive(Clone)]
pub struct RunRegistry {
    generations: Arc<DashMap<String, u64>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self {
            generations: Arc::new(DashMap::new()),
        }
    }

    /// Start a new run for `key`, superseding any run still in flight.
    pub fn begin(&self, key: impl Into<String>) -> RunToken {
        let key = key.into();
        let mut entry = self.generations.entry(key.clone()).or_insert(0);
        *entry += 1;
        let generation = *entry;
        drop(entry);

        RunToken {
            key,
            generation,
            generations: self.generations.clone(),
        }
    }

    /// Supersede any run in flight for `key` without starting a new one.
    pub fn invalidate(&self, key: &str) {
        if let Some(mut entry) = self.generations.get_mut(key) {
            *entry += 1;
        }
    }
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle identifying one run of one key.
#[derive(Clone)]
pub struct RunToken {
    key: String,
    generation: u64,
    generations: Arc<DashMap<String, u64>>,
}

impl RunToken {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this token still belongs to the newest run for its key.
    pub fn is_current(&self) -> bool {
        self.generations
            .get(&self.key)
            .map(|current| *current == self.generation)
            .unwrap_or(false)
    }
}
