use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;

use crate::recs::error::EngineError;
use crate::recs::types::{QEntry, StateKey};

/// Full address of one Q-table cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QKey {
    pub user_id: String,
    pub state_key: StateKey,
    pub content_id: String,
}

impl QKey {
    pub fn new(
        user_id: impl Into<String>,
        state_key: StateKey,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            state_key,
            content_id: content_id.into(),
        }
    }
}

/// Storage seam for the Q-table. Injected into the policy engine so tests
/// and alternative backends (a transactional KV) can swap the implementation.
///
/// `update` must apply its closure atomically per key: concurrent updates to
/// the same key serialize, updates to unrelated keys may run in parallel.
pub trait QTableStore: Send + Sync {
    /// Read-only lookup; never creates an entry.
    fn get(&self, key: &QKey) -> Result<Option<QEntry>, EngineError>;

    /// Atomic read-modify-write. Creates the entry with `default_q` on first
    /// touch, then applies the closure under the key's write lock.
    fn update(
        &self,
        key: &QKey,
        default_q: f64,
        apply: &mut dyn FnMut(&mut QEntry),
    ) -> Result<QEntry, EngineError>;

    /// Max recorded q over all content for `(user, state)`; `None` when the
    /// state has never been visited for this user.
    fn max_q_for_state(&self, user_id: &str, state_key: &StateKey)
        -> Result<Option<f64>, EngineError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory key-partitioned Q-table. Shards are keyed by `(user, state)` so
/// one state's whole action set lives in a single shard: same-key writes
/// serialize on the shard lock, and the bootstrap max is a one-shard scan.
pub struct ShardedQTable {
    shards: Vec<RwLock<HashMap<QKey, QEntry>>>,
}

impl ShardedQTable {
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    fn shard_index(&self, user_id: &str, state_key: &StateKey) -> usize {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        state_key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }
}

impl QTableStore for ShardedQTable {
    fn get(&self, key: &QKey) -> Result<Option<QEntry>, EngineError> {
        let shard = &self.shards[self.shard_index(&key.user_id, &key.state_key)];
        Ok(shard.read().get(key).copied())
    }

    fn update(
        &self,
        key: &QKey,
        default_q: f64,
        apply: &mut dyn FnMut(&mut QEntry),
    ) -> Result<QEntry, EngineError> {
        let shard = &self.shards[self.shard_index(&key.user_id, &key.state_key)];
        let mut guard = shard.write();
        let entry = guard
            .entry(key.clone())
            .or_insert_with(|| QEntry::with_default_q(default_q));
        apply(entry);
        Ok(*entry)
    }

    fn max_q_for_state(
        &self,
        user_id: &str,
        state_key: &StateKey,
    ) -> Result<Option<f64>, EngineError> {
        let shard = &self.shards[self.shard_index(user_id, state_key)];
        let guard = shard.read();
        let max = guard
            .iter()
            .filter(|(k, _)| k.user_id == user_id && &k.state_key == state_key)
            .map(|(_, e)| e.q_value)
            .fold(None, |acc: Option<f64>, q| {
                Some(acc.map_or(q, |m| m.max(q)))
            });
        Ok(max)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }
}

impl Default for ShardedQTable {
    fn default() -> Self {
        Self::new(16)
    }
}
