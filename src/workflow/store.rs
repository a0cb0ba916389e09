//! Persistence of workflow history.
//!
//! [`HistoryStore`] is the seam to whatever keeps history rows durable.
//! Every write goes through [`HistoryStore::transact`], which runs a unit of
//! work against one entity's rows and commits it all or nothing.
//!
//! [`MemoryHistoryStore`] shards rows per entity in a `DashMap`; each shard
//! sits behind its own mutex, so writers on the same entity are serialized
//! while different entities never contend.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{Result, StoreError};
use crate::model::EntityKey;

use super::history::{HistoryRecord, NewRecord, RecordId};

/// Operations available inside one atomic unit of work.
pub trait HistoryTxn {
    /// Current rows, oldest first.
    fn current(&self) -> Vec<HistoryRecord>;

    /// Clears the `current` flag of a row.
    fn retire(&mut self, id: RecordId) -> Result<(), StoreError>;

    /// Inserts a row as current.
    fn append(&mut self, record: NewRecord) -> HistoryRecord;
}

pub trait HistoryStore: Send + Sync {
    /// Rows of `entity` flagged current, oldest first.
    fn current(&self, entity: &EntityKey) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Every row of `entity`, oldest first.
    fn history(&self, entity: &EntityKey) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Runs `work` as one atomic unit scoped to `entity`. If `work` fails
    /// nothing it did is kept.
    fn transact(
        &self,
        entity: &EntityKey,
        work: &mut dyn FnMut(&mut dyn HistoryTxn) -> Result<()>,
    ) -> Result<()>;
}

type Shard = Arc<Mutex<Vec<HistoryRecord>>>;

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    shards: DashMap<EntityKey, Shard>,
    next_id: AtomicU64,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a row as-is, bypassing the one-current-row rule. Meant for
    /// importing existing history.
    pub fn import(&self, record: NewRecord, current: bool) -> HistoryRecord {
        let shard = self.shard(&record.entity);
        let record = record.into_record(self.allocate_id(), current);
        shard.lock().push(record.clone());
        record
    }

    /// Number of entities with at least one row.
    pub fn entity_count(&self) -> usize {
        self.shards.iter().filter(|s| !s.value().lock().is_empty()).count()
    }

    fn shard(&self, entity: &EntityKey) -> Shard {
        Arc::clone(self.shards.entry(entity.clone()).or_default().value())
    }

    fn existing(&self, entity: &EntityKey) -> Option<Shard> {
        self.shards.get(entity).map(|s| Arc::clone(s.value()))
    }

    fn allocate_id(&self) -> RecordId {
        RecordId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn current(&self, entity: &EntityKey) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self
            .existing(entity)
            .map(|shard| shard.lock().iter().filter(|r| r.current).cloned().collect())
            .unwrap_or_default())
    }

    fn history(&self, entity: &EntityKey) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self
            .existing(entity)
            .map(|shard| shard.lock().clone())
            .unwrap_or_default())
    }

    fn transact(
        &self,
        entity: &EntityKey,
        work: &mut dyn FnMut(&mut dyn HistoryTxn) -> Result<()>,
    ) -> Result<()> {
        let shard = self.shard(entity);
        let mut rows = shard.lock();
        let mut txn = MemoryTxn {
            entity,
            rows: rows.clone(),
            next_id: &self.next_id,
        };
        work(&mut txn)?;
        *rows = txn.rows;
        Ok(())
    }
}

/// Staged copy of one shard; swapped in only when the work succeeds.
struct MemoryTxn<'a> {
    entity: &'a EntityKey,
    rows: Vec<HistoryRecord>,
    next_id: &'a AtomicU64,
}

impl HistoryTxn for MemoryTxn<'_> {
    fn current(&self) -> Vec<HistoryRecord> {
        self.rows.iter().filter(|r| r.current).cloned().collect()
    }

    fn retire(&mut self, id: RecordId) -> Result<(), StoreError> {
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::RecordNotFound(id.0))?;
        row.current = false;
        Ok(())
    }

    fn append(&mut self, record: NewRecord) -> HistoryRecord {
        debug_assert_eq!(&record.entity, self.entity);
        let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = record.into_record(id, true);
        self.rows.push(record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelflowError;
    use crate::workflow::StateMachine;

    fn row(key: &EntityKey, label: &str) -> NewRecord {
        let machine = StateMachine::sequence("m", &["A", "B", "C"]).unwrap();
        NewRecord::now(key.clone(), machine.state(Some(label)).unwrap(), "test")
    }

    #[test]
    fn transact_commits_all_writes() {
        let store = MemoryHistoryStore::new();
        let key = EntityKey::new("Item", 1);
        store
            .transact(&key, &mut |txn: &mut dyn HistoryTxn| {
                let first = txn.append(row(&key, "A"));
                txn.retire(first.id)?;
                txn.append(row(&key, "B"));
                Ok(())
            })
            .unwrap();

        let history = store.history(&key).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].current);
        assert!(history[1].current);
        assert_eq!(store.current(&key).unwrap().len(), 1);
    }

    #[test]
    fn failed_work_leaves_rows_untouched() {
        let store = MemoryHistoryStore::new();
        let key = EntityKey::new("Item", 1);
        store.import(row(&key, "A"), true);

        let result = store.transact(&key, &mut |txn: &mut dyn HistoryTxn| {
            for r in txn.current() {
                txn.retire(r.id)?;
            }
            txn.append(row(&key, "B"));
            txn.retire(RecordId(999))?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(ModelflowError::Store(StoreError::RecordNotFound(999)))
        ));
        let history = store.history(&key).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].current);
    }

    #[test]
    fn entities_are_isolated() {
        let store = MemoryHistoryStore::new();
        let a = EntityKey::new("Item", 1);
        let b = EntityKey::new("Item", 2);
        store.import(row(&a, "A"), true);
        assert!(store.current(&b).unwrap().is_empty());
        assert!(store.history(&b).unwrap().is_empty());
        assert_eq!(store.entity_count(), 1);
    }

    #[test]
    fn record_ids_increase() {
        let store = MemoryHistoryStore::new();
        let key = EntityKey::new("Item", 1);
        let first = store.import(row(&key, "A"), false);
        let second = store.import(row(&key, "B"), true);
        assert!(second.id > first.id);
    }
}
