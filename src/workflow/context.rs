//! Binds an entity to its state machine and persisted status history.
//!
//! The store is the source of truth: [`Context::current_state`] reads it on
//! every call once the entity has an identity, and [`Context::advance`]
//! retires the current row and appends the next one in a single
//! [`HistoryStore::transact`] unit.

use std::sync::Arc;

use crate::config::ModelflowConfig;
use crate::error::{ModelflowError, Result, StoreError};
use crate::events::{Event, EventSink, STATUS_HISTORY_INCONSISTENCIES, Severity, TracingEventSink};
use crate::model::{Entity, EntityId, EntityKey};

use super::history::{AuditTrail, HistoryRecord, NewRecord};
use super::state::{StateMachine, Transition, WorkflowState};
use super::store::{HistoryStore, HistoryTxn};

/// The entity a [`Context`] tracks. `id` stays `None` until the entity has
/// been durably created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub type_name: String,
    pub id: Option<EntityId>,
}

impl Subject {
    pub fn new(type_name: impl Into<String>, id: Option<EntityId>) -> Self {
        Self {
            type_name: type_name.into(),
            id,
        }
    }

    pub fn unsaved(type_name: impl Into<String>) -> Self {
        Self::new(type_name, None)
    }

    pub fn key(&self) -> Option<EntityKey> {
        self.id
            .as_ref()
            .map(|id| EntityKey::new(self.type_name.clone(), id.clone()))
    }
}

impl From<&dyn Entity> for Subject {
    fn from(entity: &dyn Entity) -> Self {
        Self::new(entity.type_name(), Some(entity.id()))
    }
}

pub struct Context {
    subject: Subject,
    machine: Arc<StateMachine>,
    store: Arc<dyn HistoryStore>,
    events: Arc<dyn EventSink>,
    system_actor: String,
    state: WorkflowState,
}

impl Context {
    pub fn new(subject: Subject, machine: Arc<StateMachine>, store: Arc<dyn HistoryStore>) -> Self {
        let state = machine.initial();
        Self {
            subject,
            machine,
            store,
            events: Arc::new(TracingEventSink),
            system_actor: ModelflowConfig::default().system_actor,
            state,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_system_actor(mut self, actor: impl Into<String>) -> Self {
        self.system_actor = actor.into();
        self
    }

    pub fn with_config(self, config: &ModelflowConfig) -> Self {
        self.with_system_actor(config.system_actor.clone())
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Last state this context read or wrote, without touching the store.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Reads the entity's current state from the store.
    ///
    /// An entity without identity is in the initial state and nothing is
    /// written. A persisted entity with no current row gets one, carrying
    /// the initial state and the system actor. Several current rows are
    /// reported as an inconsistency and the last one wins.
    pub fn current_state(&mut self) -> Result<WorkflowState> {
        let Some(key) = self.subject.key() else {
            tracing::debug!(entity_type = %self.subject.type_name, "no identity yet, using initial state");
            self.state = self.machine.initial();
            return Ok(self.state.clone());
        };

        let mut rows = self.store.current(&key)?;
        let record = match rows.len() {
            0 => self.write_initial(&key)?,
            1 => rows.remove(0),
            count => {
                self.report_inconsistency(&key, count);
                rows.remove(count - 1)
            }
        };

        tracing::debug!(entity = %key, status = %record.status, "current state");
        self.state = self.machine.state(Some(record.status.label()))?;
        Ok(self.state.clone())
    }

    /// Moves the entity to the next state on behalf of `actor`.
    ///
    /// Fails with `IllegalTransition` if the entity has no identity yet.
    /// Retiring the current row(s) and appending the new current row happen
    /// in one atomic unit. A terminal state is re-entered and still recorded.
    pub fn advance(&mut self, actor: &str) -> Result<WorkflowState> {
        let Some(key) = self.subject.key() else {
            return Err(ModelflowError::IllegalTransition {
                from: self.state.to_string(),
                reason: "save the entity before going to the next state".into(),
            });
        };

        let machine = Arc::clone(&self.machine);
        let system_actor = self.system_actor.clone();
        let mut outcome: Option<(WorkflowState, Transition)> = None;
        let mut duplicates = 0;

        self.store.transact(&key, &mut |txn: &mut dyn HistoryTxn| {
            let mut current = txn.current();
            if current.is_empty() {
                current.push(txn.append(NewRecord::now(
                    key.clone(),
                    machine.initial(),
                    system_actor.as_str(),
                )));
            }
            if current.len() > 1 {
                duplicates = current.len();
            }

            let from = match current.last() {
                Some(record) => machine.state(Some(record.status.label()))?,
                None => machine.initial(),
            };
            let transition = machine.advance(&from)?;

            for record in &current {
                txn.retire(record.id)?;
            }
            txn.append(NewRecord::now(key.clone(), transition.target().clone(), actor));
            outcome = Some((from, transition));
            Ok(())
        })?;

        if duplicates > 1 {
            self.report_inconsistency(&key, duplicates);
        }

        let (from, transition) = outcome
            .ok_or_else(|| StoreError::Backend("transaction finished without running".into()))?;
        tracing::debug!(
            entity = %key,
            actor = %actor,
            terminal = transition.is_terminal(),
            "{key}: {from} -> {}",
            transition.target()
        );
        self.state = transition.target().clone();
        Ok(self.state.clone())
    }

    /// Binds the identity the entity received when it was saved and writes
    /// its first history row if it has none.
    pub fn on_saved(&mut self, id: impl Into<EntityId>) -> Result<WorkflowState> {
        self.subject.id = Some(id.into());
        self.current_state()
    }

    /// Every history row of the entity, oldest first. Empty before the
    /// entity has an identity.
    pub fn history(&self) -> Result<Vec<HistoryRecord>> {
        match self.subject.key() {
            Some(key) => Ok(self.store.history(&key)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn audit(&self) -> Result<Option<AuditTrail>> {
        let Some(key) = self.subject.key() else {
            return Ok(None);
        };
        let rows = self.store.history(&key)?;
        Ok(Some(AuditTrail::from_history(key, &rows)))
    }

    fn write_initial(&self, key: &EntityKey) -> Result<HistoryRecord> {
        let mut written = None;
        self.store.transact(key, &mut |txn: &mut dyn HistoryTxn| {
            // Another writer may have created the row since the read.
            let record = match txn.current().pop() {
                Some(existing) => existing,
                None => txn.append(NewRecord::now(
                    key.clone(),
                    self.machine.initial(),
                    self.system_actor.as_str(),
                )),
            };
            written = Some(record);
            Ok(())
        })?;
        tracing::debug!(entity = %key, actor = %self.system_actor, "initial status written");
        written.ok_or_else(|| StoreError::Backend("transaction finished without running".into()).into())
    }

    fn report_inconsistency(&self, key: &EntityKey, count: usize) {
        tracing::error!(
            entity = %key,
            current_rows = count,
            "Consistency error. More than one current status set for object"
        );
        self.events.emit(
            Event::new(
                STATUS_HISTORY_INCONSISTENCIES,
                Severity::Error,
                "More than one current status set for object",
            )
            .with("object_class", &key.type_name)
            .with("object_id", &key.id)
            .with("current_rows", count),
        );
    }
}
