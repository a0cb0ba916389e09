use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::EntityKey;

use super::state::WorkflowState;

/// Store-assigned identifier of a history row. Increases with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted workflow status row. Rows are append-only; the only
/// mutation ever applied is clearing `current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: RecordId,
    pub entity: EntityKey,
    pub status: WorkflowState,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub current: bool,
}

/// A row about to be inserted as the entity's current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub entity: EntityKey,
    pub status: WorkflowState,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

impl NewRecord {
    pub fn now(entity: EntityKey, status: WorkflowState, actor: impl Into<String>) -> Self {
        Self {
            entity,
            status,
            actor: actor.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn into_record(self, id: RecordId, current: bool) -> HistoryRecord {
        HistoryRecord {
            id,
            entity: self.entity,
            status: self.status,
            timestamp: self.timestamp,
            actor: self.actor,
            current,
        }
    }
}

/// Summary of an entity's workflow history.
#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub entity: EntityKey,
    pub current: Option<WorkflowState>,
    pub state_transitions: Vec<WorkflowState>,
    pub actors: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_change_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
}

impl AuditTrail {
    /// Builds the trail from rows in insertion order.
    pub fn from_history(entity: EntityKey, rows: &[HistoryRecord]) -> Self {
        let started_at = rows.first().map(|r| r.timestamp);
        let last_change_at = rows.last().map(|r| r.timestamp);
        let duration_ms = match (started_at, last_change_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            _ => 0,
        };

        Self {
            entity,
            current: rows.iter().rev().find(|r| r.current).map(|r| r.status.clone()),
            state_transitions: rows.iter().map(|r| r.status.clone()).collect(),
            actors: rows.iter().map(|r| r.actor.clone()).collect(),
            started_at,
            last_change_at,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::StateMachine;
    use chrono::Duration;

    #[test]
    fn audit_trail_from_history() {
        let machine = StateMachine::sequence("m", &["A", "B"]).unwrap();
        let key = EntityKey::new("Item", 1);
        let start = Utc::now();
        let first = NewRecord {
            entity: key.clone(),
            status: machine.initial(),
            actor: "SYSTEM".into(),
            timestamp: start,
        }
        .into_record(RecordId(1), false);
        let second = NewRecord {
            entity: key.clone(),
            status: machine.state(Some("B")).unwrap(),
            actor: "alice".into(),
            timestamp: start + Duration::milliseconds(250),
        }
        .into_record(RecordId(2), true);

        let trail = AuditTrail::from_history(key, &[first, second]);
        assert_eq!(trail.current.unwrap().label(), "B");
        assert_eq!(
            trail
                .state_transitions
                .iter()
                .map(|s| s.label())
                .collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        assert_eq!(trail.actors, vec!["SYSTEM", "alice"]);
        assert_eq!(trail.duration_ms, 250);
    }

    #[test]
    fn empty_trail() {
        let trail = AuditTrail::from_history(EntityKey::new("Item", 1), &[]);
        assert!(trail.current.is_none());
        assert_eq!(trail.duration_ms, 0);
    }

    #[test]
    fn record_serialization_roundtrip() {
        let machine = StateMachine::sequence("m", &["A"]).unwrap();
        let record = NewRecord::now(EntityKey::new("Item", 7), machine.initial(), "SYSTEM")
            .into_record(RecordId(3), true);
        let json = serde_json::to_string(&record).unwrap();
        let back: HistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(json.contains("\"status\":\"A\""));
    }
}
