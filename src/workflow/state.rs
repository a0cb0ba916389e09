use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelflowError, Result};

/// Label of one point in a workflow, e.g. `CREATED`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState(String);

impl WorkflowState {
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The result of asking the machine where a state leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move forward to the next state.
    Next(WorkflowState),
    /// Terminal state: advancing re-enters the same state.
    Stay(WorkflowState),
}

impl Transition {
    pub fn target(&self) -> &WorkflowState {
        match self {
            Transition::Next(state) | Transition::Stay(state) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Transition::Stay(_))
    }
}

/// A finite, forward-only workflow for one entity type.
///
/// States are held in declaration order with a transition table mapping
/// each state to exactly one successor. Terminal states map to themselves.
#[derive(Debug, Clone)]
pub struct StateMachine {
    name: String,
    states: Vec<WorkflowState>,
    next: Vec<usize>,
    initial: usize,
}

impl StateMachine {
    pub fn builder(name: impl Into<String>) -> StateMachineBuilder {
        StateMachineBuilder {
            name: name.into(),
            states: Vec::new(),
            initial: None,
            transitions: Vec::new(),
        }
    }

    /// Linear chain: the first label is initial, each label advances to the
    /// following one and the last is terminal.
    pub fn sequence<S: AsRef<str>>(name: impl Into<String>, labels: &[S]) -> Result<Self> {
        let mut builder = Self::builder(name);
        for label in labels {
            builder = builder.state(label.as_ref());
        }
        for pair in labels.windows(2) {
            builder = builder.transition(pair[0].as_ref(), pair[1].as_ref());
        }
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[WorkflowState] {
        &self.states
    }

    pub fn initial(&self) -> WorkflowState {
        self.states[self.initial].clone()
    }

    /// Named factory: no label gives the initial state, otherwise the state
    /// with that label.
    pub fn state(&self, label: Option<&str>) -> Result<WorkflowState> {
        match label {
            None => Ok(self.initial()),
            Some(label) => self
                .index(label)
                .map(|i| self.states[i].clone())
                .ok_or_else(|| self.unknown(label)),
        }
    }

    pub fn advance(&self, from: &WorkflowState) -> Result<Transition> {
        let index = self.index(from.label()).ok_or_else(|| self.unknown(from.label()))?;
        let next = self.next[index];
        let target = self.states[next].clone();
        if next == index {
            Ok(Transition::Stay(target))
        } else {
            Ok(Transition::Next(target))
        }
    }

    pub fn is_terminal(&self, state: &WorkflowState) -> bool {
        self.index(state.label())
            .is_some_and(|index| self.next[index] == index)
    }

    fn index(&self, label: &str) -> Option<usize> {
        self.states.iter().position(|s| s.label() == label)
    }

    fn unknown(&self, label: &str) -> ModelflowError {
        ModelflowError::UnknownState {
            machine: self.name.clone(),
            label: label.to_string(),
        }
    }
}

/// Collects states and transitions, validated by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct StateMachineBuilder {
    name: String,
    states: Vec<String>,
    initial: Option<String>,
    transitions: Vec<(String, String)>,
}

impl StateMachineBuilder {
    pub fn state(mut self, label: impl Into<String>) -> Self {
        self.states.push(label.into());
        self
    }

    /// Defaults to the first declared state.
    pub fn initial(mut self, label: impl Into<String>) -> Self {
        self.initial = Some(label.into());
        self
    }

    pub fn transition(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.transitions.push((from.into(), to.into()));
        self
    }

    /// Checks that labels are unique and non-empty, every transition names
    /// declared states, each state has at most one successor, and following
    /// successors from any state reaches a terminal state.
    pub fn build(self) -> Result<StateMachine> {
        let invalid = |msg: String| ModelflowError::InvalidStateMachine(format!("{}: {msg}", self.name));

        if self.states.is_empty() {
            return Err(invalid("no states declared".into()));
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, label) in self.states.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(invalid("empty state label".into()));
            }
            if index.insert(label.as_str(), i).is_some() {
                return Err(invalid(format!("duplicate state `{label}`")));
            }
        }

        let lookup = |label: &str| {
            index
                .get(label)
                .copied()
                .ok_or_else(|| invalid(format!("undeclared state `{label}`")))
        };

        let mut next: Vec<Option<usize>> = vec![None; self.states.len()];
        for (from, to) in &self.transitions {
            let (from_index, to_index) = (lookup(from)?, lookup(to)?);
            if next[from_index].is_some_and(|existing| existing != to_index) {
                return Err(invalid(format!("`{from}` has more than one successor")));
            }
            next[from_index] = Some(to_index);
        }
        let next: Vec<usize> = next
            .into_iter()
            .enumerate()
            .map(|(i, successor)| successor.unwrap_or(i))
            .collect();

        // Forward only: within `len` steps every walk must settle on a self-loop.
        for start in 0..next.len() {
            let mut current = start;
            for _ in 0..next.len() {
                current = next[current];
            }
            if next[current] != current {
                return Err(invalid(format!(
                    "cycle reachable from `{}`",
                    self.states[start]
                )));
            }
        }

        let initial = match &self.initial {
            Some(label) => lookup(label)?,
            None => 0,
        };

        Ok(StateMachine {
            states: self.states.into_iter().map(WorkflowState).collect(),
            name: self.name,
            next,
            initial,
        })
    }
}
