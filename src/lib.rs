//! Cycle-safe object graph serialization and persisted workflow history.
//!
//! - [`serializer`] turns an [`Entity`](model::Entity) graph of any shape
//!   into a [`SerializedNode`](serializer::SerializedNode) tree, emitting
//!   stubs for entities already visited in the same traversal.
//! - [`workflow`] binds an entity to a [`StateMachine`](workflow::StateMachine)
//!   and an append-only history with exactly one current row per entity.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod sample;
pub mod serializer;
pub mod telemetry;
pub mod ui;
pub mod workflow;

pub use error::{ModelflowError, Result, StoreError};
