mod entity;
mod graph;

pub use entity::{
    AttributeValue, Choice, Entity, EntityId, EntityKey, FieldDescriptor, FieldKind, Scalar,
};
pub use graph::{GraphEntity, NodeRef, ObjectGraph};
