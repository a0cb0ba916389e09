mod classifier;
mod filter;
mod node;
mod walker;

pub use classifier::{Strategy, bit_flags_value, choice_value, classify};
pub use filter::FieldFilter;
pub use node::{Flag, NodeValue, SerializedNode};
pub use walker::{Serializer, VisitedSet, serialize};
