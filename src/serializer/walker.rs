use std::collections::HashSet;
use std::fmt::Write;

use chrono::{NaiveDateTime, NaiveTime};

use crate::config::{DEFAULT_DATETIME_FORMAT, ModelflowConfig};
use crate::error::Result;
use crate::model::{AttributeValue, Entity, EntityKey, FieldDescriptor, Scalar};

use super::classifier::{Strategy, bit_flags_value, choice_value, classify};
use super::filter::FieldFilter;
use super::node::{NodeValue, SerializedNode};

/// Keys reserved for identity and type tag on every node.
const RESERVED_KEYS: [&str; 2] = ["id", "type"];

/// `(identity, type)` pairs already fully serialized in one traversal.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    keys: HashSet<EntityKey>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns `false` when the key was already present.
    pub fn insert(&mut self, key: EntityKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Walks an entity graph into a [`SerializedNode`] tree.
///
/// Termination relies only on the visited set: the first visit of an
/// `(id, type)` pair serializes the entity fully, every later visit in the
/// same traversal yields a stub carrying just `id` and `type`.
#[derive(Debug, Clone)]
pub struct Serializer {
    filter: FieldFilter,
    datetime_format: String,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(FieldFilter::All)
    }
}

impl Serializer {
    pub fn new(filter: FieldFilter) -> Self {
        Self {
            filter,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }

    pub fn from_config(config: &ModelflowConfig, filter: FieldFilter) -> Self {
        Self::new(filter).with_datetime_format(config.datetime_format.clone())
    }

    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    pub fn filter(&self) -> &FieldFilter {
        &self.filter
    }

    /// Serializes `entity` with a fresh visited set.
    pub fn serialize(&self, entity: &dyn Entity) -> SerializedNode {
        let mut visited = VisitedSet::new();
        self.serialize_into(entity, &mut visited)
    }

    /// Serializes `entity`, recording every fully serialized entity in
    /// `visited`. Entities already present come back as stubs.
    pub fn serialize_into(&self, entity: &dyn Entity, visited: &mut VisitedSet) -> SerializedNode {
        let key = entity.key();
        if visited.contains(&key) {
            tracing::trace!(entity = %key, "already visited, emitting stub");
            return SerializedNode::stub(key);
        }
        visited.insert(key.clone());

        let type_name = entity.type_name();
        let mut node = SerializedNode::new(key);
        for field in entity.fields() {
            if RESERVED_KEYS.contains(&field.name.as_str()) {
                continue;
            }
            if !self.filter.allows(type_name, &field.name) {
                continue;
            }
            let value = self.render(field, entity.attribute(&field.name), visited);
            node.push(field.name.clone(), value);
        }
        node
    }

    fn render(
        &self,
        field: &FieldDescriptor,
        value: AttributeValue<'_>,
        visited: &mut VisitedSet,
    ) -> NodeValue {
        match (classify(field), value) {
            (Strategy::Choice(choices), AttributeValue::Scalar(scalar)) => {
                choice_value(choices, &scalar)
            }
            (Strategy::BitFlags(labels), AttributeValue::Scalar(scalar)) => {
                match scalar.as_bits() {
                    Some(bits) => bit_flags_value(labels, bits),
                    None => self.scalar(scalar),
                }
            }
            // Relations are followed whatever the declared kind says; a value
            // whose shape disagrees with its kind is passed through.
            (_, value) => self.passthrough(value, visited),
        }
    }

    fn passthrough(&self, value: AttributeValue<'_>, visited: &mut VisitedSet) -> NodeValue {
        match value {
            AttributeValue::Scalar(scalar) => self.scalar(scalar),
            AttributeValue::Reference(None) => NodeValue::Null,
            AttributeValue::Reference(Some(entity)) => {
                NodeValue::Node(Box::new(self.serialize_into(entity.as_ref(), visited)))
            }
            AttributeValue::Collection(items) => NodeValue::Nodes(
                items
                    .iter()
                    .map(|entity| self.serialize_into(entity.as_ref(), visited))
                    .collect(),
            ),
        }
    }

    fn scalar(&self, scalar: Scalar) -> NodeValue {
        match scalar {
            Scalar::Null => NodeValue::Null,
            Scalar::Bool(b) => NodeValue::Bool(b),
            Scalar::Int(i) => NodeValue::Int(i),
            Scalar::Float(f) => NodeValue::Float(f),
            Scalar::Text(s) => NodeValue::Text(s),
            Scalar::Date(d) => NodeValue::Text(self.format_datetime(d.and_time(NaiveTime::MIN))),
            Scalar::DateTime(dt) => NodeValue::Text(self.format_datetime(dt)),
        }
    }

    fn format_datetime(&self, dt: NaiveDateTime) -> String {
        let mut out = String::new();
        if write!(out, "{}", dt.format(&self.datetime_format)).is_err() {
            tracing::warn!(format = %self.datetime_format, "invalid datetime format, using default");
            return dt.format(DEFAULT_DATETIME_FORMAT).to_string();
        }
        out
    }
}

/// Serializes `entity` with optional include/exclude lists.
///
/// Fails with [`InvalidFilterConfiguration`](crate::error::ModelflowError::InvalidFilterConfiguration)
/// before any work when both lists are given.
pub fn serialize<S: AsRef<str>>(
    entity: &dyn Entity,
    include: Option<&[S]>,
    exclude: Option<&[S]>,
) -> Result<SerializedNode> {
    let filter = FieldFilter::new(include, exclude)?;
    Ok(Serializer::new(filter).serialize(entity))
}
