use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::Result;
use crate::model::{EntityId, EntityKey};

/// One entry of a serialized bit-flag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flag {
    pub checked: bool,
    pub label: String,
}

/// A serialized attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Choice { selected: usize, labels: Vec<String> },
    Flags(Vec<Flag>),
    Node(Box<SerializedNode>),
    Nodes(Vec<SerializedNode>),
}

impl NodeValue {
    pub fn as_node(&self) -> Option<&SerializedNode> {
        match self {
            NodeValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[SerializedNode]> {
        match self {
            NodeValue::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }
}

/// Output tree node: identity, type tag and serialized attributes in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedNode {
    pub id: EntityId,
    pub type_name: String,
    stub: bool,
    fields: Vec<(String, NodeValue)>,
}

impl SerializedNode {
    pub(crate) fn new(key: EntityKey) -> Self {
        Self {
            id: key.id,
            type_name: key.type_name,
            stub: false,
            fields: Vec::new(),
        }
    }

    /// Node emitted for an entity already visited in the same traversal.
    pub(crate) fn stub(key: EntityKey) -> Self {
        Self {
            stub: true,
            ..Self::new(key)
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: NodeValue) {
        self.fields.push((name.into(), value));
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.type_name.clone(), self.id.clone())
    }

    pub fn is_stub(&self) -> bool {
        self.stub
    }

    pub fn get(&self, name: &str) -> Option<&NodeValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &NodeValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for SerializedNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("type", &self.type_name)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
