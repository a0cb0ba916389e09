//! Arena-backed in-memory object graph.
//!
//! [`ObjectGraph`] stores records of declared types and the links between
//! them by index, so self-references and longer cycles are plain data.
//! [`GraphEntity`] is the borrowed [`Entity`] view the serializer walks.
//! Reverse relations are never stored; they are derived on read by scanning
//! records of the source type in insertion order.

use std::collections::HashMap;

use crate::error::{ModelflowError, Result};

use super::entity::{
    AttributeValue, Entity, EntityId, EntityKey, FieldDescriptor, FieldKind, Scalar,
};

/// Handle to a record inside an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

#[derive(Debug, Clone)]
enum Stored {
    Scalar(Scalar),
    Reference(Option<NodeRef>),
    Collection(Vec<NodeRef>),
}

#[derive(Debug, Clone)]
struct Record {
    key: EntityKey,
    values: HashMap<String, Stored>,
}

#[derive(Debug, Default)]
pub struct ObjectGraph {
    schemas: HashMap<String, Vec<FieldDescriptor>>,
    records: Vec<Record>,
    index: HashMap<EntityKey, NodeRef>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or redeclares) the ordered attribute list of a type.
    pub fn define(&mut self, type_name: impl Into<String>, fields: Vec<FieldDescriptor>) -> &mut Self {
        self.schemas.insert(type_name.into(), fields);
        self
    }

    pub fn insert(&mut self, type_name: &str, id: impl Into<EntityId>) -> Result<NodeRef> {
        if !self.schemas.contains_key(type_name) {
            return Err(ModelflowError::Graph(format!("type `{type_name}` is not defined")));
        }
        let key = EntityKey::new(type_name, id);
        if self.index.contains_key(&key) {
            return Err(ModelflowError::Graph(format!("{key} already exists")));
        }
        let node = NodeRef(self.records.len());
        self.records.push(Record {
            key: key.clone(),
            values: HashMap::new(),
        });
        self.index.insert(key, node);
        Ok(node)
    }

    /// Sets a non-relational attribute.
    pub fn set(&mut self, node: NodeRef, field: &str, value: impl Into<Scalar>) -> Result<()> {
        let descriptor = self.descriptor(node, field)?;
        if descriptor.is_relation() {
            return Err(ModelflowError::Graph(format!(
                "`{field}` is a relation, use link/add"
            )));
        }
        self.store(node, field, Stored::Scalar(value.into()));
        Ok(())
    }

    /// Points a single-reference attribute at `target` (or clears it).
    pub fn link(&mut self, node: NodeRef, field: &str, target: Option<NodeRef>) -> Result<()> {
        let descriptor = self.descriptor(node, field)?;
        if descriptor.kind != FieldKind::Reference {
            return Err(ModelflowError::Graph(format!(
                "`{field}` is not a single reference"
            )));
        }
        if let Some(target) = target {
            self.check_node(target)?;
        }
        self.store(node, field, Stored::Reference(target));
        Ok(())
    }

    /// Adds `target` to a multi-reference attribute. Adding an entity already
    /// in the set is a no-op.
    pub fn add(&mut self, node: NodeRef, field: &str, target: NodeRef) -> Result<()> {
        let descriptor = self.descriptor(node, field)?;
        if descriptor.kind != FieldKind::ReferenceSet {
            return Err(ModelflowError::Graph(format!(
                "`{field}` is not a reference set"
            )));
        }
        self.check_node(target)?;
        let values = &mut self.records[node.0].values;
        match values
            .entry(field.to_string())
            .or_insert_with(|| Stored::Collection(Vec::new()))
        {
            Stored::Collection(items) => {
                if !items.contains(&target) {
                    items.push(target);
                }
            }
            other => *other = Stored::Collection(vec![target]),
        }
        Ok(())
    }

    pub fn get(&self, node: NodeRef) -> GraphEntity<'_> {
        GraphEntity { graph: self, node }
    }

    pub fn find(&self, key: &EntityKey) -> Option<GraphEntity<'_>> {
        self.index.get(key).map(|node| self.get(*node))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_node(&self, node: NodeRef) -> Result<()> {
        if node.0 < self.records.len() {
            Ok(())
        } else {
            Err(ModelflowError::Graph(format!("dangling node {}", node.0)))
        }
    }

    fn descriptor(&self, node: NodeRef, field: &str) -> Result<&FieldDescriptor> {
        self.check_node(node)?;
        let key = &self.records[node.0].key;
        self.schemas
            .get(&key.type_name)
            .and_then(|fields| fields.iter().find(|f| f.name == field))
            .ok_or_else(|| ModelflowError::Graph(format!("{key} has no field `{field}`")))
    }

    fn store(&mut self, node: NodeRef, field: &str, value: Stored) {
        self.records[node.0].values.insert(field.to_string(), value);
    }

    fn record(&self, node: NodeRef) -> &Record {
        &self.records[node.0]
    }

    /// Records of `source_type` whose `source_field` references `target`.
    fn referrers(&self, target: NodeRef, source_type: &str, source_field: &str) -> Vec<NodeRef> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.key.type_name == source_type)
            .filter(|(_, record)| match record.values.get(source_field) {
                Some(Stored::Reference(Some(node))) => *node == target,
                Some(Stored::Collection(items)) => items.contains(&target),
                _ => false,
            })
            .map(|(index, _)| NodeRef(index))
            .collect()
    }
}

/// Borrowed [`Entity`] view of one record.
#[derive(Debug, Clone, Copy)]
pub struct GraphEntity<'g> {
    graph: &'g ObjectGraph,
    node: NodeRef,
}

impl<'g> GraphEntity<'g> {
    pub fn node(&self) -> NodeRef {
        self.node
    }

    fn boxed(&self, node: NodeRef) -> Box<dyn Entity + 'g> {
        Box::new(self.graph.get(node))
    }
}

impl Entity for GraphEntity<'_> {
    fn id(&self) -> EntityId {
        self.graph.record(self.node).key.id.clone()
    }

    fn type_name(&self) -> &str {
        &self.graph.record(self.node).key.type_name
    }

    fn fields(&self) -> &[FieldDescriptor] {
        self.graph
            .schemas
            .get(self.type_name())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn attribute(&self, name: &str) -> AttributeValue<'_> {
        let Some(descriptor) = self.fields().iter().find(|f| f.name == name) else {
            return AttributeValue::Scalar(Scalar::Null);
        };

        if let FieldKind::Reverse {
            source_type,
            source_field,
        } = &descriptor.kind
        {
            let items = self
                .graph
                .referrers(self.node, source_type, source_field)
                .into_iter()
                .map(|node| self.boxed(node))
                .collect();
            return AttributeValue::Collection(items);
        }

        match self.graph.record(self.node).values.get(name) {
            Some(Stored::Scalar(value)) => AttributeValue::Scalar(value.clone()),
            Some(Stored::Reference(target)) => {
                AttributeValue::Reference(target.map(|node| self.boxed(node)))
            }
            Some(Stored::Collection(items)) => {
                AttributeValue::Collection(items.iter().map(|node| self.boxed(*node)).collect())
            }
            None => match descriptor.kind {
                FieldKind::Reference => AttributeValue::Reference(None),
                FieldKind::ReferenceSet => AttributeValue::Collection(Vec::new()),
                _ => AttributeValue::Scalar(Scalar::Null),
            },
        }
    }
}
