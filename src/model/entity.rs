use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, process-unique identity of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Uuid(Uuid),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{id}"),
            EntityId::Uuid(id) => write!(f, "{id}"),
            EntityId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        EntityId::Int(i64::from(id))
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        EntityId::Uuid(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

/// Identity plus declared type. Two entities with the same key are the same
/// node as far as cycle detection and history lookups are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl EntityKey {
    pub fn new(type_name: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.type_name, self.id)
    }
}

/// One `(code, label)` entry of an enumerated-choice attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub code: String,
    pub label: String,
}

impl Choice {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

/// Structural kind of a declared attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Scalar,
    Choice(Vec<Choice>),
    BitFlags(Vec<String>),
    Reference,
    ReferenceSet,
    /// Entities of `source_type` whose `source_field` points at this one.
    Reverse {
        source_type: String,
        source_field: String,
    },
    /// A kind this crate does not know how to treat specially.
    Other(String),
}

/// Name and kind of one declared attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    pub fn choice(name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::new(name, FieldKind::Choice(choices))
    }

    /// Choice attribute whose stored codes are the labels themselves.
    pub fn choice_labels<S: AsRef<str>>(name: impl Into<String>, labels: &[S]) -> Self {
        let choices = labels
            .iter()
            .map(|l| Choice::new(l.as_ref(), l.as_ref()))
            .collect();
        Self::choice(name, choices)
    }

    pub fn bit_flags<S: AsRef<str>>(name: impl Into<String>, labels: &[S]) -> Self {
        let labels = labels.iter().map(|l| l.as_ref().to_string()).collect();
        Self::new(name, FieldKind::BitFlags(labels))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Reference)
    }

    pub fn reference_set(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::ReferenceSet)
    }

    pub fn reverse(
        name: impl Into<String>,
        source_type: impl Into<String>,
        source_field: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::Reverse {
                source_type: source_type.into(),
                source_field: source_field.into(),
            },
        )
    }

    /// Whether values of this attribute point at other entities.
    pub fn is_relation(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Reference | FieldKind::ReferenceSet | FieldKind::Reverse { .. }
        )
    }
}

/// A non-relational attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Scalar {
    /// Textual form used to match choice codes.
    pub fn as_code(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
            Scalar::Date(d) => d.to_string(),
            Scalar::DateTime(dt) => dt.to_string(),
        }
    }

    /// Integer view used for bit-flag sets.
    pub fn as_bits(&self) -> Option<u64> {
        match self {
            Scalar::Int(i) => Some(*i as u64),
            Scalar::Bool(b) => Some(u64::from(*b)),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Date(d)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(dt: NaiveDateTime) -> Self {
        Scalar::DateTime(dt)
    }
}

/// The value an [`Entity`] hands back for one of its attributes.
pub enum AttributeValue<'a> {
    Scalar(Scalar),
    Reference(Option<Box<dyn Entity + 'a>>),
    /// Related entities in the collaborator's stable order.
    Collection(Vec<Box<dyn Entity + 'a>>),
}

impl fmt::Debug for AttributeValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            AttributeValue::Reference(r) => f
                .debug_tuple("Reference")
                .field(&r.as_ref().map(|e| e.key()))
                .finish(),
            AttributeValue::Collection(items) => f
                .debug_tuple("Collection")
                .field(&items.iter().map(|e| e.key()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Read access to a persisted domain object.
///
/// Implementors expose identity, declared type, the ordered attribute list,
/// and attribute values. Related entities are returned as boxed trait objects
/// borrowing from the backing store, so cyclic graphs need no reference
/// counting.
pub trait Entity {
    fn id(&self) -> EntityId;

    fn type_name(&self) -> &str;

    /// Declared attributes, in declaration order.
    fn fields(&self) -> &[FieldDescriptor];

    /// Value of the named attribute. Unknown names yield `Scalar::Null`.
    fn attribute(&self, name: &str) -> AttributeValue<'_>;

    fn key(&self) -> EntityKey {
        EntityKey::new(self.type_name(), self.id())
    }
}
