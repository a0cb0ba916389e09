use crate::error::{ModelflowError, Result};

/// Attribute selection shared by every level of one traversal.
///
/// Entries are namespaced as `"<TypeName>.<field>"`; only entries for the
/// type being serialized apply at that level. An include list with no entry
/// for a type leaves that type with no attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldFilter {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl FieldFilter {
    /// Builds a filter from optional include/exclude lists.
    ///
    /// Supplying both is an error even when one of them is empty; an empty
    /// list on its own means "no filtering".
    pub fn new<S: AsRef<str>>(include: Option<&[S]>, exclude: Option<&[S]>) -> Result<Self> {
        match (include, exclude) {
            (Some(_), Some(_)) => Err(ModelflowError::InvalidFilterConfiguration),
            (Some(names), None) if !names.is_empty() => Ok(Self::Include(owned(names))),
            (None, Some(names)) if !names.is_empty() => Ok(Self::Exclude(owned(names))),
            _ => Ok(Self::All),
        }
    }

    pub fn include<S: AsRef<str>>(names: &[S]) -> Self {
        Self::Include(owned(names))
    }

    pub fn exclude<S: AsRef<str>>(names: &[S]) -> Self {
        Self::Exclude(owned(names))
    }

    pub fn allows(&self, type_name: &str, field: &str) -> bool {
        match self {
            FieldFilter::All => true,
            FieldFilter::Include(names) => names.iter().any(|n| names_field(n, type_name, field)),
            FieldFilter::Exclude(names) => !names.iter().any(|n| names_field(n, type_name, field)),
        }
    }
}

fn owned<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|n| n.as_ref().to_string()).collect()
}

/// `"Book.title"` names `title` on `Book`. Only the last dotted segment is
/// compared against the field name.
fn names_field(entry: &str, type_name: &str, field: &str) -> bool {
    entry
        .strip_prefix(type_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.rsplit('.').next())
        .is_some_and(|name| name == field)
}
