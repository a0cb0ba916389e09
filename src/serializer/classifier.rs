//! Maps a declared attribute kind to the way its value is serialized.

use crate::model::{Choice, FieldDescriptor, FieldKind, Scalar};

use super::node::{Flag, NodeValue};

/// How one attribute is turned into a [`NodeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'f> {
    /// Value is emitted as-is.
    Passthrough,
    Choice(&'f [Choice]),
    BitFlags(&'f [String]),
    /// Serialize the referenced entity.
    Recurse,
    /// Serialize every related entity, in collection order.
    RecurseEach,
}

/// Never fails: kinds without a dedicated strategy pass through unchanged.
pub fn classify(field: &FieldDescriptor) -> Strategy<'_> {
    match &field.kind {
        FieldKind::Scalar => Strategy::Passthrough,
        FieldKind::Choice(choices) if choices.is_empty() => Strategy::Passthrough,
        FieldKind::Choice(choices) => Strategy::Choice(choices),
        FieldKind::BitFlags(labels) => Strategy::BitFlags(labels),
        FieldKind::Reference => Strategy::Recurse,
        FieldKind::ReferenceSet | FieldKind::Reverse { .. } => Strategy::RecurseEach,
        FieldKind::Other(kind) => {
            tracing::trace!(field = %field.name, kind = %kind, "no strategy for kind, passing through");
            Strategy::Passthrough
        }
    }
}

/// `selected` is the index of the first choice whose code matches `value`,
/// or 0 when nothing matches.
pub fn choice_value(choices: &[Choice], value: &Scalar) -> NodeValue {
    let code = value.as_code();
    let selected = choices
        .iter()
        .position(|choice| choice.code == code)
        .unwrap_or(0);
    NodeValue::Choice {
        selected,
        labels: choices.iter().map(|choice| choice.label.clone()).collect(),
    }
}

/// Bit `i` of `bits` (least significant first) drives `labels[i]`.
pub fn bit_flags_value(labels: &[String], bits: u64) -> NodeValue {
    let flags = labels
        .iter()
        .enumerate()
        .map(|(i, label)| Flag {
            checked: u32::try_from(i)
                .ok()
                .and_then(|shift| bits.checked_shr(shift))
                .is_some_and(|v| v & 1 == 1),
            label: label.clone(),
        })
        .collect();
    NodeValue::Flags(flags)
}
