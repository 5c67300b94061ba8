use serde::{Deserialize, Serialize};

use crate::storage::EntityKind;

/// Closed-form description of a field's declared return shape. The four
/// entity-bearing shapes (single/list, nullable/required) are the only ones a
/// reference annotation may attach to; scalar shapes exist so every field has
/// an explicit declaration and so mismatches are caught while compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TypeShape {
    /// A leaf value (string, boolean, number).
    Scalar,
    /// A list of leaf values.
    ScalarList,
    /// One entity; `required` records the declaration only, dangling
    /// references still resolve to null.
    Entity { kind: EntityKind, required: bool },
    /// An ordered list of entities; `element_required` records the declaration.
    EntityList { kind: EntityKind, element_required: bool },
}

impl TypeShape {
    /// The entity kind this shape carries, if any.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            TypeShape::Entity { kind, .. } | TypeShape::EntityList { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Classifier used by the reference directive: target kind plus cardinality.
    /// None means the shape cannot support identifier expansion at all.
    pub fn reference_target(&self) -> Option<(EntityKind, bool)> {
        match self {
            TypeShape::Entity { kind, .. } => Some((*kind, false)),
            TypeShape::EntityList { kind, .. } => Some((*kind, true)),
            TypeShape::Scalar | TypeShape::ScalarList => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, TypeShape::ScalarList | TypeShape::EntityList { .. })
    }
}
