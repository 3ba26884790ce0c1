use fixcheck_signature::{Entity, EntityLabel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a tree transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpKind {
    Insert,
    Delete,
    Move,
    Update,
}

impl OpKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "Insert",
            Self::Delete => "Delete",
            Self::Move => "Move",
            Self::Update => "Update",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Insert" => Some(Self::Insert),
            "Delete" => Some(Self::Delete),
            "Move" => Some(Self::Move),
            "Update" => Some(Self::Update),
            _ => None,
        }
    }
}

/// Fine-grained classification of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    StatementInsert,
    StatementDelete,
    StatementUpdate,
    StatementOrderingChange,
    StatementParentChange,
    ConditionExpressionChange,
    AlternativePartInsert,
    AlternativePartDelete,
}

impl ChangeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatementInsert => "STATEMENT_INSERT",
            Self::StatementDelete => "STATEMENT_DELETE",
            Self::StatementUpdate => "STATEMENT_UPDATE",
            Self::StatementOrderingChange => "STATEMENT_ORDERING_CHANGE",
            Self::StatementParentChange => "STATEMENT_PARENT_CHANGE",
            Self::ConditionExpressionChange => "CONDITION_EXPRESSION_CHANGE",
            Self::AlternativePartInsert => "ALTERNATIVE_PART_INSERT",
            Self::AlternativePartDelete => "ALTERNATIVE_PART_DELETE",
        }
    }
}

/// One tree transformation.
///
/// `entity` is the node as it was before the operation (for `Insert`, the
/// inserted node), `parent` its parent at that time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditOp {
    Insert {
        entity: Entity,
        parent: Entity,
    },
    Delete {
        entity: Entity,
        parent: Entity,
    },
    Move {
        entity: Entity,
        parent: Entity,
        new_parent: Entity,
        new_entity: Entity,
    },
    Update {
        entity: Entity,
        parent: Entity,
        new_entity: Entity,
    },
}

impl EditOp {
    pub const fn kind(&self) -> OpKind {
        match self {
            Self::Insert { .. } => OpKind::Insert,
            Self::Delete { .. } => OpKind::Delete,
            Self::Move { .. } => OpKind::Move,
            Self::Update { .. } => OpKind::Update,
        }
    }

    pub const fn entity(&self) -> &Entity {
        match self {
            Self::Insert { entity, .. }
            | Self::Delete { entity, .. }
            | Self::Move { entity, .. }
            | Self::Update { entity, .. } => entity,
        }
    }

    pub const fn parent(&self) -> &Entity {
        match self {
            Self::Insert { parent, .. }
            | Self::Delete { parent, .. }
            | Self::Move { parent, .. }
            | Self::Update { parent, .. } => parent,
        }
    }

    pub const fn new_entity(&self) -> Option<&Entity> {
        match self {
            Self::Move { new_entity, .. } | Self::Update { new_entity, .. } => Some(new_entity),
            _ => None,
        }
    }

    pub const fn new_parent(&self) -> Option<&Entity> {
        match self {
            Self::Move { new_parent, .. } => Some(new_parent),
            _ => None,
        }
    }

    /// Node and parent a signature must exhibit once the operation is applied
    pub const fn addressed(&self) -> (&Entity, &Entity) {
        match self {
            Self::Insert { entity, parent } | Self::Delete { entity, parent } => (entity, parent),
            Self::Update {
                parent, new_entity, ..
            } => (new_entity, parent),
            Self::Move {
                new_parent,
                new_entity,
                ..
            } => (new_entity, new_parent),
        }
    }

    /// All entities in a fixed order, for pairwise comparison
    pub fn entities(&self) -> Vec<&Entity> {
        match self {
            Self::Insert { entity, parent } | Self::Delete { entity, parent } => {
                vec![entity, parent]
            }
            Self::Move {
                entity,
                parent,
                new_parent,
                new_entity,
            } => vec![entity, parent, new_parent, new_entity],
            Self::Update {
                entity,
                parent,
                new_entity,
            } => vec![entity, parent, new_entity],
        }
    }

    /// Same operation with every source range dropped
    #[must_use]
    pub fn without_ranges(&self) -> Self {
        match self {
            Self::Insert { entity, parent } => Self::Insert {
                entity: entity.without_range(),
                parent: parent.without_range(),
            },
            Self::Delete { entity, parent } => Self::Delete {
                entity: entity.without_range(),
                parent: parent.without_range(),
            },
            Self::Move {
                entity,
                parent,
                new_parent,
                new_entity,
            } => Self::Move {
                entity: entity.without_range(),
                parent: parent.without_range(),
                new_parent: new_parent.without_range(),
                new_entity: new_entity.without_range(),
            },
            Self::Update {
                entity,
                parent,
                new_entity,
            } => Self::Update {
                entity: entity.without_range(),
                parent: parent.without_range(),
                new_entity: new_entity.without_range(),
            },
        }
    }

    /// Equal kind and entities, source ranges ignored
    pub fn same_as(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self
                .entities()
                .iter()
                .zip(other.entities())
                .all(|(a, b)| a.same_content(b))
    }

    pub fn change_type(&self) -> ChangeType {
        match self {
            Self::Insert { entity, .. } if entity.label == EntityLabel::ElseStatement => {
                ChangeType::AlternativePartInsert
            }
            Self::Insert { .. } => ChangeType::StatementInsert,
            Self::Delete { entity, .. } if entity.label == EntityLabel::ElseStatement => {
                ChangeType::AlternativePartDelete
            }
            Self::Delete { .. } => ChangeType::StatementDelete,
            Self::Update { entity, .. } if has_condition(entity.label) => {
                ChangeType::ConditionExpressionChange
            }
            Self::Update { .. } => ChangeType::StatementUpdate,
            Self::Move {
                parent, new_parent, ..
            } if parent.same_content(new_parent) => ChangeType::StatementOrderingChange,
            Self::Move { .. } => ChangeType::StatementParentChange,
        }
    }

    /// Insert, Delete and Move change the tree shape; Update only a value
    pub const fn is_structural(&self) -> bool {
        !matches!(self, Self::Update { .. })
    }
}

fn has_condition(label: EntityLabel) -> bool {
    matches!(
        label,
        EntityLabel::IfStatement
            | EntityLabel::ThenStatement
            | EntityLabel::ElseStatement
            | EntityLabel::WhileStatement
            | EntityLabel::DoStatement
            | EntityLabel::ForStatement
            | EntityLabel::SwitchStatement
    )
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { entity, parent } => write!(f, "Insert [{entity}] into [{parent}]"),
            Self::Delete { entity, parent } => write!(f, "Delete [{entity}] from [{parent}]"),
            Self::Move {
                entity,
                parent,
                new_parent,
                ..
            } => write!(f, "Move [{entity}] from [{parent}] to [{new_parent}]"),
            Self::Update {
                entity, new_entity, ..
            } => write!(f, "Update [{entity}] to [{}]", new_entity.value),
        }
    }
}
