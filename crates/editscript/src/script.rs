use crate::error::{EditScriptError, Result};
use crate::op::{EditOp, OpKind};
use fixcheck_signature::{Entity, EntityLabel, SourceRange};
use serde_json::{json, Map, Value};

/// Set of edit operations.
///
/// Insertion order is kept for reporting; exact duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    ops: Vec<EditOp>,
}

impl EditScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `op` unless an identical operation is already present
    pub fn insert(&mut self, op: EditOp) -> bool {
        if self.ops.contains(&op) {
            return false;
        }
        self.ops.push(op);
        true
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditOp> {
        self.ops.iter()
    }

    pub fn contains(&self, op: &EditOp) -> bool {
        self.ops.contains(op)
    }

    /// Whether an equal operation exists, source ranges ignored
    pub fn contains_ignoring_ranges(&self, op: &EditOp) -> bool {
        self.ops.iter().any(|candidate| candidate.same_as(op))
    }

    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&EditOp) -> bool,
    {
        self.ops.retain(f);
    }

    /// Drop every operation also present in `other`, source ranges ignored.
    ///
    /// Returns the number of removed operations.
    pub fn remove_all_ignoring_ranges(&mut self, other: &Self) -> usize {
        let before = self.ops.len();
        self.ops.retain(|op| !other.contains_ignoring_ranges(op));
        before - self.ops.len()
    }

    /// Contains an Insert, Delete or Move
    pub fn is_structural_change(&self) -> bool {
        self.ops.iter().any(EditOp::is_structural)
    }

    pub fn count(&self, kind: OpKind) -> usize {
        self.ops.iter().filter(|op| op.kind() == kind).count()
    }

    /// Encode as a `StructureEntity` document describing changes to `unique_name`
    pub fn to_json_value(&self, unique_name: &str) -> Value {
        let changes: Vec<Value> = self.ops.iter().map(op_to_value).collect();
        json!({
            "StructureEntity": {
                "UniqueName": unique_name,
                "EntityType": EntityLabel::Method.as_str(),
                "Modifiers": "0",
                "changes": changes,
            }
        })
    }

    pub fn to_json(&self, unique_name: &str) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json_value(unique_name))?)
    }

    /// Decode a `StructureEntity` document; a bare `changes` array is accepted too
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let changes = value
            .get("StructureEntity")
            .and_then(|s| s.get("changes"))
            .or_else(|| value.get("changes"))
            .or(if value.is_array() { Some(value) } else { None })
            .and_then(Value::as_array)
            .ok_or_else(|| EditScriptError::invalid("missing 'changes' array"))?;

        let mut script = Self::new();
        for change in changes {
            script.insert(op_from_value(change)?);
        }
        Ok(script)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }
}

impl FromIterator<EditOp> for EditScript {
    fn from_iter<I: IntoIterator<Item = EditOp>>(iter: I) -> Self {
        let mut script = Self::new();
        for op in iter {
            script.insert(op);
        }
        script
    }
}

impl Extend<EditOp> for EditScript {
    fn extend<I: IntoIterator<Item = EditOp>>(&mut self, iter: I) {
        for op in iter {
            self.insert(op);
        }
    }
}

impl IntoIterator for EditScript {
    type Item = EditOp;
    type IntoIter = std::vec::IntoIter<EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = std::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

fn entity_to_value(entity: &Entity) -> Value {
    let mut object = Map::new();
    object.insert("UniqueName".into(), Value::String(entity.value.clone()));
    object.insert(
        "EntityType".into(),
        Value::String(entity.label.as_str().to_string()),
    );
    object.insert("Modifiers".into(), Value::String("0".into()));
    if let Some(range) = entity.range {
        object.insert(
            "SourceCodeRange".into(),
            json!({ "Start": range.start.to_string(), "End": range.end.to_string() }),
        );
    }
    Value::Object(object)
}

fn op_to_value(op: &EditOp) -> Value {
    let mut object = Map::new();
    object.insert(
        "OperationType".into(),
        Value::String(op.kind().as_str().into()),
    );
    object.insert(
        "changeType".into(),
        Value::String(op.change_type().as_str().into()),
    );
    match op {
        EditOp::Insert { entity, parent } => {
            object.insert("InsertedEntity".into(), entity_to_value(entity));
            object.insert("ParentEntity".into(), entity_to_value(parent));
        }
        EditOp::Delete { entity, parent } => {
            object.insert("DeletedEntity".into(), entity_to_value(entity));
            object.insert("ParentEntity".into(), entity_to_value(parent));
        }
        EditOp::Move {
            entity,
            parent,
            new_parent,
            new_entity,
        } => {
            object.insert("OldParentEntity".into(), entity_to_value(parent));
            object.insert("MovedEntity".into(), entity_to_value(entity));
            object.insert("NewParentEntity".into(), entity_to_value(new_parent));
            object.insert("NewEntity".into(), entity_to_value(new_entity));
        }
        EditOp::Update {
            entity,
            parent,
            new_entity,
        } => {
            object.insert("NewEntity".into(), entity_to_value(new_entity));
            object.insert("UpdatedEntity".into(), entity_to_value(entity));
            object.insert("ParentEntity".into(), entity_to_value(parent));
        }
    }
    Value::Object(object)
}

/// Numbers are written as strings but accepted in either form
fn number(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn entity_from_value(change: &Value, key: &str) -> Result<Entity> {
    let value = change
        .get(key)
        .ok_or_else(|| EditScriptError::invalid(format!("missing '{key}'")))?;
    let label = value
        .get("EntityType")
        .and_then(Value::as_str)
        .map_or(EntityLabel::Method, EntityLabel::from_name);
    let unique_name = value
        .get("UniqueName")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut entity = Entity::new(label, unique_name);
    if let Some(range) = value.get("SourceCodeRange") {
        if let (Some(start), Some(end)) = (number(range.get("Start")), number(range.get("End"))) {
            entity = entity.with_range(SourceRange::new(start, end));
        }
    }
    Ok(entity)
}

fn op_from_value(change: &Value) -> Result<EditOp> {
    let name = change
        .get("OperationType")
        .and_then(Value::as_str)
        .ok_or_else(|| EditScriptError::invalid("missing 'OperationType'"))?;
    let kind =
        OpKind::parse(name).ok_or_else(|| EditScriptError::UnknownOperation(name.to_string()))?;

    Ok(match kind {
        OpKind::Insert => EditOp::Insert {
            entity: entity_from_value(change, "InsertedEntity")?,
            parent: entity_from_value(change, "ParentEntity")?,
        },
        OpKind::Delete => EditOp::Delete {
            entity: entity_from_value(change, "DeletedEntity")?,
            parent: entity_from_value(change, "ParentEntity")?,
        },
        OpKind::Move => EditOp::Move {
            entity: entity_from_value(change, "MovedEntity")?,
            parent: entity_from_value(change, "OldParentEntity")?,
            new_parent: entity_from_value(change, "NewParentEntity")?,
            new_entity: entity_from_value(change, "NewEntity")?,
        },
        OpKind::Update => EditOp::Update {
            entity: entity_from_value(change, "UpdatedEntity")?,
            parent: entity_from_value(change, "ParentEntity")?,
            new_entity: entity_from_value(change, "NewEntity")?,
        },
    })
}
