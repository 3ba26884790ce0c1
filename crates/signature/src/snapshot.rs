//! JSON snapshot format of a [`Signature`].
//!
//! ```text
//! {"ast":[{"Value":"..","EntityType":"METHOD",
//!          "SourceCodeEntity":{"Modifiers":0,"SourceRange":{"Start":0,"End":42}},
//!          "C":[ ...children... ]}]}
//! ```

use crate::error::{Result, SignatureError};
use crate::label::EntityLabel;
use crate::tree::{Entity, NodeId, Signature, SourceRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    ast: Vec<SnapshotNode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotNode {
    #[serde(rename = "Value", default)]
    value: String,
    #[serde(rename = "EntityType", default)]
    entity_type: String,
    #[serde(
        rename = "SourceCodeEntity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    source: Option<SnapshotSource>,
    #[serde(rename = "C", default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<SnapshotNode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotSource {
    #[serde(rename = "Modifiers", default)]
    modifiers: i64,
    #[serde(rename = "SourceRange", default, skip_serializing_if = "Option::is_none")]
    range: Option<SnapshotRange>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRange {
    #[serde(rename = "Start")]
    start: usize,
    #[serde(rename = "End")]
    end: usize,
}

impl SnapshotNode {
    fn entity(&self) -> Entity {
        Entity {
            label: EntityLabel::from_name(&self.entity_type),
            value: self.value.clone(),
            range: self
                .source
                .as_ref()
                .and_then(|s| s.range.as_ref())
                .map(|r| SourceRange::new(r.start, r.end)),
        }
    }
}

impl Signature {
    /// Decode a snapshot document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: SnapshotDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let document: SnapshotDocument = serde_json::from_value(value)?;
        Self::from_document(document)
    }

    fn from_document(document: SnapshotDocument) -> Result<Self> {
        let mut roots = document.ast.into_iter();
        let root = roots
            .next()
            .ok_or_else(|| SignatureError::invalid_snapshot("'ast' array is empty"))?;
        if roots.next().is_some() {
            log::warn!("Snapshot holds more than one root, ignoring the extra ones");
        }

        let mut tree = Self::with_root(root.entity());
        let mut pending: Vec<(NodeId, SnapshotNode)> = vec![(tree.root(), root)];
        while let Some((id, node)) = pending.pop() {
            for child in node.children {
                let child_id = tree.add_child(id, child.entity());
                pending.push((child_id, child));
            }
        }
        Ok(tree)
    }

    /// Encode as a snapshot document
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_document())?)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_document())?)
    }

    fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            ast: vec![self.snapshot_node(self.root())],
        }
    }

    fn snapshot_node(&self, id: NodeId) -> SnapshotNode {
        let node = self.node(id);
        SnapshotNode {
            value: node.value().to_string(),
            entity_type: node.label().as_str().to_string(),
            source: Some(SnapshotSource {
                modifiers: 0,
                range: node.range().map(|r| SnapshotRange {
                    start: r.start,
                    end: r.end,
                }),
            }),
            children: node
                .children()
                .iter()
                .map(|child| self.snapshot_node(*child))
                .collect(),
        }
    }
}
