use crate::label::EntityLabel;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Byte span of a node in the source it was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Label, value and optional range of one node, detached from its tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    pub label: EntityLabel,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
}

impl Entity {
    pub fn new(label: EntityLabel, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            range: None,
        }
    }

    #[must_use]
    pub const fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Same label and value, source range ignored
    pub fn same_content(&self, other: &Self) -> bool {
        self.label == other.label && self.value == other.value
    }

    /// Copy of the entity with the source range dropped
    #[must_use]
    pub fn without_range(&self) -> Self {
        Self {
            label: self.label,
            value: self.value.clone(),
            range: None,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// Index of a node inside a [`Signature`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    label: EntityLabel,
    value: String,
    range: Option<SourceRange>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub const fn label(&self) -> EntityLabel {
        self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub const fn range(&self) -> Option<SourceRange> {
        self.range
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn entity(&self) -> Entity {
        Entity {
            label: self.label,
            value: self.value.clone(),
            range: self.range,
        }
    }
}

/// Node predicate used by [`Signature::locate`]
#[derive(Debug, Clone, Copy)]
pub enum Locate<'a> {
    /// Equal label and value
    LabelAndValue(EntityLabel, &'a str),
    /// Equal value, any label
    Value(&'a str),
    /// Equal label and value, and equal range when both sides carry one
    Entity(&'a Entity),
}

impl Locate<'_> {
    fn matches(&self, node: &Node) -> bool {
        match *self {
            Self::LabelAndValue(label, value) => node.label == label && node.value == value,
            Self::Value(value) => node.value == value,
            Self::Entity(entity) => {
                node.label == entity.label
                    && node.value == entity.value
                    && match (node.range, entity.range) {
                        (Some(a), Some(b)) => a == b,
                        _ => true,
                    }
            }
        }
    }
}

/// How [`structurally_equal`] compares paired nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    Label,
    Value,
}

/// Canonical tree of one construct body.
///
/// Nodes live in an arena; the root is always the first node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    nodes: Vec<Node>,
}

impl Signature {
    /// Create a tree holding only a root node
    pub fn new(label: EntityLabel, value: impl Into<String>) -> Self {
        Self::with_root(Entity::new(label, value))
    }

    pub fn with_root(entity: Entity) -> Self {
        Self {
            nodes: vec![Node {
                label: entity.label,
                value: entity.value,
                range: entity.range,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a child as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, entity: Entity) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            label: entity.label,
            value: entity.value,
            range: entity.range,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn entity(&self, id: NodeId) -> Entity {
        self.nodes[id.0].entity()
    }

    /// Position of `id` among its siblings
    pub fn child_position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    pub fn breadth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root()]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.children(id).iter().copied());
        }
        order
    }

    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Depth-first enumeration with children before their parent
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
            } else {
                stack.push((id, true));
                stack.extend(self.children(id).iter().rev().map(|child| (*child, false)));
            }
        }
        order
    }

    /// First node in breadth-first order satisfying `predicate`
    pub fn find<F>(&self, mut predicate: F) -> Option<NodeId>
    where
        F: FnMut(&Self, NodeId) -> bool,
    {
        self.breadth_first()
            .into_iter()
            .find(|id| predicate(self, *id))
    }

    pub fn locate(&self, query: &Locate<'_>) -> Option<NodeId> {
        self.find(|tree, id| query.matches(tree.node(id)))
    }

    /// Indented one-node-per-line rendering, mostly for logs
    pub fn render(&self) -> String {
        let mut out = String::new();
        for id in self.pre_order() {
            let node = self.node(id);
            out.push_str(&"  ".repeat(self.depth(id)));
            out.push_str(&format!("{}: {}\n", node.label, node.value));
        }
        out
    }
}

/// Compare two trees node by node over their post-order enumerations
pub fn structurally_equal(a: &Signature, b: &Signature, mode: CompareMode) -> bool {
    let left = a.post_order();
    let right = b.post_order();
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right.iter()).all(|(l, r)| {
        let (l, r) = (a.node(*l), b.node(*r));
        match mode {
            CompareMode::Label => l.label == r.label,
            CompareMode::Value => l.value == r.value,
        }
    })
}
