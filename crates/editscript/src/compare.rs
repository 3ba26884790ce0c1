use crate::differ::{DistillingDiffer, TreeDiffer};
use crate::op::EditOp;
use crate::script::EditScript;
use crate::similarity::{bigram_similarity, levenshtein_similarity};
use fixcheck_normalize::{NameNormalizer, NormalizationContext};
use fixcheck_signature::{Entity, NodeId, Signature};
use serde::Serialize;

/// Similarity a node value must exceed to count as a match.
///
/// Small scripts are matched more strictly than large ones.
pub const fn similarity_threshold(script_len: usize) -> f64 {
    match script_len {
        0..=2 => 0.7,
        3..=5 => 0.6,
        _ => 0.5,
    }
}

/// Outcome of [`EditScriptComparator::contains_change`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContainmentReport {
    pub contained: bool,
    pub matched: usize,
    pub total: usize,
    pub threshold: f64,
}

impl ContainmentReport {
    /// Share of operations found in the signature; 1.0 for an empty script
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }
}

/// How [`intersect`] decides that two entities are equal
#[derive(Debug, Clone, Copy)]
pub enum EntityComparison<'a> {
    /// Equal label and value
    IgnoreRange,
    /// Equal label and equal normalized value
    Normalized {
        normalizer: &'a NameNormalizer,
        context: NormalizationContext<'a>,
    },
}

impl EntityComparison<'_> {
    pub const fn is_relaxed(&self) -> bool {
        matches!(self, Self::Normalized { .. })
    }

    fn entities_equal(&self, a: &Entity, b: &Entity) -> bool {
        if a.label != b.label {
            return false;
        }
        match self {
            Self::IgnoreRange => a.value == b.value,
            Self::Normalized {
                normalizer,
                context,
            } => normalizer.equal_unique_names(a, b, context),
        }
    }

    fn ops_equal(&self, a: &EditOp, b: &EditOp) -> bool {
        a.kind() == b.kind()
            && a
                .entities()
                .into_iter()
                .zip(b.entities())
                .all(|(x, y)| self.entities_equal(x, y))
    }
}

/// Every operation of `b` that has an equal counterpart in `a`; source ranges never matter
pub fn intersect(a: &EditScript, b: &EditScript, comparison: &EntityComparison<'_>) -> EditScript {
    b.iter()
        .filter(|op_b| a.iter().any(|op_a| comparison.ops_equal(op_a, op_b)))
        .cloned()
        .collect()
}

/// Diffs signatures and tests whether a signature already exhibits a change
#[derive(Debug, Clone, Default)]
pub struct EditScriptComparator<D = DistillingDiffer> {
    differ: D,
}

impl EditScriptComparator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: TreeDiffer> EditScriptComparator<D> {
    pub const fn with_differ(differ: D) -> Self {
        Self { differ }
    }

    pub const fn differ(&self) -> &D {
        &self.differ
    }

    /// Edit script turning `before` into `after`; `before` is consumed
    pub fn diff(&self, before: Signature, after: &Signature) -> EditScript {
        self.differ.diff(before, after)
    }

    /// Whether `signature` shows the effect of `op`
    pub fn contains_op(&self, signature: &Signature, op: &EditOp, threshold: f64) -> bool {
        let (target, parent) = op.addressed();
        let found = find_similar(signature, target, parent, threshold).is_some();
        match op {
            EditOp::Insert { .. } | EditOp::Update { .. } | EditOp::Move { .. } => found,
            EditOp::Delete { .. } => !found,
        }
    }

    /// Whether `signature` shows the effect of every operation of `script`
    pub fn contains_change(&self, signature: &Signature, script: &EditScript) -> ContainmentReport {
        let threshold = similarity_threshold(script.len());
        let matched = script
            .iter()
            .filter(|op| self.contains_op(signature, op, threshold))
            .count();
        ContainmentReport {
            contained: matched == script.len(),
            matched,
            total: script.len(),
            threshold,
        }
    }
}

/// Breadth-first search for a node resembling `target` whose parent resembles `parent`.
///
/// Labels must be equal. Values are compared with bigram similarity (two empty
/// values always match), parent values with Levenshtein similarity; both must
/// exceed `threshold`.
pub fn find_similar(
    signature: &Signature,
    target: &Entity,
    parent: &Entity,
    threshold: f64,
) -> Option<NodeId> {
    signature.find(|tree, id| {
        let node = tree.node(id);
        if node.label() != target.label {
            return false;
        }
        let both_empty = node.value().is_empty() && target.value.is_empty();
        if !both_empty && bigram_similarity(node.value(), &target.value) <= threshold {
            return false;
        }
        tree.parent(id).is_some_and(|p| {
            let p = tree.node(p);
            p.label() == parent.label
                && levenshtein_similarity(p.value(), &parent.value) > threshold
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixcheck_signature::{EntityLabel, SourceRange};
    use pretty_assertions::assert_eq;

    fn method(statements: &[&str]) -> Signature {
        let mut tree = Signature::new(EntityLabel::Method, "parse(String)");
        let root = tree.root();
        for stmt in statements {
            tree.add_child(root, Entity::new(EntityLabel::MethodInvocation, *stmt));
        }
        tree
    }

    fn root() -> Entity {
        Entity::new(EntityLabel::Method, "parse(String)")
    }

    fn insert(value: &str) -> EditOp {
        EditOp::Insert {
            entity: Entity::new(EntityLabel::MethodInvocation, value),
            parent: root(),
        }
    }

    fn delete(value: &str) -> EditOp {
        EditOp::Delete {
            entity: Entity::new(EntityLabel::MethodInvocation, value),
            parent: root(),
        }
    }

    #[test]
    fn test_threshold_schedule() {
        assert_eq!(similarity_threshold(1), 0.7);
        assert_eq!(similarity_threshold(2), 0.7);
        assert_eq!(similarity_threshold(3), 0.6);
        assert_eq!(similarity_threshold(5), 0.6);
        assert_eq!(similarity_threshold(6), 0.5);
    }

    #[test]
    fn test_insert_containment() {
        let comparator = EditScriptComparator::new();
        let op = insert("validate(input)");

        let without = method(&["open(input)", "close()"]);
        assert!(!comparator.contains_op(&without, &op, 0.7));

        let with = method(&["open(input)", "validate(input)", "close()"]);
        assert!(comparator.contains_op(&with, &op, 0.7));
    }

    #[test]
    fn test_delete_containment_mirrors_insert() {
        let comparator = EditScriptComparator::new();
        let op = delete("unsafeCall(input)");

        let still_there = method(&["unsafeCall(input)", "close()"]);
        assert!(!comparator.contains_op(&still_there, &op, 0.7));

        let removed = method(&["close()"]);
        assert!(comparator.contains_op(&removed, &op, 0.7));
    }

    #[test]
    fn test_update_looks_for_new_value() {
        let comparator = EditScriptComparator::new();
        let op = EditOp::Update {
            entity: Entity::new(EntityLabel::MethodInvocation, "copy(buf, len)"),
            parent: root(),
            new_entity: Entity::new(EntityLabel::MethodInvocation, "copy(buf, min(len, max))"),
        };
        assert!(!comparator.contains_op(&method(&["copy(buf, len)"]), &op, 0.7));
        assert!(comparator.contains_op(&method(&["copy(buf, min(len, max))"]), &op, 0.7));
    }

    #[test]
    fn test_parent_must_resemble() {
        let comparator = EditScriptComparator::new();
        let op = EditOp::Insert {
            entity: Entity::new(EntityLabel::MethodInvocation, "check()"),
            parent: Entity::new(EntityLabel::Method, "somethingElse(int, int)"),
        };
        assert!(!comparator.contains_op(&method(&["check()"]), &op, 0.7));
    }

    #[test]
    fn test_contains_change_counts() {
        let comparator = EditScriptComparator::new();
        let script: EditScript = [insert("validate(input)"), delete("unsafeCall(input)")]
            .into_iter()
            .collect();

        let fixed = method(&["validate(input)", "close()"]);
        let report = comparator.contains_change(&fixed, &script);
        assert!(report.contained);
        assert_eq!((report.matched, report.total), (2, 2));
        assert_eq!(report.threshold, 0.7);

        let half = method(&["validate(input)", "unsafeCall(input)"]);
        let report = comparator.contains_change(&half, &script);
        assert!(!report.contained);
        assert_eq!(report.matched, 1);
        assert_eq!(report.ratio(), 0.5);

        let empty = comparator.contains_change(&half, &EditScript::new());
        assert!(empty.contained);
        assert_eq!(empty.ratio(), 1.0);
    }

    #[test]
    fn test_intersect_ignores_ranges() {
        let a: EditScript = [EditOp::Insert {
            entity: Entity::new(EntityLabel::MethodInvocation, "check()")
                .with_range(SourceRange::new(10, 17)),
            parent: root(),
        }]
        .into_iter()
        .collect();
        let b: EditScript = [insert("check()"), insert("other()")].into_iter().collect();

        let common = intersect(&a, &b, &EntityComparison::IgnoreRange);
        assert_eq!(common.len(), 1);
        assert_eq!(common.iter().next().unwrap().entity().value, "check()");
        assert!(intersect(&EditScript::new(), &b, &EntityComparison::IgnoreRange).is_empty());
    }

    #[test]
    fn test_intersect_relaxed_uses_normalizer() {
        let a: EditScript = [insert("this.check(10L)")].into_iter().collect();
        let b: EditScript = [insert("check(10)")].into_iter().collect();
        assert!(intersect(&a, &b, &EntityComparison::IgnoreRange).is_empty());

        let normalizer = NameNormalizer::default();
        let relaxed = EntityComparison::Normalized {
            normalizer: &normalizer,
            context: NormalizationContext::new(),
        };
        assert!(relaxed.is_relaxed());
        assert_eq!(intersect(&a, &b, &relaxed).len(), 1);
    }

    #[test]
    fn test_diff_round_trip_through_comparator() {
        let comparator = EditScriptComparator::new();
        let before = method(&["open(input)"]);
        let after = method(&["validate(input)", "open(input)"]);
        let script = comparator.diff(before, &after);
        assert_eq!(script.len(), 1);
        assert!(comparator.contains_change(&after, &script).contained);
        assert!(!comparator
            .contains_change(&method(&["open(input)"]), &script)
            .contained);
    }
}
