use crate::op::EditOp;
use crate::script::EditScript;
use crate::similarity::bigram_similarity;
use fixcheck_signature::{EntityLabel, NodeId, Signature};
use std::collections::HashMap;
use std::sync::Arc;

/// Computes the edit script turning one signature into another.
///
/// `before` is taken by value: implementations may rearrange it while matching,
/// so a tree can serve as the source of a single diff only. Rebuild it from its
/// snapshot for the next comparison.
pub trait TreeDiffer: Send + Sync {
    fn diff(&self, before: Signature, after: &Signature) -> EditScript;
}

impl<T: TreeDiffer + ?Sized> TreeDiffer for Arc<T> {
    fn diff(&self, before: Signature, after: &Signature) -> EditScript {
        (**self).diff(before, after)
    }
}

/// Default differ: exact matching first, then similarity matching for updates.
///
/// Unmatched `after` nodes become inserts, unmatched `before` nodes deletes,
/// matched nodes with a new value updates, and matched nodes under a different
/// parent or out of sibling order moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistillingDiffer {
    min_similarity: f64,
}

impl Default for DistillingDiffer {
    fn default() -> Self {
        Self {
            min_similarity: 0.5,
        }
    }
}

impl DistillingDiffer {
    pub const fn new(min_similarity: f64) -> Self {
        Self { min_similarity }
    }

    pub const fn min_similarity(&self) -> f64 {
        self.min_similarity
    }
}

impl TreeDiffer for DistillingDiffer {
    fn diff(&self, before: Signature, after: &Signature) -> EditScript {
        let mapping = Mapping::build(&before, after, self.min_similarity);
        let script = mapping.edit_script(&before, after);
        log::debug!(
            "Diff of {} -> {} nodes produced {} operations",
            before.len(),
            after.len(),
            script.len()
        );
        script
    }
}

struct Mapping {
    before_to_after: Vec<Option<NodeId>>,
    after_to_before: Vec<Option<NodeId>>,
}

impl Mapping {
    fn build(before: &Signature, after: &Signature, min_similarity: f64) -> Self {
        let mut mapping = Self {
            before_to_after: vec![None; before.len()],
            after_to_before: vec![None; after.len()],
        };
        mapping.link(before.root(), after.root());

        let before_order: Vec<NodeId> = before.pre_order().into_iter().skip(1).collect();
        let after_order: Vec<NodeId> = after.pre_order().into_iter().skip(1).collect();

        let mut exact: HashMap<(EntityLabel, &str), Vec<NodeId>> = HashMap::new();
        for id in &before_order {
            let node = before.node(*id);
            exact
                .entry((node.label(), node.value()))
                .or_default()
                .push(*id);
        }

        for a in &after_order {
            let node = after.node(*a);
            let Some(candidates) = exact.get(&(node.label(), node.value())) else {
                continue;
            };
            let expected_parent = mapping.expected_parent(after, *a);
            let free: Vec<NodeId> = candidates
                .iter()
                .copied()
                .filter(|b| mapping.before_to_after[b.index()].is_none())
                .collect();
            let pick = free
                .iter()
                .copied()
                .find(|b| expected_parent.is_some() && before.parent(*b) == expected_parent)
                .or_else(|| free.first().copied());
            if let Some(b) = pick {
                mapping.link(b, *a);
            }
        }

        for a in &after_order {
            if mapping.after_to_before[a.index()].is_some() {
                continue;
            }
            let node = after.node(*a);
            let expected_parent = mapping.expected_parent(after, *a);
            let mut best: Option<(NodeId, f64, bool)> = None;
            for b in &before_order {
                if mapping.before_to_after[b.index()].is_some() {
                    continue;
                }
                let candidate = before.node(*b);
                if candidate.label() != node.label() {
                    continue;
                }
                let score = bigram_similarity(candidate.value(), node.value());
                if score < min_similarity {
                    continue;
                }
                let same_parent = expected_parent.is_some() && before.parent(*b) == expected_parent;
                let better = match best {
                    None => true,
                    Some((_, best_score, best_parent)) => {
                        score > best_score || (score == best_score && same_parent && !best_parent)
                    }
                };
                if better {
                    best = Some((*b, score, same_parent));
                }
            }
            if let Some((b, _, _)) = best {
                mapping.link(b, *a);
            }
        }

        mapping
    }

    fn link(&mut self, before: NodeId, after: NodeId) {
        self.before_to_after[before.index()] = Some(after);
        self.after_to_before[after.index()] = Some(before);
    }

    /// Before-tree counterpart of the parent of `after_node`
    fn expected_parent(&self, after: &Signature, after_node: NodeId) -> Option<NodeId> {
        after
            .parent(after_node)
            .and_then(|p| self.after_to_before[p.index()])
    }

    /// After nodes whose position among unmoved siblings changed
    fn reordered(&self, before: &Signature, after: &Signature) -> Vec<bool> {
        let mut reordered = vec![false; after.len()];
        for parent in after.pre_order() {
            let Some(before_parent) = self.after_to_before[parent.index()] else {
                continue;
            };
            let stayed: Vec<(NodeId, usize)> = after
                .children(parent)
                .iter()
                .filter_map(|child| {
                    let b = self.after_to_before[child.index()]?;
                    if before.parent(b) != Some(before_parent) {
                        return None;
                    }
                    Some((*child, before.child_position(b)?))
                })
                .collect();
            let positions: Vec<usize> = stayed.iter().map(|(_, pos)| *pos).collect();
            for ((child, _), keep) in stayed.iter().zip(increasing_subsequence(&positions)) {
                if !keep {
                    reordered[child.index()] = true;
                }
            }
        }
        reordered
    }

    fn edit_script(&self, before: &Signature, after: &Signature) -> EditScript {
        let mut script = EditScript::new();

        for b in before.post_order() {
            if self.before_to_after[b.index()].is_some() {
                continue;
            }
            let Some(parent) = before.parent(b) else {
                continue;
            };
            script.insert(EditOp::Delete {
                entity: before.entity(b),
                parent: before.entity(parent),
            });
        }

        let reordered = self.reordered(before, after);
        for a in after.pre_order() {
            let Some(parent) = after.parent(a) else {
                continue;
            };
            let parent_entity = after.entity(parent);
            let Some(b) = self.after_to_before[a.index()] else {
                script.insert(EditOp::Insert {
                    entity: after.entity(a),
                    parent: parent_entity,
                });
                continue;
            };

            if before.node(b).value() != after.node(a).value() {
                script.insert(EditOp::Update {
                    entity: before.entity(b),
                    parent: parent_entity.clone(),
                    new_entity: after.entity(a),
                });
            }

            let old_parent = before.parent(b).unwrap_or_else(|| before.root());
            let moved = self.before_to_after[old_parent.index()] != Some(parent);
            if moved || reordered[a.index()] {
                script.insert(EditOp::Move {
                    entity: before.entity(b),
                    parent: before.entity(old_parent),
                    new_parent: parent_entity,
                    new_entity: after.entity(a),
                });
            }
        }

        script
    }
}

/// Flags the members of one longest strictly increasing subsequence
fn increasing_subsequence(seq: &[usize]) -> Vec<bool> {
    let n = seq.len();
    let mut keep = vec![false; n];
    if n == 0 {
        return keep;
    }
    let mut length = vec![1usize; n];
    let mut previous: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        for j in 0..i {
            if seq[j] < seq[i] && length[j] + 1 > length[i] {
                length[i] = length[j] + 1;
                previous[i] = Some(j);
            }
        }
    }
    let longest = length.iter().copied().max().unwrap_or(0);
    let mut cursor = length.iter().position(|l| *l == longest);
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = previous[i];
    }
    keep
}
