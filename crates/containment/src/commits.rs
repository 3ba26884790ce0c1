use crate::model::{ChangeType, ConstructChange, OverallChangeType};
use fixcheck_editscript::{DistillingDiffer, EditScript, EditScriptComparator, TreeDiffer};
use fixcheck_signature::{structurally_equal, CompareMode, Signature};
use once_cell::sync::OnceCell;
use serde_json::{json, Value};
use std::sync::Arc;

/// Differ shared by every index and check of one archive check
pub type SharedDiffer = Arc<dyn TreeDiffer>;

/// How the tested signature relates to the historical endpoints of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMatch {
    pub mode: CompareMode,
    pub equals_defective: Option<bool>,
    pub equals_fixed: Option<bool>,
}

/// Chronologically ordered commits of one bug touching one construct on one
/// repository path.
///
/// Never empty. Snapshots are decoded afresh for every diff.
pub struct CommitChangeIndex {
    path: String,
    changes: Vec<ConstructChange>,
    comparator: EditScriptComparator<SharedDiffer>,
    overall: OnceCell<Option<EditScript>>,
}

impl CommitChangeIndex {
    pub fn new(first: ConstructChange) -> Self {
        Self::with_differ(first, Arc::new(DistillingDiffer::default()))
    }

    pub fn with_differ(first: ConstructChange, differ: SharedDiffer) -> Self {
        let path = match first.repo_path.as_deref() {
            Some(path) => path.to_string(),
            None => {
                log::warn!(
                    "Change {} of {} has no repository path, using ''",
                    first.commit,
                    first.construct_id
                );
                String::new()
            }
        };
        Self {
            path,
            changes: vec![first],
            comparator: EditScriptComparator::with_differ(differ),
            overall: OnceCell::new(),
        }
    }

    /// Insert a change in commit order; duplicates are ignored
    pub fn add(&mut self, change: ConstructChange) -> bool {
        if change.path() != self.path {
            log::warn!(
                "Change {} belongs to path '{}', not '{}'",
                change.commit,
                change.path(),
                self.path
            );
        }
        match self.changes.binary_search(&change) {
            Ok(_) => false,
            Err(pos) => {
                self.changes.insert(pos, change);
                self.overall = OnceCell::new();
                true
            }
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[ConstructChange] {
        &self.changes
    }

    pub fn first(&self) -> &ConstructChange {
        &self.changes[0]
    }

    pub fn last(&self) -> &ConstructChange {
        &self.changes[self.changes.len() - 1]
    }

    pub fn comparator(&self) -> &EditScriptComparator<SharedDiffer> {
        &self.comparator
    }

    pub fn existed_before(&self) -> bool {
        self.first().construct_change_type != ChangeType::Add
    }

    pub fn exists_after(&self) -> bool {
        self.last().construct_change_type != ChangeType::Del
    }

    pub fn overall_change_type(&self) -> OverallChangeType {
        match (self.existed_before(), self.exists_after()) {
            (true, true) => OverallChangeType::Mod,
            (true, false) => OverallChangeType::Del,
            (false, true) => OverallChangeType::Add,
            (false, false) => {
                log::info!(
                    "{} on path '{}' only existed while the fix was developed ({})",
                    self.first().construct_id,
                    self.path,
                    self.commits_as_string()
                );
                OverallChangeType::Nul
            }
        }
    }

    /// Snapshot before the first commit, decoded afresh
    pub fn from_defective(&self) -> Option<Signature> {
        decode(self.first().buggy_signature(), "buggy", self.first())
    }

    /// Snapshot after the last commit, decoded afresh
    pub fn to_fixed(&self) -> Option<Signature> {
        decode(self.last().fixed_signature(), "fixed", self.last())
    }

    /// Diff from the first defective to the last fixed snapshot, gaps not repaired
    pub fn raw_overall_edit_script(&self) -> Option<EditScript> {
        if self.overall_change_type() != OverallChangeType::Mod {
            return None;
        }
        let defective = self.from_defective()?;
        let fixed = self.to_fixed()?;
        Some(self.comparator.diff(defective, &fixed))
    }

    /// Net fix of this path, with edits from untracked intervening commits removed.
    ///
    /// `None` unless the construct was modified and both endpoint snapshots decode.
    pub fn overall_edit_script(&self) -> Option<&EditScript> {
        self.overall
            .get_or_init(|| {
                let mut overall = self.raw_overall_edit_script()?;
                if !self.is_contiguous(self.first(), self.last()) {
                    self.remove_intermediate_changes(&mut overall);
                }
                Some(overall)
            })
            .as_ref()
    }

    fn remove_intermediate_changes(&self, overall: &mut EditScript) {
        for pair in self.changes.windows(2) {
            let (precedent, following) = (&pair[0], &pair[1]);
            let Some(gap) = self.gap_script(precedent, following) else {
                continue;
            };
            if gap.is_empty() {
                continue;
            }
            let removed = overall.remove_all_ignoring_ranges(&gap);
            log::debug!(
                "Gap between {} and {} on '{}': {} operations, {} removed from overall change",
                precedent.commit,
                following.commit,
                self.path,
                gap.len(),
                removed
            );
        }
    }

    /// Diff between the fixed state of `precedent` and the buggy state of `following`
    fn gap_script(
        &self,
        precedent: &ConstructChange,
        following: &ConstructChange,
    ) -> Option<EditScript> {
        let fixed = decode(precedent.fixed_signature(), "fixed", precedent)?;
        let buggy = decode(following.buggy_signature(), "buggy", following)?;
        Some(self.comparator.diff(fixed, &buggy))
    }

    /// True when no code change happened between the two commits
    pub fn is_contiguous(&self, c1: &ConstructChange, c2: &ConstructChange) -> bool {
        if c1 == c2 {
            return true;
        }
        self.gap_script(c1, c2).is_some_and(|gap| gap.is_empty())
    }

    /// Persisted edit script of the most recent commit
    pub fn last_change(&self) -> Option<EditScript> {
        match self.last().body_change_script() {
            Ok(script) => script,
            Err(e) => {
                log::warn!(
                    "Cannot decode body change of commit {}: {e}",
                    self.last().commit
                );
                None
            }
        }
    }

    /// Compare `tested` with both endpoints; label-only when the fix changes the tree shape
    pub fn equal_version(&self, tested: &Signature) -> VersionMatch {
        let mode = match self.overall_edit_script() {
            Some(overall) if overall.is_structural_change() => CompareMode::Label,
            _ => CompareMode::Value,
        };
        VersionMatch {
            mode,
            equals_defective: self
                .from_defective()
                .map(|defective| structurally_equal(tested, &defective, mode)),
            equals_fixed: self
                .to_fixed()
                .map(|fixed| structurally_equal(tested, &fixed, mode)),
        }
    }

    pub fn commits_as_string(&self) -> String {
        self.changes
            .iter()
            .map(|c| c.commit.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_json(&self, fixed: Option<bool>, relaxed: Option<bool>) -> Value {
        let mut value = json!({
            "path": self.path,
            "revisions": self.commits_as_string(),
            "is_modification": self.overall_change_type() == OverallChangeType::Mod,
        });
        if let Some(fixed) = fixed {
            value["fixed"] = json!(fixed);
        }
        if let Some(relaxed) = relaxed {
            value["relaxed_comparison"] = json!(relaxed);
        }
        value
    }
}

fn decode(
    result: crate::error::Result<Option<Signature>>,
    which: &str,
    change: &ConstructChange,
) -> Option<Signature> {
    match result {
        Ok(signature) => signature,
        Err(e) => {
            log::warn!(
                "Unusable {which} snapshot in commit {} of {}: {e}",
                change.commit,
                change.construct_id
            );
            None
        }
    }
}
