use crate::check::ConstructState;
use crate::model::{ConstructChange, ConstructId, OverallChangeType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Construct change as echoed in reports, without snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRef {
    pub repo: String,
    pub commit: String,
    pub repo_path: Option<String>,
    pub construct_id: ConstructId,
}

impl From<&ConstructChange> for ChangeRef {
    fn from(change: &ConstructChange) -> Self {
        Self {
            repo: change.repo.clone(),
            commit: change.commit.clone(),
            repo_path: change.repo_path.clone(),
            construct_id: change.construct_id.clone(),
        }
    }
}

/// Verdict of one construct in one archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructReport {
    pub construct_change: Option<ChangeRef>,
    /// `true` when the archive still contains the vulnerable construct
    pub affected: Option<bool>,
    pub in_archive: bool,
    pub class_in_archive: bool,
    pub equal_change_type: bool,
    /// Change type shared by all paths, omitted when they differ
    #[serde(rename = "overall_chg", default, skip_serializing_if = "Option::is_none")]
    pub overall_chg: Option<OverallChangeType>,
    /// Per-path summaries
    pub paths: Vec<Value>,
    /// Snapshot JSON text of the tested body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tested_body: Option<String>,
    pub state: ConstructState,
}

/// Verdict of one archive for one bug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveReport {
    pub bug_id: String,
    pub archive: String,
    /// `None` when no construct could be decided
    pub fixed: Option<bool>,
    pub constructs: Vec<ConstructReport>,
    pub fixed_count: usize,
    pub vulnerable_count: usize,
    pub indeterminate_count: usize,
}
