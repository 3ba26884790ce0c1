use crate::archive::ArchiveInspector;
use crate::commits::{CommitChangeIndex, SharedDiffer};
use crate::dump::EditScriptDumper;
use crate::model::{ConstructChange, ConstructId, OverallChangeType};
use crate::report::{ChangeRef, ConstructReport};
use fixcheck_editscript::{intersect, DistillingDiffer, EditScript, EntityComparison};
use fixcheck_normalize::{NameNormalizer, NormalizationContext};
use fixcheck_signature::Signature;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Terminal state of a construct check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstructState {
    Fixed,
    Vulnerable,
    /// Only test code was touched
    Excluded,
    Indeterminate,
}

impl ConstructState {
    /// `Some(true)` for fixed, `Some(false)` for vulnerable, `None` otherwise
    pub const fn fixed(self) -> Option<bool> {
        match self {
            Self::Fixed => Some(true),
            Self::Vulnerable => Some(false),
            Self::Excluded | Self::Indeterminate => None,
        }
    }
}

/// Shared inputs of every construct check of one archive
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub inspector: &'a dyn ArchiveInspector,
    pub normalizer: NameNormalizer,
    /// Compare normalized names right away
    pub relaxed_first: bool,
    pub dumper: Option<&'a EditScriptDumper>,
}

impl<'a> CheckContext<'a> {
    pub fn new(inspector: &'a dyn ArchiveInspector) -> Self {
        Self {
            inspector,
            normalizer: NameNormalizer::default(),
            relaxed_first: false,
            dumper: None,
        }
    }
}

/// Overall change of a path intersected with the diffs around the tested version
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptComparison {
    /// Operations of the overall change also done between defective and tested
    pub i_dt: EditScript,
    /// Operations of the overall change still to do between tested and fixed
    pub i_tf: EditScript,
    pub relaxed: bool,
    overall_len: usize,
}

impl ScriptComparison {
    /// Intersect strictly first; retry with `relaxed` when that finds nothing at all.
    pub fn compare(
        overall: &EditScript,
        defective_to_test: &EditScript,
        test_to_fixed: &EditScript,
        relaxed: &EntityComparison<'_>,
        relaxed_first: bool,
    ) -> Self {
        let strict = EntityComparison::IgnoreRange;
        let first = if relaxed_first { relaxed } else { &strict };
        let mut comparison = Self {
            i_dt: intersect(defective_to_test, overall, first),
            i_tf: intersect(test_to_fixed, overall, first),
            relaxed: first.is_relaxed(),
            overall_len: overall.len(),
        };
        if !comparison.relaxed
            && comparison.i_dt.is_empty()
            && comparison.i_tf.is_empty()
            && !overall.is_empty()
        {
            log::info!(
                "No strict match for {} operations, retrying with normalized names",
                overall.len()
            );
            comparison.i_dt = intersect(defective_to_test, overall, relaxed);
            comparison.i_tf = intersect(test_to_fixed, overall, relaxed);
            comparison.relaxed = true;
        }
        comparison
    }

    pub fn fixed(&self) -> bool {
        self.overall_len == 0 || (!self.i_dt.is_empty() && self.i_tf.is_empty())
    }

    pub fn vulnerable(&self) -> bool {
        self.i_dt.is_empty() && !self.i_tf.is_empty()
    }

    /// Share of the overall change already present in the tested version
    pub fn confidence(&self) -> f64 {
        if self.overall_len == 0 {
            1.0
        } else {
            self.i_dt.len() as f64 / self.overall_len as f64
        }
    }
}

/// Outcome of one repository path
#[derive(Debug, Clone, PartialEq)]
pub struct PathVerdict {
    pub path: String,
    pub change_type: OverallChangeType,
    /// `None` when the path gives no opinion
    pub fixed: Option<bool>,
    pub vulnerable: bool,
    /// Set when the tested body was compared with the path's edit scripts
    pub relaxed: Option<bool>,
    pub matched: usize,
    pub total: usize,
}

impl PathVerdict {
    fn new(index: &CommitChangeIndex, fixed: Option<bool>) -> Self {
        Self {
            path: index.path().to_string(),
            change_type: index.overall_change_type(),
            fixed,
            vulnerable: fixed == Some(false),
            relaxed: None,
            matched: 0,
            total: 0,
        }
    }
}

/// Evaluated state of one construct in one archive
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructVerdict {
    pub state: ConstructState,
    pub in_archive: bool,
    pub class_in_archive: bool,
    pub equal_change_type: bool,
    /// Change type shared by all paths, `None` when they differ
    pub change_type: Option<OverallChangeType>,
    pub paths: Vec<PathVerdict>,
    pub tested_body: Option<Value>,
}

impl ConstructVerdict {
    fn excluded() -> Self {
        Self {
            state: ConstructState::Excluded,
            in_archive: false,
            class_in_archive: false,
            equal_change_type: true,
            change_type: None,
            paths: Vec::new(),
            tested_body: None,
        }
    }

    pub fn fixed(&self) -> Option<bool> {
        self.state.fixed()
    }

    pub fn relaxed(&self) -> bool {
        self.paths.iter().any(|p| p.relaxed == Some(true))
    }

    /// Matched and total operations over all compared paths
    pub fn matched(&self) -> (usize, usize) {
        self.paths
            .iter()
            .fold((0, 0), |(m, t), p| (m + p.matched, t + p.total))
    }
}

/// Decides whether one archive contains the fix of one construct.
///
/// Changes are grouped by repository path. The verdict is computed once and
/// cached until another change is added.
pub struct FixContainmentCheck {
    construct_id: ConstructId,
    differ: SharedDiffer,
    paths: BTreeMap<String, CommitChangeIndex>,
    excluded: Vec<(ConstructChange, String)>,
    verdict: OnceCell<ConstructVerdict>,
}

impl FixContainmentCheck {
    pub fn new(construct_id: ConstructId) -> Self {
        Self::with_differ(construct_id, Arc::new(DistillingDiffer::default()))
    }

    pub fn with_differ(construct_id: ConstructId, differ: SharedDiffer) -> Self {
        Self {
            construct_id,
            differ,
            paths: BTreeMap::new(),
            excluded: Vec::new(),
            verdict: OnceCell::new(),
        }
    }

    pub fn construct_id(&self) -> &ConstructId {
        &self.construct_id
    }

    pub fn paths(&self) -> impl Iterator<Item = &CommitChangeIndex> {
        self.paths.values()
    }

    pub fn path(&self, path: &str) -> Option<&CommitChangeIndex> {
        self.paths.get(path)
    }

    /// Returns false if the change was already known
    pub fn add_change(&mut self, change: ConstructChange) -> bool {
        if change.construct_id != self.construct_id {
            log::warn!(
                "Change {} concerns {}, adding it to the check of {}",
                change.commit,
                change.construct_id,
                self.construct_id
            );
        }
        self.verdict = OnceCell::new();
        let path = change.path().to_string();
        match self.paths.get_mut(&path) {
            Some(index) => index.add(change),
            None => {
                let index = CommitChangeIndex::with_differ(change, Arc::clone(&self.differ));
                self.paths.insert(path, index);
                true
            }
        }
    }

    /// Record a change that must not influence the verdict
    pub fn exclude(&mut self, change: ConstructChange, reason: impl Into<String>) {
        self.verdict = OnceCell::new();
        self.excluded.push((change, reason.into()));
    }

    pub fn excluded(&self) -> impl Iterator<Item = (&ConstructChange, &str)> {
        self.excluded.iter().map(|(c, r)| (c, r.as_str()))
    }

    /// Whether only excluded changes were added
    pub fn is_excluded(&self) -> bool {
        self.paths.is_empty() && !self.excluded.is_empty()
    }

    /// Cached verdict, if [`Self::evaluate`] ran since the last change
    pub fn verdict(&self) -> Option<&ConstructVerdict> {
        self.verdict.get()
    }

    pub fn evaluate(&self, ctx: &CheckContext<'_>) -> &ConstructVerdict {
        self.verdict.get_or_init(|| self.compute(ctx))
    }

    fn compute(&self, ctx: &CheckContext<'_>) -> ConstructVerdict {
        if self.paths.is_empty() {
            for (change, reason) in &self.excluded {
                log::debug!("Ignoring {} in {}: {reason}", self.construct_id, change.commit);
            }
            return ConstructVerdict::excluded();
        }

        let id = &self.construct_id;
        let in_archive = ctx.inspector.contains_construct(id);
        let class_in_archive = ctx.inspector.contains_class(id.definition_context());

        let change_types: BTreeSet<OverallChangeType> = self
            .paths
            .values()
            .map(CommitChangeIndex::overall_change_type)
            .filter(|t| *t != OverallChangeType::Nul)
            .collect();
        let equal_change_type = change_types.len() <= 1;

        let mut verdict = ConstructVerdict {
            state: ConstructState::Indeterminate,
            in_archive,
            class_in_archive,
            equal_change_type,
            change_type: equal_change_type
                .then(|| change_types.first().copied().unwrap_or(OverallChangeType::Nul)),
            paths: Vec::new(),
            tested_body: None,
        };

        if !equal_change_type {
            log::warn!(
                "{id} has different overall changes on its paths ({change_types:?}), not fixed"
            );
            verdict.paths = self.paths.values().map(|i| PathVerdict::new(i, None)).collect();
            verdict.state = ConstructState::Vulnerable;
            return verdict;
        }

        let Some(change_type) = change_types.into_iter().next() else {
            verdict.paths = self.paths.values().map(|i| PathVerdict::new(i, None)).collect();
            return verdict;
        };

        match change_type {
            OverallChangeType::Add => self.decide_existence(&mut verdict, in_archive),
            OverallChangeType::Del => self.decide_existence(&mut verdict, !in_archive),
            OverallChangeType::Mod if id.is_nested_class_member() => {
                log::warn!(
                    "{id} is declared in a nested class, deciding by presence in the archive only"
                );
                self.decide_existence(&mut verdict, in_archive);
            }
            OverallChangeType::Mod if !in_archive => {
                log::info!("{id} was modified by the fix but is missing from the archive");
                self.decide_existence(&mut verdict, false);
            }
            OverallChangeType::Mod => self.decide_modification(&mut verdict, ctx),
            OverallChangeType::Nul => {}
        }

        log::debug!("{id}: {:?}", verdict.state);
        verdict
    }

    fn decide_existence(&self, verdict: &mut ConstructVerdict, fixed: bool) {
        verdict.paths = self
            .paths
            .values()
            .map(|index| match index.overall_change_type() {
                OverallChangeType::Nul => PathVerdict::new(index, None),
                _ => PathVerdict::new(index, Some(fixed)),
            })
            .collect();
        verdict.state = if fixed {
            ConstructState::Fixed
        } else {
            ConstructState::Vulnerable
        };
    }

    fn decide_modification(&self, verdict: &mut ConstructVerdict, ctx: &CheckContext<'_>) {
        let id = &self.construct_id;
        let tested = match ctx.inspector.tested_signature(id) {
            Ok(Some(tested)) => tested,
            Ok(None) => {
                log::warn!("No body of {id} available in the archive");
                verdict.paths = self.paths.values().map(|i| PathVerdict::new(i, None)).collect();
                return;
            }
            Err(e) => {
                log::warn!("Cannot read body of {id} from the archive: {e}");
                verdict.paths = self.paths.values().map(|i| PathVerdict::new(i, None)).collect();
                return;
            }
        };
        verdict.tested_body = tested.to_json_value().ok();

        verdict.paths = self
            .paths
            .values()
            .map(|index| self.compare_path(index, &tested, ctx))
            .collect();

        verdict.state = if verdict.paths.iter().any(|p| p.fixed == Some(true)) {
            ConstructState::Fixed
        } else if verdict.paths.iter().any(|p| p.fixed == Some(false)) {
            ConstructState::Vulnerable
        } else {
            ConstructState::Indeterminate
        };
    }

    fn compare_path(
        &self,
        index: &CommitChangeIndex,
        tested: &Signature,
        ctx: &CheckContext<'_>,
    ) -> PathVerdict {
        let id = &self.construct_id;
        let (Some(overall), Some(defective), Some(fixed)) = (
            index.overall_edit_script(),
            index.from_defective(),
            index.to_fixed(),
        ) else {
            log::info!("Path '{}' of {id} lacks usable snapshots, skipping", index.path());
            return PathVerdict::new(index, None);
        };

        let comparator = index.comparator();
        let defective_to_test = comparator.diff(defective, tested);
        let test_to_fixed = comparator.diff(tested.clone(), &fixed);

        let mut normalization = NormalizationContext::new().with_class(id.definition_context());
        if let Some(constants) = ctx.inspector.constants() {
            normalization = normalization.with_constants(constants);
        }
        let relaxed = EntityComparison::Normalized {
            normalizer: &ctx.normalizer,
            context: normalization,
        };
        let comparison = ScriptComparison::compare(
            overall,
            &defective_to_test,
            &test_to_fixed,
            &relaxed,
            ctx.relaxed_first,
        );
        log::info!(
            "{id} on '{}': Confidence({}/{}) = {:.2}, fixed={}, vulnerable={}, relaxed={}",
            index.path(),
            comparison.i_dt.len(),
            overall.len(),
            comparison.confidence(),
            comparison.fixed(),
            comparison.vulnerable(),
            comparison.relaxed
        );

        if let Some(dumper) = ctx.dumper {
            dumper.dump_script(id, "overall", overall);
            dumper.dump_script(id, "defective_to_test", &defective_to_test);
            dumper.dump_script(id, "test_to_fixed", &test_to_fixed);
            dumper.dump_intersections(id, &comparison.i_dt, &comparison.i_tf);
        }

        let contained = comparator.contains_change(tested, overall);
        PathVerdict {
            path: index.path().to_string(),
            change_type: OverallChangeType::Mod,
            fixed: Some(comparison.fixed()),
            vulnerable: comparison.vulnerable(),
            relaxed: Some(comparison.relaxed),
            matched: contained.matched,
            total: contained.total,
        }
    }

    /// Earliest change of this construct, excluded ones only when nothing else is known
    pub fn first_change(&self) -> Option<&ConstructChange> {
        self.paths
            .values()
            .map(CommitChangeIndex::first)
            .min()
            .or_else(|| self.excluded.first().map(|(c, _)| c))
    }

    pub fn report(&self, ctx: &CheckContext<'_>) -> ConstructReport {
        let verdict = self.evaluate(ctx);
        let paths = self
            .paths
            .values()
            .map(|index| {
                let path = verdict.paths.iter().find(|p| p.path == index.path());
                index.to_json(
                    path.and_then(|p| p.fixed),
                    path.and_then(|p| p.relaxed),
                )
            })
            .collect();
        ConstructReport {
            construct_change: self.first_change().map(ChangeRef::from),
            affected: verdict.fixed().map(|fixed| !fixed),
            in_archive: verdict.in_archive,
            class_in_archive: verdict.class_in_archive,
            equal_change_type: verdict.equal_change_type,
            overall_chg: verdict.change_type,
            paths,
            tested_body: verdict.tested_body.as_ref().map(Value::to_string),
            state: verdict.state,
        }
    }
}
