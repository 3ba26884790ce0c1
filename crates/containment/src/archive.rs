use crate::check::{CheckContext, ConstructState, FixContainmentCheck};
use crate::commits::SharedDiffer;
use crate::config::ContainmentConfig;
use crate::dump::EditScriptDumper;
use crate::error::{ContainmentError, Result};
use crate::model::{ConstructChange, ConstructId};
use crate::report::ArchiveReport;
use fixcheck_editscript::DistillingDiffer;
use fixcheck_normalize::{ConstantSource, ConstantTable, NameNormalizer};
use fixcheck_signature::{JavaSignatureBuilder, Signature};
use globset::GlobSet;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read access to the archive under test
pub trait ArchiveInspector: Send + Sync {
    fn contains_construct(&self, id: &ConstructId) -> bool;

    /// `qname` uses `$` for nested classes
    fn contains_class(&self, qname: &str) -> bool;

    /// Body of the construct as found in the archive; a fresh tree on every call
    fn tested_signature(&self, id: &ConstructId) -> Result<Option<Signature>>;

    /// Static final field values declared in the archive
    fn constants(&self) -> Option<&dyn ConstantSource> {
        None
    }
}

#[derive(Debug, Default, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    constructs: BTreeMap<String, Option<ManifestBody>>,
    #[serde(default)]
    classes: BTreeSet<String>,
    #[serde(default)]
    constants: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ManifestBody {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    snapshot: Option<Value>,
}

/// Archive described by a JSON manifest.
///
/// ```json
/// {
///   "constructs": {
///     "org.acme.Parser.parse(String)": {"source": "String parse(String s) { ... }"},
///     "org.acme.Parser.close()": {"snapshot": {"ast": [ ... ]}},
///     "org.acme.Parser(String)": null
///   },
///   "classes": ["org.acme.Parser"],
///   "constants": {"org.acme.Limits": {"MAX": 10}}
/// }
/// ```
///
/// Constructs are keyed by qualified name. A `null` body marks a construct
/// that is present but whose body is not available. Declaring classes of all
/// listed constructs count as present.
#[derive(Debug, Clone, Default)]
pub struct ArchiveManifest {
    path: PathBuf,
    constructs: BTreeMap<String, Option<Signature>>,
    classes: BTreeSet<String>,
    constants: ConstantTable,
}

impl ArchiveManifest {
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContainmentError::archive_unavailable(path, e.to_string()))?;
        Self::from_json_str(path, &text)
    }

    pub fn from_json_str(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let unavailable = |reason: String| ContainmentError::archive_unavailable(&path, reason);

        let file: ManifestFile =
            serde_json::from_str(text).map_err(|e| unavailable(format!("invalid manifest: {e}")))?;

        let constants = match &file.constants {
            Some(value) => ConstantTable::from_json_value(value)
                .map_err(|e| unavailable(format!("invalid constants: {e}")))?,
            None => ConstantTable::new(),
        };

        let needs_parser = file
            .constructs
            .values()
            .flatten()
            .any(|body| body.snapshot.is_none() && body.source.is_some());
        let mut builder = if needs_parser {
            Some(
                JavaSignatureBuilder::new()
                    .map_err(|e| unavailable(format!("java parser: {e}")))?,
            )
        } else {
            None
        };

        let mut constructs = BTreeMap::new();
        let mut classes = file.classes;
        for (qname, body) in file.constructs {
            let signature = match (body, builder.as_mut()) {
                (
                    Some(ManifestBody {
                        snapshot: Some(snapshot),
                        ..
                    }),
                    _,
                ) => Some(
                    Signature::from_json_value(snapshot)
                        .map_err(|e| unavailable(format!("snapshot of {qname}: {e}")))?,
                ),
                (
                    Some(ManifestBody {
                        source: Some(source),
                        ..
                    }),
                    Some(builder),
                ) => Some(
                    builder
                        .build(&source)
                        .map_err(|e| unavailable(format!("source of {qname}: {e}")))?,
                ),
                _ => None,
            };
            if let Some(class) = declaring_class(&qname) {
                classes.insert(class.to_string());
            }
            constructs.insert(qname, signature);
        }

        log::debug!(
            "Archive {} lists {} constructs, {} classes, {} constant classes",
            path.display(),
            constructs.len(),
            classes.len(),
            constants.len()
        );
        Ok(Self {
            path,
            constructs,
            classes,
            constants,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.constructs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructs.is_empty()
    }
}

/// Class part of a qualified member name.
///
/// Lower-case members with a parameter list are methods; anything else names a class.
fn declaring_class(qname: &str) -> Option<&str> {
    let member = qname.split_once('(').map_or(qname, |(name, _)| name);
    let (owner, last) = member.rsplit_once('.')?;
    if qname.contains('(') && last.starts_with(|c: char| c.is_lowercase()) {
        Some(owner)
    } else {
        Some(member)
    }
}

impl ArchiveInspector for ArchiveManifest {
    fn contains_construct(&self, id: &ConstructId) -> bool {
        self.constructs.contains_key(&id.qname)
    }

    fn contains_class(&self, qname: &str) -> bool {
        self.classes.contains(qname)
    }

    fn tested_signature(&self, id: &ConstructId) -> Result<Option<Signature>> {
        Ok(self.constructs.get(&id.qname).cloned().flatten())
    }

    fn constants(&self) -> Option<&dyn ConstantSource> {
        if self.constants.is_empty() {
            None
        } else {
            Some(&self.constants)
        }
    }
}

/// Decides whether one archive contains the complete fix of one bug.
///
/// The archive is fixed when every decided construct is fixed. Constructs in
/// test code are excluded and never count.
pub struct ArchiveFixContainmentCheck {
    bug_id: String,
    archive: PathBuf,
    config: ContainmentConfig,
    inspector: Arc<dyn ArchiveInspector>,
    differ: SharedDiffer,
    test_paths: GlobSet,
    dumper: Option<EditScriptDumper>,
    checks: BTreeMap<ConstructId, FixContainmentCheck>,
    fixed: OnceCell<Option<bool>>,
}

impl ArchiveFixContainmentCheck {
    /// Open the manifest at `archive`; fails fast when it is missing or unreadable
    pub fn new(
        bug_id: impl Into<String>,
        archive: Option<&Path>,
        config: ContainmentConfig,
    ) -> Result<Self> {
        let archive = archive.ok_or(ContainmentError::MissingArchive)?;
        config.validate().map_err(ContainmentError::invalid_config)?;
        let manifest = ArchiveManifest::open(archive)?;
        Self::with_inspector(bug_id, archive, Arc::new(manifest), config)
    }

    pub fn with_inspector(
        bug_id: impl Into<String>,
        archive: impl Into<PathBuf>,
        inspector: Arc<dyn ArchiveInspector>,
        config: ContainmentConfig,
    ) -> Result<Self> {
        config.validate().map_err(ContainmentError::invalid_config)?;
        let test_paths = config
            .test_path_matcher()
            .map_err(|e| ContainmentError::invalid_config(format!("{e:#}")))?;
        Ok(Self {
            bug_id: bug_id.into(),
            archive: archive.into(),
            dumper: EditScriptDumper::from_config(&config),
            config,
            inspector,
            differ: Arc::new(DistillingDiffer::default()),
            test_paths,
            checks: BTreeMap::new(),
            fixed: OnceCell::new(),
        })
    }

    /// Use `differ` for constructs added from now on
    #[must_use]
    pub fn with_differ(mut self, differ: SharedDiffer) -> Self {
        self.differ = differ;
        self
    }

    pub fn bug_id(&self) -> &str {
        &self.bug_id
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn config(&self) -> &ContainmentConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn check(&self, id: &ConstructId) -> Option<&FixContainmentCheck> {
        self.checks.get(id)
    }

    pub fn checks(&self) -> impl Iterator<Item = &FixContainmentCheck> {
        self.checks.values()
    }

    /// Why `change` must not influence the verdict, if it must not
    pub fn exclusion_reason(&self, change: &ConstructChange) -> Option<String> {
        let id = &change.construct_id;
        if id.is_test_method() {
            return Some("test method".to_string());
        }
        if self.test_paths.is_match(change.path()) {
            return Some(format!("test path '{}'", change.path()));
        }
        if let Some(segment) = test_segment(&id.qname) {
            log::info!("Assuming {id} is test code, '{segment}' mentions test");
            return Some(format!("assumed test code ('{segment}')"));
        }
        None
    }

    /// Returns false if the change was already known
    pub fn add_construct_change(&mut self, change: ConstructChange) -> bool {
        if change.repo_path.is_none() {
            log::warn!(
                "Change {} of {} has no repository path",
                change.commit,
                change.construct_id
            );
        }
        self.fixed = OnceCell::new();
        let reason = self.exclusion_reason(&change);
        let differ = &self.differ;
        let check = self
            .checks
            .entry(change.construct_id.clone())
            .or_insert_with_key(|id| {
                FixContainmentCheck::with_differ(id.clone(), Arc::clone(differ))
            });
        match reason {
            Some(reason) => {
                log::debug!("Excluding {} in {}: {reason}", change.construct_id, change.commit);
                check.exclude(change, reason);
                true
            }
            None => check.add_change(change),
        }
    }

    pub fn add_construct_changes<I>(&mut self, changes: I) -> usize
    where
        I: IntoIterator<Item = ConstructChange>,
    {
        changes
            .into_iter()
            .map(|change| usize::from(self.add_construct_change(change)))
            .sum()
    }

    fn context(&self) -> CheckContext<'_> {
        CheckContext {
            inspector: self.inspector.as_ref(),
            normalizer: NameNormalizer::new(self.config.strip_finals),
            relaxed_first: self.config.relaxed_by_default,
            dumper: self.dumper.as_ref(),
        }
    }

    fn evaluate_all(&self) {
        let ctx = self.context();
        if self.config.parallel {
            self.checks.par_iter().for_each(|(_, check)| {
                check.evaluate(&ctx);
            });
        } else {
            for check in self.checks.values() {
                check.evaluate(&ctx);
            }
        }
    }

    /// `Some(true)` when every decided construct is fixed; `None` when none is decided
    pub fn contains_fix(&self) -> Option<bool> {
        *self.fixed.get_or_init(|| {
            self.evaluate_all();
            let ctx = self.context();
            let decided: Vec<bool> = self
                .checks
                .values()
                .filter_map(|check| check.evaluate(&ctx).fixed())
                .collect();
            let fixed = if decided.is_empty() {
                None
            } else {
                Some(decided.iter().all(|f| *f))
            };
            log::info!(
                "Bug {} in {}: fixed={fixed:?} ({} fixed, {} vulnerable, {} indeterminate, {} excluded)",
                self.bug_id,
                self.archive.display(),
                self.fixed_count(),
                self.vulnerable_count(),
                self.indeterminate_count(),
                self.excluded_count()
            );
            fixed
        })
    }

    fn count(&self, state: ConstructState) -> usize {
        let ctx = self.context();
        self.checks
            .values()
            .filter(|check| check.evaluate(&ctx).state == state)
            .count()
    }

    pub fn fixed_count(&self) -> usize {
        self.count(ConstructState::Fixed)
    }

    pub fn vulnerable_count(&self) -> usize {
        self.count(ConstructState::Vulnerable)
    }

    pub fn indeterminate_count(&self) -> usize {
        self.count(ConstructState::Indeterminate)
    }

    pub fn excluded_count(&self) -> usize {
        self.count(ConstructState::Excluded)
    }

    pub fn report(&self) -> ArchiveReport {
        let fixed = self.contains_fix();
        let ctx = self.context();
        ArchiveReport {
            bug_id: self.bug_id.clone(),
            archive: self.archive.display().to_string(),
            fixed,
            constructs: self.checks.values().map(|check| check.report(&ctx)).collect(),
            fixed_count: self.fixed_count(),
            vulnerable_count: self.vulnerable_count(),
            indeterminate_count: self.indeterminate_count(),
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.report())?)
    }
}

/// First qname segment mentioning "test", ignoring case
fn test_segment(qname: &str) -> Option<&str> {
    qname
        .split(|c: char| matches!(c, '.' | '$' | '(' | ')' | ',' | ' '))
        .find(|segment| segment.to_lowercase().contains("test"))
}
