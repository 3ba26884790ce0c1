//! # Fixcheck Containment
//!
//! Decides whether an archive contains the fix of a bug.
//!
//! ## Architecture
//!
//! ```text
//! ConstructChange records (one bug)
//!        │
//!        ▼
//! ArchiveFixContainmentCheck ──> exclusion (test methods, test paths, "test" names)
//!        │
//!        ├──> FixContainmentCheck (per construct)
//!        │        │
//!        │        ├──> CommitChangeIndex (per repository path)
//!        │        │        ├─> overall change type  ADD | MOD | DEL | NUL
//!        │        │        └─> overall edit script  diff(first buggy, last fixed) - gaps
//!        │        │
//!        │        └──> MOD: intersect(overall, defective→tested), intersect(overall, tested→fixed)
//!        │                  strict first, normalized names on retry
//!        │
//!        ├──> ArchiveInspector (ArchiveManifest): presence, tested bodies, constants
//!        │
//!        └──> ArchiveReport: fixed = AND over decided constructs
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fixcheck_containment::{
//!     ArchiveFixContainmentCheck, ArchiveManifest, ChangeType, ConstructChange, ConstructId,
//!     ConstructKind, ContainmentConfig,
//! };
//!
//! let manifest = ArchiveManifest::from_json_str(
//!     "app.jar",
//!     r#"{"constructs": {"org.acme.Parser.validate(String)": null}}"#,
//! )
//! .unwrap();
//! let mut check = ArchiveFixContainmentCheck::with_inspector(
//!     "BUG-1",
//!     "app.jar",
//!     Arc::new(manifest),
//!     ContainmentConfig::default(),
//! )
//! .unwrap();
//!
//! check.add_construct_change(ConstructChange::new(
//!     "https://github.com/acme/parser",
//!     "a1b2c3",
//!     "src/main/java/org/acme/Parser.java",
//!     ConstructId::java(ConstructKind::Meth, "org.acme.Parser.validate(String)"),
//!     1_500_000_000_000,
//!     ChangeType::Add,
//! ));
//!
//! assert_eq!(check.contains_fix(), Some(true));
//! ```

mod archive;
mod check;
mod commits;
mod config;
mod dump;
mod error;
mod model;
mod report;

pub use archive::{ArchiveFixContainmentCheck, ArchiveInspector, ArchiveManifest};
pub use check::{
    CheckContext, ConstructState, ConstructVerdict, FixContainmentCheck, PathVerdict,
    ScriptComparison,
};
pub use commits::{CommitChangeIndex, SharedDiffer, VersionMatch};
pub use config::ContainmentConfig;
pub use dump::EditScriptDumper;
pub use error::{ContainmentError, Result};
pub use model::{ChangeType, ConstructChange, ConstructId, ConstructKind, OverallChangeType};
pub use report::{ArchiveReport, ChangeRef, ConstructReport};
