//! # Fixcheck Edit Script
//!
//! Edit scripts between signatures and containment tests against them.
//!
//! ## Architecture
//!
//! ```text
//! before: Signature ──┐
//!                     ├──> TreeDiffer::diff ──> EditScript {Insert, Delete, Move, Update}
//! after: &Signature ──┘      (consumes before)        │
//!                                                     ├──> intersect(a, b, IgnoreRange | Normalized)
//!                                                     │
//! tested: &Signature ─────────────────────────────────┴──> EditScriptComparator::contains_change
//!                                                              ├─> threshold by script size
//!                                                              ├─> BFS node search (bigram)
//!                                                              └─> parent check (Levenshtein)
//! ```

mod compare;
mod differ;
mod error;
mod op;
mod script;
pub mod similarity;

pub use compare::{
    find_similar, intersect, similarity_threshold, ContainmentReport, EditScriptComparator,
    EntityComparison,
};
pub use differ::{DistillingDiffer, TreeDiffer};
pub use error::{EditScriptError, Result};
pub use op::{ChangeType, EditOp, OpKind};
pub use script::EditScript;
