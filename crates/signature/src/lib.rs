//! # Fixcheck Signature
//!
//! Canonical program trees ("signatures") of construct bodies.
//!
//! ## Architecture
//!
//! ```text
//! Java source ──> JavaSignatureBuilder (tree-sitter) ──┐
//!                                                     ├──> Signature (arena)
//! Snapshot JSON ──> Signature::from_json ─────────────┘        │
//!                                                              ├─> locate / find (BFS)
//!                                                              ├─> pre/post/breadth-first order
//!                                                              └─> structurally_equal(Label | Value)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use fixcheck_signature::{EntityLabel, JavaSignatureBuilder, Locate};
//!
//! let mut builder = JavaSignatureBuilder::new().unwrap();
//! let tree = builder.build("int size() { return items.length; }").unwrap();
//!
//! let ret = tree
//!     .locate(&Locate::LabelAndValue(EntityLabel::ReturnStatement, "return items.length"))
//!     .unwrap();
//! assert_eq!(tree.parent(ret), Some(tree.root()));
//! ```

mod error;
mod java;
mod label;
mod snapshot;
mod tree;

pub use error::{Result, SignatureError};
pub use java::JavaSignatureBuilder;
pub use label::EntityLabel;
pub use tree::{
    structurally_equal, CompareMode, Entity, Locate, Node, NodeId, Signature, SourceRange,
};
