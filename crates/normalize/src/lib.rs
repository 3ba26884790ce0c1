//! # Fixcheck Normalize
//!
//! Name normalization for relaxed entity comparison.
//!
//! ## Pipeline
//!
//! ```text
//! raw value
//!     │
//!     ├──> strip `ClassUnderAnalysis.` (statements only)
//!     │
//!     └──> repeat until stable, outside string/char literals:
//!          ├─> trim
//!          ├─> drop `this.`
//!          ├─> drop `(Object)` casts
//!          ├─> drop `final ` (optional)
//!          ├─> inline `Class.CONSTANT` via ConstantSource
//!          └─> drop numeric suffixes (10L → 10)
//! ```
//!
//! All state lives in [`NormalizationContext`], so one normalizer can serve
//! concurrent checks.

mod constants;
mod error;
mod normalizer;

pub use constants::{ConstantSource, ConstantTable, ConstantValue};
pub use error::{NormalizeError, Result};
pub use normalizer::{NameNormalizer, NormalizationContext};
