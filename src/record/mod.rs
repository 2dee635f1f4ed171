//! Application-record types and the per-record pure transforms.
//!
//! Records move through fixed stages during a cycle: the loosely-typed feed row
//! (`RawRecord`), the canonical shape produced by the normalizer
//! (`CanonicalRecord`), and the reconciliation state computed from the
//! destination system's status signals (`ComputedState`). Conversions between
//! stages are the only place field-name logic lives.

pub mod normalize;
pub mod status;
mod types;

pub use types::*;
