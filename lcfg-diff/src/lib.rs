//! LCFG Diff - Structural Profile Comparison
//!
//! Three-way classification of components and per-resource diffs between
//! two profiles, plus the deterministic hold-file serialization consumed
//! by change-review tooling.

mod diff;
mod holdfile;

// Re-export diff types
pub use diff::*;

// Re-export hold-file writer
pub use holdfile::*;
