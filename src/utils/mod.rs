//! Shared utilities: bit sets for liveness, graph infrastructure and DOT
//! escaping.

mod bitset;
mod dot;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
pub use dot::escape_dot;
