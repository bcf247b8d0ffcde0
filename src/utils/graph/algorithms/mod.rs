//! Graph algorithms over the traits in [`traits`](super::traits).
//!
//! - [`topological_sort`] - Kahn's algorithm, used to order delay computation
//! - [`has_cycle`] / [`find_cycle`] / [`find_any_cycle`] - cycle detection for
//!   rejecting and reporting malformed dependency graphs

mod cycles;
mod topological;

pub use cycles::{find_any_cycle, find_cycle, has_cycle};
pub use topological::topological_sort;
