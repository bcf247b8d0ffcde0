//! Lightweight graph infrastructure for dependency graphs.
//!
//! The scheduler's dependency graph stores its own nodes and edges in an
//! arena; this module supplies the shared vocabulary around it:
//!
//! - [`NodeId`] - strongly-typed node index
//! - [`GraphBase`], [`Successors`], [`Predecessors`] - adjacency traits
//! - [`algorithms`] - topological sort and cycle detection written against
//!   those traits

pub mod algorithms;
mod node;
pub(crate) mod traits;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, Successors};
