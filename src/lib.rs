// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # gensched
//!
//! An intra-basic-block list scheduler for the backend of a GPU shader
//! compiler. `gensched` reorders the low-level instructions of each basic
//! block to hide execution latency while never violating a data or resource
//! dependency, and before register allocation it also keeps register
//! pressure below the allocatable budget.
//!
//! ## Features
//!
//! - **Dependency analysis** - read-after-write, write-after-write and
//!   write-after-read hazards on general, message, flag and accumulator
//!   registers, with side-effecting instructions serialized
//! - **Two schedulers** - a pressure-aware bottom-up pass before register
//!   allocation and a latency-driven top-down pass after it
//! - **Latency model** - per-opcode tables for each hardware generation,
//!   shared across threads
//! - **Scalar and vec4 flavors** - selected per block
//! - **Parallel driver** - independent blocks scheduled with `rayon`
//!
//! ## Quick Start
//!
//! ```rust
//! use gensched::prelude::*;
//!
//! let scheduler = InstructionScheduler::new(SchedulerConfig::default())?
//!     .with_vreg_sizes(vec![1, 1, 1]);
//!
//! let block = ShaderBlock::new(0, vec![
//!     Instruction::build(Opcode::Mov).dst(Operand::vgrf(0, 0)).src0(Operand::Immediate(1)).build(),
//!     Instruction::build(Opcode::Add).dst(Operand::vgrf(1, 0)).src0(Operand::vgrf(0, 0)).build(),
//!     Instruction::build(Opcode::Mul).dst(Operand::vgrf(2, 0)).src0(Operand::vgrf(1, 0)).build(),
//! ]);
//!
//! let scheduled = scheduler.schedule_block(&block)?;
//! assert_eq!(scheduled.order, vec![0, 1, 2]);
//! println!("{}", scheduler.events().summary());
//! # Ok::<(), gensched::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - the instruction representation the scheduler consumes
//! - [`schedule`] - latency model, dependency graph, pressure tracking,
//!   heuristics, the list scheduler and the per-block driver
//! - [`utils`] - bit sets and generic graph algorithms
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. A block whose operands
//! cannot be placed yields [`Error::Malformed`]; a dependency graph that
//! violates its invariants yields [`Error::GraphError`] or
//! [`Error::SchedulingStalled`] and aborts scheduling of that block.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use gensched::prelude::*;
///
/// let config = SchedulerConfig::post_allocation(Generation::new(9));
/// let scheduler = InstructionScheduler::new(config)?;
/// assert_eq!(scheduler.config().direction(), Direction::TopDown);
/// # Ok::<(), gensched::Error>(())
/// ```
pub mod prelude;

/// Instruction representation
///
/// Opcodes, operands and instructions as produced by the lowering stage.
/// The scheduler only inspects register references, message payloads,
/// flag and accumulator usage and the property flags of each instruction.
pub mod ir;

/// Instruction scheduling for one basic block at a time
pub mod schedule;

/// Bit sets, graph primitives and graph algorithms
pub mod utils;

/// `gensched` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is
/// always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `gensched` Error type
///
/// # Examples
///
/// ```rust
/// use gensched::{ir::{Instruction, Opcode, Operand}, Error};
/// use gensched::schedule::{InstructionScheduler, SchedulerConfig, ShaderBlock};
///
/// let scheduler = InstructionScheduler::new(SchedulerConfig::default())?;
/// let block = ShaderBlock::new(0, vec![
///     Instruction::build(Opcode::Mov).dst(Operand::vgrf(9, 0)).build(),
/// ]);
///
/// match scheduler.schedule_block(&block) {
///     Err(Error::Malformed { message, .. }) => println!("rejected: {message}"),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok::<(), gensched::Error>(())
/// ```
pub use error::Error;

pub use schedule::{InstructionScheduler, ScheduledBlock, SchedulerConfig, ShaderBlock};
