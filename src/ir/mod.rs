//! Machine instruction contract consumed by the scheduler.
//!
//! The lowering pass produces a [`Instruction`] list per basic block. The
//! scheduler reads opcode, operands and property flags, and hands the same
//! values back in a new order.

mod instruction;
mod opcode;
mod operand;

pub use instruction::{Instruction, InstructionBuilder, InstructionFlags};
pub use opcode::Opcode;
pub use operand::{Operand, RegRef, RegisterFile};
