//! The three-address intermediate representation.
//!
//! Instructions ([`Instruction`]) live in basic blocks ([`BasicBlock`]),
//! blocks live in an arena owned by the [`ControlFlowGraph`], and every
//! cross-block reference is a [`BlockId`] index. Dominator computation is
//! implemented on the graph itself and stores its results on the blocks.
//!
//! The IR is built by [`crate::builder::CfgBuilder`], rewritten into SSA by
//! [`crate::ssa::SsaTransformer`], analyzed by [`crate::dataflow`] and
//! mutated by [`crate::opt`] passes.

mod block;
mod cfg;
mod dominance;
mod instruction;
mod operand;

pub use block::{BasicBlock, BlockId};
pub use cfg::ControlFlowGraph;
pub use instruction::{InstrKind, Instruction, InstructionDisplay, Operator};
pub use operand::Operand;
