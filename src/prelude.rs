//! Convenient re-exports of the most commonly used types.
//!
//! ```rust,no_run
//! use jsmir::prelude::*;
//!
//! # fn lower(program: &Program) -> jsmir::Result<()> {
//! let mut cfg = CfgBuilder::build_program(program)?;
//! SsaTransformer::transform(&mut cfg)?;
//! optimize(&mut cfg)?;
//! # Ok(())
//! # }
//! ```

pub use crate::{
    ast::{Expr, ExprKind, FunctionDecl, Literal, Program, Stmt, StmtKind},
    builder::CfgBuilder,
    dataflow::{
        AvailableExpressions, ConstantPropagation, DataFlowSolver, DeadCode, LiveVariables,
        ReachingDefinitions,
    },
    ir::{BasicBlock, BlockId, ControlFlowGraph, InstrKind, Instruction, Operand, Operator},
    opt::{optimize, ConstantFoldingPass, CsePass, DcePass, Pass, PassManager},
    position::SourcePosition,
    ssa::SsaTransformer,
    Error, Result,
};
