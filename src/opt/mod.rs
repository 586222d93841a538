//! CFG transformations driven by the dataflow analyses.
//!
//! Three classical optimizations operate on SSA form:
//!
//! - [`ConstantFoldingPass`] — constant propagation and folding
//! - [`CsePass`] — common-subexpression elimination over available
//!   expressions
//! - [`DcePass`] — dead-code elimination over liveness
//!
//! Passes implement [`Pass`] and can be sequenced by a [`PassManager`],
//! which re-runs the pipeline until a round changes nothing. [`optimize`]
//! wires up the standard pipeline.
//!
//! Every pass leaves the graph in valid SSA form with the structural
//! invariants of [`crate::ir::ControlFlowGraph::verify`] intact; none of
//! them adds or removes edges.

mod pass;
mod passes;
mod scheduler;

pub use pass::Pass;
pub use passes::{ConstantFoldingPass, CsePass, DcePass};
pub use scheduler::PassManager;

use crate::{ir::ControlFlowGraph, Result};

/// Runs the standard optimization pipeline (constant folding, then CSE,
/// then DCE) until the graph stops changing.
///
/// # Errors
///
/// Propagates the first pass failure.
pub fn optimize(cfg: &mut ControlFlowGraph) -> Result<()> {
    let mut manager = PassManager::new();
    manager
        .add_pass(ConstantFoldingPass::new())
        .add_pass(CsePass::new())
        .add_pass(DcePass::new());
    manager.run(cfg)?;
    Ok(())
}
