//! Dead-code elimination.
//!
//! Physically removes the instructions that [`DeadCode`] reports. Removing
//! a definition can make the definitions feeding it dead in turn, so the
//! pass re-runs liveness and removes again until a sweep finds nothing.
//! Edges never change, so predecessor/successor lists stay consistent, and
//! removing a phi drops its incoming references with it.

use crate::{
    dataflow::{DataFlowSolver, DeadCode, LiveVariables},
    ir::ControlFlowGraph,
    opt::pass::Pass,
    Result,
};

/// The dead-code elimination pass.
#[derive(Debug, Default)]
pub struct DcePass;

impl DcePass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// One liveness run plus one sweep. Returns `true` if anything was
    /// removed.
    fn sweep(cfg: &mut ControlFlowGraph) -> Result<bool> {
        let mut solver = DataFlowSolver::new(LiveVariables::new(cfg));
        let results = solver.solve(cfg)?;
        let deadcode = DeadCode::new(solver.analysis(), &results);

        let mut unused_per_block = Vec::new();
        for block in cfg.block_ids() {
            let unused = deadcode.unused_definitions(block, cfg);
            if !unused.is_empty() {
                unused_per_block.push((block, unused));
            }
        }

        let removed = !unused_per_block.is_empty();
        for (block, unused) in unused_per_block {
            let instructions = cfg.block_mut(block).instructions_mut();
            for idx in unused.into_iter().rev() {
                instructions.remove(idx);
            }
        }
        Ok(removed)
    }
}

impl Pass for DcePass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes instructions whose definitions are never used"
    }

    fn run(&self, cfg: &mut ControlFlowGraph) -> Result<bool> {
        let mut changed = false;
        while Self::sweep(cfg)? {
            changed = true;
        }
        Ok(changed)
    }
}
