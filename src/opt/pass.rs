//! The transformation pass interface.

use crate::{ir::ControlFlowGraph, Result};

/// A CFG-to-CFG transformation.
///
/// Passes mutate the graph in place and report whether they changed
/// anything, which is what the [`crate::opt::PassManager`] iterates on.
/// Every pass must preserve the structural invariants checked by
/// [`ControlFlowGraph::verify`] and leave the graph in valid SSA form.
pub trait Pass {
    /// Short kebab-case pass name for diagnostics.
    fn name(&self) -> &'static str;

    /// One-line description of what the pass does.
    fn description(&self) -> &'static str;

    /// Runs the pass. Returns `true` if the graph was changed.
    ///
    /// # Errors
    ///
    /// Passes propagate analysis failures such as
    /// [`crate::Error::AnalysisDiverged`].
    fn run(&self, cfg: &mut ControlFlowGraph) -> Result<bool>;
}
