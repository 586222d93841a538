//! The dataflow analysis abstraction.
//!
//! A concrete analysis supplies three things: the lattice value stored per
//! block, the boundary/interior seed values, and the block transfer
//! function. The [`crate::dataflow::DataFlowSolver`] owns the iteration.

use crate::{
    dataflow::lattice::MeetSemiLattice,
    ir::{BlockId, ControlFlowGraph},
};

/// Direction of a dataflow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Information flows from entry to exit; block inputs meet the outputs
    /// of predecessors. Reaching definitions, available expressions and
    /// constant propagation run forward.
    Forward,
    /// Information flows from exit to entry; block outputs meet the inputs
    /// of successors. Live variables runs backward.
    Backward,
}

/// A dataflow analysis over the control flow graph.
///
/// For a forward analysis the transfer maps a block's input to its output;
/// for a backward analysis it maps the block's output to its input.
pub trait DataFlowAnalysis {
    /// The per-block lattice value.
    type Lattice: MeetSemiLattice;

    /// The direction information propagates in.
    const DIRECTION: Direction;

    /// The value at the analysis boundary: function entry for forward
    /// analyses, the exit blocks for backward analyses.
    fn boundary(&self, cfg: &ControlFlowGraph) -> Self::Lattice;

    /// The seed value for interior blocks before iteration starts. This
    /// must be the identity of the analysis's meet so unreachable
    /// neighbours cannot perturb reachable blocks.
    fn initial(&self, cfg: &ControlFlowGraph) -> Self::Lattice;

    /// Applies the block's effects to an incoming value.
    fn transfer(
        &self,
        block: BlockId,
        cfg: &ControlFlowGraph,
        input: &Self::Lattice,
    ) -> Self::Lattice;
}

/// Fixpoint results: one input and one output value per block.
#[derive(Debug, Clone)]
pub struct AnalysisResults<L> {
    in_states: Vec<L>,
    out_states: Vec<L>,
}

impl<L> AnalysisResults<L> {
    pub(crate) fn new(in_states: Vec<L>, out_states: Vec<L>) -> Self {
        Self {
            in_states,
            out_states,
        }
    }

    /// Returns the value flowing into a block.
    #[must_use]
    pub fn in_state(&self, block: BlockId) -> &L {
        &self.in_states[block.index()]
    }

    /// Returns the value flowing out of a block.
    #[must_use]
    pub fn out_state(&self, block: BlockId) -> &L {
        &self.out_states[block.index()]
    }

    /// Returns the number of blocks covered.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.in_states.len()
    }
}
