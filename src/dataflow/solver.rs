//! Worklist-based fixpoint solver.
//!
//! Blocks are seeded in reverse postorder (forward analyses) or postorder
//! (backward analyses), which is a speed matter rather than a correctness
//! one, and re-queued whenever a neighbour's value changes. Iteration stops at the
//! fixpoint, or with [`crate::Error::AnalysisDiverged`] once the budget is
//! exhausted; with the finite monotone lattices in this crate the budget is
//! only reachable through a non-monotone transfer function.
//!
//! Unreachable blocks never enter the worklist and keep their seed value,
//! which is the meet identity, so they cannot perturb reachable results.

use std::collections::VecDeque;

use crate::{
    dataflow::{
        framework::{AnalysisResults, DataFlowAnalysis, Direction},
        lattice::MeetSemiLattice,
    },
    ir::{BlockId, ControlFlowGraph},
    Error, Result,
};

/// How many times a single block may be re-processed before the solver
/// declares divergence.
const VISIT_BUDGET_PER_BLOCK: usize = 1_000;

/// Iterates a [`DataFlowAnalysis`] to its fixpoint.
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    analysis: A,
    in_states: Vec<A::Lattice>,
    out_states: Vec<A::Lattice>,
    worklist: VecDeque<usize>,
    in_worklist: Vec<bool>,
    iterations: usize,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a solver for the given analysis.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            in_states: Vec::new(),
            out_states: Vec::new(),
            worklist: VecDeque::new(),
            in_worklist: Vec::new(),
            iterations: 0,
        }
    }

    /// Returns the analysis this solver runs.
    #[must_use]
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Returns the number of block visits performed so far.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Runs the analysis to a fixpoint over `cfg`.
    ///
    /// # Errors
    ///
    /// [`Error::AnalysisDiverged`] when the iteration budget is exceeded.
    pub fn solve(&mut self, cfg: &ControlFlowGraph) -> Result<AnalysisResults<A::Lattice>> {
        let num_blocks = cfg.block_count();
        if num_blocks == 0 {
            return Ok(AnalysisResults::new(Vec::new(), Vec::new()));
        }

        self.initialize(cfg);
        self.iterate(cfg)?;

        Ok(AnalysisResults::new(
            self.in_states.clone(),
            self.out_states.clone(),
        ))
    }

    fn initialize(&mut self, cfg: &ControlFlowGraph) {
        let num_blocks = cfg.block_count();
        let initial = self.analysis.initial(cfg);
        let boundary = self.analysis.boundary(cfg);

        self.in_states = vec![initial.clone(); num_blocks];
        self.out_states = vec![initial; num_blocks];
        self.in_worklist = vec![false; num_blocks];
        self.worklist.clear();
        self.iterations = 0;

        match A::DIRECTION {
            Direction::Forward => {
                self.in_states[cfg.entry().index()] = boundary;
            }
            Direction::Backward => {
                for exit in cfg.exit_blocks() {
                    self.out_states[exit.index()] = boundary.clone();
                }
            }
        }

        let order = match A::DIRECTION {
            Direction::Forward => cfg.reverse_postorder(),
            Direction::Backward => cfg.postorder(),
        };
        for block in order {
            self.worklist.push_back(block.index());
            self.in_worklist[block.index()] = true;
        }
    }

    fn iterate(&mut self, cfg: &ControlFlowGraph) -> Result<()> {
        let budget = VISIT_BUDGET_PER_BLOCK * cfg.block_count().max(1);

        while let Some(block_idx) = self.worklist.pop_front() {
            self.in_worklist[block_idx] = false;
            self.iterations += 1;
            if self.iterations > budget {
                return Err(Error::AnalysisDiverged(self.iterations));
            }

            let block = BlockId::new(block_idx);
            let changed = match A::DIRECTION {
                Direction::Forward => self.process_forward(block, cfg),
                Direction::Backward => self.process_backward(block, cfg),
            };

            if changed {
                self.enqueue_affected(block, cfg);
            }
        }
        Ok(())
    }

    /// Recomputes one block forward. Returns `true` if its output changed.
    fn process_forward(&mut self, block: BlockId, cfg: &ControlFlowGraph) -> bool {
        let idx = block.index();

        // The entry keeps its boundary value; everything else meets its
        // predecessors' outputs.
        if block != cfg.entry() {
            let mut input: Option<A::Lattice> = None;
            for &pred in cfg.block(block).predecessors() {
                let pred_out = &self.out_states[pred.index()];
                input = Some(match input {
                    None => pred_out.clone(),
                    Some(acc) => acc.meet(pred_out),
                });
            }
            if let Some(input) = input {
                self.in_states[idx] = input;
            }
        }

        let output = self.analysis.transfer(block, cfg, &self.in_states[idx]);
        let changed = output != self.out_states[idx];
        self.out_states[idx] = output;
        changed
    }

    /// Recomputes one block backward. Returns `true` if its input changed.
    fn process_backward(&mut self, block: BlockId, cfg: &ControlFlowGraph) -> bool {
        let idx = block.index();

        let mut output: Option<A::Lattice> = None;
        for &succ in cfg.block(block).successors() {
            let succ_in = &self.in_states[succ.index()];
            output = Some(match output {
                None => succ_in.clone(),
                Some(acc) => acc.meet(succ_in),
            });
        }
        if let Some(output) = output {
            self.out_states[idx] = output;
        }

        let input = self.analysis.transfer(block, cfg, &self.out_states[idx]);
        let changed = input != self.in_states[idx];
        self.in_states[idx] = input;
        changed
    }

    fn enqueue_affected(&mut self, block: BlockId, cfg: &ControlFlowGraph) {
        let affected = match A::DIRECTION {
            Direction::Forward => cfg.block(block).successors(),
            Direction::Backward => cfg.block(block).predecessors(),
        };
        for &next in affected {
            let idx = next.index();
            if !self.in_worklist[idx] {
                self.worklist.push_back(idx);
                self.in_worklist[idx] = true;
            }
        }
    }
}
