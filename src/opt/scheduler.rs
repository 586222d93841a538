//! Pass pipeline execution.
//!
//! The manager runs its pass list round-robin until a full round changes
//! nothing. A round cap bounds pathological interactions; the standard
//! pipeline stabilizes in two rounds (one that transforms, one that
//! confirms).

use crate::{ir::ControlFlowGraph, opt::pass::Pass, Result};

/// Default cap on pipeline rounds.
const DEFAULT_MAX_ROUNDS: usize = 8;

/// Runs a sequence of passes to a fixpoint.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
    max_rounds: usize,
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PassManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Appends a pass to the pipeline.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Overrides the round cap.
    pub fn set_max_rounds(&mut self, max_rounds: usize) -> &mut Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Returns the names of the registered passes, in run order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs the pipeline until a full round leaves the graph unchanged or
    /// the round cap is reached. Returns the number of rounds executed.
    ///
    /// # Errors
    ///
    /// Propagates the first pass failure.
    pub fn run(&self, cfg: &mut ControlFlowGraph) -> Result<usize> {
        let mut rounds = 0;
        while rounds < self.max_rounds {
            rounds += 1;
            let mut changed = false;
            for pass in &self.passes {
                changed |= pass.run(cfg)?;
            }
            if !changed {
                break;
            }
        }
        Ok(rounds)
    }
}
