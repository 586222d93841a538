//! Common-subexpression elimination.
//!
//! A redundant binary or unary instruction is replaced with an assignment
//! from the variable that already holds the value. Two conditions gate the
//! replacement:
//!
//! - the canonical expression is *available* at the instruction (computed
//!   on every incoming path with no operand redefined since), and
//! - a producer for it is in scope on the dominator-tree path from the
//!   entry, so the substituted variable is defined wherever the redundant
//!   instruction executed.
//!
//! The producer map is carried down the dominator tree the same way the
//! SSA renamer carries its version stacks; each child starts from its
//! parent's map. Per instruction the order is: check for reuse, invalidate
//! entries mentioning the definition, then record the instruction's own
//! expression. Invalidating first keeps an instruction that redefines one
//! of its own operands from leaving stale entries behind.

use rustc_hash::FxHashMap;

use crate::{
    dataflow::{
        AnalysisResults, AvailSet, AvailableExpressions, CanonicalExpr, DataFlowSolver,
    },
    ir::{BlockId, ControlFlowGraph, InstrKind, Operand},
    opt::pass::Pass,
    Result,
};

/// The common-subexpression elimination pass.
#[derive(Debug, Default)]
pub struct CsePass;

impl CsePass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn run_block(
        cfg: &mut ControlFlowGraph,
        block: BlockId,
        results: &AnalysisResults<AvailSet>,
        mut producers: FxHashMap<CanonicalExpr, String>,
        changed: &mut bool,
    ) {
        let mut avail = results.in_state(block).clone();

        for idx in 0..cfg.block(block).instructions().len() {
            let instr = &mut cfg.block_mut(block).instructions_mut()[idx];

            if let Some(expr) = CanonicalExpr::of_instruction(instr) {
                if avail.contains(&expr) {
                    if let Some(producer) = producers.get(&expr) {
                        let dst = instr
                            .dst()
                            .expect("expression defines a variable")
                            .to_string();
                        *instr.kind_mut() = InstrKind::Assign {
                            dst,
                            src: Operand::Var(producer.clone()),
                        };
                        *changed = true;
                    }
                }
            }

            // Invalidate before recording: a definition kills every
            // expression over the old value, including this instruction's
            // own when it consumes what it overwrites.
            let bare = instr.dst().map(str::to_string);
            let qualified = instr.def_ssa_name();
            if let (Some(bare), Some(qualified)) = (&bare, &qualified) {
                avail.invalidate(bare);
                avail.invalidate(qualified);
                producers.retain(|expr, _| !expr.mentions(bare) && !expr.mentions(qualified));
            }

            if let Some(expr) = CanonicalExpr::of_instruction(&cfg.block(block).instructions()[idx])
            {
                avail.insert(expr.clone());
                if let Some(qualified) = qualified {
                    producers.entry(expr).or_insert(qualified);
                }
            }
        }

        for child in cfg.dominator_children(block) {
            // Each subtree extends its parent's producers, never its
            // siblings'.
            Self::run_block(cfg, child, results, producers.clone(), changed);
        }
    }
}

impl Pass for CsePass {
    fn name(&self) -> &'static str {
        "common-subexpression-elimination"
    }

    fn description(&self) -> &'static str {
        "Replaces recomputed expressions with reuses of earlier results"
    }

    fn run(&self, cfg: &mut ControlFlowGraph) -> Result<bool> {
        let mut solver = DataFlowSolver::new(AvailableExpressions::new(cfg));
        let results = solver.solve(cfg)?;
        cfg.compute_dominance();

        let mut changed = false;
        let entry = cfg.entry();
        Self::run_block(cfg, entry, &results, FxHashMap::default(), &mut changed);
        Ok(changed)
    }
}
