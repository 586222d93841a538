//! Dead-code detection on top of liveness.
//!
//! A definition is unused when the defined variable is dead immediately
//! after the defining instruction. The helper walks a block backward from
//! its live-out set, maintaining liveness per instruction, and reports the
//! non-side-effecting instructions whose whole defined set is dead.
//!
//! Side-effecting instructions (calls and the control-transfer terminators)
//! are never reported. Phis are ordinary definitions here.

use crate::{
    dataflow::{
        framework::AnalysisResults,
        liveness::{LiveSet, LiveVariables},
    },
    ir::{BlockId, ControlFlowGraph},
};

/// Finds unused definitions using a solved liveness analysis.
pub struct DeadCode<'a> {
    liveness: &'a LiveVariables,
    results: &'a AnalysisResults<LiveSet>,
}

impl<'a> DeadCode<'a> {
    /// Pairs a liveness analysis with its fixpoint results.
    #[must_use]
    pub fn new(liveness: &'a LiveVariables, results: &'a AnalysisResults<LiveSet>) -> Self {
        Self { liveness, results }
    }

    /// Returns the indices (ascending) of instructions in `block` whose
    /// definitions are all dead and which have no side effects.
    #[must_use]
    pub fn unused_definitions(&self, block: BlockId, cfg: &ControlFlowGraph) -> Vec<usize> {
        let mut live = self.results.out_state(block).as_bitset().clone();
        let mut unused = Vec::new();

        for (index, instr) in cfg.block(block).instructions().iter().enumerate().rev() {
            if !instr.has_side_effects() {
                let dead_def = instr
                    .def_ssa_name()
                    .and_then(|def| self.liveness.index_of(&def))
                    .is_some_and(|idx| !live.contains(idx));
                if dead_def {
                    unused.push(index);
                }
            }

            for used in instr.used_vars() {
                if let Some(idx) = self.liveness.index_of(used) {
                    live.insert(idx);
                }
            }
            if let Some(def) = instr.def_ssa_name() {
                if let Some(idx) = self.liveness.index_of(&def) {
                    live.remove(idx);
                }
            }
        }

        unused.reverse();
        unused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Expr, Program, Stmt},
        builder::CfgBuilder,
        dataflow::DataFlowSolver,
        ssa::SsaTransformer,
    };

    fn build_ssa(statements: Vec<Stmt>) -> ControlFlowGraph {
        let mut cfg = CfgBuilder::build_program(&Program { statements }).unwrap();
        SsaTransformer::transform(&mut cfg).unwrap();
        cfg
    }

    #[test]
    fn test_dead_store_detected() {
        // let x = 1; x = 2; return x;  -- the first store is dead.
        let cfg = build_ssa(vec![
            Stmt::var_decl("x", Some(Expr::number(1.0))),
            Stmt::expression(Expr::assign("x", Expr::number(2.0))),
            Stmt::ret(Some(Expr::variable("x"))),
        ]);

        let mut solver = DataFlowSolver::new(LiveVariables::new(&cfg));
        let results = solver.solve(&cfg).unwrap();
        let deadcode = DeadCode::new(solver.analysis(), &results);

        let unused = deadcode.unused_definitions(cfg.entry(), &cfg);
        assert_eq!(unused, vec![0]);
    }

    #[test]
    fn test_side_effecting_never_reported() {
        // let r = f(); -- r is dead but the call must stay.
        let cfg = build_ssa(vec![
            Stmt::new(crate::ast::StmtKind::FunctionDecl(crate::ast::FunctionDecl {
                name: "f".to_string(),
                params: vec![],
                body: vec![],
                position: crate::position::SourcePosition::UNKNOWN,
            })),
            Stmt::var_decl("r", Some(Expr::call(Expr::variable("f"), vec![]))),
        ]);

        let mut solver = DataFlowSolver::new(LiveVariables::new(&cfg));
        let results = solver.solve(&cfg).unwrap();
        let deadcode = DeadCode::new(solver.analysis(), &results);

        let unused = deadcode.unused_definitions(cfg.entry(), &cfg);
        // Only the dead `r = tmp` and `f = function_object` assigns may be
        // reported; the call itself never is.
        for &idx in &unused {
            assert!(!cfg.block(cfg.entry()).instructions()[idx].has_side_effects());
        }
    }

    #[test]
    fn test_live_definition_not_reported() {
        let cfg = build_ssa(vec![
            Stmt::var_decl("x", Some(Expr::number(1.0))),
            Stmt::ret(Some(Expr::variable("x"))),
        ]);

        let mut solver = DataFlowSolver::new(LiveVariables::new(&cfg));
        let results = solver.solve(&cfg).unwrap();
        let deadcode = DeadCode::new(solver.analysis(), &results);

        assert!(deadcode.unused_definitions(cfg.entry(), &cfg).is_empty());
    }
}
