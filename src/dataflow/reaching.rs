//! Reaching definitions analysis.
//!
//! Forward may-analysis: a definition of a variable reaches a point if some
//! path from the definition to the point contains no other definition of
//! the same variable. The value at each block is a map from the variable's
//! bare name to the set of definition sites that may reach; meet is union
//! and a definition kills by replacing the variable's set with a singleton.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    dataflow::{
        framework::{DataFlowAnalysis, Direction},
        lattice::MeetSemiLattice,
    },
    ir::{BlockId, ControlFlowGraph},
};

/// The location of a defining instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefSite {
    /// The block holding the definition.
    pub block: BlockId,
    /// The instruction's index within the block.
    pub index: usize,
}

/// Map from bare variable name to the definition sites that may reach.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReachingDefs {
    defs: FxHashMap<String, FxHashSet<DefSite>>,
}

impl ReachingDefs {
    /// Creates an empty map: no definitions reach.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sites defining `var` that may reach this point.
    #[must_use]
    pub fn reaching(&self, var: &str) -> Option<&FxHashSet<DefSite>> {
        self.defs.get(var)
    }

    /// Returns the number of variables with at least one reaching
    /// definition.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.defs.len()
    }

    fn kill_and_define(&mut self, var: &str, site: DefSite) {
        let set = self.defs.entry(var.to_string()).or_default();
        set.clear();
        set.insert(site);
    }
}

impl MeetSemiLattice for ReachingDefs {
    /// Union: a definition reaches a join if it reaches along any edge.
    fn meet(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (var, sites) in &other.defs {
            merged
                .defs
                .entry(var.clone())
                .or_default()
                .extend(sites.iter().copied());
        }
        merged
    }

    fn is_bottom(&self) -> bool {
        false
    }
}

/// Reaching definitions as a [`DataFlowAnalysis`].
pub struct ReachingDefinitions;

impl DataFlowAnalysis for ReachingDefinitions {
    type Lattice = ReachingDefs;
    const DIRECTION: Direction = Direction::Forward;

    fn boundary(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        ReachingDefs::new()
    }

    fn initial(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        ReachingDefs::new()
    }

    fn transfer(
        &self,
        block: BlockId,
        cfg: &ControlFlowGraph,
        input: &Self::Lattice,
    ) -> Self::Lattice {
        let mut state = input.clone();
        for (index, instr) in cfg.block(block).instructions().iter().enumerate() {
            if let Some(dst) = instr.dst() {
                state.kill_and_define(dst, DefSite { block, index });
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Expr, Program, Stmt, StmtKind},
        builder::CfgBuilder,
        dataflow::DataFlowSolver,
    };

    fn build(statements: Vec<Stmt>) -> ControlFlowGraph {
        CfgBuilder::build_program(&Program { statements }).unwrap()
    }

    #[test]
    fn test_redefinition_kills() {
        // let x = 1; x = 2;  -- only the second definition reaches the end.
        let cfg = build(vec![
            Stmt::var_decl("x", Some(Expr::number(1.0))),
            Stmt::expression(Expr::assign("x", Expr::number(2.0))),
        ]);

        let mut solver = DataFlowSolver::new(ReachingDefinitions);
        let results = solver.solve(&cfg).unwrap();

        let out = results.out_state(cfg.entry());
        let sites = out.reaching("x").unwrap();
        assert_eq!(sites.len(), 1);
        assert!(sites.contains(&DefSite {
            block: cfg.entry(),
            index: 1,
        }));
    }

    #[test]
    fn test_join_unions_definitions() {
        // let c = true; let x = 0; if (c) { x = 1; } else { x = 2; }
        // Both branch definitions reach the merge block.
        let cfg = build(vec![
            Stmt::var_decl("c", Some(Expr::boolean(true))),
            Stmt::var_decl("x", Some(Expr::number(0.0))),
            Stmt::new(StmtKind::If {
                condition: Expr::variable("c"),
                then_branch: Box::new(Stmt::expression(Expr::assign("x", Expr::number(1.0)))),
                else_branch: Some(Box::new(Stmt::expression(Expr::assign(
                    "x",
                    Expr::number(2.0),
                )))),
            }),
        ]);

        let mut solver = DataFlowSolver::new(ReachingDefinitions);
        let results = solver.solve(&cfg).unwrap();

        let merge = cfg
            .block_ids()
            .find(|&id| cfg.block(id).name() == "merge_0")
            .unwrap();
        let sites = results.in_state(merge).reaching("x").unwrap();
        assert_eq!(sites.len(), 2, "one definition per branch arm");
    }

    #[test]
    fn test_entry_boundary_is_empty() {
        let cfg = build(vec![Stmt::var_decl("x", Some(Expr::number(1.0)))]);
        let mut solver = DataFlowSolver::new(ReachingDefinitions);
        let results = solver.solve(&cfg).unwrap();
        assert_eq!(results.in_state(cfg.entry()).variable_count(), 0);
    }
}
