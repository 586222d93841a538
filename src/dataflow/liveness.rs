//! Live variable analysis.
//!
//! A variable is live at a point if some path from that point reaches a use
//! before any redefinition. The analysis runs backward with set union as
//! meet: `in = use ∪ (out \ def)`, with the per-instruction order respected
//! when the block sets are built, so `x#1 = x#0 + 1` keeps `x#0` live above
//! the instruction.
//!
//! Variable names are interned into a dense index when the analysis is
//! constructed, and the per-block USE/DEF sets are bit sets over that index.
//! The analysis operates on SSA form: definitions are identified by their
//! qualified `name#k` spelling so they line up with renamed uses. Phi
//! operands count as uses in the phi's own block, which is the conservative
//! reading for dead-code purposes.

use rustc_hash::FxHashMap;

use crate::{
    dataflow::{
        framework::{DataFlowAnalysis, Direction},
        lattice::MeetSemiLattice,
    },
    ir::{BlockId, ControlFlowGraph},
    utils::BitSet,
};

/// Live variable analysis over a name-indexed bit set.
pub struct LiveVariables {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
    use_sets: Vec<BitSet>,
    def_sets: Vec<BitSet>,
}

impl LiveVariables {
    /// Builds the variable index and per-block USE/DEF sets for `cfg`.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        let mut names: Vec<String> = Vec::new();
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        let mut intern = |name: &str, names: &mut Vec<String>| -> usize {
            if let Some(&idx) = index.get(name) {
                idx
            } else {
                let idx = names.len();
                names.push(name.to_string());
                index.insert(name.to_string(), idx);
                idx
            }
        };

        // First sweep: the variable universe, in first-appearance order.
        for block in cfg.blocks() {
            for instr in block.instructions() {
                for used in instr.used_vars() {
                    intern(used, &mut names);
                }
                if let Some(def) = instr.def_ssa_name() {
                    intern(&def, &mut names);
                }
            }
        }

        let num_vars = names.len();
        let mut use_sets = Vec::with_capacity(cfg.block_count());
        let mut def_sets = Vec::with_capacity(cfg.block_count());

        // Second sweep: USE is the upward-exposed uses (used before any
        // definition in the block), DEF is everything the block defines.
        for block in cfg.blocks() {
            let mut uses = BitSet::new(num_vars);
            let mut defs = BitSet::new(num_vars);
            for instr in block.instructions() {
                for used in instr.used_vars() {
                    let idx = index[used];
                    if !defs.contains(idx) {
                        uses.insert(idx);
                    }
                }
                if let Some(def) = instr.def_ssa_name() {
                    defs.insert(index[&def]);
                }
            }
            use_sets.push(uses);
            def_sets.push(defs);
        }

        Self {
            names,
            index,
            use_sets,
            def_sets,
        }
    }

    /// Returns the number of tracked variables.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.names.len()
    }

    /// Returns the dense index of a variable name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the name at a dense index.
    #[must_use]
    pub fn name_of(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Returns the upward-exposed uses of a block.
    #[must_use]
    pub fn use_set(&self, block: BlockId) -> &BitSet {
        &self.use_sets[block.index()]
    }

    /// Returns the definitions of a block.
    #[must_use]
    pub fn def_set(&self, block: BlockId) -> &BitSet {
        &self.def_sets[block.index()]
    }
}

impl DataFlowAnalysis for LiveVariables {
    type Lattice = LiveSet;
    const DIRECTION: Direction = Direction::Backward;

    fn boundary(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        // Nothing is live after the function exits.
        LiveSet::new(self.variable_count())
    }

    fn initial(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        LiveSet::new(self.variable_count())
    }

    fn transfer(
        &self,
        block: BlockId,
        _cfg: &ControlFlowGraph,
        output: &Self::Lattice,
    ) -> Self::Lattice {
        let mut live = output.live.clone();
        live.difference_with(&self.def_sets[block.index()]);
        live.union_with(&self.use_sets[block.index()]);
        LiveSet { live }
    }
}

/// The set of live variables at one program point.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSet {
    live: BitSet,
}

impl LiveSet {
    /// Creates an empty set sized for `num_vars` variables.
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            live: BitSet::new(num_vars),
        }
    }

    /// Returns `true` if the variable at `index` is live.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.live.contains(index)
    }

    /// Returns the number of live variables.
    #[must_use]
    pub fn count(&self) -> usize {
        self.live.count()
    }

    /// Returns the underlying bit set.
    #[must_use]
    pub const fn as_bitset(&self) -> &BitSet {
        &self.live
    }
}

impl MeetSemiLattice for LiveSet {
    /// Union: a variable is live if it is live on any successor path.
    fn meet(&self, other: &Self) -> Self {
        let mut live = self.live.clone();
        live.union_with(&other.live);
        Self { live }
    }

    fn is_bottom(&self) -> bool {
        self.live.count() == self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Expr, Program, Stmt, StmtKind},
        builder::CfgBuilder,
        dataflow::DataFlowSolver,
        ir::Operator,
        ssa::SsaTransformer,
    };

    fn build_ssa(statements: Vec<Stmt>) -> ControlFlowGraph {
        let mut cfg = CfgBuilder::build_program(&Program { statements }).unwrap();
        SsaTransformer::transform(&mut cfg).unwrap();
        cfg
    }

    #[test]
    fn test_dead_store_not_live() {
        // let x = 1; x = 2; return x;  -- x#0 is never used.
        let cfg = build_ssa(vec![
            Stmt::var_decl("x", Some(Expr::number(1.0))),
            Stmt::expression(Expr::assign("x", Expr::number(2.0))),
            Stmt::ret(Some(Expr::variable("x"))),
        ]);

        let analysis = LiveVariables::new(&cfg);
        let mut solver = DataFlowSolver::new(analysis);
        let results = solver.solve(&cfg).unwrap();
        let analysis = solver.analysis();

        let x0 = analysis.index_of("x#0").unwrap();
        let x1 = analysis.index_of("x#1").unwrap();
        let entry_in = results.in_state(cfg.entry());
        assert!(!entry_in.contains(x0));
        assert!(!entry_in.contains(x1));
        // x#1 is used by the return below its definition, so the block's
        // upward-exposed uses exclude it while the def set holds both.
        assert!(analysis.def_set(cfg.entry()).contains(x0));
        assert!(analysis.def_set(cfg.entry()).contains(x1));
    }

    #[test]
    fn test_loop_variable_live_around_back_edge() {
        // let n = 3; while (n > 0) { n = n - 1; } return n;
        let cfg = build_ssa(vec![
            Stmt::var_decl("n", Some(Expr::number(3.0))),
            Stmt::new(StmtKind::While {
                condition: Expr::binary(Operator::Gt, Expr::variable("n"), Expr::number(0.0)),
                body: Box::new(Stmt::expression(Expr::assign(
                    "n",
                    Expr::binary(Operator::Sub, Expr::variable("n"), Expr::number(1.0)),
                ))),
            }),
            Stmt::ret(Some(Expr::variable("n"))),
        ]);

        let mut solver = DataFlowSolver::new(LiveVariables::new(&cfg));
        let results = solver.solve(&cfg).unwrap();
        let analysis = solver.analysis();

        // The entry definition of n flows into the loop header's phi.
        let n0 = analysis.index_of("n#0").unwrap();
        assert!(results.out_state(cfg.entry()).contains(n0));
    }

    #[test]
    fn test_use_before_def_keeps_variable_live() {
        // x#1 = x#0 + 1 keeps x#0 in the block's upward-exposed uses.
        let cfg = build_ssa(vec![
            Stmt::var_decl("x", Some(Expr::number(1.0))),
            Stmt::expression(Expr::assign(
                "x",
                Expr::binary(Operator::Add, Expr::variable("x"), Expr::number(1.0)),
            )),
        ]);

        let analysis = LiveVariables::new(&cfg);
        let x0 = analysis.index_of("x#0").unwrap();
        // x#0 is defined before its use in the same block, so it is not
        // upward-exposed; the temporary's use of it sits below the def.
        assert!(!analysis.use_set(cfg.entry()).contains(x0));
        assert!(analysis.def_set(cfg.entry()).contains(x0));
    }
}
