//! Available expressions analysis.
//!
//! Forward must-analysis over canonical expressions: an expression is
//! available at a point if it has been computed on *every* path reaching
//! the point and none of its operands has been redefined since. Meet is
//! intersection, and interior blocks are seeded with the universe of
//! expressions appearing in the graph so the intersection can only shrink.
//!
//! Canonical equality normalizes operand order for commutative operators,
//! so `a * b` and `b * a` are the same expression.

use rustc_hash::FxHashSet;

use crate::{
    dataflow::{
        framework::{DataFlowAnalysis, Direction},
        lattice::MeetSemiLattice,
    },
    ir::{BlockId, ControlFlowGraph, InstrKind, Instruction, Operand, Operator},
};

/// A binary or unary computation identified up to commutativity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalExpr {
    /// `left op right`, with operands in canonical order for commutative
    /// operators.
    Binary {
        /// The operator.
        op: Operator,
        /// Left operand.
        left: Operand,
        /// Right operand.
        right: Operand,
    },
    /// `op operand`.
    Unary {
        /// The operator.
        op: Operator,
        /// The operand.
        operand: Operand,
    },
}

impl CanonicalExpr {
    /// Extracts the canonical expression computed by an instruction, for
    /// binary and unary instructions only.
    #[must_use]
    pub fn of_instruction(instr: &Instruction) -> Option<Self> {
        match instr.kind() {
            InstrKind::Binary {
                op, left, right, ..
            } => {
                let (left, right) = if op.is_commutative() && operand_key(right) < operand_key(left)
                {
                    (right.clone(), left.clone())
                } else {
                    (left.clone(), right.clone())
                };
                Some(Self::Binary {
                    op: *op,
                    left,
                    right,
                })
            }
            InstrKind::Unary { op, operand, .. } => Some(Self::Unary {
                op: *op,
                operand: operand.clone(),
            }),
            _ => None,
        }
    }

    /// Returns `true` if any operand is a reference to `var`.
    #[must_use]
    pub fn mentions(&self, var: &str) -> bool {
        match self {
            Self::Binary { left, right, .. } => {
                left.as_var() == Some(var) || right.as_var() == Some(var)
            }
            Self::Unary { operand, .. } => operand.as_var() == Some(var),
        }
    }
}

/// Total order key used to pick the canonical operand order. Variables
/// order by name, literals by their rendered spelling, grouped by variant.
fn operand_key(op: &Operand) -> (u8, String) {
    match op {
        Operand::Var(name) => (0, name.clone()),
        Operand::Number(_) => (1, op.to_string()),
        Operand::Str(s) => (2, s.clone()),
        Operand::Bool(b) => (3, b.to_string()),
        Operand::Null => (4, String::new()),
        Operand::Undefined => (5, String::new()),
    }
}

/// A set of available expressions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AvailSet {
    exprs: FxHashSet<CanonicalExpr>,
}

impl AvailSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `expr` is available.
    #[must_use]
    pub fn contains(&self, expr: &CanonicalExpr) -> bool {
        self.exprs.contains(expr)
    }

    /// Adds an expression.
    pub fn insert(&mut self, expr: CanonicalExpr) {
        self.exprs.insert(expr);
    }

    /// Drops every expression mentioning `var`.
    pub fn invalidate(&mut self, var: &str) {
        self.exprs.retain(|expr| !expr.mentions(var));
    }

    /// Returns the number of available expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Returns `true` if nothing is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

impl MeetSemiLattice for AvailSet {
    /// Intersection: available only if available on every path.
    fn meet(&self, other: &Self) -> Self {
        Self {
            exprs: self.exprs.intersection(&other.exprs).cloned().collect(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// Available expressions as a [`DataFlowAnalysis`].
pub struct AvailableExpressions {
    all: FxHashSet<CanonicalExpr>,
}

impl AvailableExpressions {
    /// Collects the expression universe of `cfg`.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        let mut all = FxHashSet::default();
        for block in cfg.blocks() {
            for instr in block.instructions() {
                if let Some(expr) = CanonicalExpr::of_instruction(instr) {
                    all.insert(expr);
                }
            }
        }
        Self { all }
    }

    /// Returns the universe of expressions in the graph.
    #[must_use]
    pub fn all_expressions(&self) -> &FxHashSet<CanonicalExpr> {
        &self.all
    }

    /// Applies one instruction to an availability state: its own expression
    /// becomes available, then everything its definition invalidates is
    /// dropped.
    pub(crate) fn apply_instruction(instr: &Instruction, state: &mut AvailSet) {
        if let Some(expr) = CanonicalExpr::of_instruction(instr) {
            state.insert(expr);
        }
        if let Some(dst) = instr.dst() {
            state.invalidate(dst);
        }
        if let Some(def) = instr.def_ssa_name() {
            state.invalidate(&def);
        }
    }
}

impl DataFlowAnalysis for AvailableExpressions {
    type Lattice = AvailSet;
    const DIRECTION: Direction = Direction::Forward;

    fn boundary(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        // Nothing has been computed before the entry.
        AvailSet::new()
    }

    fn initial(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        AvailSet {
            exprs: self.all.clone(),
        }
    }

    fn transfer(
        &self,
        block: BlockId,
        cfg: &ControlFlowGraph,
        input: &Self::Lattice,
    ) -> Self::Lattice {
        let mut state = input.clone();
        for instr in cfg.block(block).instructions() {
            Self::apply_instruction(instr, &mut state);
        }
        state
    }
}
