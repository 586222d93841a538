//! Constant propagation analysis.
//!
//! Forward analysis over the three-level constant lattice: ⊤ (not yet
//! known), a concrete literal, or ⊥, "not a constant" (NAC). The value per
//! block is a map from qualified SSA name to lattice value with absent keys
//! reading as ⊤, so the pointwise meet needs no explicit universe.
//!
//! Evaluation follows IEEE-754 double semantics with one exception required
//! for soundness of later folding: division by exactly zero produces ⊥
//! rather than an infinity. String operations, `null`/`undefined` sources
//! and call results are absorbed as ⊥; nothing in this analysis ever
//! raises.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{
    dataflow::{
        framework::{DataFlowAnalysis, Direction},
        lattice::MeetSemiLattice,
    },
    ir::{BlockId, ControlFlowGraph, InstrKind, Instruction, Operand, Operator},
};

/// One point of the constant lattice.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// ⊤: no information yet; the meet identity.
    Top,
    /// A numeric constant.
    Num(f64),
    /// A string constant.
    Str(String),
    /// A boolean constant.
    Bool(bool),
    /// ⊥: not a constant.
    Nac,
}

impl ConstValue {
    /// Returns `true` for a concrete literal (neither ⊤ nor ⊥).
    #[must_use]
    pub fn is_const(&self) -> bool {
        !matches!(self, Self::Top | Self::Nac)
    }

    /// The pairwise meet: ⊤ is the identity, ⊥ absorbs, equal constants
    /// stay, and differing constants collapse to ⊥.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Top, x) | (x, Self::Top) => x.clone(),
            (Self::Nac, _) | (_, Self::Nac) => Self::Nac,
            (a, b) if a == b => a.clone(),
            _ => Self::Nac,
        }
    }

    /// Converts a constant back into an immediate operand, for the
    /// rewriting transformation. ⊤ and ⊥ have no operand form.
    #[must_use]
    pub fn to_operand(&self) -> Option<Operand> {
        match self {
            Self::Num(n) => Some(Operand::Number(*n)),
            Self::Str(s) => Some(Operand::Str(s.clone())),
            Self::Bool(b) => Some(Operand::Bool(*b)),
            Self::Top | Self::Nac => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("⊤"),
            Self::Num(n) => write!(f, "{}", Operand::Number(*n)),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Nac => f.write_str("NAC"),
        }
    }
}

/// Map from qualified SSA name to constant value; absent keys are ⊤.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstMap {
    values: FxHashMap<String, ConstValue>,
}

impl ConstMap {
    /// Creates the all-⊤ map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `var` (⊤ when absent).
    #[must_use]
    pub fn get(&self, var: &str) -> ConstValue {
        self.values.get(var).cloned().unwrap_or(ConstValue::Top)
    }

    /// Records the value of `var`.
    pub fn set(&mut self, var: impl Into<String>, value: ConstValue) {
        self.values.insert(var.into(), value);
    }

    /// Returns the number of variables with recorded values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if every variable is ⊤.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl MeetSemiLattice for ConstMap {
    fn meet(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (var, value) in &other.values {
            match merged.values.get_mut(var) {
                Some(existing) => *existing = existing.meet(value),
                None => {
                    merged.values.insert(var.clone(), value.clone());
                }
            }
        }
        merged
    }

    fn is_bottom(&self) -> bool {
        !self.values.is_empty() && self.values.values().all(|v| matches!(v, ConstValue::Nac))
    }
}

/// Constant propagation as a [`DataFlowAnalysis`].
pub struct ConstantPropagation;

impl ConstantPropagation {
    /// Abstract value of an operand under `state`.
    pub(crate) fn eval_operand(operand: &Operand, state: &ConstMap) -> ConstValue {
        match operand {
            Operand::Var(name) => state.get(name),
            Operand::Number(n) => ConstValue::Num(*n),
            Operand::Str(s) => ConstValue::Str(s.clone()),
            Operand::Bool(b) => ConstValue::Bool(*b),
            // null and undefined take part in no folding.
            Operand::Null | Operand::Undefined => ConstValue::Nac,
        }
    }

    /// Evaluates a binary operator over abstract values.
    pub(crate) fn eval_binary(op: Operator, left: &ConstValue, right: &ConstValue) -> ConstValue {
        if matches!(left, ConstValue::Nac) || matches!(right, ConstValue::Nac) {
            return ConstValue::Nac;
        }
        if matches!(left, ConstValue::Top) || matches!(right, ConstValue::Top) {
            return ConstValue::Top;
        }
        match (left, right) {
            (ConstValue::Num(a), ConstValue::Num(b)) => {
                let (a, b) = (*a, *b);
                match op {
                    Operator::Add => ConstValue::Num(a + b),
                    Operator::Sub => ConstValue::Num(a - b),
                    Operator::Mul => ConstValue::Num(a * b),
                    Operator::Div => {
                        if b == 0.0 {
                            ConstValue::Nac
                        } else {
                            ConstValue::Num(a / b)
                        }
                    }
                    Operator::Eq => ConstValue::Bool(a == b),
                    Operator::Ne => ConstValue::Bool(a != b),
                    Operator::Lt => ConstValue::Bool(a < b),
                    Operator::Le => ConstValue::Bool(a <= b),
                    Operator::Gt => ConstValue::Bool(a > b),
                    Operator::Ge => ConstValue::Bool(a >= b),
                    _ => ConstValue::Nac,
                }
            }
            // String and mixed-type operations stay out of the lattice.
            _ => ConstValue::Nac,
        }
    }

    /// Evaluates a unary operator over an abstract value.
    pub(crate) fn eval_unary(op: Operator, operand: &ConstValue) -> ConstValue {
        match operand {
            ConstValue::Nac => ConstValue::Nac,
            ConstValue::Top => ConstValue::Top,
            ConstValue::Num(n) if op == Operator::Neg => ConstValue::Num(-n),
            ConstValue::Bool(b) if op == Operator::Not => ConstValue::Bool(!b),
            _ => ConstValue::Nac,
        }
    }

    /// Applies one instruction's effect to the state. Shared between the
    /// block transfer and the rewriting transformation, which advances the
    /// state instruction by instruction.
    pub(crate) fn apply_instruction(instr: &Instruction, state: &mut ConstMap) {
        let value = match instr.kind() {
            InstrKind::Assign { src, .. } => Self::eval_operand(src, state),
            InstrKind::Binary {
                op, left, right, ..
            } => {
                let left = Self::eval_operand(left, state);
                let right = Self::eval_operand(right, state);
                Self::eval_binary(*op, &left, &right)
            }
            InstrKind::Unary { op, operand, .. } => {
                let operand = Self::eval_operand(operand, state);
                Self::eval_unary(*op, &operand)
            }
            // A call may compute anything.
            InstrKind::Call { .. } => ConstValue::Nac,
            InstrKind::Phi { sources, .. } => {
                let mut value = ConstValue::Top;
                for (_, src) in sources {
                    value = value.meet(&Self::eval_operand(src, state));
                }
                value
            }
            InstrKind::Return { .. } | InstrKind::Branch { .. } | InstrKind::Jump { .. } => {
                return;
            }
        };
        if let Some(def) = instr.def_ssa_name() {
            state.set(def, value);
        }
    }
}

impl DataFlowAnalysis for ConstantPropagation {
    type Lattice = ConstMap;
    const DIRECTION: Direction = Direction::Forward;

    fn boundary(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        ConstMap::new()
    }

    fn initial(&self, _cfg: &ControlFlowGraph) -> Self::Lattice {
        // ⊤ everywhere.
        ConstMap::new()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Expr, Program, Stmt, StmtKind},
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
    fn test_meet_table() {
        use ConstValue::{Bool, Nac, Num, Top};
        assert_eq!(Top.meet(&Num(1.0)), Num(1.0));
        assert_eq!(Num(1.0).meet(&Top), Num(1.0));
        assert_eq!(Num(1.0).meet(&Num(1.0)), Num(1.0));
        assert_eq!(Num(1.0).meet(&Num(2.0)), Nac);
        assert_eq!(Num(1.0).meet(&Bool(true)), Nac);
        assert_eq!(Nac.meet(&Top), Nac);
    }

    #[test]
    fn test_straight_line_folding_values() {
        // let a = 2; let b = 3; let c = a + b;
        let cfg = build_ssa(vec![
            Stmt::var_decl("a", Some(Expr::number(2.0))),
            Stmt::var_decl("b", Some(Expr::number(3.0))),
            Stmt::var_decl(
                "c",
                Some(Expr::binary(
                    crate::ir::Operator::Add,
                    Expr::variable("a"),
                    Expr::variable("b"),
                )),
            ),
        ]);

        let mut solver = DataFlowSolver::new(ConstantPropagation);
        let results = solver.solve(&cfg).unwrap();
        let out = results.out_state(cfg.entry());
        assert_eq!(out.get("a#0"), ConstValue::Num(2.0));
        assert_eq!(out.get("c#0"), ConstValue::Num(5.0));
    }

    #[test]
    fn test_division_by_zero_is_nac() {
        // let x = 4; let z = x / 0;
        let cfg = build_ssa(vec![
            Stmt::var_decl("x", Some(Expr::number(4.0))),
            Stmt::var_decl(
                "z",
                Some(Expr::binary(
                    crate::ir::Operator::Div,
                    Expr::variable("x"),
                    Expr::number(0.0),
                )),
            ),
        ]);

        let mut solver = DataFlowSolver::new(ConstantPropagation);
        let results = solver.solve(&cfg).unwrap();
        assert_eq!(results.out_state(cfg.entry()).get("z#0"), ConstValue::Nac);
    }

    #[test]
    fn test_call_result_is_nac() {
        let cfg = build_ssa(vec![
            Stmt::new(StmtKind::FunctionDecl(crate::ast::FunctionDecl {
                name: "f".to_string(),
                params: vec![],
                body: vec![],
                position: crate::position::SourcePosition::UNKNOWN,
            })),
            Stmt::var_decl("r", Some(Expr::call(Expr::variable("f"), vec![]))),
        ]);

        let mut solver = DataFlowSolver::new(ConstantPropagation);
        let results = solver.solve(&cfg).unwrap();
        assert_eq!(results.out_state(cfg.entry()).get("r#0"), ConstValue::Nac);
    }

    #[test]
    fn test_phi_meets_incoming_values() {
        // let c = true; let x; if (c) { x = 1; } else { x = 2; }
        // The merge phi sees 1 ∧ 2 = NAC.
        let diverging = build_ssa(vec![
            Stmt::var_decl("c", Some(Expr::boolean(true))),
            Stmt::var_decl("x", None),
            Stmt::new(StmtKind::If {
                condition: Expr::variable("c"),
                then_branch: Box::new(Stmt::expression(Expr::assign("x", Expr::number(1.0)))),
                else_branch: Some(Box::new(Stmt::expression(Expr::assign(
                    "x",
                    Expr::number(2.0),
                )))),
            }),
        ]);
        let mut solver = DataFlowSolver::new(ConstantPropagation);
        let results = solver.solve(&diverging).unwrap();
        let merge = diverging
            .block_ids()
            .find(|&id| diverging.block(id).name() == "merge_0")
            .unwrap();
        assert_eq!(results.out_state(merge).get("x#2"), ConstValue::Nac);

        // Same shape with equal constants folds through the phi.
        let agreeing = build_ssa(vec![
            Stmt::var_decl("c", Some(Expr::boolean(true))),
            Stmt::var_decl("x", None),
            Stmt::new(StmtKind::If {
                condition: Expr::variable("c"),
                then_branch: Box::new(Stmt::expression(Expr::assign("x", Expr::number(7.0)))),
                else_branch: Some(Box::new(Stmt::expression(Expr::assign(
                    "x",
                    Expr::number(7.0),
                )))),
            }),
        ]);
        let mut solver = DataFlowSolver::new(ConstantPropagation);
        let results = solver.solve(&agreeing).unwrap();
        let merge = agreeing
            .block_ids()
            .find(|&id| agreeing.block(id).name() == "merge_0")
            .unwrap();
        assert_eq!(results.out_state(merge).get("x#2"), ConstValue::Num(7.0));
    }

    #[test]
    fn test_loop_counter_collapses_to_nac() {
        // for (let i = 0; i < 3; i = i + 1) { }
        let cfg = build_ssa(vec![Stmt::new(StmtKind::For {
            init: Some(Box::new(Stmt::var_decl("i", Some(Expr::number(0.0))))),
            condition: Some(Expr::binary(
                crate::ir::Operator::Lt,
                Expr::variable("i"),
                Expr::number(3.0),
            )),
            increment: Some(Expr::assign(
                "i",
                Expr::binary(crate::ir::Operator::Add, Expr::variable("i"), Expr::number(1.0)),
            )),
            body: Box::new(Stmt::block(vec![])),
        })]);

        let mut solver = DataFlowSolver::new(ConstantPropagation);
        let results = solver.solve(&cfg).unwrap();
        let cond = cfg
            .block_ids()
            .find(|&id| cfg.block(id).name() == "cond_0")
            .unwrap();
        // The loop-carried phi mixes 0 and 1, 2, ...: not a constant.
        assert_eq!(results.out_state(cond).get("i#1"), ConstValue::Nac);
    }

    #[test]
    fn test_string_operations_absorbed() {
        use ConstValue::{Nac, Str};
        let left = Str("a".to_string());
        let right = Str("b".to_string());
        assert_eq!(
            ConstantPropagation::eval_binary(Operator::Add, &left, &right),
            Nac
        );
    }
}
