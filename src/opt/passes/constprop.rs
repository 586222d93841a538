//! Constant propagation and folding.
//!
//! Uses the constant analysis to rewrite operands whose abstract value is a
//! known literal, then lowers binary and unary instructions whose operands
//! all became literals into plain assignments of the precomputed value.
//!
//! Rewriting is limited to binary/unary operands, branch conditions and
//! return values; assignment sources and phi operands are left alone. A
//! branch whose condition folds to a boolean literal keeps its two edges;
//! turning it into a jump is a control-flow rewrite this pass does not do.

use crate::{
    dataflow::{ConstMap, ConstantPropagation, DataFlowSolver},
    ir::{ControlFlowGraph, InstrKind, Operand},
    opt::pass::Pass,
    Result,
};

/// The constant propagation / folding pass.
#[derive(Debug, Default)]
pub struct ConstantFoldingPass;

impl ConstantFoldingPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Replaces a variable operand with its literal value when the state
    /// knows one. Returns `true` on rewrite.
    fn rewrite_operand(operand: &mut Operand, state: &ConstMap) -> bool {
        if let Operand::Var(name) = operand {
            if let Some(literal) = state.get(name).to_operand() {
                *operand = literal;
                return true;
            }
        }
        false
    }
}

impl Pass for ConstantFoldingPass {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn description(&self) -> &'static str {
        "Rewrites known-constant operands and folds constant computations"
    }

    fn run(&self, cfg: &mut ControlFlowGraph) -> Result<bool> {
        let mut solver = DataFlowSolver::new(ConstantPropagation);
        let results = solver.solve(cfg)?;

        let mut changed = false;
        for block in cfg.block_ids().collect::<Vec<_>>() {
            // Walk the block with a running state so rewrites see the
            // values live at each instruction, not just at block entry.
            let mut state = results.in_state(block).clone();

            for idx in 0..cfg.block(block).instructions().len() {
                let instr = &mut cfg.block_mut(block).instructions_mut()[idx];

                match instr.kind_mut() {
                    InstrKind::Binary { left, right, .. } => {
                        changed |= Self::rewrite_operand(left, &state);
                        changed |= Self::rewrite_operand(right, &state);
                    }
                    InstrKind::Unary { operand, .. } => {
                        changed |= Self::rewrite_operand(operand, &state);
                    }
                    InstrKind::Branch { cond, .. } => {
                        changed |= Self::rewrite_operand(cond, &state);
                    }
                    InstrKind::Return {
                        value: Some(value), ..
                    } => {
                        changed |= Self::rewrite_operand(value, &state);
                    }
                    _ => {}
                }

                // Fold fully-literal computations down to assignments.
                let folded = match instr.kind() {
                    InstrKind::Binary {
                        dst,
                        op,
                        left,
                        right,
                    } if left.is_literal() && right.is_literal() => {
                        let left = ConstantPropagation::eval_operand(left, &state);
                        let right = ConstantPropagation::eval_operand(right, &state);
                        ConstantPropagation::eval_binary(*op, &left, &right)
                            .to_operand()
                            .map(|literal| (dst.clone(), literal))
                    }
                    InstrKind::Unary { dst, op, operand } if operand.is_literal() => {
                        let operand = ConstantPropagation::eval_operand(operand, &state);
                        ConstantPropagation::eval_unary(*op, &operand)
                            .to_operand()
                            .map(|literal| (dst.clone(), literal))
                    }
                    _ => None,
                };
                if let Some((dst, literal)) = folded {
                    *instr.kind_mut() = InstrKind::Assign { dst, src: literal };
                    changed = true;
                }

                let instr = &cfg.block(block).instructions()[idx];
                ConstantPropagation::apply_instruction(instr, &mut state);
            }
        }
        Ok(changed)
    }
}
