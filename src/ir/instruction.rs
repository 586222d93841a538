//! Three-address instructions.
//!
//! Instructions are a sum type with a common header: a source position and
//! an SSA version slot. The version is 0 until SSA renaming assigns the
//! definition its version `k`; the fully-qualified SSA name of a definition
//! is `dst#k` and the renderer always prints destinations that way.
//!
//! Dispatch is by `match` on [`InstrKind`]; there is no virtual hierarchy.

use std::fmt;

use crate::{
    ir::{BlockId, ControlFlowGraph, Operand},
    position::SourcePosition,
};

/// The closed operator set: arithmetic, relational, logical, unary negation
/// and logical not, and property access.
///
/// Operators carry no source position; the instruction header does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
    /// Unary `-`
    Neg,
    /// Unary `!`
    Not,
    /// Property access, `.`
    Member,
}

impl Operator {
    /// Returns the JavaScript spelling of the operator.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub | Self::Neg => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
            Self::Member => ".",
        }
    }

    /// Returns `true` for operators where operand order does not change the
    /// value. Available-expressions equality normalizes operand order for
    /// these.
    #[must_use]
    pub const fn is_commutative(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Mul | Self::Eq | Self::Ne | Self::And | Self::Or
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Instruction variants.
///
/// `Return`, `Branch` and `Jump` are terminators; everything else defines a
/// single destination variable.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    /// `dst = src`
    Assign {
        /// Destination variable.
        dst: String,
        /// Source operand.
        src: Operand,
    },
    /// `dst = left op right`
    Binary {
        /// Destination variable.
        dst: String,
        /// The operator.
        op: Operator,
        /// Left operand.
        left: Operand,
        /// Right operand.
        right: Operand,
    },
    /// `dst = op operand`
    Unary {
        /// Destination variable.
        dst: String,
        /// The operator (`Neg` or `Not`).
        op: Operator,
        /// The operand.
        operand: Operand,
    },
    /// `dst = callee(args...)`
    Call {
        /// Destination variable.
        dst: String,
        /// The callee.
        callee: Operand,
        /// Arguments, left to right.
        args: Vec<Operand>,
    },
    /// `dst = phi(src0 [pred0], src1 [pred1], ...)`
    ///
    /// The i-th source pairs with the i-th predecessor of the enclosing
    /// block.
    Phi {
        /// Destination variable.
        dst: String,
        /// Incoming `(predecessor, value)` pairs, in predecessor order.
        sources: Vec<(BlockId, Operand)>,
    },
    /// `return;` or `return value;`
    Return {
        /// The returned value, if any.
        value: Option<Operand>,
        /// Set on the return the builder appends when a function body falls
        /// off the end.
        is_implicit: bool,
    },
    /// `if (cond) goto true_target; else goto false_target`
    Branch {
        /// The condition operand.
        cond: Operand,
        /// Target when the condition is truthy.
        true_target: BlockId,
        /// Target when the condition is falsy.
        false_target: BlockId,
    },
    /// `goto target`
    Jump {
        /// The jump target.
        target: BlockId,
    },
}

/// An instruction: a variant plus the shared position/version header.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    kind: InstrKind,
    position: SourcePosition,
    version: u32,
}

impl Instruction {
    /// Creates an instruction with no position information.
    #[must_use]
    pub fn new(kind: InstrKind) -> Self {
        Self {
            kind,
            position: SourcePosition::UNKNOWN,
            version: 0,
        }
    }

    /// Creates an instruction at a source position.
    #[must_use]
    pub fn with_position(kind: InstrKind, position: SourcePosition) -> Self {
        Self {
            kind,
            position,
            version: 0,
        }
    }

    /// Returns the instruction variant.
    #[must_use]
    pub const fn kind(&self) -> &InstrKind {
        &self.kind
    }

    /// Returns a mutable reference to the variant. Transformations rewrite
    /// operands and replace folded instructions through this.
    pub fn kind_mut(&mut self) -> &mut InstrKind {
        &mut self.kind
    }

    /// Returns the source position.
    #[must_use]
    pub const fn position(&self) -> SourcePosition {
        self.position
    }

    /// Returns the SSA version (0 before renaming).
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Records the SSA version of this definition.
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Returns the destination variable, or `None` for terminators.
    #[must_use]
    pub fn dst(&self) -> Option<&str> {
        match &self.kind {
            InstrKind::Assign { dst, .. }
            | InstrKind::Binary { dst, .. }
            | InstrKind::Unary { dst, .. }
            | InstrKind::Call { dst, .. }
            | InstrKind::Phi { dst, .. } => Some(dst),
            InstrKind::Return { .. } | InstrKind::Branch { .. } | InstrKind::Jump { .. } => None,
        }
    }

    /// Returns the fully-qualified SSA name of the definition, `dst#k`.
    #[must_use]
    pub fn def_ssa_name(&self) -> Option<String> {
        self.dst().map(|dst| format!("{dst}#{}", self.version))
    }

    /// Returns the variables (not literals) appearing as operands.
    #[must_use]
    pub fn used_vars(&self) -> Vec<&str> {
        let mut used = Vec::new();
        self.for_each_operand(|op| {
            if let Some(name) = op.as_var() {
                used.push(name);
            }
        });
        used
    }

    /// Calls `f` on every operand of this instruction.
    pub fn for_each_operand<'a>(&'a self, mut f: impl FnMut(&'a Operand)) {
        match &self.kind {
            InstrKind::Assign { src, .. } => f(src),
            InstrKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            InstrKind::Unary { operand, .. } => f(operand),
            InstrKind::Call { callee, args, .. } => {
                f(callee);
                for arg in args {
                    f(arg);
                }
            }
            InstrKind::Phi { sources, .. } => {
                for (_, src) in sources {
                    f(src);
                }
            }
            InstrKind::Return { value, .. } => {
                if let Some(value) = value {
                    f(value);
                }
            }
            InstrKind::Branch { cond, .. } => f(cond),
            InstrKind::Jump { .. } => {}
        }
    }

    /// Calls `f` on every operand, mutably. SSA renaming rewrites uses
    /// through this.
    pub fn for_each_operand_mut(&mut self, mut f: impl FnMut(&mut Operand)) {
        match &mut self.kind {
            InstrKind::Assign { src, .. } => f(src),
            InstrKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            InstrKind::Unary { operand, .. } => f(operand),
            InstrKind::Call { callee, args, .. } => {
                f(callee);
                for arg in args {
                    f(arg);
                }
            }
            InstrKind::Phi { sources, .. } => {
                for (_, src) in sources {
                    f(src);
                }
            }
            InstrKind::Return { value, .. } => {
                if let Some(value) = value {
                    f(value);
                }
            }
            InstrKind::Branch { cond, .. } => f(cond),
            InstrKind::Jump { .. } => {}
        }
    }

    /// Returns `true` for `Return`, `Branch` and `Jump`.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            InstrKind::Return { .. } | InstrKind::Branch { .. } | InstrKind::Jump { .. }
        )
    }

    /// Returns `true` for phi instructions.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self.kind, InstrKind::Phi { .. })
    }

    /// Returns `true` if the instruction must not be removed even when its
    /// definition is dead: calls and control transfers. Phis are not
    /// side-effecting.
    #[must_use]
    pub const fn has_side_effects(&self) -> bool {
        matches!(
            self.kind,
            InstrKind::Call { .. }
                | InstrKind::Return { .. }
                | InstrKind::Branch { .. }
                | InstrKind::Jump { .. }
        )
    }

    /// Renders the instruction, resolving block references through `cfg`.
    #[must_use]
    pub fn display<'a>(&'a self, cfg: &'a ControlFlowGraph) -> InstructionDisplay<'a> {
        InstructionDisplay { instr: self, cfg }
    }
}

/// Adapter that renders an instruction with block names resolved.
pub struct InstructionDisplay<'a> {
    instr: &'a Instruction,
    cfg: &'a ControlFlowGraph,
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.instr.version();
        let name = |id: BlockId| self.cfg.block(id).name();
        match self.instr.kind() {
            InstrKind::Assign { dst, src } => write!(f, "{dst}#{version} = {src}"),
            InstrKind::Binary {
                dst,
                op,
                left,
                right,
            } => write!(f, "{dst}#{version} = {left} {op} {right}"),
            InstrKind::Unary { dst, op, operand } => {
                write!(f, "{dst}#{version} = {op}{operand}")
            }
            InstrKind::Call { dst, callee, args } => {
                write!(f, "{dst}#{version} = {callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            InstrKind::Phi { dst, sources } => {
                write!(f, "{dst}#{version} = phi(")?;
                for (i, (pred, src)) in sources.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{src} [{}]", name(*pred))?;
                }
                f.write_str(")")
            }
            InstrKind::Return { value, .. } => match value {
                Some(value) => write!(f, "return {value};"),
                None => f.write_str("return;"),
            },
            InstrKind::Branch {
                cond,
                true_target,
                false_target,
            } => write!(
                f,
                "if ({cond}) goto {}; else goto {}",
                name(*true_target),
                name(*false_target)
            ),
            InstrKind::Jump { target } => write!(f, "goto {}", name(*target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(dst: &str, src: &str) -> Instruction {
        Instruction::new(InstrKind::Assign {
            dst: dst.to_string(),
            src: Operand::parse(src),
        })
    }

    #[test]
    fn test_defined_and_used_vars() {
        let instr = Instruction::new(InstrKind::Binary {
            dst: "t".to_string(),
            op: Operator::Add,
            left: Operand::parse("a"),
            right: Operand::parse("2"),
        });
        assert_eq!(instr.dst(), Some("t"));
        assert_eq!(instr.used_vars(), vec!["a"]);

        let ret = Instruction::new(InstrKind::Return {
            value: Some(Operand::parse("x")),
            is_implicit: false,
        });
        assert_eq!(ret.dst(), None);
        assert_eq!(ret.used_vars(), vec!["x"]);
    }

    #[test]
    fn test_call_uses_callee_and_args() {
        let call = Instruction::new(InstrKind::Call {
            dst: "t".to_string(),
            callee: Operand::parse("f"),
            args: vec![Operand::parse("a"), Operand::parse("1"), Operand::parse("b")],
        });
        assert_eq!(call.used_vars(), vec!["f", "a", "b"]);
    }

    #[test]
    fn test_terminators() {
        assert!(Instruction::new(InstrKind::Jump {
            target: BlockId::new(0)
        })
        .is_terminator());
        assert!(!assign("x", "1").is_terminator());
    }

    #[test]
    fn test_side_effects() {
        let call = Instruction::new(InstrKind::Call {
            dst: "t".to_string(),
            callee: Operand::parse("f"),
            args: vec![],
        });
        assert!(call.has_side_effects());
        assert!(!assign("x", "1").has_side_effects());

        let phi = Instruction::new(InstrKind::Phi {
            dst: "x".to_string(),
            sources: vec![],
        });
        assert!(!phi.has_side_effects());
        assert!(phi.is_phi());
    }

    #[test]
    fn test_def_ssa_name() {
        let mut instr = assign("x", "1");
        assert_eq!(instr.def_ssa_name().as_deref(), Some("x#0"));
        instr.set_version(3);
        assert_eq!(instr.def_ssa_name().as_deref(), Some("x#3"));
    }

    #[test]
    fn test_clone_preserves_header() {
        let mut instr = Instruction::with_position(
            InstrKind::Assign {
                dst: "x".to_string(),
                src: Operand::parse("1"),
            },
            crate::position::SourcePosition::new(4, 2),
        );
        instr.set_version(7);
        let copy = instr.clone();
        assert_eq!(copy.version(), 7);
        assert_eq!(copy.position(), instr.position());
        assert_eq!(copy, instr);
    }
}
