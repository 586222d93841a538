//! Lowering from the AST to the control flow graph.
//!
//! The builder walks the statement tree with explicit traversal state: the
//! *current block* every instruction is appended to, a counter for fresh
//! `tmp_N` temporaries, per-prefix counters for fresh block names, and a
//! stack of loop contexts for `break`/`continue` targets.
//!
//! Expression lowering is strictly left-to-right and three-address: every
//! compound expression materializes its result into a fresh temporary, while
//! literals lower to their immediate operand and identifiers to themselves.
//! Statement lowering produces the block topology described in the module
//! docs of each arm below; a block that already terminated never receives a
//! second terminator, which is what makes `break`/`return` inside an arm
//! compose with the structural jumps.
//!
//! Scoping is assumed correct (an external scope analysis runs first); the
//! builder only tracks the flat set of declared names so that a reference
//! with no declaration fails fast with [`crate::Error::UnboundVariable`].

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    ast::{Expr, ExprKind, FunctionDecl, Program, Stmt, StmtKind},
    ir::{BlockId, ControlFlowGraph, InstrKind, Instruction, Operand, Operator},
    position::SourcePosition,
    Error, Result,
};

/// Break and continue targets of the innermost enclosing loop.
///
/// `continue` goes to the condition block of a `while` and the increment
/// block of a `for`; `break` always goes to the loop's exit block.
struct LoopContext {
    continue_target: BlockId,
    break_target: BlockId,
}

/// Lowers an AST into a [`ControlFlowGraph`].
pub struct CfgBuilder {
    cfg: ControlFlowGraph,
    current: BlockId,
    temp_counter: usize,
    block_counters: FxHashMap<&'static str, usize>,
    loop_stack: Vec<LoopContext>,
    declared: FxHashSet<String>,
}

impl CfgBuilder {
    fn new() -> Self {
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.create_block("entry");
        Self {
            cfg,
            current: entry,
            temp_counter: 0,
            block_counters: FxHashMap::default(),
            loop_stack: Vec::new(),
            declared: FxHashSet::default(),
        }
    }

    /// Lowers a program's top-level statements into a CFG.
    ///
    /// Function declarations inside the program are *not* lowered here; the
    /// enclosing graph receives an opaque `function_object` placeholder and
    /// the declaration compiles to a child CFG via [`Self::build_function`].
    ///
    /// # Errors
    ///
    /// [`Error::MalformedAst`] for `break`/`continue` outside a loop and
    /// [`Error::UnboundVariable`] for identifier uses with no declaration.
    pub fn build_program(program: &Program) -> Result<ControlFlowGraph> {
        let mut builder = Self::new();
        for stmt in &program.statements {
            builder.lower_stmt(stmt)?;
        }
        builder.finish()
    }

    /// Lowers a function declaration into its own CFG.
    ///
    /// The entry block starts with one `Assign(param, param_<name>)` per
    /// parameter so that parameter values have an explicit definition site.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::build_program`].
    pub fn build_function(func: &FunctionDecl) -> Result<ControlFlowGraph> {
        let mut builder = Self::new();
        // The function's own name is in scope for self-recursion.
        builder.declared.insert(func.name.clone());
        for param in &func.params {
            builder.declared.insert(param.clone());
            builder.emit(
                InstrKind::Assign {
                    dst: param.clone(),
                    src: Operand::Var(format!("param_{param}")),
                },
                func.position,
            );
        }
        for stmt in &func.body {
            builder.lower_stmt(stmt)?;
        }
        builder.finish()
    }

    fn finish(mut self) -> Result<ControlFlowGraph> {
        if !self.cfg.block(self.current).has_terminator() {
            self.cfg.add_terminator(
                self.current,
                Instruction::new(InstrKind::Return {
                    value: None,
                    is_implicit: true,
                }),
            );
        }
        Ok(self.cfg)
    }

    /// Returns a fresh `tmp_N` temporary name.
    fn temp(&mut self) -> String {
        let name = format!("tmp_{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    /// Creates a fresh block named `<prefix>_<n>` with a per-prefix counter.
    fn start_block(&mut self, prefix: &'static str) -> BlockId {
        let counter = self.block_counters.entry(prefix).or_insert(0);
        let name = format!("{prefix}_{counter}");
        *counter += 1;
        self.cfg.create_block(name)
    }

    /// Appends an instruction to the current block. If the current block
    /// already terminated (code textually following a `return`), a fresh
    /// unreachable block is started to hold it.
    fn emit(&mut self, kind: InstrKind, position: SourcePosition) {
        if self.cfg.block(self.current).has_terminator() {
            self.current = self.start_block("after_return");
        }
        self.cfg
            .add_instruction(self.current, Instruction::with_position(kind, position));
    }

    /// Terminates the current block with a jump, unless it already
    /// terminated.
    fn jump_to(&mut self, target: BlockId, position: SourcePosition) {
        self.cfg.add_terminator(
            self.current,
            Instruction::with_position(InstrKind::Jump { target }, position),
        );
    }

    /// Terminates the current block with a conditional branch, unless it
    /// already terminated.
    fn branch_to(
        &mut self,
        cond: Operand,
        true_target: BlockId,
        false_target: BlockId,
        position: SourcePosition,
    ) {
        self.cfg.add_terminator(
            self.current,
            Instruction::with_position(
                InstrKind::Branch {
                    cond,
                    true_target,
                    false_target,
                },
                position,
            ),
        );
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        let position = stmt.position;
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.lower_expr(expr)?;
            }

            StmtKind::VarDecl { name, init } => {
                // The name is introduced after its initializer: a
                // self-referencing initializer is an unbound use.
                let value = init
                    .as_ref()
                    .map(|init| self.lower_expr(init))
                    .transpose()?;
                self.declared.insert(name.clone());
                if let Some(value) = value {
                    self.emit(
                        InstrKind::Assign {
                            dst: name.clone(),
                            src: value,
                        },
                        position,
                    );
                }
            }

            StmtKind::Block(statements) => {
                for stmt in statements {
                    self.lower_stmt(stmt)?;
                }
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.lower_expr(condition)?;
                let then_blk = self.start_block("then");
                if let Some(else_branch) = else_branch {
                    let else_blk = self.start_block("else");
                    let merge_blk = self.start_block("merge");
                    self.branch_to(cond, then_blk, else_blk, position);

                    self.current = then_blk;
                    self.lower_stmt(then_branch)?;
                    self.jump_to(merge_blk, position);

                    self.current = else_blk;
                    self.lower_stmt(else_branch)?;
                    self.jump_to(merge_blk, position);

                    self.current = merge_blk;
                } else {
                    let merge_blk = self.start_block("merge");
                    self.branch_to(cond, then_blk, merge_blk, position);

                    self.current = then_blk;
                    self.lower_stmt(then_branch)?;
                    self.jump_to(merge_blk, position);

                    self.current = merge_blk;
                }
            }

            StmtKind::While { condition, body } => {
                let cond_blk = self.start_block("cond");
                self.jump_to(cond_blk, position);

                self.current = cond_blk;
                let cond = self.lower_expr(condition)?;
                let body_blk = self.start_block("body");
                let exit_blk = self.start_block("exit");
                self.branch_to(cond, body_blk, exit_blk, position);

                self.loop_stack.push(LoopContext {
                    continue_target: cond_blk,
                    break_target: exit_blk,
                });
                self.current = body_blk;
                self.lower_stmt(body)?;
                self.jump_to(cond_blk, position);
                self.loop_stack.pop();

                self.current = exit_blk;
            }

            StmtKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                let cond_blk = self.start_block("cond");
                self.jump_to(cond_blk, position);

                self.current = cond_blk;
                let cond = condition
                    .as_ref()
                    .map(|cond| self.lower_expr(cond))
                    .transpose()?;
                let body_blk = self.start_block("body");
                let incr_blk = self.start_block("incr");
                let exit_blk = self.start_block("exit");
                match cond {
                    Some(cond) => self.branch_to(cond, body_blk, exit_blk, position),
                    // No condition means always true.
                    None => self.jump_to(body_blk, position),
                }

                self.loop_stack.push(LoopContext {
                    continue_target: incr_blk,
                    break_target: exit_blk,
                });
                self.current = body_blk;
                self.lower_stmt(body)?;
                self.jump_to(incr_blk, position);

                self.current = incr_blk;
                if let Some(increment) = increment {
                    self.lower_expr(increment)?;
                }
                self.jump_to(cond_blk, position);
                self.loop_stack.pop();

                self.current = exit_blk;
            }

            StmtKind::Break => {
                let Some(ctx) = self.loop_stack.last() else {
                    return Err(malformed_ast!("`break` outside of a loop"));
                };
                let target = ctx.break_target;
                self.jump_to(target, position);
                self.current = self.start_block("after_break");
            }

            StmtKind::Continue => {
                let Some(ctx) = self.loop_stack.last() else {
                    return Err(malformed_ast!("`continue` outside of a loop"));
                };
                let target = ctx.continue_target;
                self.jump_to(target, position);
                self.current = self.start_block("after_continue");
            }

            StmtKind::Return(value) => {
                let value = value
                    .as_ref()
                    .map(|value| self.lower_expr(value))
                    .transpose()?;
                self.cfg.add_terminator(
                    self.current,
                    Instruction::with_position(
                        InstrKind::Return {
                            value,
                            is_implicit: false,
                        },
                        position,
                    ),
                );
            }

            StmtKind::FunctionDecl(func) => {
                // The body compiles to a child CFG elsewhere; here the name
                // just binds an opaque function object.
                self.declared.insert(func.name.clone());
                self.emit(
                    InstrKind::Assign {
                        dst: func.name.clone(),
                        src: Operand::Var("function_object".to_string()),
                    },
                    position,
                );
            }
        }
        Ok(())
    }

    /// Lowers an expression and returns the operand holding its value.
    fn lower_expr(&mut self, expr: &Expr) -> Result<Operand> {
        let position = expr.position;
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(Operand::from_literal(literal)),

            ExprKind::Variable(name) => {
                if !self.declared.contains(name) {
                    return Err(Error::UnboundVariable {
                        name: name.clone(),
                        position,
                    });
                }
                Ok(Operand::Var(name.clone()))
            }

            ExprKind::Assign { name, value } => {
                if !self.declared.contains(name) {
                    return Err(Error::UnboundVariable {
                        name: name.clone(),
                        position,
                    });
                }
                let value = self.lower_expr(value)?;
                self.emit(
                    InstrKind::Assign {
                        dst: name.clone(),
                        src: value,
                    },
                    position,
                );
                Ok(Operand::Var(name.clone()))
            }

            ExprKind::Binary { op, left, right } => match op {
                Operator::And | Operator::Or => self.lower_short_circuit(*op, left, right, position),
                _ => {
                    let left = self.lower_expr(left)?;
                    let right = self.lower_expr(right)?;
                    let dst = self.temp();
                    self.emit(
                        InstrKind::Binary {
                            dst: dst.clone(),
                            op: *op,
                            left,
                            right,
                        },
                        position,
                    );
                    Ok(Operand::Var(dst))
                }
            },

            ExprKind::Unary { op, operand } => {
                let op = match op {
                    Operator::Neg | Operator::Sub => Operator::Neg,
                    Operator::Not => Operator::Not,
                    other => {
                        return Err(malformed_ast!("`{other}` is not a unary operator"));
                    }
                };
                let operand = self.lower_expr(operand)?;
                let dst = self.temp();
                self.emit(
                    InstrKind::Unary {
                        dst: dst.clone(),
                        op,
                        operand,
                    },
                    position,
                );
                Ok(Operand::Var(dst))
            }

            ExprKind::Call { callee, args } => {
                let callee = self.lower_expr(callee)?;
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_expr(arg)?);
                }
                let dst = self.temp();
                self.emit(
                    InstrKind::Call {
                        dst: dst.clone(),
                        callee,
                        args: lowered,
                    },
                    position,
                );
                Ok(Operand::Var(dst))
            }

            ExprKind::Member { object, property } => {
                let object = self.lower_expr(object)?;
                let dst = self.temp();
                self.emit(
                    InstrKind::Binary {
                        dst: dst.clone(),
                        op: Operator::Member,
                        left: object,
                        right: Operand::Str(property.clone()),
                    },
                    position,
                );
                Ok(Operand::Var(dst))
            }

            ExprKind::Array(elements) => {
                let mut lowered = Vec::with_capacity(elements.len());
                for element in elements {
                    lowered.push(self.lower_expr(element)?);
                }
                let dst = self.temp();
                // Construction is an opaque side-effecting operation.
                self.emit(
                    InstrKind::Call {
                        dst: dst.clone(),
                        callee: Operand::Var("array_literal".to_string()),
                        args: lowered,
                    },
                    position,
                );
                Ok(Operand::Var(dst))
            }

            ExprKind::Object(properties) => {
                let mut args = Vec::with_capacity(properties.len() * 2);
                for (key, value) in properties {
                    args.push(Operand::Str(key.clone()));
                    args.push(self.lower_expr(value)?);
                }
                let dst = self.temp();
                self.emit(
                    InstrKind::Call {
                        dst: dst.clone(),
                        callee: Operand::Var("object_literal".to_string()),
                        args,
                    },
                    position,
                );
                Ok(Operand::Var(dst))
            }

            ExprKind::Arrow { .. } => {
                let dst = self.temp();
                self.emit(
                    InstrKind::Assign {
                        dst: dst.clone(),
                        src: Operand::Var("function_object".to_string()),
                    },
                    position,
                );
                Ok(Operand::Var(dst))
            }
        }
    }

    /// Lowers `left && right` / `left || right` into a two-block diamond
    /// writing one shared temporary. The merge phi is inserted later by SSA
    /// construction, not here.
    fn lower_short_circuit(
        &mut self,
        op: Operator,
        left: &Expr,
        right: &Expr,
        position: SourcePosition,
    ) -> Result<Operand> {
        let left = self.lower_expr(left)?;
        let dst = self.temp();
        self.emit(
            InstrKind::Assign {
                dst: dst.clone(),
                src: left,
            },
            position,
        );

        let (rhs_blk, merge_blk) = if op == Operator::And {
            let rhs = self.start_block("and_rhs");
            let merge = self.start_block("and_merge");
            // Truthy left: the result is the right-hand side.
            self.branch_to(Operand::Var(dst.clone()), rhs, merge, position);
            (rhs, merge)
        } else {
            let rhs = self.start_block("or_rhs");
            let merge = self.start_block("or_merge");
            // Falsy left: the result is the right-hand side.
            self.branch_to(Operand::Var(dst.clone()), merge, rhs, position);
            (rhs, merge)
        };

        self.current = rhs_blk;
        let right = self.lower_expr(right)?;
        self.emit(
            InstrKind::Assign {
                dst: dst.clone(),
                src: right,
            },
            position,
        );
        self.jump_to(merge_blk, position);

        self.current = merge_blk;
        Ok(Operand::Var(dst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;

    fn names(cfg: &ControlFlowGraph) -> Vec<&str> {
        cfg.blocks().iter().map(|b| b.name()).collect()
    }

    #[test]
    fn test_straight_line_lowering() {
        // let a = 2; let b = 3; let c = a + b; return c;
        let program = Program {
            statements: vec![
                Stmt::var_decl("a", Some(Expr::number(2.0))),
                Stmt::var_decl("b", Some(Expr::number(3.0))),
                Stmt::var_decl(
                    "c",
                    Some(Expr::binary(
                        Operator::Add,
                        Expr::variable("a"),
                        Expr::variable("b"),
                    )),
                ),
                Stmt::ret(Some(Expr::variable("c"))),
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();

        assert_eq!(cfg.block_count(), 1);
        let entry = cfg.block(cfg.entry());
        assert_eq!(entry.instructions().len(), 5);
        assert_eq!(entry.instructions()[0].dst(), Some("a"));
        assert_eq!(entry.instructions()[2].dst(), Some("tmp_0"));
        assert!(matches!(
            entry.instructions()[4].kind(),
            InstrKind::Return {
                value: Some(Operand::Var(v)),
                is_implicit: false,
            } if v == "c"
        ));
        cfg.verify().unwrap();
    }

    #[test]
    fn test_literal_lowering_is_direct() {
        // Literals become immediate operands, not temporaries.
        let program = Program {
            statements: vec![Stmt::var_decl("a", Some(Expr::number(2.0)))],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        let entry = cfg.block(cfg.entry());
        assert!(matches!(
            entry.instructions()[0].kind(),
            InstrKind::Assign {
                src: Operand::Number(n),
                ..
            } if *n == 2.0
        ));
    }

    #[test]
    fn test_decl_without_init_emits_nothing() {
        let program = Program {
            statements: vec![
                Stmt::var_decl("x", None),
                Stmt::ret(Some(Expr::variable("x"))),
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        let entry = cfg.block(cfg.entry());
        assert_eq!(entry.instructions().len(), 1);
    }

    #[test]
    fn test_if_else_topology() {
        // let x; if (c) { x = 1; } else { x = 2; }
        let program = Program {
            statements: vec![
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
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        assert_eq!(names(&cfg), vec!["entry", "then_0", "else_0", "merge_0"]);

        let entry = cfg.block(cfg.entry());
        assert!(matches!(
            entry.terminator().unwrap().kind(),
            InstrKind::Branch { .. }
        ));
        let merge = BlockId::new(3);
        assert_eq!(cfg.block(merge).predecessors().len(), 2);
        cfg.verify().unwrap();
    }

    #[test]
    fn test_if_without_else_targets_merge() {
        let program = Program {
            statements: vec![
                Stmt::var_decl("c", Some(Expr::boolean(true))),
                Stmt::new(StmtKind::If {
                    condition: Expr::variable("c"),
                    then_branch: Box::new(Stmt::block(vec![])),
                    else_branch: None,
                }),
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        assert_eq!(names(&cfg), vec!["entry", "then_0", "merge_0"]);

        let InstrKind::Branch {
            true_target,
            false_target,
            ..
        } = cfg.block(cfg.entry()).terminator().unwrap().kind()
        else {
            panic!("expected branch");
        };
        assert_eq!(cfg.block(*true_target).name(), "then_0");
        assert_eq!(cfg.block(*false_target).name(), "merge_0");
    }

    #[test]
    fn test_while_topology() {
        // while (c) {}; an empty body still yields the full loop layout.
        let program = Program {
            statements: vec![
                Stmt::var_decl("c", Some(Expr::boolean(false))),
                Stmt::new(StmtKind::While {
                    condition: Expr::variable("c"),
                    body: Box::new(Stmt::block(vec![])),
                }),
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        assert_eq!(names(&cfg), vec!["entry", "cond_0", "body_0", "exit_0"]);

        let cond = BlockId::new(1);
        let body = BlockId::new(2);
        // Back edge from the body to the condition.
        assert_eq!(cfg.block(body).successors(), [cond]);
        assert_eq!(cfg.block(cond).predecessors(), [cfg.entry(), body]);
        cfg.verify().unwrap();
    }

    #[test]
    fn test_for_topology_and_continue_target() {
        // for (let i = 0; i < 10; i = i + 1) { continue; }
        let program = Program {
            statements: vec![Stmt::new(StmtKind::For {
                init: Some(Box::new(Stmt::var_decl("i", Some(Expr::number(0.0))))),
                condition: Some(Expr::binary(
                    Operator::Lt,
                    Expr::variable("i"),
                    Expr::number(10.0),
                )),
                increment: Some(Expr::assign(
                    "i",
                    Expr::binary(Operator::Add, Expr::variable("i"), Expr::number(1.0)),
                )),
                body: Box::new(Stmt::new(StmtKind::Continue)),
            })],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        assert_eq!(
            names(&cfg),
            vec![
                "entry",
                "cond_0",
                "body_0",
                "incr_0",
                "exit_0",
                "after_continue_0"
            ]
        );

        let cond = BlockId::new(1);
        let body = BlockId::new(2);
        let incr = BlockId::new(3);
        // continue jumps to the increment block, which loops back to cond.
        assert_eq!(cfg.block(body).successors(), [incr]);
        assert_eq!(cfg.block(incr).successors(), [cond]);
        cfg.verify().unwrap();
    }

    #[test]
    fn test_for_without_condition_jumps_to_body() {
        let program = Program {
            statements: vec![Stmt::new(StmtKind::For {
                init: None,
                condition: None,
                increment: None,
                body: Box::new(Stmt::new(StmtKind::Break)),
            })],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        let cond = BlockId::new(1);
        let body = BlockId::new(2);
        assert_eq!(cfg.block(cond).successors(), [body]);
        cfg.verify().unwrap();
    }

    #[test]
    fn test_break_outside_loop_fails() {
        let program = Program {
            statements: vec![Stmt::new(StmtKind::Break)],
        };
        assert!(matches!(
            CfgBuilder::build_program(&program),
            Err(Error::MalformedAst(_))
        ));
    }

    #[test]
    fn test_unbound_variable_fails() {
        let program = Program {
            statements: vec![Stmt::ret(Some(Expr::variable("ghost")))],
        };
        assert!(matches!(
            CfgBuilder::build_program(&program),
            Err(Error::UnboundVariable { name, .. }) if name == "ghost"
        ));
    }

    #[test]
    fn test_break_starts_unreachable_block() {
        // while (true) { break; let y = 1; }
        let program = Program {
            statements: vec![Stmt::new(StmtKind::While {
                condition: Expr::boolean(true),
                body: Box::new(Stmt::block(vec![
                    Stmt::new(StmtKind::Break),
                    Stmt::var_decl("y", Some(Expr::number(1.0))),
                ])),
            })],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        let after_break = cfg
            .block_ids()
            .find(|&id| cfg.block(id).name() == "after_break_0")
            .unwrap();
        assert!(cfg.block(after_break).predecessors().is_empty());
        assert_eq!(cfg.block(after_break).instructions()[0].dst(), Some("y"));
        cfg.verify().unwrap();
    }

    #[test]
    fn test_implicit_return_appended() {
        let program = Program {
            statements: vec![Stmt::var_decl("a", Some(Expr::number(1.0)))],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        assert!(matches!(
            cfg.block(cfg.entry()).terminator().unwrap().kind(),
            InstrKind::Return {
                value: None,
                is_implicit: true,
            }
        ));
    }

    #[test]
    fn test_short_circuit_and() {
        // let a = true; let b = false; let r = a && b;
        let program = Program {
            statements: vec![
                Stmt::var_decl("a", Some(Expr::boolean(true))),
                Stmt::var_decl("b", Some(Expr::boolean(false))),
                Stmt::var_decl(
                    "r",
                    Some(Expr::binary(
                        Operator::And,
                        Expr::variable("a"),
                        Expr::variable("b"),
                    )),
                ),
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        assert_eq!(names(&cfg), vec!["entry", "and_rhs_0", "and_merge_0"]);

        // Both the entry and the rhs block write the shared temporary.
        let writes: Vec<_> = cfg
            .block_ids()
            .flat_map(|id| cfg.block(id).instructions())
            .filter(|i| i.dst() == Some("tmp_0"))
            .collect();
        assert_eq!(writes.len(), 2);

        // No phi yet: that is SSA construction's job.
        assert!(cfg
            .blocks()
            .iter()
            .all(|b| b.instructions().iter().all(|i| !i.is_phi())));
        cfg.verify().unwrap();
    }

    #[test]
    fn test_member_access_lowering() {
        let program = Program {
            statements: vec![
                Stmt::var_decl("o", Some(Expr::new(ExprKind::Object(vec![])))),
                Stmt::var_decl("v", Some(Expr::member(Expr::variable("o"), "field"))),
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        let entry = cfg.block(cfg.entry());
        assert!(entry.instructions().iter().any(|i| matches!(
            i.kind(),
            InstrKind::Binary {
                op: Operator::Member,
                right: Operand::Str(prop),
                ..
            } if prop == "field"
        )));
    }

    #[test]
    fn test_function_decl_placeholder() {
        let program = Program {
            statements: vec![Stmt::new(StmtKind::FunctionDecl(FunctionDecl {
                name: "f".to_string(),
                params: vec![],
                body: vec![],
                position: SourcePosition::UNKNOWN,
            }))],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        assert!(matches!(
            cfg.block(cfg.entry()).instructions()[0].kind(),
            InstrKind::Assign {
                dst,
                src: Operand::Var(src),
            } if dst == "f" && src == "function_object"
        ));
    }

    #[test]
    fn test_build_function_param_prologue() {
        let func = FunctionDecl {
            name: "add".to_string(),
            params: vec!["a".to_string(), "b".to_string()],
            body: vec![Stmt::ret(Some(Expr::binary(
                Operator::Add,
                Expr::variable("a"),
                Expr::variable("b"),
            )))],
            position: SourcePosition::UNKNOWN,
        };
        let cfg = CfgBuilder::build_function(&func).unwrap();
        let entry = cfg.block(cfg.entry());
        assert!(matches!(
            entry.instructions()[0].kind(),
            InstrKind::Assign { dst, src: Operand::Var(src) } if dst == "a" && src == "param_a"
        ));
        assert!(matches!(
            entry.instructions()[1].kind(),
            InstrKind::Assign { dst, src: Operand::Var(src) } if dst == "b" && src == "param_b"
        ));
    }

    #[test]
    fn test_call_lowering_literal_args() {
        let program = Program {
            statements: vec![
                Stmt::new(StmtKind::FunctionDecl(FunctionDecl {
                    name: "f".to_string(),
                    params: vec![],
                    body: vec![],
                    position: SourcePosition::UNKNOWN,
                })),
                Stmt::expression(Expr::call(
                    Expr::variable("f"),
                    vec![
                        Expr::number(1.0),
                        Expr::new(ExprKind::Literal(Literal::Str("s".to_string()))),
                    ],
                )),
            ],
        };
        let cfg = CfgBuilder::build_program(&program).unwrap();
        let entry = cfg.block(cfg.entry());
        assert!(entry.instructions().iter().any(|i| matches!(
            i.kind(),
            InstrKind::Call { args, .. }
                if args == &[Operand::Number(1.0), Operand::Str("s".to_string())]
        )));
    }
}
