#![deny(missing_docs)]

//! # jsmir
//!
//! The middle-end of an ahead-of-time JavaScript compiler: it lowers a
//! parsed AST into a control flow graph of three-address instructions,
//! rewrites the graph into SSA form, runs a family of monotone dataflow
//! analyses over it, and applies three classical optimizations: constant
//! propagation with folding, common-subexpression elimination, and
//! dead-code elimination.
//!
//! Parsing sits in front of this crate and code generation behind it; the
//! crate itself reads no files, consults no environment, and runs entirely
//! on the calling thread.
//!
//! # Pipeline
//!
//! ```text
//! AST ──▶ CfgBuilder ──▶ ControlFlowGraph ──▶ dominators ──▶ SsaTransformer
//!                                                                 │
//!                         optimized CFG ◀── opt passes ◀── dataflow analyses
//! ```
//!
//! - [`ast`] — the input tree handed over by the parser
//! - [`builder`] — AST → CFG lowering
//! - [`ir`] — instructions, blocks, the graph arena and dominance
//! - [`ssa`] — phi placement and renaming
//! - [`dataflow`] — the fixpoint framework and the analyses
//! - [`opt`] — the transformation passes
//!
//! # Example
//!
//! ```rust
//! use jsmir::{ast::{Expr, Program, Stmt}, builder::CfgBuilder, opt, ssa::SsaTransformer};
//!
//! // let a = 2; let b = 3; return a + b;
//! let program = Program {
//!     statements: vec![
//!         Stmt::var_decl("a", Some(Expr::number(2.0))),
//!         Stmt::var_decl("b", Some(Expr::number(3.0))),
//!         Stmt::ret(Some(Expr::binary(
//!             jsmir::ir::Operator::Add,
//!             Expr::variable("a"),
//!             Expr::variable("b"),
//!         ))),
//!     ],
//! };
//!
//! let mut cfg = CfgBuilder::build_program(&program)?;
//! SsaTransformer::transform(&mut cfg)?;
//! opt::optimize(&mut cfg)?;
//!
//! assert!(cfg.to_string().contains("return 5;"));
//! # Ok::<(), jsmir::Error>(())
//! ```
//!
//! # Errors
//!
//! Every failure surfaces as a [`Error`]; all are fatal for the current
//! compilation unit. See [`Error`] for the catalogue.

#[macro_use]
mod error;

pub mod ast;
pub mod builder;
pub mod dataflow;
pub mod ir;
pub mod opt;
pub mod position;
pub mod prelude;
pub mod ssa;
pub mod utils;

pub use error::Error;

/// Crate-wide result type: every fallible operation returns this.
pub type Result<T> = std::result::Result<T, Error>;
