//! Dataflow analyses over the control flow graph.
//!
//! The framework is split into three pieces:
//!
//! - [`MeetSemiLattice`] — the value domain with its meet operation
//! - [`DataFlowAnalysis`] — direction, boundary values and the transfer
//!   function of one concrete analysis
//! - [`DataFlowSolver`] — the worklist iteration to a fixpoint
//!
//! # Analyses provided
//!
//! - [`LiveVariables`] — which variables are still needed (backward, ∪)
//! - [`ReachingDefinitions`] — which definitions may reach (forward, ∪)
//! - [`AvailableExpressions`] — which computations are reusable
//!   (forward, ∩)
//! - [`ConstantPropagation`] — which variables hold known constants
//!   (forward, pointwise meet)
//! - [`DeadCode`] — unused-definition detection over liveness results
//!
//! All analyses operate on SSA form, where definitions are identified by
//! their qualified `name#k` spelling.
//!
//! # Example
//!
//! ```rust,ignore
//! use jsmir::dataflow::{ConstantPropagation, DataFlowSolver};
//!
//! let mut solver = DataFlowSolver::new(ConstantPropagation);
//! let results = solver.solve(&cfg)?;
//! let exit_values = results.out_state(cfg.entry());
//! ```

mod available;
mod constants;
mod deadcode;
mod framework;
mod lattice;
mod liveness;
mod reaching;
mod solver;

pub use available::{AvailSet, AvailableExpressions, CanonicalExpr};
pub use constants::{ConstMap, ConstValue, ConstantPropagation};
pub use deadcode::DeadCode;
pub use framework::{AnalysisResults, DataFlowAnalysis, Direction};
pub use lattice::MeetSemiLattice;
pub use liveness::{LiveSet, LiveVariables};
pub use reaching::{DefSite, ReachingDefinitions, ReachingDefs};
pub use solver::DataFlowSolver;
