//! The lattice trait for dataflow values.
//!
//! Every analysis value forms a meet semi-lattice: a partial order with a
//! greatest-lower-bound operation used to combine values where control flow
//! merges. The solver only ever needs `meet` and equality; fixpoint
//! termination comes from the lattices being finite and the transfer
//! functions monotone.

use std::fmt::Debug;

/// A meet semi-lattice.
///
/// `meet` must be idempotent, commutative and associative. For a *may*
/// analysis (live variables, reaching definitions) meet is set union; for a
/// *must* analysis (available expressions) it is intersection; the constant
/// lattice meets pointwise.
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Computes the greatest lower bound of two values.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;

    /// Returns `true` for the bottom element, the value no meet can lower
    /// further.
    fn is_bottom(&self) -> bool;
}
