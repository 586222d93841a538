//! Small shared utilities: a dense bit set for dataflow sets and DOT
//! escaping for graph dumps.

mod bitset;
mod dot;

pub use bitset::BitSet;
pub use dot::escape_dot;
