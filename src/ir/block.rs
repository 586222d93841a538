//! Basic blocks.
//!
//! A basic block is a named, ordered instruction sequence with at most one
//! terminator, always last. Blocks reference each other by [`BlockId`]
//! indices into the owning [`crate::ir::ControlFlowGraph`]; the predecessor
//! and successor lists are kept as mirror images by the graph's edge
//! operations.
//!
//! Dominator computation stores its per-block results here: the immediate
//! dominator and the dominance frontier.

use std::fmt;

use crate::ir::Instruction;

/// Index of a basic block within its control flow graph.
///
/// Blocks are arena-allocated by the graph and addressed by index, so edges
/// and phi source references never carry ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    /// Creates a block id from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A basic block: name, instructions, mirrored edge lists and dominance
/// results.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    name: String,
    instructions: Vec<Instruction>,
    predecessors: Vec<BlockId>,
    successors: Vec<BlockId>,
    idom: Option<BlockId>,
    dominance_frontier: Vec<BlockId>,
}

impl BasicBlock {
    /// Creates an empty block with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
            idom: None,
            dominance_frontier: Vec::new(),
        }
    }

    /// Returns the block name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instruction sequence.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns mutable access to the instruction sequence.
    ///
    /// Callers must keep the block invariants: at most one terminator,
    /// always last, and phis before every non-phi.
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Returns `true` if the block has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the predecessor blocks, in edge insertion order.
    #[must_use]
    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    /// Returns the successor blocks, in edge insertion order. For a branch
    /// terminator the true target comes first.
    #[must_use]
    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }

    /// Returns `true` if the block is non-empty and ends in a terminator.
    #[must_use]
    pub fn has_terminator(&self) -> bool {
        self.instructions
            .last()
            .is_some_and(Instruction::is_terminator)
    }

    /// Returns the terminator instruction, if the block ends in one.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    /// Iterates over the leading phi instructions.
    pub fn phis(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().take_while(|i| i.is_phi())
    }

    /// Returns the number of leading phi instructions.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.phis().count()
    }

    /// Returns the immediate dominator, or `None` for the entry block (and
    /// for unreachable blocks, which no block dominates).
    #[must_use]
    pub const fn idom(&self) -> Option<BlockId> {
        self.idom
    }

    /// Returns the dominance frontier, sorted by block index.
    #[must_use]
    pub fn dominance_frontier(&self) -> &[BlockId] {
        &self.dominance_frontier
    }

    pub(crate) fn push_instruction(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    pub(crate) fn add_predecessor(&mut self, pred: BlockId) {
        self.predecessors.push(pred);
    }

    pub(crate) fn add_successor(&mut self, succ: BlockId) {
        self.successors.push(succ);
    }

    pub(crate) fn set_idom(&mut self, idom: Option<BlockId>) {
        self.idom = idom;
    }

    pub(crate) fn set_dominance_frontier(&mut self, frontier: Vec<BlockId>) {
        self.dominance_frontier = frontier;
    }
}
