//! The control flow graph.
//!
//! A [`ControlFlowGraph`] owns its blocks in an arena addressed by
//! [`BlockId`]; the first block created is the entry. All cross-block
//! references (edges, branch targets, phi sources) are indices, so the graph
//! cycles of a loop never create ownership cycles. The whole graph is
//! released together.
//!
//! The graph keeps predecessor/successor lists as mirror images: edges are
//! only ever created through [`ControlFlowGraph::add_terminator`], which
//! derives them from the branch or jump being appended.

use std::fmt::{self, Write as _};

use crate::{
    ir::{BasicBlock, BlockId, InstrKind, Instruction},
    utils::{escape_dot, BitSet},
    Result,
};

/// A control flow graph for one function.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Creates a new block and returns its id. The first block created is
    /// the entry block.
    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(name));
        id
    }

    /// Returns the entry block id.
    #[must_use]
    pub fn entry(&self) -> BlockId {
        BlockId::new(0)
    }

    /// Returns the block with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this graph.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// Returns the block with the given id, mutably.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// Returns all blocks in creation order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns mutable access to all blocks.
    pub fn blocks_mut(&mut self) -> &mut [BasicBlock] {
        &mut self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterates over all block ids in creation order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId::new)
    }

    /// Appends a non-terminator instruction to a block.
    pub fn add_instruction(&mut self, block: BlockId, instr: Instruction) {
        self.block_mut(block).push_instruction(instr);
    }

    /// Appends a terminator to a block and mirrors the edges it implies.
    ///
    /// A no-op when the block already terminates. Branch edges are appended
    /// true target first, then false target; jump edges in target order.
    pub fn add_terminator(&mut self, block: BlockId, terminator: Instruction) {
        if self.block(block).has_terminator() {
            return;
        }
        debug_assert!(terminator.is_terminator());

        match terminator.kind() {
            InstrKind::Branch {
                true_target,
                false_target,
                ..
            } => {
                let (t, f) = (*true_target, *false_target);
                self.block_mut(block).push_instruction(terminator);
                self.connect(block, t);
                self.connect(block, f);
            }
            InstrKind::Jump { target } => {
                let target = *target;
                self.block_mut(block).push_instruction(terminator);
                self.connect(block, target);
            }
            _ => {
                self.block_mut(block).push_instruction(terminator);
            }
        }
    }

    fn connect(&mut self, from: BlockId, to: BlockId) {
        self.block_mut(from).add_successor(to);
        self.block_mut(to).add_predecessor(from);
    }

    /// Returns the blocks that leave the function: return blocks and blocks
    /// with no successors.
    #[must_use]
    pub fn exit_blocks(&self) -> Vec<BlockId> {
        self.block_ids()
            .filter(|&id| {
                let block = self.block(id);
                block.successors().is_empty()
                    || matches!(
                        block.terminator().map(Instruction::kind),
                        Some(InstrKind::Return { .. })
                    )
            })
            .collect()
    }

    /// Returns the set of blocks reachable from the entry.
    #[must_use]
    pub fn reachable(&self) -> BitSet {
        let mut seen = BitSet::new(self.blocks.len());
        if self.blocks.is_empty() {
            return seen;
        }
        let mut stack = vec![self.entry()];
        seen.insert(self.entry().index());
        while let Some(block) = stack.pop() {
            for &succ in self.block(block).successors() {
                if !seen.contains(succ.index()) {
                    seen.insert(succ.index());
                    stack.push(succ);
                }
            }
        }
        seen
    }

    /// Returns reachable blocks in postorder of a depth-first walk from the
    /// entry, visiting successors in edge order.
    #[must_use]
    pub fn postorder(&self) -> Vec<BlockId> {
        let mut order = Vec::with_capacity(self.blocks.len());
        if self.blocks.is_empty() {
            return order;
        }
        let mut visited = vec![false; self.blocks.len()];
        let mut stack = vec![(self.entry(), 0usize)];
        visited[self.entry().index()] = true;

        while let Some((block, idx)) = stack.pop() {
            let succs = self.block(block).successors();
            if idx < succs.len() {
                stack.push((block, idx + 1));
                let next = succs[idx];
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    stack.push((next, 0));
                }
            } else {
                order.push(block);
            }
        }
        order
    }

    /// Returns reachable blocks in reverse postorder: the preferred
    /// iteration order for forward dataflow analyses.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut order = self.postorder();
        order.reverse();
        order
    }

    /// Returns `true` if `a` dominates `b` (every path from entry to `b`
    /// passes through `a`). Requires dominance to be computed.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut runner = self.block(b).idom();
        while let Some(r) = runner {
            if r == a {
                return true;
            }
            runner = self.block(r).idom();
        }
        false
    }

    /// Returns the blocks whose immediate dominator is `block`, in index
    /// order.
    #[must_use]
    pub fn dominator_children(&self, block: BlockId) -> Vec<BlockId> {
        self.block_ids()
            .filter(|&id| self.block(id).idom() == Some(block))
            .collect()
    }

    /// Checks the structural invariants of the graph and returns
    /// [`crate::Error::InconsistentCfg`] on the first violation:
    ///
    /// - predecessor and successor lists mirror each other
    /// - at most one terminator per block, always last, and present whenever
    ///   the block has successors
    /// - terminator targets agree with the successor list
    /// - phis form a prefix of their block and match its predecessor arity
    pub fn verify(&self) -> Result<()> {
        for id in self.block_ids() {
            let block = self.block(id);

            for &succ in block.successors() {
                if succ.index() >= self.blocks.len() {
                    return Err(inconsistent_cfg!(
                        "block `{}` has out-of-range successor {succ}",
                        block.name()
                    ));
                }
                if !self.block(succ).predecessors().contains(&id) {
                    return Err(inconsistent_cfg!(
                        "edge `{}` -> `{}` has no predecessor mirror",
                        block.name(),
                        self.block(succ).name()
                    ));
                }
            }
            for &pred in block.predecessors() {
                if pred.index() >= self.blocks.len()
                    || !self.block(pred).successors().contains(&id)
                {
                    return Err(inconsistent_cfg!(
                        "predecessor `{}` of `{}` has no successor mirror",
                        self.block(pred).name(),
                        block.name()
                    ));
                }
            }

            let instrs = block.instructions();
            for (i, instr) in instrs.iter().enumerate() {
                if instr.is_terminator() && i + 1 != instrs.len() {
                    return Err(inconsistent_cfg!(
                        "block `{}` has a terminator before its last instruction",
                        block.name()
                    ));
                }
            }
            if !block.successors().is_empty() && !block.has_terminator() {
                return Err(inconsistent_cfg!(
                    "block `{}` has successors but no terminator",
                    block.name()
                ));
            }
            match block.terminator().map(Instruction::kind) {
                Some(InstrKind::Branch {
                    true_target,
                    false_target,
                    ..
                }) => {
                    if block.successors() != [*true_target, *false_target] {
                        return Err(inconsistent_cfg!(
                            "branch targets of `{}` disagree with its successors",
                            block.name()
                        ));
                    }
                }
                Some(InstrKind::Jump { target }) => {
                    if block.successors() != [*target] {
                        return Err(inconsistent_cfg!(
                            "jump target of `{}` disagrees with its successors",
                            block.name()
                        ));
                    }
                }
                Some(InstrKind::Return { .. }) | None => {
                    if !block.successors().is_empty() {
                        return Err(inconsistent_cfg!(
                            "block `{}` falls off the end but has successors",
                            block.name()
                        ));
                    }
                }
                _ => {}
            }

            let phi_prefix = block.phi_count();
            for (i, instr) in instrs.iter().enumerate() {
                if instr.is_phi() {
                    if i >= phi_prefix {
                        return Err(inconsistent_cfg!(
                            "phi after non-phi instruction in block `{}`",
                            block.name()
                        ));
                    }
                    if let InstrKind::Phi { dst, sources } = instr.kind() {
                        if sources.len() != block.predecessors().len() {
                            return Err(inconsistent_cfg!(
                                "phi for `{dst}` in `{}` has {} sources for {} predecessors",
                                block.name(),
                                sources.len(),
                                block.predecessors().len()
                            ));
                        }
                        for (slot, (pred, _)) in sources.iter().enumerate() {
                            if block.predecessors()[slot] != *pred {
                                return Err(inconsistent_cfg!(
                                    "phi for `{dst}` in `{}` pairs slot {slot} with the wrong predecessor",
                                    block.name()
                                ));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Renders the graph in DOT format for Graphviz.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();
        dot.push_str("digraph cfg {\n");
        if let Some(title) = title {
            let _ = writeln!(dot, "    label=\"{}\";", escape_dot(title));
            dot.push_str("    labelloc=t;\n");
        }
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for id in self.block_ids() {
            let block = self.block(id);
            let mut label = format!("{}:\\l", block.name());
            for instr in block.instructions() {
                label.push_str("  ");
                label.push_str(&escape_dot(&instr.display(self).to_string()));
                label.push_str("\\l");
            }
            let _ = writeln!(dot, "    \"{}\" [label=\"{label}\"];", block.name());
        }
        dot.push('\n');
        for id in self.block_ids() {
            for &succ in self.block(id).successors() {
                let _ = writeln!(
                    dot,
                    "    \"{}\" -> \"{}\";",
                    self.block(id).name(),
                    self.block(succ).name()
                );
            }
        }
        dot.push_str("}\n");
        dot
    }

    fn write_name_list(
        &self,
        f: &mut fmt::Formatter<'_>,
        label: &str,
        ids: &[BlockId],
    ) -> fmt::Result {
        write!(f, "  // {label}:")?;
        for (i, &id) in ids.iter().enumerate() {
            if i == 0 {
                write!(f, " {}", self.block(id).name())?;
            } else {
                write!(f, ", {}", self.block(id).name())?;
            }
        }
        writeln!(f)
    }
}

impl fmt::Display for ControlFlowGraph {
    /// The stable textual dump used by golden-file tests: one section per
    /// block with predecessor/successor comments, one instruction per line,
    /// and the dominance frontier when it has been computed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.block_ids().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let block = self.block(id);
            writeln!(f, "{}:", block.name())?;
            self.write_name_list(f, "Predecessors", block.predecessors())?;
            for instr in block.instructions() {
                writeln!(f, "  {}", instr.display(self))?;
            }
            self.write_name_list(f, "Successors", block.successors())?;
            if !block.dominance_frontier().is_empty() {
                self.write_name_list(f, "Dominance frontier", block.dominance_frontier())?;
            }
        }
        Ok(())
    }
}
