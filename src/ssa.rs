//! Conversion to static single assignment form.
//!
//! Runs on a CFG whose dominance information is current (the transformer
//! recomputes it). Two phases:
//!
//! 1. **Phi placement.** For every variable with a definition, a worklist of
//!    its defining blocks pushes phis into dominance frontiers until closure.
//!    The phis carry placeholder sources (the bare variable name), one per
//!    predecessor, in predecessor order.
//! 2. **Renaming.** A depth-first walk of the dominator tree carries a stack
//!    of live versions per variable. Uses are rewritten in place to the
//!    qualified `name#k` spelling, definitions record their fresh version in
//!    the instruction's version slot, and each block fills its successors'
//!    phi slots with the version live on the incoming edge.
//!
//! Version counters are per-variable and start at 0, so the first definition
//! of `x` becomes `x#0`. Operands naming symbols with no definition anywhere
//! (`function_object`, `param_*`) are left untouched; a use of a variable
//! that *has* definitions but no live version means the use is not dominated
//! by any definition and fails with [`crate::Error::InconsistentCfg`].

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashMap;

use crate::{
    ir::{BlockId, ControlFlowGraph, InstrKind, Instruction, Operand},
    Result,
};

/// Transforms a control flow graph into pruned SSA form.
pub struct SsaTransformer;

impl SsaTransformer {
    /// Converts `cfg` to SSA form in place.
    ///
    /// Dominators and dominance frontiers are (re)computed first, so the
    /// graph's per-block dominance results are current afterwards.
    ///
    /// # Errors
    ///
    /// [`crate::Error::InconsistentCfg`] when a phi's arity disagrees with
    /// its block's predecessor count, or when renaming finds a use with no
    /// dominating definition.
    pub fn transform(cfg: &mut ControlFlowGraph) -> Result<()> {
        cfg.compute_dominance();
        cfg.compute_dominance_frontiers();

        let variables = Self::defined_variables(cfg);
        Self::place_phis(cfg, &variables);
        Self::rename(cfg, &variables)
    }

    /// Collects every variable with a definition, sorted for reproducible
    /// phi order and version assignment.
    fn defined_variables(cfg: &ControlFlowGraph) -> Vec<String> {
        let mut variables = BTreeSet::new();
        for block in cfg.blocks() {
            for instr in block.instructions() {
                if let Some(dst) = instr.dst() {
                    variables.insert(dst.to_string());
                }
            }
        }
        variables.into_iter().collect()
    }

    /// Inserts phis for `var` into the iterated dominance frontier of its
    /// definition sites.
    fn place_phis(cfg: &mut ControlFlowGraph, variables: &[String]) {
        for var in variables {
            let def_blocks: Vec<BlockId> = cfg
                .block_ids()
                .filter(|&id| {
                    cfg.block(id)
                        .instructions()
                        .iter()
                        .any(|instr| instr.dst() == Some(var))
                })
                .collect();

            let mut has_def: Vec<bool> = vec![false; cfg.block_count()];
            for &block in &def_blocks {
                has_def[block.index()] = true;
            }
            let mut has_phi = vec![false; cfg.block_count()];
            let mut worklist: VecDeque<BlockId> = def_blocks.into();

            while let Some(block) = worklist.pop_front() {
                for df in cfg.block(block).dominance_frontier().to_vec() {
                    if has_phi[df.index()] {
                        continue;
                    }
                    let sources: Vec<(BlockId, Operand)> = cfg
                        .block(df)
                        .predecessors()
                        .iter()
                        .map(|&pred| (pred, Operand::Var(var.clone())))
                        .collect();
                    cfg.block_mut(df).instructions_mut().insert(
                        0,
                        Instruction::new(InstrKind::Phi {
                            dst: var.clone(),
                            sources,
                        }),
                    );
                    has_phi[df.index()] = true;

                    if !has_def[df.index()] {
                        has_def[df.index()] = true;
                        worklist.push_back(df);
                    }
                }
            }
        }
    }

    fn rename(cfg: &mut ControlFlowGraph, variables: &[String]) -> Result<()> {
        // Arity check up front: every phi must pair with its block's
        // predecessors one to one.
        for id in cfg.block_ids() {
            let block = cfg.block(id);
            for instr in block.phis() {
                if let InstrKind::Phi { dst, sources } = instr.kind() {
                    if sources.len() != block.predecessors().len() {
                        return Err(inconsistent_cfg!(
                            "phi for `{dst}` in `{}` has {} sources for {} predecessors",
                            block.name(),
                            sources.len(),
                            block.predecessors().len()
                        ));
                    }
                }
            }
        }

        let universe: BTreeSet<&str> = variables.iter().map(String::as_str).collect();
        let mut counters: FxHashMap<String, u32> = FxHashMap::default();
        let mut stacks: FxHashMap<String, Vec<u32>> = FxHashMap::default();
        let entry = cfg.entry();
        Self::rename_block(cfg, entry, &universe, &mut counters, &mut stacks)
    }

    fn rename_block(
        cfg: &mut ControlFlowGraph,
        block: BlockId,
        universe: &BTreeSet<&str>,
        counters: &mut FxHashMap<String, u32>,
        stacks: &mut FxHashMap<String, Vec<u32>>,
    ) -> Result<()> {
        let mut pushed: Vec<String> = Vec::new();
        let block_name = cfg.block(block).name().to_string();

        for idx in 0..cfg.block(block).instructions().len() {
            let instr = &mut cfg.block_mut(block).instructions_mut()[idx];

            if instr.is_phi() {
                // Phi destinations get their version on block entry; the
                // sources belong to the predecessors and are filled from
                // there.
                let dst = instr.dst().expect("phi defines a variable").to_string();
                let version = next_version(counters, &dst);
                instr.set_version(version);
                stacks.entry(dst.clone()).or_default().push(version);
                pushed.push(dst);
                continue;
            }

            // Uses first, with the versions live above this instruction.
            let mut unversioned: Option<String> = None;
            instr.for_each_operand_mut(|op| {
                if let Operand::Var(name) = op {
                    if universe.contains(name.as_str()) {
                        match stacks.get(name.as_str()).and_then(|s| s.last()) {
                            Some(version) => *name = format!("{name}#{version}"),
                            None => {
                                if unversioned.is_none() {
                                    unversioned = Some(name.clone());
                                }
                            }
                        }
                    }
                }
            });
            if let Some(name) = unversioned {
                return Err(inconsistent_cfg!(
                    "use of `{name}` in `{block_name}` has no dominating definition"
                ));
            }

            // Then the definition, shadowing for the rest of the subtree.
            if let Some(dst) = instr.dst().map(str::to_string) {
                let version = next_version(counters, &dst);
                instr.set_version(version);
                stacks.entry(dst.clone()).or_default().push(version);
                pushed.push(dst);
            }
        }

        // Fill the phi slot for the edge `block -> succ` in every successor.
        for succ in cfg.block(block).successors().to_vec() {
            let Some(pred_index) = cfg
                .block(succ)
                .predecessors()
                .iter()
                .position(|&p| p == block)
            else {
                return Err(inconsistent_cfg!(
                    "edge `{block_name}` -> `{}` has no predecessor mirror",
                    cfg.block(succ).name()
                ));
            };

            for instr in cfg.block_mut(succ).instructions_mut().iter_mut() {
                if !instr.is_phi() {
                    break;
                }
                if let InstrKind::Phi { dst, sources } = instr.kind_mut() {
                    if let Some(version) = stacks.get(dst.as_str()).and_then(|s| s.last()) {
                        sources[pred_index].1 = Operand::Var(format!("{dst}#{version}"));
                    }
                    // No live version: the value never reaches this edge
                    // (an unreachable or undefined path); the placeholder
                    // stays.
                }
            }
        }

        for child in cfg.dominator_children(block) {
            Self::rename_block(cfg, child, universe, counters, stacks)?;
        }

        for name in pushed.into_iter().rev() {
            stacks
                .get_mut(&name)
                .and_then(Vec::pop)
                .expect("version stack underflow");
        }

        Ok(())
    }
}

fn next_version(counters: &mut FxHashMap<String, u32>, var: &str) -> u32 {
    let counter = counters.entry(var.to_string()).or_insert(0);
    let version = *counter;
    *counter += 1;
    version
}
