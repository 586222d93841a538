//! Dominator computation.
//!
//! The classical iterative set algorithm: every reachable non-entry block
//! starts with the full block set as its dominators and the sets shrink by
//! intersection over predecessors until nothing changes. Immediate
//! dominators fall out as the unique dominator that dominates no other
//! dominator of the block, and dominance frontiers come from walking each
//! join-point predecessor up the idom chain.
//!
//! Unreachable blocks (the builder creates them after `break`/`continue`)
//! never take part in the intersection: a dominator set must only reflect
//! paths from the entry, and an unreachable predecessor contributes no such
//! path. They end up with no immediate dominator and are skipped by the SSA
//! rename walk.

use crate::{
    ir::{BlockId, ControlFlowGraph},
    utils::BitSet,
};

impl ControlFlowGraph {
    /// Computes immediate dominators for every block and stores them on the
    /// blocks. The entry block and unreachable blocks get `None`.
    ///
    /// Recomputing on an unchanged graph reproduces identical results.
    pub fn compute_dominance(&mut self) {
        let n = self.block_count();
        if n == 0 {
            return;
        }

        let reachable = self.reachable();
        let entry = self.entry().index();

        // dom[b] = set of blocks dominating b.
        let mut dom: Vec<BitSet> = (0..n)
            .map(|i| {
                if i == entry || !reachable.contains(i) {
                    let mut set = BitSet::new(n);
                    set.insert(i);
                    set
                } else {
                    BitSet::full(n)
                }
            })
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            for b in 0..n {
                if b == entry || !reachable.contains(b) {
                    continue;
                }

                let mut new_dom: Option<BitSet> = None;
                for &pred in self.block(BlockId::new(b)).predecessors() {
                    if !reachable.contains(pred.index()) {
                        continue;
                    }
                    match &mut new_dom {
                        None => new_dom = Some(dom[pred.index()].clone()),
                        Some(acc) => acc.intersect_with(&dom[pred.index()]),
                    }
                }
                let mut new_dom = new_dom.unwrap_or_else(|| BitSet::new(n));
                new_dom.insert(b);

                if new_dom != dom[b] {
                    dom[b] = new_dom;
                    changed = true;
                }
            }
        }

        // idom(b): the dominator of b that strictly dominates no other
        // dominator of b, i.e. the closest one.
        for b in 0..n {
            let id = BlockId::new(b);
            if b == entry || !reachable.contains(b) {
                self.block_mut(id).set_idom(None);
                continue;
            }

            let candidates: Vec<usize> = dom[b].iter().filter(|&c| c != b).collect();
            let idom = candidates
                .iter()
                .copied()
                .find(|&c| {
                    candidates
                        .iter()
                        .all(|&other| other == c || !dom[other].contains(c))
                })
                .map(BlockId::new);
            self.block_mut(id).set_idom(idom);
        }
    }

    /// Computes the dominance frontier of every block and stores it on the
    /// blocks, sorted by block index. Requires [`Self::compute_dominance`]
    /// to have run.
    ///
    /// A block lands in the frontier of every block on the idom chain from a
    /// join-point predecessor up to (but excluding) the join point's own
    /// immediate dominator.
    pub fn compute_dominance_frontiers(&mut self) {
        let n = self.block_count();
        let mut frontiers: Vec<Vec<BlockId>> = vec![Vec::new(); n];

        for b in self.block_ids() {
            let preds = self.block(b).predecessors();
            if preds.len() < 2 {
                continue;
            }
            let idom_b = self.block(b).idom();

            for &pred in preds {
                let mut runner = Some(pred);
                while runner != idom_b {
                    let Some(r) = runner else { break };
                    if !frontiers[r.index()].contains(&b) {
                        frontiers[r.index()].push(b);
                    }
                    runner = self.block(r).idom();
                }
            }
        }

        for (i, mut frontier) in frontiers.into_iter().enumerate() {
            frontier.sort_unstable();
            self.block_mut(BlockId::new(i)).set_dominance_frontier(frontier);
        }
    }
}
