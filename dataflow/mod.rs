// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Generic set-based data-flow analysis over the register IR.
//!
//! An analysis is described by a per-op transfer function returning gen
//! and kill sets ("gen" elements become true after the op, "kill"
//! elements become false), a direction, and a lattice kind: a *may*
//! analysis meets incoming edges with union, a *must* analysis with
//! intersection. The engine composes per-op transfers into per-block
//! transfers, iterates a worklist to a fixed point, and then replays the
//! per-op transfers to record the analysis value before and after every
//! op position.
//!
//! Both lattices are finite power sets and the transfer functions are
//! monotone bit-vector style, so the iteration always terminates and the
//! fixed point is the meet-over-all-paths solution.

pub mod impls;

use std::hash::Hash;

use either::Either;
use fnv::{FnvHashMap, FnvHashSet};

use crate::cfg::Cfg;
use crate::repr::{Block, BlockData, Op};

/// Which way facts flow.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Direction {
    Forward,
    Backward,
}

/// How facts from multiple incoming edges are combined.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Lattice {
    /// Union meet: a fact holds if it holds along some path.
    Maybe,
    /// Intersection meet: a fact holds only if it holds along all paths.
    Must,
}

pub type GenAndKill<T> = (FnvHashSet<T>, FnvHashSet<T>);

/// The per-op transfer function of one analysis.
pub trait AnalysisVisitor<T> {
    fn gen_kill(&self, op: &Op) -> GenAndKill<T>;
}

/// Analysis values keyed by op position.
pub type AnalysisDict<T> = FnvHashMap<(Block, usize), FnvHashSet<T>>;

/// The result of a data-flow analysis: the set of facts in force
/// immediately before and immediately after every op.
pub struct AnalysisResult<T> {
    pub before: AnalysisDict<T>,
    pub after: AnalysisDict<T>,
}

fn transfer<T: Copy + Eq + Hash>(
    set: &mut FnvHashSet<T>,
    gen: &FnvHashSet<T>,
    kill: &FnvHashSet<T>,
) {
    set.retain(|e| !kill.contains(e));
    set.extend(gen.iter().copied());
}

fn ops_in_order(block: &BlockData, direction: Direction) -> impl Iterator<Item = &Op> {
    match direction {
        Direction::Forward => Either::Left(block.ops.iter()),
        Direction::Backward => Either::Right(block.ops.iter().rev()),
    }
}

/// Run a general set-based data-flow analysis to a fixed point.
///
/// `initial` is the analysis value at the entry point (forward) or at
/// every exit point (backward). `universe` is the set of all possible
/// elements and is required for a must analysis, whose iteration narrows
/// down from it; a may analysis starts from the empty set and ignores it.
pub fn run_analysis<T: Copy + Eq + Hash>(
    blocks: &[BlockData],
    cfg: &Cfg,
    visitor: &dyn AnalysisVisitor<T>,
    initial: &FnvHashSet<T>,
    direction: Direction,
    lattice: Lattice,
    universe: Option<&FnvHashSet<T>>,
) -> AnalysisResult<T> {
    if lattice == Lattice::Must {
        assert!(universe.is_some(), "universe must be defined for a must analysis");
    }

    // Compose the per-op transfers into whole-block gen and kill sets.
    let mut block_gen = vec![];
    let mut block_kill = vec![];
    for block in blocks {
        let mut gen = FnvHashSet::default();
        let mut kill = FnvHashSet::default();
        for op in ops_in_order(block, direction) {
            let (op_gen, op_kill) = visitor.gen_kill(op);
            transfer(&mut gen, &op_gen, &op_kill);
            transfer(&mut kill, &op_kill, &op_gen);
        }
        block_gen.push(gen);
        block_kill.push(kill);
    }

    // Worklist iteration over whole blocks. For a backward analysis the
    // graph is simply walked against the edges.
    let (pred_map, succ_map) = match direction {
        Direction::Forward => (&cfg.pred, &cfg.succ),
        Direction::Backward => (&cfg.succ, &cfg.pred),
    };

    let mut worklist: Vec<Block> = (0..blocks.len()).map(Block::new).collect();
    if direction == Direction::Forward {
        // Popping from the tail, so reverse to start at the entry. Purely
        // an iteration-count improvement.
        worklist.reverse();
    }
    let mut workset: FnvHashSet<Block> = worklist.iter().copied().collect();

    let empty_or_universe = || match lattice {
        Lattice::Maybe => FnvHashSet::default(),
        Lattice::Must => universe.unwrap().clone(),
    };
    let mut before: Vec<FnvHashSet<T>> = (0..blocks.len()).map(|_| empty_or_universe()).collect();
    let mut after: Vec<FnvHashSet<T>> = (0..blocks.len()).map(|_| empty_or_universe()).collect();

    let mut iterations = 0usize;
    while let Some(label) = worklist.pop() {
        iterations += 1;
        workset.remove(&label);

        let preds = &pred_map[label.index()];
        let new_before = if preds.is_empty() {
            initial.clone()
        } else {
            let mut meet = after[preds[0].index()].clone();
            for pred in &preds[1..] {
                match lattice {
                    Lattice::Maybe => meet.extend(after[pred.index()].iter().copied()),
                    Lattice::Must => meet.retain(|e| after[pred.index()].contains(e)),
                }
            }
            meet
        };

        let mut new_after = new_before.clone();
        transfer(&mut new_after, &block_gen[label.index()], &block_kill[label.index()]);
        before[label.index()] = new_before;
        if new_after != after[label.index()] {
            for &succ in &succ_map[label.index()] {
                if workset.insert(succ) {
                    worklist.push(succ);
                }
            }
            after[label.index()] = new_after;
        }
    }
    debug!("dataflow fixed point after {} block visits ({} blocks)", iterations, blocks.len());

    // Replay the per-op transfers within each block to get op-level sets.
    let mut op_before: AnalysisDict<T> = FnvHashMap::default();
    let mut op_after: AnalysisDict<T> = FnvHashMap::default();
    for (i, block) in blocks.iter().enumerate() {
        let label = Block::new(i);
        let mut cur = before[i].clone();
        let indexes = match direction {
            Direction::Forward => Either::Left(0..block.ops.len()),
            Direction::Backward => Either::Right((0..block.ops.len()).rev()),
        };
        for idx in indexes {
            op_before.insert((label, idx), cur.clone());
            let (op_gen, op_kill) = visitor.gen_kill(&block.ops[idx]);
            transfer(&mut cur, &op_gen, &op_kill);
            op_after.insert((label, idx), cur.clone());
        }
    }
    // A backward analysis walks ops in reverse, so what it computed as
    // "after" is the state before the op in program order.
    if direction == Direction::Backward {
        std::mem::swap(&mut op_before, &mut op_after);
    }

    AnalysisResult { before: op_before, after: op_after }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build_cfg;
    use crate::repr::{BlockData, BranchKind, Environment, Op, OpKind, Register};
    use crate::ty::RType;

    struct DefinedVisitor;

    impl AnalysisVisitor<Register> for DefinedVisitor {
        fn gen_kill(&self, op: &Op) -> GenAndKill<Register> {
            let mut gen = FnvHashSet::default();
            if let Some(dest) = op.dest() {
                gen.insert(dest);
            }
            (gen, FnvHashSet::default())
        }
    }

    /// if c: x = 1 else: y = 1; join: return c
    fn diamond() -> (Environment, Vec<BlockData>, Register, Register) {
        let mut env = Environment::new();
        let c = env.add_arg("c", RType::BOOL);
        let x = env.add_local("x", RType::INT);
        let y = env.add_local("y", RType::INT);

        let mut entry = BlockData::new();
        entry.ops.push(Op::branch(c, Block::new(1), Block::new(2), BranchKind::BoolExpr));
        let mut left = BlockData::new();
        left.ops.push(Op::new(OpKind::LoadInt { dest: x, value: 1 }));
        left.ops.push(Op::goto(Block::new(3)));
        let mut right = BlockData::new();
        right.ops.push(Op::new(OpKind::LoadInt { dest: y, value: 1 }));
        right.ops.push(Op::goto(Block::new(3)));
        let mut join = BlockData::new();
        join.ops.push(Op::ret(c));

        (env, vec![entry, left, right, join], x, y)
    }

    #[test]
    fn may_vs_must_at_a_join() {
        let (env, blocks, x, y) = diamond();
        let cfg = build_cfg(&blocks);
        let initial: FnvHashSet<Register> = [Register::new(0)].iter().copied().collect();
        let universe: FnvHashSet<Register> = env.regs().collect();

        let may = run_analysis(
            &blocks,
            &cfg,
            &DefinedVisitor,
            &initial,
            Direction::Forward,
            Lattice::Maybe,
            None,
        );
        let must = run_analysis(
            &blocks,
            &cfg,
            &DefinedVisitor,
            &initial,
            Direction::Forward,
            Lattice::Must,
            Some(&universe),
        );

        let key = (Block::new(3), 0);
        assert!(may.before[&key].contains(&x));
        assert!(may.before[&key].contains(&y));
        assert!(!must.before[&key].contains(&x));
        assert!(!must.before[&key].contains(&y));
        assert!(must.before[&key].contains(&Register::new(0)));
    }

    #[test]
    fn terminates_on_a_loop() {
        // L0: goto L1; L1: if c -> L1 | L2; L2: return c
        let mut env = Environment::new();
        let c = env.add_arg("c", RType::BOOL);
        let mut entry = BlockData::new();
        entry.ops.push(Op::goto(Block::new(1)));
        let mut head = BlockData::new();
        head.ops.push(Op::branch(c, Block::new(1), Block::new(2), BranchKind::BoolExpr));
        let mut exit = BlockData::new();
        exit.ops.push(Op::ret(c));
        let blocks = vec![entry, head, exit];
        let cfg = build_cfg(&blocks);

        let initial: FnvHashSet<Register> = [c].iter().copied().collect();
        let result = run_analysis(
            &blocks,
            &cfg,
            &DefinedVisitor,
            &initial,
            Direction::Forward,
            Lattice::Maybe,
            None,
        );
        assert!(result.before[&(Block::new(2), 0)].contains(&c));
    }
}
