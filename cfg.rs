// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Control-flow graphs derived from a function's block list.

use fnv::FnvHashSet;

use crate::repr::{Block, BlockData, OpKind};

/// Control-flow graph.
///
/// Block 0 is always the entry point. There must be a non-empty set of
/// exits. Successor and predecessor lists are indexed by block; the
/// predecessor map is the transpose of the successor map.
pub struct Cfg {
    pub succ: Vec<Vec<Block>>,
    pub pred: Vec<Vec<Block>>,
    pub exits: FnvHashSet<Block>,
}

/// The successors a terminator contributes. A branch contributes both
/// its targets (true first; the order only matters for printing), a goto
/// its single target; return and unreachable contribute nothing and make
/// the block an exit.
fn successors(terminator: &OpKind) -> Vec<Block> {
    match terminator {
        OpKind::Branch { true_target, false_target, .. } => vec![*true_target, *false_target],
        OpKind::Goto { target } => vec![*target],
        OpKind::Return { .. } | OpKind::Unreachable => vec![],
        _ => panic!("block does not end in a terminator"),
    }
}

/// Calculate the basic block control-flow graph of `blocks`.
pub fn build_cfg(blocks: &[BlockData]) -> Cfg {
    let mut succ_map = vec![];
    let mut pred_map: Vec<Vec<Block>> = vec![vec![]; blocks.len()];
    let mut exits = FnvHashSet::default();

    for (i, block) in blocks.iter().enumerate() {
        let label = Block::new(i);
        let succ = successors(&block.terminator().kind);
        if succ.is_empty() {
            exits.insert(label);
        }
        succ_map.push(succ);
    }
    for (i, succ) in succ_map.iter().enumerate() {
        for &target in succ {
            pred_map[target.index()].push(Block::new(i));
        }
    }
    assert!(!exits.is_empty(), "control-flow graph has no exit");

    Cfg { succ: succ_map, pred: pred_map, exits }
}
