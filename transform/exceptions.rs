// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Insert error checks after fallible ops.
//!
//! When the IR is first built, ops that can raise appear in the middle
//! of basic blocks with no checks around them. This transform inserts
//! all the checks afterwards: each fallible op gets a branch on its
//! error indicator, and since branches can only sit at the end of a
//! block, the containing block is split at every check.
//!
//! An op's failure routes to the error handler its block carries (set by
//! the front-end for `try` bodies), or to a function-level default
//! handler that loads the return type's error sentinel and returns it.

use fnv::{FnvHashMap, FnvHashSet};

use crate::repr::{
    Block, BlockData, BranchKind, ErrorKind, FuncIr, Op, OpKind, NO_TRACEBACK_LINE_NO,
};

/// Insert error checks into `func` and split its blocks accordingly.
///
/// Running the transform a second time is a no-op: a fallible op that is
/// already followed by its own error check is left alone.
pub fn insert_exception_handling(func: &mut FuncIr) {
    if !needs_split(func) {
        return;
    }
    debug!("inserting exception handling in {}", func.name);
    let error_label = add_handler_block(func);
    split_blocks_at_errors(func, error_label);
}

fn needs_split(func: &FuncIr) -> bool {
    func.blocks.iter().any(|block| {
        block.ops.iter().enumerate().any(|(i, op)| {
            op.can_raise()
                && (i + 1 >= block.ops.len() || !is_error_check_for(&block.ops[i + 1], op))
        })
    })
}

/// Does `next` already branch on the error indicator of `op`?
fn is_error_check_for(next: &Op, op: &Op) -> bool {
    let dest = match op.dest() {
        Some(dest) => dest,
        None => return false,
    };
    match &next.kind {
        OpKind::Branch { cond, kind, negated, .. } if *cond == dest => match op.error_kind() {
            ErrorKind::Magic => *kind == BranchKind::IsError && !*negated,
            ErrorKind::False => *kind == BranchKind::BoolExpr && *negated,
            ErrorKind::Never => false,
        },
        _ => false,
    }
}

/// Append the function-level default handler: load the return type's
/// error sentinel into a fresh register and return it.
fn add_handler_block(func: &mut FuncIr) -> Block {
    let block = func.new_block();
    let dest = func.env.add_temp(func.sig.ret_type.clone());
    let data = func.block_mut(block);
    data.ops.push(Op::new(OpKind::LoadErrorValue { dest }));
    data.ops.push(Op::ret(dest));
    block
}

fn split_blocks_at_errors(func: &mut FuncIr, default_error_handler: Block) {
    let old_blocks = std::mem::replace(&mut func.blocks, vec![]);
    let func_name = func.name.clone();

    let mut new_blocks: Vec<BlockData> = vec![];
    // Old block index -> the first of its fragments in the new list.
    let mut mapping: FnvHashMap<Block, Block> = FnvHashMap::default();
    // Positions (new block, op index) of the branches created below.
    let mut partial: FnvHashSet<(usize, usize)> = FnvHashSet::default();

    for (old_index, block) in old_blocks.into_iter().enumerate() {
        let old_label = Block::new(old_index);
        let BlockData { ops, error_handler } = block;

        // Positions after which this block splits. The final op is a
        // terminator and never fallible, so it is never a split point.
        let mut split_at: FnvHashSet<usize> = FnvHashSet::default();
        for i in 0..ops.len().saturating_sub(1) {
            if ops[i].can_raise() && !is_error_check_for(&ops[i + 1], &ops[i]) {
                split_at.insert(i);
            }
        }

        let mut cur = BlockData::new();
        let mut first_fragment = true;
        for (i, op) in ops.into_iter().enumerate() {
            let split = split_at.contains(&i);
            let (line, dest, error_kind) = (op.line, op.dest(), op.error_kind());
            cur.ops.push(op);
            if !split {
                continue;
            }

            // Void ops can't be fallible: failure is signalled through
            // the result register.
            let dest = dest.expect("void op generating errors?");
            let (kind, negated) = match error_kind {
                ErrorKind::Magic => (BranchKind::IsError, false),
                ErrorKind::False => (BranchKind::BoolExpr, true),
                ErrorKind::Never => unreachable!(),
            };
            let error_label = error_handler.unwrap_or(default_error_handler);
            let fragment_index = new_blocks.len();
            let traceback_entry = if line != NO_TRACEBACK_LINE_NO {
                Some((func_name.clone(), line))
            } else {
                None
            };
            let branch = Op::with_line(
                OpKind::Branch {
                    cond: dest,
                    // The true label is the error side and still names an
                    // old block; the false label names the next fragment
                    // in the *new* list, which is why these branches are
                    // only partially remapped below.
                    true_target: error_label,
                    false_target: Block::new(fragment_index + 1),
                    kind,
                    negated,
                    traceback_entry,
                },
                line,
            );
            partial.insert((fragment_index, cur.ops.len()));
            cur.ops.push(branch);

            if first_fragment {
                mapping.insert(old_label, Block::new(fragment_index));
                first_fragment = false;
            }
            new_blocks.push(std::mem::replace(&mut cur, BlockData::new()));
        }

        if first_fragment {
            mapping.insert(old_label, Block::new(new_blocks.len()));
        }
        new_blocks.push(cur);
    }

    // Adjust all labels to reflect the new block list. Branches created
    // above are "partial": only their true label goes through the map,
    // the false label is already a new-list index and must not be
    // rewritten. All other branches and gotos still carry old labels on
    // every side. (See the open-question note in DESIGN.md.)
    for (block_index, block) in new_blocks.iter_mut().enumerate() {
        for (op_index, op) in block.ops.iter_mut().enumerate() {
            match &mut op.kind {
                OpKind::Goto { target } => *target = mapping[target],
                OpKind::Branch { true_target, false_target, .. } => {
                    if !partial.contains(&(block_index, op_index)) {
                        *false_target = mapping[false_target];
                    }
                    *true_target = mapping[true_target];
                }
                _ => {}
            }
        }
    }

    func.blocks = new_blocks;
}
