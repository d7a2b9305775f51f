// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Insert reference count inc/dec ops.
//!
//! This runs towards the end of compilation, after exception splitting.
//! Up to this point reference counts are not modeled at all, which keeps
//! the earlier passes simple. The strategy is to decrement a reference
//! soon after the value's last use, so memory is freed (and `__del__`
//! run) promptly; the only hard guarantee is that all owned local
//! references are released before the function returns.
//!
//! Function arguments are special: they start out *borrowed* from the
//! caller, so they must not be decremented before return. An assignment
//! to an argument register replaces the borrowed reference with a
//! regular owned one, which does need releasing. Statics are borrowed
//! from the module in the same way.
//!
//! Only registers of reference-counted types get inc/dec ops; an
//! unboxed bool or a tuple struct of such never touches a count.

use fnv::FnvHashSet;

use crate::cfg::build_cfg;
use crate::dataflow::impls::{analyze_borrowed_arguments, analyze_live_regs};
use crate::dataflow::AnalysisDict;
use crate::repr::{Block, Environment, FuncIr, Op, OpKind, Register};

/// Insert reference count inc/dec ops into a function.
///
/// This is the entry point to this module.
pub fn insert_ref_count_opcodes(func: &mut FuncIr) {
    debug!("inserting refcount ops in {}", func.name);
    let cfg = build_cfg(&func.blocks);
    let args: FnvHashSet<Register> = func.arg_regs().into_iter().collect();
    let live = analyze_live_regs(&func.blocks, &cfg);
    let borrow = analyze_borrowed_arguments(&func.blocks, &cfg, &args);

    // Edge bridging appends blocks; only the original blocks are
    // rewritten.
    let num_blocks = func.blocks.len();
    for index in 0..num_blocks {
        let block = Block::new(index);
        if matches!(
            func.block(block).terminator().kind,
            OpKind::Branch { .. } | OpKind::Goto { .. }
        ) {
            insert_branch_inc_and_decrefs(block, func, &live.before, &borrow.before, &borrow.after);
        }
        transform_block(block, func, &live.before, &live.after, &borrow.before);
    }
}

fn maybe_append_inc_ref(ops: &mut Vec<Op>, reg: Register, env: &Environment) {
    if env.ty(reg).is_refcounted() {
        ops.push(Op::inc_ref(reg));
    }
}

fn maybe_append_dec_ref(ops: &mut Vec<Op>, reg: Register, env: &Environment) {
    if env.ty(reg).is_refcounted() {
        ops.push(Op::dec_ref(reg));
    }
}

fn transform_block(
    block: Block,
    func: &mut FuncIr,
    pre_live: &AnalysisDict<Register>,
    post_live: &AnalysisDict<Register>,
    pre_borrow: &AnalysisDict<Register>,
) {
    let old_ops = std::mem::replace(&mut func.blocks[block.index()].ops, vec![]);
    let mut ops: Vec<Op> = vec![];

    for (i, op) in old_ops.into_iter().enumerate() {
        let key = (block, i);
        match &op.kind {
            // These just copy or steal a reference, they don't create a
            // new one.
            OpKind::Assign { dest, src }
            | OpKind::Cast { dest, src }
            | OpKind::Box { dest, src } => {
                let (dest, src) = (*dest, *src);
                // The source stays live (or was never ours): retain it.
                if post_live[&key].contains(&src) || pre_borrow[&key].contains(&src) {
                    maybe_append_inc_ref(&mut ops, src, &func.env);
                }
                // Overwriting an owned value releases it.
                if !pre_borrow[&key].contains(&dest) && pre_live[&key].contains(&dest) {
                    maybe_append_dec_ref(&mut ops, dest, &func.env);
                }
                ops.push(op);
                if !post_live[&key].contains(&dest) {
                    maybe_append_dec_ref(&mut ops, dest, &func.env);
                }
            }

            // The return value must be an owned reference.
            OpKind::Return { reg } if pre_borrow[&key].contains(reg) => {
                maybe_append_inc_ref(&mut ops, *reg, &func.env);
                ops.push(op);
            }

            OpKind::Goto { .. }
            | OpKind::Branch { .. }
            | OpKind::Return { .. }
            | OpKind::Unreachable
            | OpKind::IncRef { .. }
            | OpKind::DecRef { .. } => ops.push(op),

            // Everything else constructs a new reference in its dest.
            _ => {
                let dest = op.dest();
                let mut tmp_reg: Option<Register> = None;
                if let Some(dest) = dest {
                    if func.env.ty(dest).is_refcounted()
                        && !pre_borrow[&key].contains(&dest)
                        && pre_live[&key].contains(&dest)
                    {
                        if !op.sources().contains(&dest) {
                            maybe_append_dec_ref(&mut ops, dest, &func.env);
                        } else {
                            // The op still reads the old value, so it
                            // can't be released up front; park it in a
                            // temporary and release that afterwards.
                            let tmp = func.env.add_temp(func.env.ty(dest).clone());
                            ops.push(Op::assign(tmp, dest));
                            tmp_reg = Some(tmp);
                        }
                    }
                }

                let is_borrowed_producer = matches!(op.kind, OpKind::LoadStatic { .. });
                let sources = op.unique_sources();
                ops.push(op);

                // Release sources that die here and were ours to release.
                for src in sources {
                    if !post_live[&key].contains(&src)
                        && !pre_borrow[&key].contains(&src)
                        && Some(src) != dest
                    {
                        maybe_append_dec_ref(&mut ops, src, &func.env);
                    }
                }
                if let Some(dest) = dest {
                    // A static is borrowed from the module; retain it so
                    // the register holds an owned reference like any
                    // other produced value.
                    if is_borrowed_producer {
                        maybe_append_inc_ref(&mut ops, dest, &func.env);
                    }
                    if !post_live[&key].contains(&dest) {
                        maybe_append_dec_ref(&mut ops, dest, &func.env);
                    }
                }
                if let Some(tmp) = tmp_reg {
                    maybe_append_dec_ref(&mut ops, tmp, &func.env);
                }
            }
        }
    }

    func.blocks[block.index()].ops = ops;
}

/// Equalize ownership across the outgoing edges of a branch or goto.
///
/// Registers that die across an edge get a dec_ref on that edge, and
/// registers that stop being borrowed get an inc_ref (they are owned at
/// the target). The true and false successors of a branch can have
/// different live and borrowed sets, so the fix-up ops cannot sit in
/// either adjacent block: when an edge needs ops, a new block holding
/// them is spliced into it.
///
/// An example where an edge needs an inc_ref:
///
/// ```text
/// def f(a: int) -> int:
///     if a:
///         a = 1
///     return a   # a is borrowed if the condition was false, owned if true
/// ```
fn insert_branch_inc_and_decrefs(
    block: Block,
    func: &mut FuncIr,
    pre_live: &AnalysisDict<Register>,
    pre_borrow: &AnalysisDict<Register>,
    post_borrow: &AnalysisDict<Register>,
) {
    let prev_key = (block, func.block(block).ops.len() - 1);
    let source_live = pre_live[&prev_key].clone();
    let source_borrowed = post_borrow[&prev_key].clone();

    let bridge = |func: &mut FuncIr, target: Block| -> Option<Block> {
        let mut ops: Vec<Op> = vec![];
        let target_pre_live = &pre_live[&(target, 0)];
        let target_borrowed = &pre_borrow[&(target, 0)];

        let mut decref: Vec<Register> = source_live
            .iter()
            .filter(|r| !target_pre_live.contains(r) && !source_borrowed.contains(r))
            .copied()
            .collect();
        decref.sort();
        for reg in decref {
            maybe_append_dec_ref(&mut ops, reg, &func.env);
        }

        let mut incref: Vec<Register> = source_borrowed
            .iter()
            .filter(|r| !target_borrowed.contains(r))
            .copied()
            .collect();
        incref.sort();
        for reg in incref {
            maybe_append_inc_ref(&mut ops, reg, &func.env);
        }

        if ops.is_empty() {
            return None;
        }
        let new_block = func.new_block();
        ops.push(Op::goto(target));
        func.block_mut(new_block).ops = ops;
        Some(new_block)
    };

    match func.blocks[block.index()].ops.last().map(|op| &op.kind) {
        Some(OpKind::Branch { true_target, false_target, .. }) => {
            let (old_true, old_false) = (*true_target, *false_target);
            let new_true = bridge(func, old_true);
            let new_false = bridge(func, old_false);
            if let Some(OpKind::Branch { true_target, false_target, .. }) =
                func.blocks[block.index()].ops.last_mut().map(|op| &mut op.kind)
            {
                if let Some(new_true) = new_true {
                    *true_target = new_true;
                }
                if let Some(new_false) = new_false {
                    *false_target = new_false;
                }
            }
        }
        Some(OpKind::Goto { target }) => {
            let old_target = *target;
            let new_target = bridge(func, old_target);
            if let Some(OpKind::Goto { target }) =
                func.blocks[block.index()].ops.last_mut().map(|op| &mut op.kind)
            {
                if let Some(new_target) = new_target {
                    *target = new_target;
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{BlockData, BranchKind, FuncSignature, Namespace, RuntimeArg};
    use crate::ty::RType;
    use crate::util::pretty::format_func;

    fn int_func(args: &[&str], env: Environment, blocks: Vec<BlockData>) -> FuncIr {
        let sig_args = args.iter().map(|a| RuntimeArg::new(a, RType::INT)).collect();
        FuncIr::new("f", None, "main", FuncSignature::new(sig_args, RType::INT), env, blocks)
    }

    #[test]
    fn returned_argument_is_retained() {
        // f(n: int) -> int: return n
        let mut env = Environment::new();
        let n = env.add_arg("n", RType::INT);
        let mut block = BlockData::new();
        block.ops.push(Op::ret(n));
        let mut func = int_func(&["n"], env, vec![block]);

        insert_ref_count_opcodes(&mut func);
        assert_eq!(
            format_func(&func),
            vec![
                "def f(n):".to_owned(),
                "    n :: int".to_owned(),
                "L0:".to_owned(),
                "    inc_ref n :: int".to_owned(),
                "    return n".to_owned(),
            ]
        );
    }

    #[test]
    fn borrow_promoted_on_one_path_only() {
        // f(a: int) -> int: if a: a = 1; return a
        //
        // The argument is still borrowed on the false path but owned on
        // the true path (the assignment replaced it), so the false edge
        // gets a bridge block retaining it.
        let mut env = Environment::new();
        let a = env.add_arg("a", RType::INT);
        let r0 = env.add_temp(RType::INT);

        let mut entry = BlockData::new();
        entry.ops.push(Op::branch(a, Block::new(1), Block::new(2), BranchKind::BoolExpr));
        let mut then = BlockData::new();
        then.ops.push(Op::new(OpKind::LoadInt { dest: r0, value: 1 }));
        then.ops.push(Op::assign(a, r0));
        then.ops.push(Op::goto(Block::new(2)));
        let mut exit = BlockData::new();
        exit.ops.push(Op::ret(a));
        let mut func = int_func(&["a"], env, vec![entry, then, exit]);

        insert_ref_count_opcodes(&mut func);
        assert_eq!(
            format_func(&func),
            vec![
                "def f(a):".to_owned(),
                "    a, r0 :: int".to_owned(),
                "L0:".to_owned(),
                "    if a goto L1 else goto L3 :: bool".to_owned(),
                "L1:".to_owned(),
                "    r0 = 1".to_owned(),
                "    a = r0".to_owned(),
                "    goto L2".to_owned(),
                "L2:".to_owned(),
                "    return a".to_owned(),
                "L3:".to_owned(),
                "    inc_ref a :: int".to_owned(),
                "    goto L2".to_owned(),
            ]
        );
    }

    #[test]
    fn tuple_pack_and_unpack() {
        // f(a: str, b: str) -> str: t = (a, b); x = t[0]; return x
        let mut env = Environment::new();
        let a = env.add_arg("a", RType::STR);
        let b = env.add_arg("b", RType::STR);
        let t = env.add_temp(RType::tuple(vec![RType::STR, RType::STR]));
        let x = env.add_temp(RType::STR);

        let mut block = BlockData::new();
        block.ops.push(Op::new(OpKind::TupleSet { dest: t, items: vec![a, b] }));
        block.ops.push(Op::new(OpKind::TupleGet { dest: x, src: t, index: 0 }));
        block.ops.push(Op::ret(x));
        let mut func = FuncIr::new(
            "f",
            None,
            "main",
            FuncSignature::new(
                vec![RuntimeArg::new("a", RType::STR), RuntimeArg::new("b", RType::STR)],
                RType::STR,
            ),
            env,
            vec![block],
        );

        insert_ref_count_opcodes(&mut func);
        // The borrowed arguments are never touched; the tuple register
        // is released exactly once, after its last use.
        assert_eq!(
            format_func(&func)[4..],
            [
                "L0:".to_owned(),
                "    r0 = (a, b)".to_owned(),
                "    r1 = r0[0]".to_owned(),
                "    dec_ref r0".to_owned(),
                "    return r1".to_owned(),
            ]
        );
    }

    #[test]
    fn no_refcounting_for_unboxed_tuple_of_bools() {
        // Same shape, but nothing in the tuple is reference counted, so
        // the pass must not insert a single inc/dec.
        let mut env = Environment::new();
        let a = env.add_arg("a", RType::BOOL);
        let b = env.add_arg("b", RType::BOOL);
        let t = env.add_temp(RType::tuple(vec![RType::BOOL, RType::BOOL]));
        let x = env.add_temp(RType::BOOL);

        let mut block = BlockData::new();
        block.ops.push(Op::new(OpKind::TupleSet { dest: t, items: vec![a, b] }));
        block.ops.push(Op::new(OpKind::TupleGet { dest: x, src: t, index: 1 }));
        block.ops.push(Op::ret(x));
        let mut func = FuncIr::new(
            "f",
            None,
            "main",
            FuncSignature::new(
                vec![RuntimeArg::new("a", RType::BOOL), RuntimeArg::new("b", RType::BOOL)],
                RType::BOOL,
            ),
            env,
            vec![block],
        );

        insert_ref_count_opcodes(&mut func);
        assert_eq!(func.blocks.len(), 1);
        assert!(func.blocks[0]
            .ops
            .iter()
            .all(|op| !matches!(op.kind, OpKind::IncRef { .. } | OpKind::DecRef { .. })));
    }

    #[test]
    fn static_load_is_made_owned() {
        // f() -> object: r0 = main.g :: static; return r0
        let mut env = Environment::new();
        let r0 = env.add_temp(RType::OBJECT);
        let mut block = BlockData::new();
        block.ops.push(Op::new(OpKind::LoadStatic {
            dest: r0,
            identifier: "g".to_owned(),
            module_name: Some("main".to_owned()),
            namespace: Namespace::Static,
        }));
        block.ops.push(Op::ret(r0));
        let mut func = FuncIr::new(
            "f",
            None,
            "main",
            FuncSignature::new(vec![], RType::OBJECT),
            env,
            vec![block],
        );

        insert_ref_count_opcodes(&mut func);
        assert_eq!(
            format_func(&func)[2..],
            [
                "L0:".to_owned(),
                "    r0 = main.g :: static".to_owned(),
                "    inc_ref r0".to_owned(),
                "    return r0".to_owned(),
            ]
        );
    }

    #[test]
    fn clobbered_dest_that_is_also_a_source_goes_through_a_temp() {
        // x = g(x) twice, so the second call overwrites a live x that it
        // also reads: the old value is parked in a temp and released
        // after the call.
        let mut env = Environment::new();
        let x = env.add_local("x", RType::OBJECT);
        let mut block = BlockData::new();
        block.ops.push(Op::new(OpKind::Call {
            dest: Some(x),
            function: "main.g".to_owned(),
            args: vec![],
        }));
        block.ops.push(Op::new(OpKind::Call {
            dest: Some(x),
            function: "main.g".to_owned(),
            args: vec![x],
        }));
        block.ops.push(Op::ret(x));
        let mut func = FuncIr::new(
            "f",
            None,
            "main",
            FuncSignature::new(vec![], RType::OBJECT),
            env,
            vec![block],
        );

        insert_ref_count_opcodes(&mut func);
        assert_eq!(
            format_func(&func)[2..],
            [
                "L0:".to_owned(),
                "    x = g()".to_owned(),
                "    r0 = x".to_owned(),
                "    x = g(x)".to_owned(),
                "    dec_ref r0".to_owned(),
                "    return x".to_owned(),
            ]
        );
    }

    #[test]
    fn dead_source_of_a_call_is_released() {
        // f() -> int: r0 = g(); r1 = h(r0); return r1 -- r0 dies at the
        // second call and is owned, so it is released right after it.
        let mut env = Environment::new();
        let r0 = env.add_temp(RType::INT);
        let r1 = env.add_temp(RType::INT);
        let mut block = BlockData::new();
        block.ops.push(Op::new(OpKind::Call {
            dest: Some(r0),
            function: "main.g".to_owned(),
            args: vec![],
        }));
        block.ops.push(Op::new(OpKind::Call {
            dest: Some(r1),
            function: "main.h".to_owned(),
            args: vec![r0],
        }));
        block.ops.push(Op::ret(r1));
        let mut func = int_func(&[], env, vec![block]);

        insert_ref_count_opcodes(&mut func);
        assert_eq!(
            format_func(&func)[2..],
            [
                "L0:".to_owned(),
                "    r0 = g()".to_owned(),
                "    r1 = h(r0)".to_owned(),
                "    dec_ref r0 :: int".to_owned(),
                "    return r1".to_owned(),
            ]
        );
    }

    #[test]
    fn dead_values_are_released_on_branch_edges() {
        // f(c: bool) -> int:
        //   r0 = g()
        //   if c: return r0
        //   else: r1 = 0; return r1   # r0 dies on this edge
        let mut env = Environment::new();
        let c = env.add_arg("c", RType::BOOL);
        let r0 = env.add_temp(RType::INT);
        let r1 = env.add_temp(RType::INT);

        let mut entry = BlockData::new();
        entry.ops.push(Op::new(OpKind::Call {
            dest: Some(r0),
            function: "main.g".to_owned(),
            args: vec![],
        }));
        entry.ops.push(Op::branch(c, Block::new(1), Block::new(2), BranchKind::BoolExpr));
        let mut then = BlockData::new();
        then.ops.push(Op::ret(r0));
        let mut other = BlockData::new();
        other.ops.push(Op::new(OpKind::LoadInt { dest: r1, value: 0 }));
        other.ops.push(Op::ret(r1));
        let mut func = FuncIr::new(
            "f",
            None,
            "main",
            FuncSignature::new(vec![RuntimeArg::new("c", RType::BOOL)], RType::INT),
            env,
            vec![entry, then, other],
        );

        insert_ref_count_opcodes(&mut func);
        assert_eq!(
            format_func(&func)[3..],
            [
                "L0:".to_owned(),
                "    r0 = g()".to_owned(),
                "    if c goto L1 else goto L3 :: bool".to_owned(),
                "L1:".to_owned(),
                "    return r0".to_owned(),
                "L2:".to_owned(),
                "    r1 = 0".to_owned(),
                "    return r1".to_owned(),
                "L3:".to_owned(),
                "    dec_ref r0 :: int".to_owned(),
                "    goto L2".to_owned(),
            ]
        );
    }
}
