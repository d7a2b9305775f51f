// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Human-readable form of the IR.
//!
//! Every op has a canonical one-line form, and `format_func` produces
//! the canonical text of a whole function. The format is a contract: it
//! is what the golden tests of the analyses and transforms compare
//! against, so a change here is a change to every expected test output.
//!
//! ```text
//! def f(n):
//!     n :: int
//! L0:
//!     inc_ref n :: int
//!     return n
//! ```
//!
//! Registers print as their name; block labels are the block's position
//! in the function's block list; op lines are indented four spaces and
//! block headers are flush-left.

use itertools::Itertools;

use crate::primitives::apply_format;
use crate::repr::{BlockData, BranchKind, Environment, FuncIr, Op, OpKind};

const INDENT: &str = "    ";

/// The canonical one-line form of an op (no indentation).
pub fn format_op(op: &Op, env: &Environment) -> String {
    match &op.kind {
        OpKind::Goto { target } => format!("goto L{}", target.index()),
        OpKind::Branch { cond, true_target, false_target, kind, negated, traceback_entry } => {
            let (mut cond_str, typ) = match kind {
                BranchKind::BoolExpr => (env.name(*cond).to_owned(), "bool"),
                BranchKind::IsNone => (format!("{} is None", env.name(*cond)), "object"),
                BranchKind::IsError => (format!("is_error({})", env.name(*cond)), ""),
            };
            if *negated {
                cond_str = format!("not {}", cond_str);
            }
            let tb = match traceback_entry {
                Some((func, line)) => format!(" (error at {}:{})", func, line),
                None => String::new(),
            };
            let mut line = format!(
                "if {} goto L{}{} else goto L{}",
                cond_str,
                true_target.index(),
                tb,
                false_target.index()
            );
            if !typ.is_empty() {
                line.push_str(&format!(" :: {}", typ));
            }
            line
        }
        OpKind::Return { reg } => format!("return {}", env.name(*reg)),
        OpKind::Unreachable => "unreachable".to_owned(),
        OpKind::Assign { dest, src } => {
            format!("{} = {}", env.name(*dest), env.name(*src))
        }
        OpKind::LoadInt { dest, value } => format!("{} = {}", env.name(*dest), value),
        OpKind::LoadErrorValue { dest } => {
            format!("{} = <error> :: {}", env.name(*dest), env.ty(*dest))
        }
        OpKind::LoadStatic { dest, identifier, module_name, namespace } => {
            let name = match module_name {
                Some(module) => format!("{}.{}", module, identifier),
                None => identifier.clone(),
            };
            format!("{} = {} :: {}", env.name(*dest), name, namespace.as_str())
        }
        OpKind::GetAttr { dest, obj, attr } => {
            format!("{} = {}.{}", env.name(*dest), env.name(*obj), attr)
        }
        OpKind::SetAttr { dest, obj, attr, src } => format!(
            "{}.{} = {}; {} = is_error",
            env.name(*obj),
            attr,
            env.name(*src),
            env.name(*dest)
        ),
        OpKind::TupleGet { dest, src, index } => {
            format!("{} = {}[{}]", env.name(*dest), env.name(*src), index)
        }
        OpKind::TupleSet { dest, items } => format!(
            "{} = ({})",
            env.name(*dest),
            items.iter().map(|&item| env.name(item)).join(", ")
        ),
        OpKind::Call { dest, function, args } => {
            // Keep the line readable; the module prefix adds nothing at
            // this level.
            let short = function.rsplit('.').next().unwrap();
            let call = format!("{}({})", short, args.iter().map(|&a| env.name(a)).join(", "));
            match dest {
                Some(dest) => format!("{} = {}", env.name(*dest), call),
                None => call,
            }
        }
        OpKind::MethodCall { dest, obj, method, args } => {
            let call = format!(
                "{}.{}({})",
                env.name(*obj),
                method,
                args.iter().map(|&a| env.name(a)).join(", ")
            );
            match dest {
                Some(dest) => format!("{} = {}", env.name(*dest), call),
                None => call,
            }
        }
        OpKind::PyCall { dest, function, args } => format!(
            "{} = {}({}) :: object",
            env.name(*dest),
            env.name(*function),
            args.iter().map(|&a| env.name(a)).join(", ")
        ),
        OpKind::PyMethodCall { dest, obj, method, args } => format!(
            "{} = {}.{}({}) :: object",
            env.name(*dest),
            env.name(*obj),
            env.name(*method),
            args.iter().map(|&a| env.name(a)).join(", ")
        ),
        OpKind::Primitive { dest, desc, args } => {
            let arg_names: Vec<&str> = args.iter().map(|&a| env.name(a)).collect();
            apply_format(&desc.format_str, dest.map(|d| env.name(d)), &arg_names)
        }
        OpKind::Cast { dest, src } => {
            format!("{} = cast({}, {})", env.name(*dest), env.ty(*dest), env.name(*src))
        }
        OpKind::Box { dest, src } => {
            format!("{} = box({}, {})", env.name(*dest), env.ty(*src), env.name(*src))
        }
        OpKind::Unbox { dest, src } => {
            format!("{} = unbox({}, {})", env.name(*dest), env.ty(*dest), env.name(*src))
        }
        OpKind::IncRef { src } => {
            let mut line = format!("inc_ref {}", env.name(*src));
            let ty = env.ty(*src);
            if ty.is_int() || ty.is_bool() {
                line.push_str(&format!(" :: {}", ty));
            }
            line
        }
        OpKind::DecRef { src } => {
            let mut line = format!("dec_ref {}", env.name(*src));
            let ty = env.ty(*src);
            if ty.is_int() || ty.is_bool() {
                line.push_str(&format!(" :: {}", ty));
            }
            line
        }
        OpKind::RaiseStandardError { class_name, message, .. } => match message {
            Some(message) => format!("raise {}('{}')", class_name, message),
            None => format!("raise {}", class_name),
        },
    }
}

/// Format the blocks of a function. A trailing goto that just falls
/// through to the lexically next block is hidden.
pub fn format_blocks(blocks: &[BlockData], env: &Environment) -> Vec<String> {
    let mut lines = vec![];
    for (i, block) in blocks.iter().enumerate() {
        lines.push(format!("L{}:", i));

        let mut ops: &[Op] = &block.ops;
        if let Some(OpKind::Goto { target }) = ops.last().map(|op| &op.kind) {
            if target.index() == i + 1 {
                ops = &ops[..ops.len() - 1];
            }
        }
        for op in ops {
            lines.push(format!("{}{}", INDENT, format_op(op, env)));
        }

        if !block.ops.last().map_or(false, |op| op.is_terminator()) {
            // Every basic block needs to exit somewhere.
            lines.push(format!("{}[MISSING BLOCK EXIT OPCODE]", INDENT));
        }
    }
    lines
}

/// The golden text of a whole function: header, environment, blocks.
pub fn format_func(func: &FuncIr) -> Vec<String> {
    let mut lines = vec![];
    let cls_prefix = match &func.class_name {
        Some(cls) => format!("{}.", cls),
        None => String::new(),
    };
    lines.push(format!(
        "def {}{}({}):",
        cls_prefix,
        func.name,
        func.args().iter().map(|arg| arg.name.as_str()).join(", ")
    ));
    for line in func.env.to_lines() {
        lines.push(format!("{}{}", INDENT, line));
    }
    lines.extend(format_blocks(&func.blocks, &func.env));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{
        Block, BlockData, BranchKind, Environment, FuncSignature, Namespace, Op, OpKind,
        RuntimeArg,
    };
    use crate::ty::RType;

    fn identity_func() -> FuncIr {
        let mut env = Environment::new();
        let n = env.add_arg("n", RType::INT);
        let mut block = BlockData::new();
        block.ops.push(Op::inc_ref(n));
        block.ops.push(Op::ret(n));
        FuncIr::new(
            "f",
            None,
            "main",
            FuncSignature::new(vec![RuntimeArg::new("n", RType::INT)], RType::INT),
            env,
            vec![block],
        )
    }

    #[test]
    fn golden_identity_function() {
        let func = identity_func();
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
    fn op_forms() {
        let mut env = Environment::new();
        let a = env.add_arg("a", RType::INT);
        let o = env.add_local("o", RType::OBJECT);
        let r0 = env.add_temp(RType::INT);
        let r1 = env.add_temp(RType::OBJECT);
        let flag = env.add_temp(RType::BOOL);

        assert_eq!(format_op(&Op::goto(Block::new(3)), &env), "goto L3");
        assert_eq!(
            format_op(&Op::branch(flag, Block::new(1), Block::new(2), BranchKind::BoolExpr), &env),
            "if r2 goto L1 else goto L2 :: bool"
        );
        assert_eq!(
            format_op(&Op::branch(o, Block::new(1), Block::new(2), BranchKind::IsNone), &env),
            "if o is None goto L1 else goto L2 :: object"
        );
        let mut err_branch = Op::branch(r0, Block::new(4), Block::new(5), BranchKind::IsError);
        assert_eq!(format_op(&err_branch, &env), "if is_error(r0) goto L4 else goto L5");
        match &mut err_branch.kind {
            OpKind::Branch { traceback_entry, .. } => {
                *traceback_entry = Some(("f".to_owned(), 7));
            }
            _ => unreachable!(),
        }
        assert_eq!(
            format_op(&err_branch, &env),
            "if is_error(r0) goto L4 (error at f:7) else goto L5"
        );

        assert_eq!(
            format_op(&Op::new(OpKind::LoadInt { dest: r0, value: 5 }), &env),
            "r0 = 5"
        );
        assert_eq!(
            format_op(&Op::new(OpKind::LoadErrorValue { dest: r0 }), &env),
            "r0 = <error> :: int"
        );
        assert_eq!(
            format_op(
                &Op::new(OpKind::LoadStatic {
                    dest: r1,
                    identifier: "f".to_owned(),
                    module_name: Some("main".to_owned()),
                    namespace: Namespace::Static,
                }),
                &env
            ),
            "r1 = main.f :: static"
        );
        assert_eq!(
            format_op(&Op::new(OpKind::Box { dest: r1, src: a }), &env),
            "r1 = box(int, a)"
        );
        assert_eq!(
            format_op(&Op::new(OpKind::Unbox { dest: r0, src: r1 }), &env),
            "r0 = unbox(int, r1)"
        );
        assert_eq!(
            format_op(&Op::new(OpKind::Cast { dest: r1, src: o }), &env),
            "r1 = cast(object, o)"
        );
        assert_eq!(
            format_op(
                &Op::new(OpKind::Call {
                    dest: Some(r0),
                    function: "main.g".to_owned(),
                    args: vec![a],
                }),
                &env
            ),
            "r0 = g(a)"
        );
        assert_eq!(
            format_op(&Op::new(OpKind::PyCall { dest: r1, function: o, args: vec![r1] }), &env),
            "r1 = o(r1) :: object"
        );
        assert_eq!(
            format_op(
                &Op::new(OpKind::GetAttr { dest: r0, obj: o, attr: "x".to_owned() }),
                &env
            ),
            "r0 = o.x"
        );
        assert_eq!(
            format_op(
                &Op::new(OpKind::SetAttr {
                    dest: flag,
                    obj: o,
                    attr: "x".to_owned(),
                    src: a,
                }),
                &env
            ),
            "o.x = a; r2 = is_error"
        );
        assert_eq!(
            format_op(
                &Op::new(OpKind::RaiseStandardError {
                    dest: flag,
                    class_name: "ValueError".to_owned(),
                    message: Some("bad value".to_owned()),
                }),
                &env
            ),
            "raise ValueError('bad value')"
        );
        assert_eq!(format_op(&Op::dec_ref(o), &env), "dec_ref o");
        assert_eq!(format_op(&Op::inc_ref(a), &env), "inc_ref a :: int");
        assert_eq!(format_op(&Op::dec_ref(flag), &env), "dec_ref r2 :: bool");
    }

    #[test]
    fn tuple_ops_and_unreachable() {
        let mut env = Environment::new();
        let a = env.add_arg("a", RType::INT);
        let b = env.add_arg("b", RType::STR);
        let t = env.add_temp(RType::tuple(vec![RType::INT, RType::STR]));
        let x = env.add_temp(RType::INT);

        assert_eq!(
            format_op(&Op::new(OpKind::TupleSet { dest: t, items: vec![a, b] }), &env),
            "r0 = (a, b)"
        );
        assert_eq!(
            format_op(&Op::new(OpKind::TupleGet { dest: x, src: t, index: 0 }), &env),
            "r1 = r0[0]"
        );
        assert_eq!(format_op(&Op::unreachable(), &env), "unreachable");
    }

    #[test]
    fn trailing_goto_to_next_block_is_hidden() {
        let mut env = Environment::new();
        let n = env.add_arg("n", RType::INT);
        let mut first = BlockData::new();
        first.ops.push(Op::goto(Block::new(1)));
        let mut second = BlockData::new();
        second.ops.push(Op::ret(n));

        assert_eq!(
            format_blocks(&[first, second], &env),
            vec!["L0:".to_owned(), "L1:".to_owned(), "    return n".to_owned()]
        );
    }
}
