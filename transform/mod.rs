// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! IR-to-IR transforms.
//!
//! Each transform maps one function's IR to new IR for the same
//! function, in place. The driver runs them in a fixed order: exception
//! splitting first, reference-count insertion last, with the analyses
//! recomputed in between. A transform rebuilds the op lists it changes
//! rather than patching them; blocks are only appended and re-linked,
//! never deleted.

pub mod exceptions;
pub mod refcount;

pub use self::exceptions::insert_exception_handling;
pub use self::refcount::insert_ref_count_opcodes;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build_cfg;
    use crate::primitives::{matching_primitive_op, PrimitiveRegistry};
    use crate::repr::{
        Block, BlockData, Classes, Environment, FuncIr, FuncSignature, Op, OpKind, RuntimeArg,
    };
    use crate::ty::RType;
    use crate::util::pretty::format_func;

    /// Both transforms over a function with a fallible registry op:
    /// f(x: list, n: int) -> object: return x[n]
    #[test]
    fn full_pipeline_on_a_fallible_subscript() {
        let registry = PrimitiveRegistry::new();
        let classes = Classes::default();
        let desc = matching_primitive_op(
            registry.method_candidates("__getitem__"),
            &[&RType::LIST, &RType::INT],
            &classes,
        )
        .unwrap();

        let mut env = Environment::new();
        let x = env.add_arg("x", RType::LIST);
        let n = env.add_arg("n", RType::INT);
        let r0 = env.add_temp(RType::OBJECT);
        let mut block = BlockData::new();
        block.ops.push(Op::new(OpKind::Primitive { dest: Some(r0), desc, args: vec![x, n] }));
        block.ops.push(Op::ret(r0));
        let mut func = FuncIr::new(
            "f",
            None,
            "main",
            FuncSignature::new(
                vec![RuntimeArg::new("x", RType::LIST), RuntimeArg::new("n", RType::INT)],
                RType::OBJECT,
            ),
            env,
            vec![block],
        );

        insert_exception_handling(&mut func);
        insert_ref_count_opcodes(&mut func);

        assert_eq!(
            format_func(&func),
            vec![
                "def f(x, n):".to_owned(),
                "    x :: list".to_owned(),
                "    n :: int".to_owned(),
                "    r0, r1 :: object".to_owned(),
                "L0:".to_owned(),
                "    r0 = x.__getitem__(n)".to_owned(),
                "    if is_error(r0) goto L3 else goto L1".to_owned(),
                "L1:".to_owned(),
                "    return r0".to_owned(),
                "L2:".to_owned(),
                "    r1 = <error> :: object".to_owned(),
                "    return r1".to_owned(),
                "L3:".to_owned(),
                "    dec_ref r0".to_owned(),
                "    goto L2".to_owned(),
            ]
        );

        // Well-formedness survives both passes: every block ends in a
        // terminator, all jump targets are in range, all referenced
        // registers are in the environment, and the derived maps are
        // mutual transposes.
        let cfg = build_cfg(&func.blocks);
        for (b, succ) in cfg.succ.iter().enumerate() {
            for target in succ {
                assert!(target.index() < func.blocks.len());
                assert!(cfg.pred[target.index()].contains(&Block::new(b)));
            }
        }
        for block in &func.blocks {
            assert!(block.terminator().is_terminator());
            for op in &block.ops {
                for reg in op.sources() {
                    assert!(reg.index() < func.env.num_regs());
                }
                if let Some(dest) = op.dest() {
                    assert!(dest.index() < func.env.num_regs());
                }
            }
        }
    }
}
