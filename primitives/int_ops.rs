// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tagged integer arithmetic and comparison primitives.

use crate::primitives::{simple_emit, PrimitiveRegistry};
use crate::repr::ErrorKind;
use crate::ty::RType;

fn int_binary_op(registry: &mut PrimitiveRegistry, op: &str, c_func: &str, result_type: RType) {
    registry.binary_op(
        op,
        vec![RType::INT, RType::INT],
        result_type,
        ErrorKind::Never,
        Some(&format!("{{dest}} = {{args[0]}} {} {{args[1]}} :: int", op)),
        simple_emit(format!("{{dest}} = {}({{args[0]}}, {{args[1]}});", c_func)),
        1,
    );
}

fn int_compare_op(registry: &mut PrimitiveRegistry, op: &str, c_func: &str) {
    int_binary_op(registry, op, c_func, RType::BOOL);
}

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    int_binary_op(registry, "+", "CPyTagged_Add", RType::INT);
    int_binary_op(registry, "-", "CPyTagged_Subtract", RType::INT);
    int_binary_op(registry, "*", "CPyTagged_Multiply", RType::INT);
    int_binary_op(registry, "//", "CPyTagged_FloorDivide", RType::INT);
    int_binary_op(registry, "%", "CPyTagged_Remainder", RType::INT);

    int_compare_op(registry, "==", "CPyTagged_IsEq");
    int_compare_op(registry, "!=", "CPyTagged_IsNe");
    int_compare_op(registry, "<", "CPyTagged_IsLt");
    int_compare_op(registry, "<=", "CPyTagged_IsLe");
    int_compare_op(registry, ">", "CPyTagged_IsGt");
    int_compare_op(registry, ">=", "CPyTagged_IsGe");

    registry.unary_op(
        "-",
        RType::INT,
        RType::INT,
        ErrorKind::Never,
        Some("{dest} = -{args[0]} :: int"),
        simple_emit("{dest} = CPyTagged_Negate({args[0]});"),
        1,
    );
}
