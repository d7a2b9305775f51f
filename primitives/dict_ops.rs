// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Dict primitives.

use crate::primitives::{negative_int_emit, simple_emit, PrimitiveRegistry};
use crate::repr::ErrorKind;
use crate::ty::RType;

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    registry.method_op(
        "__getitem__",
        vec![RType::DICT, RType::OBJECT],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = CPyDict_GetItem({args[0]}, {args[1]});"),
        1,
    );

    registry.method_op(
        "__setitem__",
        vec![RType::DICT, RType::OBJECT, RType::OBJECT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        simple_emit("{dest} = CPyDict_SetItem({args[0]}, {args[1]}, {args[2]}) >= 0;"),
        1,
    );

    registry.binary_op(
        "in",
        vec![RType::OBJECT, RType::DICT],
        RType::BOOL,
        ErrorKind::Magic,
        Some("{dest} = {args[0]} in {args[1]} :: dict"),
        negative_int_emit("{dest} = PyDict_Contains({args[1]}, {args[0]});"),
        1,
    );

    registry.method_op(
        "update",
        vec![RType::DICT, RType::DICT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        simple_emit("{dest} = CPyDict_Update({args[0]}, {args[1]}) != -1;"),
        2,
    );
    registry.method_op(
        "update",
        vec![RType::DICT, RType::OBJECT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        simple_emit("{dest} = CPyDict_UpdateFromSeq({args[0]}, {args[1]}) != -1;"),
        1,
    );

    registry.func_op(
        "builtins.dict",
        vec![],
        RType::DICT,
        ErrorKind::Magic,
        Some("{dest} = {{}}"),
        simple_emit("{dest} = PyDict_New();"),
        1,
    );
}
