// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Exception-related primitives. These are all custom ops wired in by
//! the lowerer when it translates raise statements and try/except
//! frames, never matched from source-level expressions.

use crate::primitives::{simple_emit, PrimitiveRegistry};
use crate::repr::ErrorKind;
use crate::ty::RType;

/// The (type, value, traceback) triple saved by an except frame.
fn exc_tuple() -> RType {
    RType::tuple(vec![RType::OBJECT, RType::OBJECT, RType::OBJECT])
}

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    registry.custom_op(
        "raise_exception",
        vec![RType::OBJECT, RType::OBJECT],
        Some(RType::BOOL),
        false,
        ErrorKind::False,
        "raise_exception({args[0]}, {args[1]}); {dest} = 0",
        simple_emit("PyErr_SetObject({args[0]}, {args[1]}); {dest} = 0;"),
    );

    registry.custom_op(
        "clear_exception",
        vec![],
        None,
        false,
        ErrorKind::Never,
        "clear_exception",
        simple_emit("PyErr_Clear();"),
    );

    registry.func_op(
        "no_err_occurred",
        vec![],
        RType::BOOL,
        ErrorKind::False,
        None,
        simple_emit("{dest} = (PyErr_Occurred() == NULL);"),
        1,
    );

    registry.custom_op(
        "error_catch",
        vec![],
        Some(exc_tuple()),
        false,
        ErrorKind::Never,
        "{dest} = err_catch",
        simple_emit("CPy_CatchError(&{dest}.f0, &{dest}.f1, &{dest}.f2);"),
    );

    registry.custom_op(
        "clear_exc_info",
        vec![],
        None,
        false,
        ErrorKind::Never,
        "clear_exc_info",
        simple_emit("PyErr_SetExcInfo(NULL, NULL, NULL);"),
    );
}
