// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! String primitives.

use std::rc::Rc;

use crate::primitives::{simple_emit, EmitCallback, PrimitiveRegistry};
use crate::repr::ErrorKind;
use crate::ty::RType;

/// PyUnicode_Compare reports both "less than" and "error" as -1; the
/// error case has to be separated with PyErr_Occurred.
fn str_compare_emit(comparison: &'static str) -> EmitCallback {
    Rc::new(move |emitter, args, dest| {
        let temp = emitter.temp_name();
        emitter.emit_declaration(&format!("int {};", temp));
        emitter.emit_line(&format!("{} = PyUnicode_Compare({}, {});", temp, args[0], args[1]));
        emitter.emit_line(&format!("if ({} == -1 && PyErr_Occurred())", temp));
        emitter.emit_line(&format!("    {} = 2;", dest));
        emitter.emit_line("else");
        emitter.emit_line(&format!("    {} = ({} {});", dest, temp, comparison));
    })
}

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    registry.name_ref_op(
        "builtins.str",
        RType::OBJECT,
        ErrorKind::Never,
        simple_emit("{dest} = (PyObject *)&PyUnicode_Type;"),
    );

    registry.func_op(
        "builtins.str",
        vec![RType::OBJECT],
        RType::STR,
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = PyObject_Str({args[0]});"),
        1,
    );

    registry.binary_op(
        "+",
        vec![RType::STR, RType::STR],
        RType::STR,
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = PyUnicode_Concat({args[0]}, {args[1]});"),
        1,
    );

    // PyUnicode_Append makes an effort to reuse the LHS buffer when its
    // refcount is 1, which is why the augmented form gets its own op.
    registry.binary_op(
        "+=",
        vec![RType::STR, RType::STR],
        RType::STR,
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = {args[0]}; PyUnicode_Append(&{dest}, {args[1]});"),
        1,
    );

    registry.method_op(
        "join",
        vec![RType::STR, RType::OBJECT],
        Some(RType::STR),
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = PyUnicode_Join({args[0]}, {args[1]});"),
        1,
    );

    registry.method_op(
        "split",
        vec![RType::STR, RType::STR],
        Some(RType::LIST),
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = PyUnicode_Split({args[0]}, {args[1]}, -1);"),
        1,
    );

    registry.binary_op(
        "==",
        vec![RType::STR, RType::STR],
        RType::BOOL,
        ErrorKind::Magic,
        None,
        str_compare_emit("== 0"),
        1,
    );
    registry.binary_op(
        "!=",
        vec![RType::STR, RType::STR],
        RType::BOOL,
        ErrorKind::Magic,
        None,
        str_compare_emit("!= 0"),
        1,
    );
}
