// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! List primitives.

use std::rc::Rc;

use crate::primitives::{
    call_emit, call_negative_bool_emit, simple_emit, EmitCallback, EmitterInterface,
    PrimitiveRegistry,
};
use crate::repr::ErrorKind;
use crate::ty::RType;

fn new_list_emit(emitter: &mut dyn EmitterInterface, args: &[String], dest: &str) {
    emitter.emit_line(&format!("{} = PyList_New({});", dest, args.len()));
    emitter.emit_line(&format!("if (likely({} != NULL)) {{", dest));
    for (i, arg) in args.iter().enumerate() {
        emitter.emit_line(&format!("PyList_SET_ITEM({}, {}, {});", dest, i, arg));
    }
    emitter.emit_line("}");
}

fn len_emit(emitter: &mut dyn EmitterInterface, args: &[String], dest: &str) {
    let temp = emitter.temp_name();
    emitter.emit_declaration(&format!("Py_ssize_t {};", temp));
    emitter.emit_line(&format!("{} = PyList_GET_SIZE({});", temp, args[0]));
    emitter.emit_line(&format!("{} = CPyTagged_ShortFromSsize_t({});", dest, temp));
}

fn multiply_emit(reversed: bool) -> EmitCallback {
    Rc::new(move |emitter, args, dest| {
        let (lst, num) = if reversed { (&args[1], &args[0]) } else { (&args[0], &args[1]) };
        let temp = emitter.temp_name();
        emitter.emit_declaration(&format!("Py_ssize_t {};", temp));
        emitter.emit_lines(&[
            &format!("{} = CPyTagged_AsSsize_t({});", temp, num),
            &format!("if ({} == -1 && PyErr_Occurred())", temp),
            "    CPyError_OutOfMemory();",
            &format!("{} = PySequence_Repeat({}, {});", dest, lst, temp),
        ]);
    })
}

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    registry.name_ref_op(
        "builtins.list",
        RType::OBJECT,
        ErrorKind::Never,
        simple_emit("{dest} = (PyObject *)&PyList_Type;"),
    );

    registry.func_op(
        "builtins.list",
        vec![RType::OBJECT],
        RType::LIST,
        ErrorKind::Magic,
        None,
        call_emit("PySequence_List"),
        1,
    );

    registry.custom_op(
        "new_list",
        vec![RType::OBJECT],
        Some(RType::LIST),
        true,
        ErrorKind::Magic,
        "{dest} = [{comma_args}]",
        Rc::new(new_list_emit),
    );

    registry.method_op(
        "__getitem__",
        vec![RType::LIST, RType::INT],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        call_emit("CPyList_GetItem"),
        1,
    );

    // Version with no int bounds check for when the index is known to be
    // short.
    registry.method_op(
        "__getitem__",
        vec![RType::LIST, RType::SHORT_INT],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        call_emit("CPyList_GetItemShort"),
        2,
    );

    // Assumes a non-negative short integer index that is in bounds.
    registry.custom_op(
        "list_get_item_unsafe",
        vec![RType::LIST, RType::SHORT_INT],
        Some(RType::OBJECT),
        false,
        ErrorKind::Never,
        "{dest} = {args[0]}[{args[1]}] :: unsafe list",
        simple_emit("{dest} = CPyList_GetItemUnsafe({args[0]}, {args[1]});"),
    );

    registry.method_op(
        "__setitem__",
        vec![RType::LIST, RType::INT, RType::OBJECT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        call_emit("CPyList_SetItem"),
        1,
    );

    registry.method_op(
        "append",
        vec![RType::LIST, RType::OBJECT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        call_negative_bool_emit("PyList_Append"),
        1,
    );

    registry.method_op(
        "extend",
        vec![RType::LIST, RType::OBJECT],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = _PyList_Extend((PyListObject *) {args[0]}, {args[1]});"),
        1,
    );

    registry.method_op(
        "pop",
        vec![RType::LIST],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        call_emit("CPyList_PopLast"),
        1,
    );
    registry.method_op(
        "pop",
        vec![RType::LIST, RType::INT],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        call_emit("CPyList_Pop"),
        1,
    );

    registry.method_op(
        "count",
        vec![RType::LIST, RType::OBJECT],
        Some(RType::SHORT_INT),
        ErrorKind::Magic,
        None,
        call_emit("CPyList_Count"),
        1,
    );

    registry.binary_op(
        "*",
        vec![RType::LIST, RType::INT],
        RType::LIST,
        ErrorKind::Magic,
        Some("{dest} = {args[0]} * {args[1]} :: list"),
        multiply_emit(false),
        1,
    );
    registry.binary_op(
        "*",
        vec![RType::INT, RType::LIST],
        RType::LIST,
        ErrorKind::Magic,
        Some("{dest} = {args[0]} * {args[1]} :: list"),
        multiply_emit(true),
        1,
    );

    registry.func_op(
        "builtins.len",
        vec![RType::LIST],
        RType::SHORT_INT,
        ErrorKind::Never,
        None,
        Rc::new(len_emit),
        1,
    );
}
