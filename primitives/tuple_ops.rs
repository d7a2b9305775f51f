// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Primitives on variable-length tuples (tuple objects, not the unboxed
//! fixed-length tuple structs).

use std::rc::Rc;

use crate::primitives::{call_emit, EmitterInterface, PrimitiveRegistry};
use crate::repr::ErrorKind;
use crate::ty::RType;

fn new_tuple_emit(emitter: &mut dyn EmitterInterface, args: &[String], dest: &str) {
    let mut line = format!("{} = PyTuple_Pack({}", dest, args.len());
    for arg in args {
        line.push_str(", ");
        line.push_str(arg);
    }
    line.push_str(");");
    emitter.emit_line(&line);
}

fn len_emit(emitter: &mut dyn EmitterInterface, args: &[String], dest: &str) {
    let temp = emitter.temp_name();
    emitter.emit_declaration(&format!("Py_ssize_t {};", temp));
    emitter.emit_line(&format!("{} = PyTuple_GET_SIZE({});", temp, args[0]));
    emitter.emit_line(&format!("{} = CPyTagged_ShortFromSsize_t({});", dest, temp));
}

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    registry.method_op(
        "__getitem__",
        vec![RType::TUPLE, RType::INT],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        call_emit("CPySequenceTuple_GetItem"),
        1,
    );

    registry.custom_op(
        "new_tuple",
        vec![RType::OBJECT],
        Some(RType::TUPLE),
        true,
        ErrorKind::Magic,
        "{dest} = ({comma_args}) :: tuple",
        Rc::new(new_tuple_emit),
    );

    registry.func_op(
        "builtins.len",
        vec![RType::TUPLE],
        RType::INT,
        ErrorKind::Never,
        None,
        Rc::new(len_emit),
        1,
    );

    registry.func_op(
        "builtins.tuple",
        vec![RType::LIST],
        RType::TUPLE,
        ErrorKind::Magic,
        None,
        call_emit("PyList_AsTuple"),
        2,
    );
    registry.func_op(
        "builtins.tuple",
        vec![RType::OBJECT],
        RType::TUPLE,
        ErrorKind::Magic,
        None,
        call_emit("PySequence_Tuple"),
        1,
    );
}
