// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Set and frozenset primitives.

use std::rc::Rc;

use crate::primitives::{
    call_emit, call_negative_bool_emit, negative_int_emit, simple_emit, EmitterInterface,
    PrimitiveRegistry,
};
use crate::repr::ErrorKind;
use crate::ty::RType;

fn len_emit(emitter: &mut dyn EmitterInterface, args: &[String], dest: &str) {
    let temp = emitter.temp_name();
    emitter.emit_declaration(&format!("Py_ssize_t {};", temp));
    emitter.emit_line(&format!("{} = PySet_GET_SIZE({});", temp, args[0]));
    emitter.emit_line(&format!("{} = CPyTagged_ShortFromSsize_t({});", dest, temp));
}

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    registry.func_op(
        "builtins.set",
        vec![],
        RType::SET,
        ErrorKind::Magic,
        None,
        simple_emit("{dest} = PySet_New(NULL);"),
        1,
    );
    registry.func_op(
        "builtins.set",
        vec![RType::OBJECT],
        RType::SET,
        ErrorKind::Magic,
        None,
        call_emit("PySet_New"),
        1,
    );

    registry.func_op(
        "builtins.frozenset",
        vec![RType::OBJECT],
        RType::OBJECT,
        ErrorKind::Magic,
        None,
        call_emit("PyFrozenSet_New"),
        1,
    );

    registry.func_op(
        "builtins.len",
        vec![RType::SET],
        RType::INT,
        ErrorKind::Never,
        None,
        Rc::new(len_emit),
        1,
    );

    registry.binary_op(
        "in",
        vec![RType::OBJECT, RType::SET],
        RType::BOOL,
        ErrorKind::Magic,
        Some("{dest} = {args[0]} in {args[1]} :: set"),
        negative_int_emit("{dest} = PySet_Contains({args[1]}, {args[0]});"),
        1,
    );

    registry.method_op(
        "remove",
        vec![RType::SET, RType::OBJECT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        call_negative_bool_emit("CPySet_Remove"),
        1,
    );
    registry.method_op(
        "discard",
        vec![RType::SET, RType::OBJECT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        call_negative_bool_emit("PySet_Discard"),
        1,
    );
    registry.method_op(
        "add",
        vec![RType::SET, RType::OBJECT],
        Some(RType::BOOL),
        ErrorKind::False,
        None,
        call_negative_bool_emit("PySet_Add"),
        1,
    );
    registry.method_op(
        "pop",
        vec![RType::SET],
        Some(RType::OBJECT),
        ErrorKind::Magic,
        None,
        call_emit("PySet_Pop"),
        1,
    );
}
