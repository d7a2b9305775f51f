// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Miscellaneous primitives.

use std::rc::Rc;

use crate::primitives::{negative_int_emit, simple_emit, EmitterInterface, PrimitiveRegistry};
use crate::repr::ErrorKind;
use crate::ty::RType;

fn none_emit(emitter: &mut dyn EmitterInterface, _args: &[String], dest: &str) {
    emitter.emit_line(&format!("{} = Py_None;", dest));
    emitter.emit_line(&format!("Py_INCREF({});", dest));
}

pub(crate) fn register(registry: &mut PrimitiveRegistry) {
    registry.name_ref_op("builtins.None", RType::NONE, ErrorKind::Never, Rc::new(none_emit));

    registry.name_ref_op("builtins.True", RType::BOOL, ErrorKind::Never, simple_emit("{dest} = 1;"));

    registry.name_ref_op(
        "builtins.False",
        RType::BOOL,
        ErrorKind::Never,
        simple_emit("{dest} = 0;"),
    );

    registry.func_op(
        "builtins.bool",
        vec![RType::OBJECT],
        RType::BOOL,
        ErrorKind::Magic,
        None,
        negative_int_emit("{dest} = PyObject_IsTrue({args[0]});"),
        1,
    );

    // Object identity; never fails and ignores __eq__.
    registry.binary_op(
        "is",
        vec![RType::OBJECT, RType::OBJECT],
        RType::BOOL,
        ErrorKind::Never,
        None,
        simple_emit("{dest} = {args[0]} == {args[1]};"),
        1,
    );
    registry.binary_op(
        "is not",
        vec![RType::OBJECT, RType::OBJECT],
        RType::BOOL,
        ErrorKind::Never,
        None,
        simple_emit("{dest} = {args[0]} != {args[1]};"),
        1,
    );
}
