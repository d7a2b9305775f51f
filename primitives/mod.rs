// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The primitive-operation registry.
//!
//! Primitive ops are register operations on specific operand types whose
//! details live in data rather than in dedicated op kinds: an
//! `OpDescription` carries the signature, the failure discipline, the
//! pretty-printed form and the C emission recipe. The AST lowerer looks
//! ops up here by symbolic name and operand types; the IR core only
//! defines the data model and the matching rule.
//!
//! All entries are registered when the registry is constructed, by the
//! categorized modules below. There is no import-time or global
//! registration; a lowerer gets handed a registry and everything it can
//! emit is in there.

pub mod dict_ops;
pub mod exc_ops;
pub mod int_ops;
pub mod list_ops;
pub mod misc_ops;
pub mod set_ops;
pub mod str_ops;
pub mod tuple_ops;

use std::fmt::{Debug, Error, Formatter};
use std::rc::Rc;

use fnv::FnvHashMap;

use crate::repr::{Classes, ErrorKind, Register};
use crate::ty::{is_subtype, RType};

///////////////////////////////////////////////////////////////////////////
// Emission interface

/// What a primitive op's emit recipe may ask of the C back-end. The
/// back-end implements this; the core only defines the contract.
pub trait EmitterInterface {
    /// C name of a register.
    fn reg(&self, reg: Register) -> String;

    /// C spelling of a type's error sentinel.
    fn c_error_value(&self, ty: &RType) -> String;

    /// Fresh C-level temporary name.
    fn temp_name(&mut self) -> String;

    fn emit_line(&mut self, line: &str);

    fn emit_lines(&mut self, lines: &[&str]) {
        for line in lines {
            self.emit_line(line);
        }
    }

    /// Emit into the declarations section of the enclosing C function.
    fn emit_declaration(&mut self, line: &str);
}

/// Emission recipe of a primitive op: receives the C expressions for the
/// arguments and the C lvalue for the destination.
pub type EmitCallback = Rc<dyn Fn(&mut dyn EmitterInterface, &[String], &str)>;

///////////////////////////////////////////////////////////////////////////
// Op descriptions

/// Everything there is to know about one primitive operation.
pub struct OpDescription {
    pub name: String,
    pub arg_types: Vec<RType>,
    /// `None` for ops that produce no value.
    pub result_type: Option<RType>,
    pub is_var_arg: bool,
    pub error_kind: ErrorKind,
    /// Pretty-printer template; understands `{dest}`, `{args[i]}` and
    /// `{comma_args}`.
    pub format_str: String,
    pub emit: EmitCallback,
    /// Higher wins when several descriptions match the same operands.
    pub priority: u32,
}

impl Debug for OpDescription {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            fmt,
            "OpDescription(name={}, arg_types={:?}, result_type={:?}, error_kind={:?}, priority={})",
            self.name, self.arg_types, self.result_type, self.error_kind, self.priority
        )
    }
}

/// Expand a `format_str`-style template: `{dest}`, `{args[i]}`,
/// `{comma_args}`, with `{{`/`}}` as literal braces. Used both for
/// pretty-printing primitive ops and for the simple emit recipes.
pub fn apply_format(template: &str, dest: Option<&str>, args: &[&str]) -> String {
    let mut result = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    result.push('{');
                    continue;
                }
                let mut token = String::new();
                for t in &mut chars {
                    if t == '}' {
                        break;
                    }
                    token.push(t);
                }
                if token == "dest" {
                    result.push_str(dest.expect("format uses {dest} but op has no result"));
                } else if token == "comma_args" {
                    result.push_str(&args.join(", "));
                } else if token.starts_with("args[") && token.ends_with(']') {
                    let index: usize = token["args[".len()..token.len() - 1]
                        .parse()
                        .expect("malformed args index in format");
                    result.push_str(args[index]);
                } else {
                    panic!("invalid format sequence {{{}}}", token);
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                result.push('}');
            }
            _ => result.push(c),
        }
    }
    result
}

/// Emit recipe that expands a single C template line.
pub fn simple_emit<S: Into<String>>(template: S) -> EmitCallback {
    let template = template.into();
    Rc::new(move |emitter, args, dest| {
        let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        emitter.emit_line(&apply_format(&template, Some(dest), &args));
    })
}

/// Emit recipe for a plain C function call returning the result.
pub fn call_emit<S: Into<String>>(function: S) -> EmitCallback {
    let function = function.into();
    Rc::new(move |emitter, args, dest| {
        emitter.emit_line(&format!("{} = {}({});", dest, function, args.join(", ")));
    })
}

/// Emit recipe for a C function whose negative return value means
/// failure, for ops with a boolean-false error discipline.
pub fn call_negative_bool_emit<S: Into<String>>(function: S) -> EmitCallback {
    let function = function.into();
    Rc::new(move |emitter, args, dest| {
        emitter.emit_line(&format!("{} = {}({}) >= 0;", dest, function, args.join(", ")));
    })
}

/// Emit recipe wrapping a template whose int result is negative on
/// failure; converts it to a bool result with the bool error sentinel.
pub fn negative_int_emit<S: Into<String>>(template: S) -> EmitCallback {
    let template = template.into();
    Rc::new(move |emitter, args, dest| {
        let temp = emitter.temp_name();
        emitter.emit_declaration(&format!("int {};", temp));
        let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        emitter.emit_line(&apply_format(&template, Some(&temp), &args));
        emitter.emit_line(&format!("if ({} < 0)", temp));
        emitter.emit_line(&format!("    {} = {};", dest, RType::BOOL.error_value()));
        emitter.emit_line("else");
        emitter.emit_line(&format!("    {} = {};", dest, temp));
    })
}

///////////////////////////////////////////////////////////////////////////
// The registry

/// All registered primitive operations, indexed the way the lowerer asks
/// for them: binary/unary by operator token, functions by fully
/// qualified name, methods by bare method name, name refs by fully
/// qualified name. `custom` holds ops the lowerer uses directly by
/// symbolic handle rather than by source-level matching.
pub struct PrimitiveRegistry {
    binary_ops: FnvHashMap<String, Vec<Rc<OpDescription>>>,
    unary_ops: FnvHashMap<String, Vec<Rc<OpDescription>>>,
    func_ops: FnvHashMap<String, Vec<Rc<OpDescription>>>,
    method_ops: FnvHashMap<String, Vec<Rc<OpDescription>>>,
    name_ref_ops: FnvHashMap<String, Rc<OpDescription>>,
    custom_ops: FnvHashMap<String, Rc<OpDescription>>,
}

impl PrimitiveRegistry {
    /// Build the registry with every categorized module's entries.
    pub fn new() -> PrimitiveRegistry {
        let mut registry = PrimitiveRegistry {
            binary_ops: FnvHashMap::default(),
            unary_ops: FnvHashMap::default(),
            func_ops: FnvHashMap::default(),
            method_ops: FnvHashMap::default(),
            name_ref_ops: FnvHashMap::default(),
            custom_ops: FnvHashMap::default(),
        };
        int_ops::register(&mut registry);
        str_ops::register(&mut registry);
        list_ops::register(&mut registry);
        dict_ops::register(&mut registry);
        set_ops::register(&mut registry);
        tuple_ops::register(&mut registry);
        exc_ops::register(&mut registry);
        misc_ops::register(&mut registry);
        registry
    }

    #[allow(clippy::too_many_arguments)]
    pub fn binary_op(
        &mut self,
        op: &str,
        arg_types: Vec<RType>,
        result_type: RType,
        error_kind: ErrorKind,
        format_str: Option<&str>,
        emit: EmitCallback,
        priority: u32,
    ) -> Rc<OpDescription> {
        let format_str = match format_str {
            Some(s) => s.to_owned(),
            None => format!("{{dest}} = {{args[0]}} {} {{args[1]}}", op),
        };
        let desc = Rc::new(OpDescription {
            name: op.to_owned(),
            arg_types,
            result_type: Some(result_type),
            is_var_arg: false,
            error_kind,
            format_str,
            emit,
            priority,
        });
        self.binary_ops.entry(op.to_owned()).or_insert_with(Vec::new).push(desc.clone());
        desc
    }

    #[allow(clippy::too_many_arguments)]
    pub fn unary_op(
        &mut self,
        op: &str,
        arg_type: RType,
        result_type: RType,
        error_kind: ErrorKind,
        format_str: Option<&str>,
        emit: EmitCallback,
        priority: u32,
    ) -> Rc<OpDescription> {
        let format_str = match format_str {
            Some(s) => s.to_owned(),
            None => format!("{{dest}} = {}{{args[0]}}", op),
        };
        let desc = Rc::new(OpDescription {
            name: op.to_owned(),
            arg_types: vec![arg_type],
            result_type: Some(result_type),
            is_var_arg: false,
            error_kind,
            format_str,
            emit,
            priority,
        });
        self.unary_ops.entry(op.to_owned()).or_insert_with(Vec::new).push(desc.clone());
        desc
    }

    /// Register an op matched against calls of a global function such as
    /// `builtins.len`.
    #[allow(clippy::too_many_arguments)]
    pub fn func_op(
        &mut self,
        name: &str,
        arg_types: Vec<RType>,
        result_type: RType,
        error_kind: ErrorKind,
        format_str: Option<&str>,
        emit: EmitCallback,
        priority: u32,
    ) -> Rc<OpDescription> {
        let format_str = match format_str {
            Some(s) => s.to_owned(),
            None => format!("{{dest}} = {}({{comma_args}})", short_name(name)),
        };
        let desc = Rc::new(OpDescription {
            name: name.to_owned(),
            arg_types,
            result_type: Some(result_type),
            is_var_arg: false,
            error_kind,
            format_str,
            emit,
            priority,
        });
        self.func_ops.entry(name.to_owned()).or_insert_with(Vec::new).push(desc.clone());
        desc
    }

    /// Register an op matched against method calls; the receiver is the
    /// first argument type.
    #[allow(clippy::too_many_arguments)]
    pub fn method_op(
        &mut self,
        name: &str,
        arg_types: Vec<RType>,
        result_type: Option<RType>,
        error_kind: ErrorKind,
        format_str: Option<&str>,
        emit: EmitCallback,
        priority: u32,
    ) -> Rc<OpDescription> {
        let format_str = match format_str {
            Some(s) => s.to_owned(),
            None => {
                let rest: Vec<String> =
                    (1..arg_types.len()).map(|i| format!("{{args[{}]}}", i)).collect();
                format!("{{dest}} = {{args[0]}}.{}({})", name, rest.join(", "))
            }
        };
        let desc = Rc::new(OpDescription {
            name: name.to_owned(),
            arg_types,
            result_type,
            is_var_arg: false,
            error_kind,
            format_str,
            emit,
            priority,
        });
        self.method_ops.entry(name.to_owned()).or_insert_with(Vec::new).push(desc.clone());
        desc
    }

    /// Register an op that loads a fully qualified name such as
    /// `builtins.True`.
    pub fn name_ref_op(
        &mut self,
        name: &str,
        result_type: RType,
        error_kind: ErrorKind,
        emit: EmitCallback,
    ) -> Rc<OpDescription> {
        let desc = Rc::new(OpDescription {
            name: name.to_owned(),
            arg_types: vec![],
            result_type: Some(result_type),
            is_var_arg: false,
            error_kind,
            format_str: format!("{{dest}} = {}", short_name(name)),
            emit,
            priority: 1,
        });
        let prev = self.name_ref_ops.insert(name.to_owned(), desc.clone());
        assert!(prev.is_none(), "duplicate name_ref op {}", name);
        desc
    }

    /// Register an op the lowerer picks up by handle instead of by
    /// source-level matching (tuple construction, exception plumbing and
    /// the like).
    #[allow(clippy::too_many_arguments)]
    pub fn custom_op(
        &mut self,
        name: &str,
        arg_types: Vec<RType>,
        result_type: Option<RType>,
        is_var_arg: bool,
        error_kind: ErrorKind,
        format_str: &str,
        emit: EmitCallback,
    ) -> Rc<OpDescription> {
        let desc = Rc::new(OpDescription {
            name: name.to_owned(),
            arg_types,
            result_type,
            is_var_arg,
            error_kind,
            format_str: format_str.to_owned(),
            emit,
            priority: 1,
        });
        let prev = self.custom_ops.insert(name.to_owned(), desc.clone());
        assert!(prev.is_none(), "duplicate custom op {}", name);
        desc
    }

    pub fn binary_candidates(&self, op: &str) -> &[Rc<OpDescription>] {
        self.binary_ops.get(op).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn unary_candidates(&self, op: &str) -> &[Rc<OpDescription>] {
        self.unary_ops.get(op).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn func_candidates(&self, name: &str) -> &[Rc<OpDescription>] {
        self.func_ops.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn method_candidates(&self, name: &str) -> &[Rc<OpDescription>] {
        self.method_ops.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn name_ref(&self, name: &str) -> Option<&Rc<OpDescription>> {
        self.name_ref_ops.get(name)
    }

    pub fn custom(&self, name: &str) -> &Rc<OpDescription> {
        &self.custom_ops[name]
    }
}

impl Default for PrimitiveRegistry {
    fn default() -> PrimitiveRegistry {
        PrimitiveRegistry::new()
    }
}

fn short_name(name: &str) -> &str {
    if name.starts_with("builtins.") {
        &name["builtins.".len()..]
    } else {
        name
    }
}

/// Find the description matching the given operand types.
///
/// A candidate matches when it has the right arity and every operand is
/// a subtype of the corresponding formal. Among several matches the
/// highest priority wins; two matches with equal priority are a bug in
/// the registration modules and abort.
pub fn matching_primitive_op(
    candidates: &[Rc<OpDescription>],
    actual_types: &[&RType],
    classes: &Classes,
) -> Option<Rc<OpDescription>> {
    let mut matching: Option<&Rc<OpDescription>> = None;
    for desc in candidates {
        if desc.arg_types.len() != actual_types.len() {
            continue;
        }
        let fits = actual_types
            .iter()
            .zip(desc.arg_types.iter())
            .all(|(actual, formal)| is_subtype(actual, formal, classes));
        if !fits {
            continue;
        }
        match matching {
            Some(prev) => {
                assert!(
                    prev.priority != desc.priority,
                    "ambiguous primitive ops:\n1) {:?}\n2) {:?}",
                    prev,
                    desc
                );
                if desc.priority > prev.priority {
                    matching = Some(desc);
                }
            }
            None => matching = Some(desc),
        }
    }
    matching.cloned()
}
