// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runtime types for the register IR.
//!
//! These are erased, concrete types: no generics and no type variables.
//! Every register has exactly one `RType`, fixed when the register is
//! created. A type knows its C representation, whether that representation
//! is unboxed, whether values of the type participate in reference
//! counting, and which bit pattern serves as its error sentinel.

use std::fmt;

use crate::repr::{ClassId, Classes};

/// The built-in primitive types.
///
/// `Int` uses a tagged pointer-sized representation (`CPyTagged`);
/// `ShortInt` is the subrange of `Int` that is statically known to fit in
/// the tag, which lets some primitives skip overflow and bounds checks.
/// `Bool` is a single byte. `Tuple` here is the *variable-length* tuple
/// object; fixed-length tuples are `RType::Tuple` structs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PrimitiveKind {
    Int,
    ShortInt,
    Bool,
    Float,
    Str,
    List,
    Dict,
    Set,
    Tuple,
    Object,
    NoneType,
}

/// A runtime type descriptor.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RType {
    /// The unit type of ops that produce no value.
    Void,

    Primitive(PrimitiveKind),

    /// Fixed-length tuple, represented as an unboxed C struct.
    Tuple(Vec<RType>),

    /// Instance of a compiled user-defined class. The name is the class
    /// name and is redundant with the id (ids are unique per run); it is
    /// carried so types print without access to the class table.
    Instance { class: ClassId, name: String },

    /// Optional[x]. Always boxed, since None needs a representation.
    Optional(Box<RType>),
}

impl RType {
    pub const VOID: RType = RType::Void;
    pub const INT: RType = RType::Primitive(PrimitiveKind::Int);
    pub const SHORT_INT: RType = RType::Primitive(PrimitiveKind::ShortInt);
    pub const BOOL: RType = RType::Primitive(PrimitiveKind::Bool);
    pub const FLOAT: RType = RType::Primitive(PrimitiveKind::Float);
    pub const STR: RType = RType::Primitive(PrimitiveKind::Str);
    pub const LIST: RType = RType::Primitive(PrimitiveKind::List);
    pub const DICT: RType = RType::Primitive(PrimitiveKind::Dict);
    pub const SET: RType = RType::Primitive(PrimitiveKind::Set);
    pub const TUPLE: RType = RType::Primitive(PrimitiveKind::Tuple);
    pub const OBJECT: RType = RType::Primitive(PrimitiveKind::Object);
    pub const NONE: RType = RType::Primitive(PrimitiveKind::NoneType);

    pub fn tuple(types: Vec<RType>) -> RType {
        RType::Tuple(types)
    }

    pub fn instance(class: ClassId, name: &str) -> RType {
        RType::Instance { class, name: name.to_owned() }
    }

    pub fn optional(value: RType) -> RType {
        RType::Optional(Box::new(value))
    }

    pub fn is_void(&self) -> bool {
        *self == RType::Void
    }

    /// Both `int` and `short_int` use the tagged integer representation.
    pub fn is_int(&self) -> bool {
        matches!(
            self,
            RType::Primitive(PrimitiveKind::Int) | RType::Primitive(PrimitiveKind::ShortInt)
        )
    }

    pub fn is_bool(&self) -> bool {
        *self == RType::BOOL
    }

    pub fn is_object(&self) -> bool {
        *self == RType::OBJECT
    }

    pub fn is_none(&self) -> bool {
        *self == RType::NONE
    }

    /// Is the C representation something other than a `PyObject *`?
    pub fn is_unboxed(&self) -> bool {
        match self {
            RType::Primitive(k) => matches!(
                k,
                PrimitiveKind::Int | PrimitiveKind::ShortInt | PrimitiveKind::Bool
            ),
            RType::Tuple(_) => true,
            _ => false,
        }
    }

    /// Do values of this type participate in reference counting?
    ///
    /// Tagged ints do (a long int holds a heap object behind the tag), a
    /// fixed-length tuple does iff any of its elements does. Bools and
    /// short ints never point into the heap.
    pub fn is_refcounted(&self) -> bool {
        match self {
            RType::Void => false,
            RType::Primitive(k) => {
                !matches!(k, PrimitiveKind::Bool | PrimitiveKind::ShortInt)
            }
            RType::Tuple(types) => types.iter().any(|t| t.is_refcounted()),
            RType::Instance { .. } | RType::Optional(_) => true,
        }
    }

    /// The C-level bit pattern that signals an error for ops with
    /// `ErrorKind::Magic` results of this type.
    ///
    /// Integers reserve an invalid tag value; object pointers use NULL;
    /// bools use the out-of-range byte 2. Tuple structs fail element-wise.
    pub fn error_value(&self) -> String {
        match self {
            RType::Void => panic!("void has no error value"),
            RType::Primitive(k) => match k {
                PrimitiveKind::Int | PrimitiveKind::ShortInt => "CPY_INT_TAG".to_owned(),
                PrimitiveKind::Bool => "2".to_owned(),
                _ => "NULL".to_owned(),
            },
            RType::Tuple(types) => {
                let items: Vec<String> = types.iter().map(|t| t.error_value()).collect();
                format!("{{ {} }}", items.join(", "))
            }
            RType::Instance { .. } | RType::Optional(_) => "NULL".to_owned(),
        }
    }

    /// The bit pattern locals are initialized to before their first
    /// assignment. Shared with the error sentinel; the two are only
    /// distinguishable by where they are consulted.
    pub fn undefined_value(&self) -> String {
        self.error_value()
    }

    /// The C type used to declare values of this type. Total for every
    /// type including `Void`; the back-end relies on that.
    pub fn ctype(&self) -> String {
        match self {
            RType::Void => "void".to_owned(),
            RType::Primitive(k) => match k {
                PrimitiveKind::Int | PrimitiveKind::ShortInt => "CPyTagged".to_owned(),
                PrimitiveKind::Bool => "char".to_owned(),
                _ => "PyObject *".to_owned(),
            },
            // Each distinct element list gets one struct declaration; the
            // back-end dedupes on structural type equality, so the name
            // only has to be injective.
            RType::Tuple(types) => {
                let mut name = "tuple".to_owned();
                for t in types {
                    name.push('_');
                    name.push_str(&t.ctype().replace(" *", "_ptr").replace(' ', "_"));
                }
                name
            }
            RType::Instance { .. } | RType::Optional(_) => "PyObject *".to_owned(),
        }
    }
}

impl fmt::Display for RType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RType::Void => write!(f, "void"),
            RType::Primitive(k) => {
                let name = match k {
                    PrimitiveKind::Int => "int",
                    PrimitiveKind::ShortInt => "short_int",
                    PrimitiveKind::Bool => "bool",
                    PrimitiveKind::Float => "float",
                    PrimitiveKind::Str => "str",
                    PrimitiveKind::List => "list",
                    PrimitiveKind::Dict => "dict",
                    PrimitiveKind::Set => "set",
                    PrimitiveKind::Tuple => "tuple",
                    PrimitiveKind::Object => "object",
                    PrimitiveKind::NoneType => "None",
                };
                write!(f, "{}", name)
            }
            RType::Tuple(types) => {
                let items: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                write!(f, "tuple[{}]", items.join(", "))
            }
            RType::Instance { name, .. } => write!(f, "{}", name),
            RType::Optional(value) => write!(f, "optional[{}]", value),
        }
    }
}

/// Is `left` usable where `right` is expected, without any conversion?
///
/// This is the relation the primitive-op registry matches argument types
/// with. Everything is a subtype of `object`; a bool is a subtype of int
/// (both are tagged, a bool's values are valid tags); a short int is a
/// subtype of int; a tuple struct is a subtype of the generic tuple
/// object type only for matching purposes (the registry's formal types
/// never require an unboxed tuple where a boxed one is passed -- the
/// lowerer boxes first).
pub fn is_subtype(left: &RType, right: &RType, classes: &Classes) -> bool {
    if right.is_object() {
        return true;
    }
    if let RType::Optional(value) = right {
        if is_subtype(left, &RType::NONE, classes) || is_subtype(left, value, classes) {
            return true;
        }
    }
    match left {
        RType::Void => matches!(right, RType::Void),
        RType::Primitive(k) => {
            if matches!(k, PrimitiveKind::Bool | PrimitiveKind::ShortInt)
                && *right == RType::INT
            {
                return true;
            }
            left == right
        }
        RType::Tuple(types) => match right {
            RType::Primitive(PrimitiveKind::Tuple) => true,
            RType::Tuple(rtypes) => {
                types.len() == rtypes.len()
                    && types
                        .iter()
                        .zip(rtypes.iter())
                        .all(|(t, r)| is_subtype(t, r, classes))
            }
            _ => false,
        },
        RType::Instance { class, .. } => match right {
            RType::Instance { class: rclass, .. } => classes.mro(*class).contains(rclass),
            _ => false,
        },
        RType::Optional(value) => match right {
            RType::Optional(rvalue) => is_subtype(value, rvalue, classes),
            _ => false,
        },
    }
}

/// Structural type equality. The back-end relies on this for deduplicating
/// tuple struct declarations.
pub fn is_same_type(a: &RType, b: &RType) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{ClassIr, Classes};

    #[test]
    fn primitive_representations() {
        assert!(RType::INT.is_unboxed());
        assert!(RType::INT.is_refcounted());
        assert!(RType::BOOL.is_unboxed());
        assert!(!RType::BOOL.is_refcounted());
        assert!(!RType::SHORT_INT.is_refcounted());
        assert!(!RType::LIST.is_unboxed());
        assert!(RType::LIST.is_refcounted());
        assert_eq!(RType::INT.error_value(), "CPY_INT_TAG");
        assert_eq!(RType::BOOL.error_value(), "2");
        assert_eq!(RType::OBJECT.error_value(), "NULL");
        assert_eq!(RType::INT.ctype(), "CPyTagged");
        assert_eq!(RType::VOID.ctype(), "void");
    }

    #[test]
    fn tuple_struct_refcounting_follows_elements() {
        let all_unboxed = RType::tuple(vec![RType::BOOL, RType::BOOL]);
        assert!(all_unboxed.is_unboxed());
        assert!(!all_unboxed.is_refcounted());

        let mixed = RType::tuple(vec![RType::BOOL, RType::STR]);
        assert!(mixed.is_refcounted());
        assert_eq!(mixed.error_value(), "{ 2, NULL }");
    }

    #[test]
    fn display_forms() {
        assert_eq!(RType::NONE.to_string(), "None");
        assert_eq!(
            RType::tuple(vec![RType::INT, RType::BOOL]).to_string(),
            "tuple[int, bool]"
        );
        assert_eq!(RType::optional(RType::STR).to_string(), "optional[str]");
    }

    #[test]
    fn subtyping() {
        let classes = Classes::default();
        assert!(is_subtype(&RType::INT, &RType::OBJECT, &classes));
        assert!(is_subtype(&RType::BOOL, &RType::INT, &classes));
        assert!(is_subtype(&RType::SHORT_INT, &RType::INT, &classes));
        assert!(!is_subtype(&RType::INT, &RType::BOOL, &classes));
        assert!(is_subtype(&RType::NONE, &RType::optional(RType::STR), &classes));
        assert!(is_subtype(&RType::STR, &RType::optional(RType::STR), &classes));
        assert!(!is_subtype(&RType::INT, &RType::optional(RType::STR), &classes));
        assert!(is_subtype(
            &RType::tuple(vec![RType::INT, RType::INT]),
            &RType::TUPLE,
            &classes
        ));
        assert!(is_subtype(
            &RType::tuple(vec![RType::BOOL, RType::INT]),
            &RType::tuple(vec![RType::INT, RType::INT]),
            &classes
        ));
    }

    #[test]
    fn instance_subtyping_uses_mro() {
        let mut classes = Classes::default();
        let base = classes.add(ClassIr::new("Base", "mod"));
        let derived = classes.add(ClassIr::new("Derived", "mod"));
        classes.get_mut(derived).base = Some(base);
        classes.get_mut(derived).mro = vec![derived, base];

        let base_t = RType::instance(base, "Base");
        let derived_t = RType::instance(derived, "Derived");
        assert!(is_subtype(&derived_t, &base_t, &classes));
        assert!(!is_subtype(&base_t, &derived_t, &classes));
        assert!(is_same_type(&base_t, &base_t));
        assert!(!is_same_type(&base_t, &derived_t));
    }
}
