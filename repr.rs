// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The register-based IR.
//!
//! Ops operate on abstract registers. Each register has a type and a
//! name, recorded in a per-function environment; a register can hold a
//! local variable, an argument, an intermediate value of an expression,
//! or a condition flag. Ops are grouped into basic blocks ending in a
//! terminator (goto, branch, return or unreachable).
//!
//! While the IR is being built, ops that can raise may appear in the
//! middle of a basic block; the exception-splitting transform later
//! inserts the explicit error checks and splits blocks so that a
//! terminator can only ever be the final op of a block.
//!
//! Blocks and registers are referenced by opaque indices (`Block`,
//! `Register`) into the function's block list and environment. Indices
//! stay valid across transforms: blocks are only ever appended or
//! re-linked, never deleted, and the environment only grows.

use std::fmt::{Debug, Error, Formatter};
use std::rc::Rc;
use std::u32;

use fnv::FnvHashMap;
use smallvec::SmallVec;

use crate::primitives::OpDescription;
use crate::ty::RType;

/// Line number used when an op has no source location worth a traceback.
pub const NO_TRACEBACK_LINE_NO: i32 = -1;

///////////////////////////////////////////////////////////////////////////
// Registers and the environment

/// The index of a register in its function's environment.
///
/// (We use a `u32` internally just to save memory.)
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(u32);

impl Register {
    pub fn new(index: usize) -> Register {
        assert!(index < (u32::MAX as usize));
        Register(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for Register {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "R({})", self.0)
    }
}

/// What the environment knows about one register.
pub struct RegisterData {
    pub name: String,
    pub ty: RType,

    /// Arguments are borrowed from the caller on entry; everything else
    /// starts out undefined and becomes owned when written.
    pub is_arg: bool,
}

/// Per-function register table and symbol table.
///
/// Registers are appended and never removed; their insertion order is the
/// order the pretty printer lists them in. Temporaries get generated
/// `r<N>` names.
#[derive(Default)]
pub struct Environment {
    regs: Vec<RegisterData>,
    symtable: FnvHashMap<String, Register>,
    temp_index: u32,
}

impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    pub fn num_regs(&self) -> usize {
        self.regs.len()
    }

    pub fn regs(&self) -> impl Iterator<Item = Register> {
        (0..self.regs.len()).map(Register::new)
    }

    pub fn data(&self, reg: Register) -> &RegisterData {
        &self.regs[reg.index()]
    }

    pub fn ty(&self, reg: Register) -> &RType {
        &self.regs[reg.index()].ty
    }

    pub fn name(&self, reg: Register) -> &str {
        &self.regs[reg.index()].name
    }

    pub fn is_arg(&self, reg: Register) -> bool {
        self.regs[reg.index()].is_arg
    }

    /// Is the register's value borrowed on function entry? (Identical to
    /// `is_arg` today; the distinction is kept because the refcount
    /// transform cares about borrowing, not argument-ness.)
    pub fn is_borrowed(&self, reg: Register) -> bool {
        self.regs[reg.index()].is_arg
    }

    fn add(&mut self, name: String, ty: RType, is_arg: bool) -> Register {
        let reg = Register::new(self.regs.len());
        self.regs.push(RegisterData { name, ty, is_arg });
        reg
    }

    /// Add an argument register. Arguments must be added before any other
    /// register so that argument indices match signature positions.
    pub fn add_arg(&mut self, name: &str, ty: RType) -> Register {
        let reg = self.add(name.to_owned(), ty, true);
        self.symtable.insert(name.to_owned(), reg);
        reg
    }

    /// Add a register for a named local variable.
    pub fn add_local(&mut self, name: &str, ty: RType) -> Register {
        let reg = self.add(name.to_owned(), ty, false);
        self.symtable.insert(name.to_owned(), reg);
        reg
    }

    /// Add an anonymous temporary. Also used for op results: every op
    /// that produces a value writes it to a temp allocated here.
    pub fn add_temp(&mut self, ty: RType) -> Register {
        let name = format!("r{}", self.temp_index);
        self.temp_index += 1;
        self.add(name, ty, false)
    }

    pub fn lookup(&self, symbol: &str) -> Option<Register> {
        self.symtable.get(symbol).copied()
    }

    /// The environment header of the pretty-printed form: consecutive
    /// registers that share a type are grouped onto one line.
    pub fn to_lines(&self) -> Vec<String> {
        let mut result = vec![];
        let mut i = 0;
        while i < self.regs.len() {
            let i0 = i;
            let mut group = vec![self.regs[i0].name.as_str()];
            while i + 1 < self.regs.len() && self.regs[i + 1].ty == self.regs[i0].ty {
                i += 1;
                group.push(self.regs[i].name.as_str());
            }
            i += 1;
            result.push(format!("{} :: {}", group.join(", "), self.regs[i0].ty));
        }
        result
    }
}

///////////////////////////////////////////////////////////////////////////
// Basic blocks

/// The index of a basic block in its function's block list. Doubles as
/// the block's printed label: block `n` prints as `L<n>`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);

impl Block {
    pub fn new(index: usize) -> Block {
        assert!(index < (u32::MAX as usize));
        Block(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for Block {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "L{}", self.0)
    }
}

/// The ops of one basic block, plus the error handler installed by the
/// front-end for ops in this block. `None` routes failures to the
/// function-level default handler during exception splitting.
#[derive(Default)]
pub struct BlockData {
    pub ops: Vec<Op>,
    pub error_handler: Option<Block>,
}

impl BlockData {
    pub fn new() -> BlockData {
        BlockData::default()
    }

    pub fn terminator(&self) -> &Op {
        let last = self.ops.last().expect("empty basic block");
        assert!(last.is_terminator(), "block does not end in a terminator");
        last
    }
}

///////////////////////////////////////////////////////////////////////////
// Ops

/// How an op signals failure at runtime.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Never fails.
    Never,
    /// On failure the result register holds its type's error sentinel.
    Magic,
    /// On failure the (boolean) result register holds 0.
    False,
}

/// The condition tested by a branch.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BranchKind {
    /// Test a boolean register.
    BoolExpr,
    /// Test an object register against None.
    IsNone,
    /// Test a register against its type's error sentinel. Works for
    /// arbitrary types.
    IsError,
}

/// Namespace of a static load.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Namespace {
    /// Static data (literals, interned strings, ...).
    Static,
    /// Pointers to native type objects.
    Type,
    /// Module objects.
    Module,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Static => "static",
            Namespace::Type => "type",
            Namespace::Module => "module",
        }
    }
}

/// A single IR op: a source line number plus the operation itself.
pub struct Op {
    pub line: i32,
    pub kind: OpKind,
}

/// The operation performed by an op.
///
/// Ops that produce a value carry an explicit `dest` register, allocated
/// from the environment when the op is built. A `dest` of `None` means
/// the op is void; only calls and primitives can be void, and a void op
/// must never be fallible, since failure is always signalled through the
/// result register.
pub enum OpKind {
    /// Unconditional jump.
    Goto { target: Block },

    /// `if [not] cond goto L1 else goto L2`.
    ///
    /// Branches must not raise; a fallible comparison is split into the
    /// comparison op followed by a branch on its result.
    Branch {
        cond: Register,
        true_target: Block,
        false_target: Block,
        kind: BranchKind,
        negated: bool,
        /// If set, the true (error) side of the branch records a
        /// traceback entry (function name, line) when taken.
        traceback_entry: Option<(String, i32)>,
    },

    Return { reg: Register },

    /// Added to the end of blocks the front-end can prove never fall
    /// through. Keeps every block terminated without inventing a bogus
    /// return.
    Unreachable,

    /// `dest = src`. Copies a reference without creating a new one.
    Assign { dest: Register, src: Register },

    /// `dest = n`, a tagged integer literal.
    LoadInt { dest: Register, value: i64 },

    /// `dest = <error sentinel of dest's type>`.
    LoadErrorValue { dest: Register },

    /// Load a C static. The loaded reference is borrowed: statics are
    /// kept alive by the module object, so plain loads must not be
    /// decremented.
    LoadStatic {
        dest: Register,
        identifier: String,
        module_name: Option<String>,
        namespace: Namespace,
    },

    /// `dest = obj.attr` on a native instance.
    GetAttr { dest: Register, obj: Register, attr: String },

    /// `obj.attr = src` on a native instance; `dest` receives the error
    /// flag.
    SetAttr { dest: Register, obj: Register, attr: String, src: Register },

    /// `dest = src[index]` on a fixed-length tuple struct.
    TupleGet { dest: Register, src: Register, index: usize },

    /// `dest = (items...)`, building a fixed-length tuple struct.
    TupleSet { dest: Register, items: Vec<Register> },

    /// Native call `f(args...)`. The target is a compiled module-level
    /// function or class constructor.
    Call { dest: Option<Register>, function: String, args: Vec<Register> },

    /// Native method call `obj.method(args...)` through the vtable.
    MethodCall { dest: Option<Register>, obj: Register, method: String, args: Vec<Register> },

    /// Generic-runtime call fallback (`PyObject_CallFunctionObjArgs`).
    /// All argument registers must be boxed.
    PyCall { dest: Register, function: Register, args: Vec<Register> },

    /// Generic-runtime method call fallback
    /// (`PyObject_CallMethodObjArgs`). All argument registers must be
    /// boxed.
    PyMethodCall { dest: Register, obj: Register, method: Register, args: Vec<Register> },

    /// Registry-driven primitive operation; the description carries the
    /// signature, the error discipline and the C emission recipe.
    Primitive { dest: Option<Register>, desc: Rc<OpDescription>, args: Vec<Register> },

    /// Runtime type assertion. No representation change and no reference
    /// count change.
    Cast { dest: Register, src: Register },

    /// Unboxed representation to plain object. Always succeeds.
    Box { dest: Register, src: Register },

    /// Object to unboxed representation, with a runtime check.
    Unbox { dest: Register, src: Register },

    /// Increment the reference count of `src`. Only inserted by the
    /// refcount transform.
    IncRef { src: Register },

    /// Decrement the reference count of `src`. Only inserted by the
    /// refcount transform.
    DecRef { src: Register },

    /// Raise a built-in exception with an optional message; `dest`
    /// receives the (always false) error flag.
    RaiseStandardError { dest: Register, class_name: String, message: Option<String> },
}

/// Shallow list of the registers an op reads, in a fixed order.
pub type Sources = SmallVec<[Register; 4]>;

impl Op {
    pub fn new(kind: OpKind) -> Op {
        Op { line: NO_TRACEBACK_LINE_NO, kind }
    }

    pub fn with_line(kind: OpKind, line: i32) -> Op {
        Op { line, kind }
    }

    pub fn goto(target: Block) -> Op {
        Op::new(OpKind::Goto { target })
    }

    pub fn branch(cond: Register, true_target: Block, false_target: Block, kind: BranchKind) -> Op {
        Op::new(OpKind::Branch {
            cond,
            true_target,
            false_target,
            kind,
            negated: false,
            traceback_entry: None,
        })
    }

    pub fn ret(reg: Register) -> Op {
        Op::new(OpKind::Return { reg })
    }

    pub fn unreachable() -> Op {
        Op::new(OpKind::Unreachable)
    }

    pub fn assign(dest: Register, src: Register) -> Op {
        Op::new(OpKind::Assign { dest, src })
    }

    pub fn inc_ref(src: Register) -> Op {
        Op::new(OpKind::IncRef { src })
    }

    pub fn dec_ref(src: Register) -> Op {
        Op::new(OpKind::DecRef { src })
    }

    pub fn at_line(mut self, line: i32) -> Op {
        self.line = line;
        self
    }

    /// The register this op writes, if any.
    pub fn dest(&self) -> Option<Register> {
        match self.kind {
            OpKind::Assign { dest, .. }
            | OpKind::LoadInt { dest, .. }
            | OpKind::LoadErrorValue { dest }
            | OpKind::LoadStatic { dest, .. }
            | OpKind::GetAttr { dest, .. }
            | OpKind::SetAttr { dest, .. }
            | OpKind::TupleGet { dest, .. }
            | OpKind::TupleSet { dest, .. }
            | OpKind::PyCall { dest, .. }
            | OpKind::PyMethodCall { dest, .. }
            | OpKind::Cast { dest, .. }
            | OpKind::Box { dest, .. }
            | OpKind::Unbox { dest, .. }
            | OpKind::RaiseStandardError { dest, .. } => Some(dest),
            OpKind::Call { dest, .. }
            | OpKind::MethodCall { dest, .. }
            | OpKind::Primitive { dest, .. } => dest,
            OpKind::Goto { .. }
            | OpKind::Branch { .. }
            | OpKind::Return { .. }
            | OpKind::Unreachable
            | OpKind::IncRef { .. }
            | OpKind::DecRef { .. } => None,
        }
    }

    /// The registers this op reads.
    ///
    /// The two generic-runtime call ops keep their slightly different
    /// orders (`PyCall`: args then callee; `PyMethodCall`: args then
    /// receiver then method). Which order is canonical is an open
    /// question; see DESIGN.md.
    pub fn sources(&self) -> Sources {
        match &self.kind {
            OpKind::Branch { cond, .. } => SmallVec::from_slice(&[*cond]),
            OpKind::Return { reg } => SmallVec::from_slice(&[*reg]),
            OpKind::Assign { src, .. }
            | OpKind::TupleGet { src, .. }
            | OpKind::Cast { src, .. }
            | OpKind::Box { src, .. }
            | OpKind::Unbox { src, .. }
            | OpKind::IncRef { src }
            | OpKind::DecRef { src } => SmallVec::from_slice(&[*src]),
            OpKind::GetAttr { obj, .. } => SmallVec::from_slice(&[*obj]),
            OpKind::SetAttr { obj, src, .. } => SmallVec::from_slice(&[*obj, *src]),
            OpKind::TupleSet { items, .. } => SmallVec::from_slice(items),
            OpKind::Call { args, .. } | OpKind::Primitive { args, .. } => {
                SmallVec::from_slice(args)
            }
            OpKind::MethodCall { obj, args, .. } => {
                let mut result: Sources = SmallVec::from_slice(args);
                result.push(*obj);
                result
            }
            OpKind::PyCall { function, args, .. } => {
                let mut result: Sources = SmallVec::from_slice(args);
                result.push(*function);
                result
            }
            OpKind::PyMethodCall { obj, method, args, .. } => {
                let mut result: Sources = SmallVec::from_slice(args);
                result.push(*obj);
                result.push(*method);
                result
            }
            OpKind::Goto { .. }
            | OpKind::Unreachable
            | OpKind::LoadInt { .. }
            | OpKind::LoadErrorValue { .. }
            | OpKind::LoadStatic { .. }
            | OpKind::RaiseStandardError { .. } => SmallVec::new(),
        }
    }

    /// `sources()` with duplicates removed, first occurrence kept.
    pub fn unique_sources(&self) -> Sources {
        let mut result: Sources = SmallVec::new();
        for reg in self.sources() {
            if !result.contains(&reg) {
                result.push(reg);
            }
        }
        result
    }

    pub fn error_kind(&self) -> ErrorKind {
        match &self.kind {
            OpKind::Goto { .. }
            | OpKind::Branch { .. }
            | OpKind::Return { .. }
            | OpKind::Unreachable
            | OpKind::Assign { .. }
            | OpKind::LoadInt { .. }
            | OpKind::LoadErrorValue { .. }
            | OpKind::LoadStatic { .. }
            | OpKind::TupleGet { .. }
            | OpKind::TupleSet { .. }
            | OpKind::Box { .. }
            | OpKind::IncRef { .. }
            | OpKind::DecRef { .. } => ErrorKind::Never,
            OpKind::GetAttr { .. }
            | OpKind::Call { .. }
            | OpKind::MethodCall { .. }
            | OpKind::PyCall { .. }
            | OpKind::PyMethodCall { .. }
            | OpKind::Cast { .. }
            | OpKind::Unbox { .. } => ErrorKind::Magic,
            OpKind::SetAttr { .. } | OpKind::RaiseStandardError { .. } => ErrorKind::False,
            OpKind::Primitive { desc, .. } => desc.error_kind,
        }
    }

    pub fn can_raise(&self) -> bool {
        self.error_kind() != ErrorKind::Never
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            OpKind::Goto { .. }
                | OpKind::Branch { .. }
                | OpKind::Return { .. }
                | OpKind::Unreachable
        )
    }

    /// Swap the targets of a branch and flip its negation.
    pub fn invert_branch(&mut self) {
        match &mut self.kind {
            OpKind::Branch { true_target, false_target, negated, .. } => {
                std::mem::swap(true_target, false_target);
                *negated = !*negated;
            }
            _ => panic!("invert_branch on a non-branch op"),
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// Functions

/// One formal argument of a compiled function.
#[derive(Clone)]
pub struct RuntimeArg {
    pub name: String,
    pub ty: RType,
}

impl RuntimeArg {
    pub fn new(name: &str, ty: RType) -> RuntimeArg {
        RuntimeArg { name: name.to_owned(), ty }
    }
}

#[derive(Clone)]
pub struct FuncSignature {
    pub args: Vec<RuntimeArg>,
    pub ret_type: RType,
}

impl FuncSignature {
    pub fn new(args: Vec<RuntimeArg>, ret_type: RType) -> FuncSignature {
        FuncSignature { args, ret_type }
    }
}

/// Intermediate representation of a single function.
///
/// Block 0 is the entry point. The first `sig.args.len()` registers of
/// the environment are the argument registers, in signature order.
pub struct FuncIr {
    pub name: String,
    pub class_name: Option<String>,
    pub module_name: String,
    pub sig: FuncSignature,
    pub env: Environment,
    pub blocks: Vec<BlockData>,
}

impl FuncIr {
    pub fn new(
        name: &str,
        class_name: Option<&str>,
        module_name: &str,
        sig: FuncSignature,
        env: Environment,
        blocks: Vec<BlockData>,
    ) -> FuncIr {
        debug_assert!((0..sig.args.len()).all(|i| env.is_arg(Register::new(i))));
        FuncIr {
            name: name.to_owned(),
            class_name: class_name.map(|s| s.to_owned()),
            module_name: module_name.to_owned(),
            sig,
            env,
            blocks,
        }
    }

    pub fn args(&self) -> &[RuntimeArg] {
        &self.sig.args
    }

    pub fn ret_type(&self) -> &RType {
        &self.sig.ret_type
    }

    /// The argument registers, in signature order.
    pub fn arg_regs(&self) -> Vec<Register> {
        (0..self.sig.args.len()).map(Register::new).collect()
    }

    pub fn block(&self, block: Block) -> &BlockData {
        &self.blocks[block.index()]
    }

    pub fn block_mut(&mut self, block: Block) -> &mut BlockData {
        &mut self.blocks[block.index()]
    }

    /// Append a fresh empty block and return its index.
    pub fn new_block(&mut self) -> Block {
        let block = Block::new(self.blocks.len());
        self.blocks.push(BlockData::new());
        block
    }
}

///////////////////////////////////////////////////////////////////////////
// Classes and modules

/// The index of a class in the per-run class table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn new(index: usize) -> ClassId {
        assert!(index < (u32::MAX as usize));
        ClassId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for ClassId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "C({})", self.0)
    }
}

/// One entry of a class vtable: either a method slot or a getter slot
/// for an attribute (the matching setter lives at the next index). The
/// class recorded is the one that introduced the slot, which may be a
/// parent of the class whose vtable this is.
pub enum VTableEntry {
    Method { cls: ClassId, name: String },
    Attr { cls: ClassId, name: String, is_getter: bool },
}

/// Intermediate representation of a compiled class. Also describes the
/// runtime layout of native instances.
pub struct ClassIr {
    pub name: String,
    pub module_name: String,
    pub is_trait: bool,

    /// Attribute layout, in declaration order.
    pub attributes: Vec<(String, RType)>,

    /// Signatures of every method, populated before method bodies are
    /// generated.
    pub method_types: Vec<(String, FuncSignature)>,

    /// Name to vtable index, filled in once the vtable is computed.
    pub vtable: FnvHashMap<String, usize>,
    pub vtable_entries: Vec<VTableEntry>,

    pub base: Option<ClassId>,

    /// Method resolution order, starting at the class itself. A freshly
    /// added class gets `[itself]`; real class hierarchies fix it up.
    pub mro: Vec<ClassId>,
}

impl ClassIr {
    pub fn new(name: &str, module_name: &str) -> ClassIr {
        ClassIr {
            name: name.to_owned(),
            module_name: module_name.to_owned(),
            is_trait: false,
            attributes: vec![],
            method_types: vec![],
            vtable: FnvHashMap::default(),
            vtable_entries: vec![],
            base: None,
            mro: vec![],
        }
    }
}

/// The per-run class table. `RType::Instance` values reference classes
/// through it by id.
#[derive(Default)]
pub struct Classes {
    classes: Vec<ClassIr>,
}

impl Classes {
    pub fn add(&mut self, class: ClassIr) -> ClassId {
        let id = ClassId::new(self.classes.len());
        self.classes.push(class);
        if self.classes[id.index()].mro.is_empty() {
            self.classes[id.index()].mro.push(id);
        }
        id
    }

    pub fn get(&self, id: ClassId) -> &ClassIr {
        &self.classes[id.index()]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut ClassIr {
        &mut self.classes[id.index()]
    }

    pub fn mro(&self, id: ClassId) -> &[ClassId] {
        &self.classes[id.index()].mro
    }

    /// The declared type of an attribute, searching the mro.
    pub fn attr_type(&self, id: ClassId, name: &str) -> &RType {
        for &cls in self.mro(id) {
            for (attr, ty) in &self.get(cls).attributes {
                if attr == name {
                    return ty;
                }
            }
        }
        panic!("{:?} has no attribute {:?}", self.get(id).name, name);
    }

    /// The signature of a method, searching the mro.
    pub fn method_sig(&self, id: ClassId, name: &str) -> &FuncSignature {
        for &cls in self.mro(id) {
            for (method, sig) in &self.get(cls).method_types {
                if method == name {
                    return sig;
                }
            }
        }
        panic!("{:?} has no method {:?}", self.get(id).name, name);
    }

    /// Vtable slot of a method or attribute getter; the setter slot for
    /// an attribute is the following index.
    pub fn vtable_entry(&self, id: ClassId, name: &str) -> usize {
        let class = self.get(id);
        match class.vtable.get(name) {
            Some(&index) => index,
            None => panic!("{:?} has no vtable entry {:?}", class.name, name),
        }
    }
}

/// Intermediate representation of a module: the functions and classes it
/// compiles, plus the modules it imports (always including `builtins`).
pub struct ModuleIr {
    pub imports: Vec<String>,
    pub functions: Vec<FuncIr>,
    pub classes: Classes,
}

impl ModuleIr {
    pub fn new(imports: Vec<String>, functions: Vec<FuncIr>, classes: Classes) -> ModuleIr {
        let mut imports = imports;
        if !imports.iter().any(|m| m == "builtins") {
            imports.insert(0, "builtins".to_owned());
        }
        ModuleIr { imports, functions, classes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::RType;

    #[test]
    fn environment_names_and_grouping() {
        let mut env = Environment::new();
        let a = env.add_arg("a", RType::INT);
        let b = env.add_local("b", RType::INT);
        let t0 = env.add_temp(RType::BOOL);
        let t1 = env.add_temp(RType::INT);

        assert_eq!(env.name(a), "a");
        assert_eq!(env.name(t0), "r0");
        assert_eq!(env.name(t1), "r1");
        assert!(env.is_arg(a));
        assert!(env.is_borrowed(a));
        assert!(!env.is_arg(b));
        assert_eq!(env.lookup("b"), Some(b));
        assert_eq!(env.lookup("r0"), None);

        assert_eq!(
            env.to_lines(),
            vec!["a, b :: int".to_owned(), "r0 :: bool".to_owned(), "r1 :: int".to_owned()]
        );
    }

    #[test]
    fn op_sources_and_dest() {
        let mut env = Environment::new();
        let a = env.add_arg("a", RType::OBJECT);
        let b = env.add_arg("b", RType::OBJECT);
        let r0 = env.add_temp(RType::OBJECT);

        let call = Op::new(OpKind::PyCall { dest: r0, function: a, args: vec![b, b] });
        assert_eq!(call.dest(), Some(r0));
        assert_eq!(call.sources().as_slice(), &[b, b, a]);
        assert_eq!(call.unique_sources().as_slice(), &[b, a]);
        assert_eq!(call.error_kind(), ErrorKind::Magic);
        assert!(call.can_raise());

        let assign = Op::assign(r0, a);
        assert_eq!(assign.error_kind(), ErrorKind::Never);
        assert!(!assign.is_terminator());
        assert!(Op::ret(r0).is_terminator());
    }

    #[test]
    fn branch_inversion() {
        let mut env = Environment::new();
        let c = env.add_temp(RType::BOOL);
        let mut op = Op::branch(c, Block::new(1), Block::new(2), BranchKind::BoolExpr);
        op.invert_branch();
        match op.kind {
            OpKind::Branch { true_target, false_target, negated, .. } => {
                assert_eq!(true_target, Block::new(2));
                assert_eq!(false_target, Block::new(1));
                assert!(negated);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn class_table_lookups() {
        let mut classes = Classes::default();
        let base = classes.add(ClassIr::new("Base", "m"));
        classes.get_mut(base).attributes.push(("x".to_owned(), RType::INT));
        let derived = classes.add(ClassIr::new("Derived", "m"));
        classes.get_mut(derived).base = Some(base);
        classes.get_mut(derived).mro = vec![derived, base];

        assert_eq!(classes.attr_type(derived, "x"), &RType::INT);
        assert_eq!(classes.mro(base), &[base]);
    }
}
