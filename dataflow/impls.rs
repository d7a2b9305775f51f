// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The concrete data-flow analyses used by the transforms.
//!
//! All of them track sets of registers. Terminators other than branch
//! and return have no effect in any of them; a branch reads its tested
//! register and a return reads the returned register (liveness only).

use fnv::FnvHashSet;

use crate::cfg::Cfg;
use crate::dataflow::{
    run_analysis, AnalysisResult, AnalysisVisitor, Direction, GenAndKill, Lattice,
};
use crate::repr::{BlockData, Environment, Op, Register};

fn none() -> FnvHashSet<Register> {
    FnvHashSet::default()
}

fn one(reg: Register) -> FnvHashSet<Register> {
    let mut set = FnvHashSet::default();
    set.insert(reg);
    set
}

///////////////////////////////////////////////////////////////////////////
// Definedness

/// A write makes the destination defined; nothing ever undoes it.
/// Shared by the maybe- and must-defined analyses, which differ only in
/// lattice.
struct DefinedVisitor;

impl AnalysisVisitor<Register> for DefinedVisitor {
    fn gen_kill(&self, op: &Op) -> GenAndKill<Register> {
        match op.dest() {
            Some(dest) => (one(dest), none()),
            None => (none(), none()),
        }
    }
}

/// Calculate potentially defined registers at each location.
///
/// A register is maybe-defined if it has a value along some path from the
/// initial location.
pub fn analyze_maybe_defined_regs(
    blocks: &[BlockData],
    cfg: &Cfg,
    initial_defined: &FnvHashSet<Register>,
) -> AnalysisResult<Register> {
    run_analysis(
        blocks,
        cfg,
        &DefinedVisitor,
        initial_defined,
        Direction::Forward,
        Lattice::Maybe,
        None,
    )
}

/// Calculate always defined registers at each location.
///
/// A register is must-defined if it has a value along all paths from the
/// initial location.
pub fn analyze_must_defined_regs(
    blocks: &[BlockData],
    cfg: &Cfg,
    initial_defined: &FnvHashSet<Register>,
    env: &Environment,
) -> AnalysisResult<Register> {
    let universe: FnvHashSet<Register> = env.regs().collect();
    run_analysis(
        blocks,
        cfg,
        &DefinedVisitor,
        initial_defined,
        Direction::Forward,
        Lattice::Must,
        Some(&universe),
    )
}

/// A write makes the destination no longer undefined.
struct UndefinedVisitor;

impl AnalysisVisitor<Register> for UndefinedVisitor {
    fn gen_kill(&self, op: &Op) -> GenAndKill<Register> {
        match op.dest() {
            Some(dest) => (none(), one(dest)),
            None => (none(), none()),
        }
    }
}

/// Calculate potentially undefined registers at each location.
///
/// A register is maybe-undefined if there is some path from the entry
/// along which it never received a value. The locals that show up here
/// at a use site need a runtime definedness check.
pub fn analyze_undefined_regs(
    blocks: &[BlockData],
    cfg: &Cfg,
    env: &Environment,
    initial_defined: &FnvHashSet<Register>,
) -> AnalysisResult<Register> {
    let initial_undefined: FnvHashSet<Register> =
        env.regs().filter(|reg| !initial_defined.contains(reg)).collect();
    run_analysis(
        blocks,
        cfg,
        &UndefinedVisitor,
        &initial_undefined,
        Direction::Forward,
        Lattice::Maybe,
        None,
    )
}

///////////////////////////////////////////////////////////////////////////
// Borrowed arguments

/// Any write to an argument register kills its borrowed-ness.
struct BorrowedArgumentsVisitor<'a> {
    args: &'a FnvHashSet<Register>,
}

impl<'a> AnalysisVisitor<Register> for BorrowedArgumentsVisitor<'a> {
    fn gen_kill(&self, op: &Op) -> GenAndKill<Register> {
        match op.dest() {
            Some(dest) if self.args.contains(&dest) => (none(), one(dest)),
            _ => (none(), none()),
        }
    }
}

/// Calculate the arguments that can still use the reference borrowed
/// from the caller at each location.
///
/// Once an argument register is assigned to, it holds an owned
/// reference like any other register and falls out of this set.
pub fn analyze_borrowed_arguments(
    blocks: &[BlockData],
    cfg: &Cfg,
    args: &FnvHashSet<Register>,
) -> AnalysisResult<Register> {
    run_analysis(
        blocks,
        cfg,
        &BorrowedArgumentsVisitor { args },
        args,
        Direction::Forward,
        Lattice::Must,
        Some(args),
    )
}

///////////////////////////////////////////////////////////////////////////
// Liveness

/// Reads make a register live; a write to it ends the live range (going
/// backwards).
struct LivenessVisitor;

impl AnalysisVisitor<Register> for LivenessVisitor {
    fn gen_kill(&self, op: &Op) -> GenAndKill<Register> {
        let gen = op.sources().iter().copied().collect();
        match op.dest() {
            Some(dest) => (gen, one(dest)),
            None => (gen, none()),
        }
    }
}

/// Calculate live registers at each location.
///
/// A register is live at a location if it can be read along some path
/// starting from there.
pub fn analyze_live_regs(blocks: &[BlockData], cfg: &Cfg) -> AnalysisResult<Register> {
    run_analysis(
        blocks,
        cfg,
        &LivenessVisitor,
        &FnvHashSet::default(),
        Direction::Backward,
        Lattice::Maybe,
        None,
    )
}
