// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-run compiler configuration.
//!
//! There is deliberately no global, mutable configuration anywhere in
//! the compiler: a `CompilerOptions` value is built once by the driver
//! and passed down to whatever needs it.

#[derive(Clone)]
pub struct CompilerOptions {
    /// Treat types as non-optional unless explicitly optional.
    pub strict_optional: bool,

    /// Drop assert statements during lowering.
    pub strip_asserts: bool,

    /// Emit one C file per compiled module instead of one per group.
    pub multi_file: bool,

    pub verbose: bool,

    /// Where generated C sources and build artifacts go.
    pub target_dir: String,
}

impl Default for CompilerOptions {
    fn default() -> CompilerOptions {
        CompilerOptions {
            strict_optional: true,
            strip_asserts: false,
            multi_file: false,
            verbose: false,
            target_dir: "build".to_owned(),
        }
    }
}
