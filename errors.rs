// Copyright 2018 The Pyrite Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compile-time diagnostics.
//!
//! The front-end reports unsupported constructs and static type problems
//! here while lowering. The IR transforms never report anything: they
//! assume well-formed input, and an inconsistency there is a compiler
//! bug surfaced as an assertion, not a diagnostic.

/// Collects diagnostics during a compilation run. The driver drains the
/// formatted messages and decides how to present them.
#[derive(Default)]
pub struct Errors {
    pub num_errors: usize,
    pub num_warnings: usize,
    messages: Vec<String>,
}

impl Errors {
    pub fn new() -> Errors {
        Errors::default()
    }

    pub fn error(&mut self, msg: &str, path: &str, line: i32) {
        self.messages.push(format!("{}:{}: error: {}", path, line, msg));
        self.num_errors += 1;
        debug!("compile error at {}:{}: {}", path, line, msg);
    }

    pub fn warning(&mut self, msg: &str, path: &str, line: i32) {
        self.messages.push(format!("{}:{}: warning: {}", path, line, msg));
        self.num_warnings += 1;
    }

    /// Messages reported since the last call, oldest first.
    pub fn new_messages(&mut self) -> Vec<String> {
        std::mem::replace(&mut self.messages, vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_formatted_and_drained() {
        let mut errors = Errors::new();
        errors.error("unsupported construct", "main.py", 12);
        errors.warning("shadowed name", "main.py", 20);
        assert_eq!(errors.num_errors, 1);
        assert_eq!(errors.num_warnings, 1);
        assert_eq!(
            errors.new_messages(),
            vec![
                "main.py:12: error: unsupported construct".to_owned(),
                "main.py:20: warning: shadowed name".to_owned(),
            ]
        );
        assert!(errors.new_messages().is_empty());
    }
}
