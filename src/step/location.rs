// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Source positions of step definitions.

use std::panic;

use derive_more::with_trait::{Debug, Display};

/// Location in user code where a [`StepDefinition`] or its [`Block`] was
/// declared.
///
/// Captured via [`#[track_caller]`][0] at the registration call site, so it
/// points to user code rather than to this crate's internals.
///
/// [0]: https://doc.rust-lang.org/reference/attributes/codegen.html#the-track_caller-attribute
/// [`Block`]: crate::step::Block
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{path}:{line}:{column}")]
pub struct Location {
    /// Path to the file.
    pub path: &'static str,

    /// Line in the file.
    pub line: u32,

    /// Column in the file.
    pub column: u32,
}

impl Location {
    /// Creates a new [`Location`] out of the given parts.
    #[must_use]
    pub const fn new(path: &'static str, line: u32, column: u32) -> Self {
        Self { path, line, column }
    }

    /// Returns the [`Location`] of the caller of the function invoking this
    /// one (all the way up through the `#[track_caller]` chain).
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        panic::Location::caller().into()
    }

    /// Returns `<path>:<line>` representation of this [`Location`], as used
    /// in backtraces.
    #[must_use]
    pub fn file_colon_line(&self) -> String {
        format!("{}:{}", self.path, self.line)
    }
}

impl From<&'static panic::Location<'static>> for Location {
    fn from(loc: &'static panic::Location<'static>) -> Self {
        Self::new(loc.file(), loc.line(), loc.column())
    }
}

#[cfg(test)]
mod tests {
    use super::Location;

    #[track_caller]
    fn registered_here() -> Location {
        Location::caller()
    }

    #[test]
    fn caller_points_to_call_site() {
        let expected_line = line!() + 1;
        let loc = registered_here();

        assert_eq!(loc.path, file!());
        assert_eq!(loc.line, expected_line);
    }

    #[test]
    fn file_colon_line_omits_column() {
        let loc = Location::new("features/steps/belly.rs", 42, 9);

        assert_eq!(loc.file_colon_line(), "features/steps/belly.rs:42");
        assert_eq!(loc.to_string(), "features/steps/belly.rs:42:9");
    }

    #[test]
    fn orders_by_path_then_line() {
        let a = Location::new("a.rs", 2, 1);
        let b = Location::new("a.rs", 10, 1);
        let c = Location::new("b.rs", 1, 1);

        assert!(a < b);
        assert!(b < c);
    }
}
