// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of defining and invoking [`StepDefinition`]s.
//!
//! There are two families:
//! - [`DefinitionError`]s happen while a [`StepDefinition`] is being
//!   constructed. They mean a broken step definition, which is a programming
//!   error, so loading should be aborted.
//! - [`InvocationError`]s happen while a matched [`StepDefinition`] is being
//!   invoked, and are reported against the particular step being executed.
//!
//! [`StepDefinition`]: crate::StepDefinition

use std::fmt;

use derive_more::with_trait::{Display, Error, From};

use super::executable::Arity;

/// Error of constructing a [`StepDefinition`].
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Debug, Display, Error)]
pub enum DefinitionError {
    /// No executable was supplied.
    #[display("step definition has no executable")]
    MissingExecutable,

    /// Pattern is neither a regular expression nor text.
    #[display("step definition pattern must be a regular expression or text")]
    InvalidPatternKind,

    /// `on` option is neither a dispatch target nor a valid selector.
    #[display("invalid `on` dispatch target: {reason}")]
    InvalidDispatchTarget {
        /// Why the `on` option was rejected.
        #[error(not(source))]
        reason: String,
    },

    /// Pattern doesn't compile into a regular expression.
    #[display("invalid step definition pattern: {_0}")]
    InvalidPattern(regex::Error),
}

/// Result of constructing a [`StepDefinition`].
///
/// [`StepDefinition`]: crate::StepDefinition
pub type DefinitionResult<T> = Result<T, DefinitionError>;

impl DefinitionError {
    /// Creates a new [`DefinitionError::InvalidDispatchTarget`].
    #[must_use]
    pub fn invalid_dispatch_target(reason: impl Into<String>) -> Self {
        Self::InvalidDispatchTarget { reason: reason.into() }
    }
}

/// Number of transformed arguments doesn't fit the [`Arity`] of the invoked
/// executable.
///
/// Always points to the declaration of the [`StepDefinition`] the failed
/// invocation belongs to, rather than to the call site inside a scenario.
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Debug, Error)]
pub struct ArityMismatchError {
    /// [`Arity`] the executable requires.
    pub expected: Arity,

    /// Number of arguments it was called with.
    pub actual: usize,

    /// Source text of the [`StepDefinition`] pattern.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    pub pattern: String,

    /// Source location summary of the [`StepDefinition`].
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    pub location: String,

    /// Backtrace of the failure, with the [`StepDefinition`] declaration
    /// line first.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    pub trace: Vec<String>,
}

impl ArityMismatchError {
    /// Returns the synthesized backtrace line pointing to the
    /// [`StepDefinition`] declaration.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    #[must_use]
    pub fn backtrace_line(&self) -> Option<&str> {
        self.trace.first().map(String::as_str)
    }
}

impl fmt::Display for ArityMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Your block takes {}, but the pattern matched {} argument{}.",
            self.expected,
            self.actual,
            if self.actual == 1 { "" } else { "s" },
        )?;
        for line in &self.trace {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

/// Error of dispatching a symbol-backed [`StepDefinition`] by name.
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Debug, Display, Error)]
pub enum DispatchError {
    /// Dispatch target doesn't respond to the method.
    #[display("undefined method `{method}` for the dispatch target")]
    UndefinedMethod {
        /// Name of the method.
        #[error(not(source))]
        method: String,
    },

    /// `World` doesn't respond to the selector of the dispatch target.
    #[display("undefined selector `{selector}` for the World")]
    UndefinedSelector {
        /// Name of the selector.
        #[error(not(source))]
        selector: String,
    },
}

/// Error of invoking a [`StepDefinition`].
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Debug, Display, Error, From)]
pub enum InvocationError {
    /// Arguments don't fit the [`Arity`] of the executable.
    #[display("{_0}")]
    ArityMismatch(#[error(not(source))] ArityMismatchError),

    /// Symbol-backed executable couldn't be dispatched.
    #[display("{_0}")]
    Dispatch(#[error(not(source))] DispatchError),

    /// Error raised by user code (a step executable or an argument
    /// transform), carried unmodified.
    #[display("{_0}")]
    Failed(#[error(not(source))] anyhow::Error),
}

/// Result of invoking a [`StepDefinition`].
///
/// [`StepDefinition`]: crate::StepDefinition
pub type InvocationResult<T> = Result<T, InvocationError>;

impl InvocationError {
    /// Returns the [`ArityMismatchError`], if this is one.
    #[must_use]
    pub const fn as_arity_mismatch(&self) -> Option<&ArityMismatchError> {
        match self {
            Self::ArityMismatch(e) => Some(e),
            Self::Dispatch(_) | Self::Failed(_) => None,
        }
    }

    /// Returns the error raised by user code, if this is one.
    #[must_use]
    pub fn into_failure(self) -> Option<anyhow::Error> {
        match self {
            Self::Failed(e) => Some(e),
            Self::ArityMismatch(_) | Self::Dispatch(_) => None,
        }
    }
}
