// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pipeline invoking an [`Invocable`] against a `World`.
//!
//! Raw arguments are passed through the [`Registry`] transforms first, then
//! checked against the [`Arity`] of the executable, and only then the
//! executable is called. Errors of user code are propagated untouched.

use std::sync::PoisonError;

use crate::{registry::Registry, Value};

use super::{
    error::{
        ArityMismatchError, DispatchError, InvocationError, InvocationResult,
    },
    executable::{Arity, Dispatch, Invocable, Receiver},
};

/// Declaration of the [`StepDefinition`] an invocation originates from.
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Copy, Debug)]
pub struct Origin<'a> {
    /// Source text of the pattern.
    pub pattern: &'a str,

    /// Source location summary.
    pub location: &'a str,
}

impl Origin<'_> {
    /// Returns the backtrace line pointing to this [`Origin`].
    #[must_use]
    pub fn backtrace_line(&self) -> String {
        format!("{}: in '{}'", self.location, self.pattern)
    }

    /// Checks the number of `args` against the `expected` [`Arity`].
    fn check_arity(
        &self,
        expected: Arity,
        args: &[Value],
    ) -> InvocationResult<()> {
        if expected.accepts(args.len()) {
            return Ok(());
        }
        tracing::warn!(
            pattern = self.pattern,
            location = self.location,
            expected = %expected,
            actual = args.len(),
            "arity mismatch",
        );
        Err(ArityMismatchError {
            expected,
            actual: args.len(),
            pattern: self.pattern.to_owned(),
            location: self.location.to_owned(),
            trace: vec![self.backtrace_line()],
        }
        .into())
    }
}

/// Runs the `invocable` with the `raw_args` against the `world`.
///
/// # Errors
///
/// - [`InvocationError::Failed`] if the transforms or the executable fail.
/// - [`InvocationError::ArityMismatch`] if the transformed arguments don't fit
///   the [`Arity`] of the executable.
/// - [`InvocationError::Dispatch`] if a method-backed executable has no
///   target to be dispatched to.
pub fn run<World, R>(
    invocable: &Invocable<World>,
    raw_args: Vec<String>,
    world: &mut World,
    registry: &R,
    origin: Origin<'_>,
) -> InvocationResult<Value>
where
    World: Dispatch,
    R: Registry + ?Sized,
{
    let count = raw_args.len();
    let args = registry.execute_transforms(raw_args)?;
    debug_assert_eq!(count, args.len(), "transforms changed argument count");

    tracing::trace!(
        pattern = origin.pattern,
        location = origin.location,
        arguments = ?args,
        "invoking step definition",
    );

    match invocable {
        Invocable::Block(block) => {
            origin.check_arity(block.arity(), &args)?;
            block.call(world, args).map_err(InvocationError::Failed)
        }
        Invocable::Method { receiver, name } => match receiver {
            Receiver::World => send(world, name, args, origin),
            Receiver::Selector(selector) => {
                let target = world.select(selector).ok_or_else(|| {
                    DispatchError::UndefinedSelector {
                        selector: selector.clone(),
                    }
                })?;
                send(target, name, args, origin)
            }
            Receiver::Fixed(target) => {
                let mut target =
                    target.lock().unwrap_or_else(PoisonError::into_inner);
                send(&mut *target, name, args, origin)
            }
        },
    }
}

/// Sends the `method` to the `target`, checking its [`Arity`] first.
fn send(
    target: &mut dyn Dispatch,
    method: &str,
    args: Vec<Value>,
    origin: Origin<'_>,
) -> InvocationResult<Value> {
    let arity = target.method_arity(method).ok_or_else(|| {
        DispatchError::UndefinedMethod { method: method.to_owned() }
    })?;
    origin.check_arity(arity, &args)?;
    target.send(method, args).map_err(InvocationError::Failed)
}
