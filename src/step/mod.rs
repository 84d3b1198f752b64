// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`StepDefinition`]s and the machinery of matching and invoking them.
//!
//! - [`pattern`]: compiling patterns into [`StepRegex`]es
//! - [`argument`]: extracting [`StepArgument`]s out of step text
//! - [`executable`]: resolving executables into [`Located`] [`Invocable`]s
//! - [`invocation`]: transforming arguments and invoking executables
//! - [`definition`]: the [`StepDefinition`] aggregate
//! - [`error`]: errors of defining and invoking
//! - [`location`]: source positions of declarations

pub mod argument;
pub mod definition;
pub mod error;
pub mod executable;
pub mod invocation;
pub mod location;
pub mod pattern;

pub use self::{
    argument::StepArgument,
    definition::{Identity, StepDefinition, StepMatch},
    error::{
        ArityMismatchError, DefinitionError, DefinitionResult, DispatchError,
        InvocationError, InvocationResult,
    },
    executable::{
        Arity, Block, Callable, Dispatch, Invocable, Located, On, Options,
        Receiver, SharedTarget,
    },
    location::Location,
    pattern::{Flags, Pattern, StepRegex, UnknownFlagError},
};
