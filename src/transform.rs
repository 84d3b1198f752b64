// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Argument [`Transforms`] retyping raw step captures before invocation.

use std::sync::Arc;

use derive_more::with_trait::Debug;

use crate::{
    step::{
        argument, error::DefinitionResult, location::Location, pattern,
        Pattern, StepRegex,
    },
    Value,
};

/// Function converting the captures of a [`Transform`] pattern.
pub type TransformFn =
    dyn Fn(Vec<String>) -> anyhow::Result<Value> + Send + Sync;

/// Single argument transform.
#[derive(Clone, Debug)]
pub struct Transform {
    /// Pattern an argument has to match for this [`Transform`] to apply.
    regex: StepRegex,

    /// Conversion of the captures.
    #[debug("{:p}", Arc::as_ptr(fun))]
    fun: Arc<TransformFn>,

    /// Where this [`Transform`] was registered.
    location: Location,
}

impl Transform {
    /// Returns the [`StepRegex`] of this [`Transform`].
    #[must_use]
    pub const fn regex(&self) -> &StepRegex {
        &self.regex
    }

    /// Returns the [`Location`] this [`Transform`] was registered at.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Applies this [`Transform`] to the `arg`, if it matches.
    ///
    /// Passes the capture groups to the function, or the whole `arg` if the
    /// pattern has none.
    fn apply(&self, arg: &str) -> Option<anyhow::Result<Value>> {
        let captures = argument::extract(&self.regex, arg)?;
        let captures = if captures.is_empty() {
            vec![arg.to_owned()]
        } else {
            captures.into_iter().map(String::from).collect()
        };
        Some((self.fun)(captures))
    }
}

/// Ordered collection of [`Transform`]s.
///
/// The first [`Transform`] matching an argument converts it. Arguments no
/// [`Transform`] matches stay [`Value::Str`].
#[derive(Clone, Debug, Default)]
pub struct Transforms(Vec<Transform>);

impl Transforms {
    /// Creates an empty [`Transforms`] collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a [`Transform`] for arguments matching the `pattern`.
    ///
    /// Text patterns are compiled the same way as [`StepDefinition`] ones.
    ///
    /// # Errors
    ///
    /// If the `pattern` fails to compile.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    #[track_caller]
    pub fn with<F>(
        mut self,
        pattern: impl Into<Pattern>,
        fun: F,
    ) -> DefinitionResult<Self>
    where
        F: Fn(Vec<String>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let location = Location::caller();
        let regex = pattern::compile(pattern.into())?;
        self.0.push(Transform { regex, fun: Arc::new(fun), location });
        Ok(self)
    }

    /// Returns the number of [`Transform`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether there are no [`Transform`]s.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the [`Transform`]s in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Transform> {
        self.0.iter()
    }

    /// Converts the given raw `args`, preserving their number and order.
    ///
    /// # Errors
    ///
    /// With the first error a [`Transform`] fails with.
    pub fn execute(&self, args: Vec<String>) -> anyhow::Result<Vec<Value>> {
        args.into_iter()
            .map(|arg| {
                self.0
                    .iter()
                    .find_map(|t| t.apply(&arg))
                    .unwrap_or(Ok(Value::Str(arg)))
            })
            .collect()
    }
}
