// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Registry`] collaborating with [`StepDefinition`]s.
//!
//! [`StepDefinition`]: crate::StepDefinition

use std::sync::{Mutex, PoisonError};

use derive_more::with_trait::Debug;
use linked_hash_map::LinkedHashMap;

use crate::{transform::Transforms, Value};

/// Registry of a run, notified about [`StepDefinition`]s and providing their
/// argument transforms.
///
/// Shared between all the [`StepDefinition`]s of a run, which may be matched
/// and invoked from concurrently running scenarios, so implementors have to
/// keep their bookkeeping safe for concurrent updates.
///
/// [`StepDefinition`]: crate::StepDefinition
pub trait Registry: Send + Sync {
    /// Called once a [`StepDefinition`] has been constructed.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    fn on_definition_constructed(&self, pattern: &str, location: &str) {
        _ = (pattern, location);
    }

    /// Called every time a [`StepDefinition`] matches a step text, before
    /// it's invoked.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    fn on_definition_matched(&self, pattern: &str, location: &str) {
        _ = (pattern, location);
    }

    /// Converts the raw captured `args` into [`Value`]s, preserving their
    /// number and order.
    ///
    /// Leaves all of them as [`Value::Str`] by default.
    ///
    /// # Errors
    ///
    /// If some argument fails to be converted.
    fn execute_transforms(&self, args: Vec<String>) -> anyhow::Result<Vec<Value>> {
        Ok(args.into_iter().map(Value::Str).collect())
    }
}

/// Usage statistics of a single [`StepDefinition`].
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Usage {
    /// Pattern source of the [`StepDefinition`].
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    pub pattern: String,

    /// Source location summary of the [`StepDefinition`].
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    pub location: String,

    /// Number of step texts the [`StepDefinition`] has matched.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    pub matches: usize,
}

/// In-memory [`Registry`] tracking [`Usage`] of [`StepDefinition`]s and
/// applying [`Transforms`].
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Debug, Default)]
pub struct Basic {
    /// [`Transforms`] applied to arguments.
    transforms: Transforms,

    /// Match counters, in definition order.
    usage: Mutex<LinkedHashMap<(String, String), usize>>,
}

impl Basic {
    /// Creates a new [`Basic`] [`Registry`] with the given [`Transforms`].
    #[must_use]
    pub fn new(transforms: Transforms) -> Self {
        Self { transforms, usage: Mutex::default() }
    }

    /// Returns the [`Transforms`] of this [`Registry`].
    #[must_use]
    pub const fn transforms(&self) -> &Transforms {
        &self.transforms
    }

    /// Returns the [`Usage`] of every constructed [`StepDefinition`], in
    /// definition order.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    #[must_use]
    pub fn usage(&self) -> Vec<Usage> {
        self.lock()
            .iter()
            .map(|((pattern, location), &matches)| Usage {
                pattern: pattern.clone(),
                location: location.clone(),
                matches,
            })
            .collect()
    }

    /// Returns the [`Usage`] of [`StepDefinition`]s which haven't matched
    /// anything yet.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    #[must_use]
    pub fn unused(&self) -> Vec<Usage> {
        self.usage().into_iter().filter(|u| u.matches == 0).collect()
    }

    /// Returns the number of matches of the [`StepDefinition`] with the given
    /// pattern source, summed over all its locations.
    ///
    /// [`StepDefinition`]: crate::StepDefinition
    #[must_use]
    pub fn matches_of(&self, pattern: &str) -> Option<usize> {
        self.lock()
            .iter()
            .filter(|((p, _), _)| p == pattern)
            .map(|(_, n)| *n)
            .reduce(|a, b| a + b)
    }

    /// Locks the match counters, ignoring poisoning.
    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, LinkedHashMap<(String, String), usize>> {
        self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Registry for Basic {
    fn on_definition_constructed(&self, pattern: &str, location: &str) {
        _ = self
            .lock()
            .entry((pattern.to_owned(), location.to_owned()))
            .or_insert(0);
    }

    fn on_definition_matched(&self, pattern: &str, location: &str) {
        *self
            .lock()
            .entry((pattern.to_owned(), location.to_owned()))
            .or_insert(0) += 1;
    }

    fn execute_transforms(&self, args: Vec<String>) -> anyhow::Result<Vec<Value>> {
        self.transforms.execute(args)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn counts_matches_per_definition() {
        let registry = Basic::default();
        registry.on_definition_constructed("^a$", "steps.rs:1");
        registry.on_definition_constructed("^b$", "steps.rs:2");
        registry.on_definition_matched("^a$", "steps.rs:1");
        registry.on_definition_matched("^a$", "steps.rs:1");

        assert_eq!(registry.matches_of("^a$"), Some(2));
        assert_eq!(registry.matches_of("^b$"), Some(0));
        assert_eq!(registry.matches_of("^c$"), None);
        assert_eq!(
            registry.unused(),
            [Usage {
                pattern: "^b$".into(),
                location: "steps.rs:2".into(),
                matches: 0,
            }],
        );
    }

    #[test]
    fn keeps_definition_order() {
        let registry = Basic::default();
        for p in ["^z$", "^a$", "^m$"] {
            registry.on_definition_constructed(p, "steps.rs:1");
        }

        let order: Vec<_> =
            registry.usage().into_iter().map(|u| u.pattern).collect();
        assert_eq!(order, ["^z$", "^a$", "^m$"]);
    }

    #[test]
    fn counts_concurrent_matches() {
        let registry = Arc::new(Basic::default());
        registry.on_definition_constructed("^a$", "steps.rs:1");

        let handles = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        registry.on_definition_matched("^a$", "steps.rs:1");
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.matches_of("^a$"), Some(800));
    }

    #[test]
    fn default_transforms_keep_raw_strings() {
        struct Silent;
        impl Registry for Silent {}

        let out = Silent.execute_transforms(vec!["5".into()]).unwrap();

        assert_eq!(out, [Value::from("5")]);
    }
}
