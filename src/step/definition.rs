// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`StepDefinition`]: a pattern paired with an executable.

use std::{
    cmp::Reverse,
    hash::{Hash, Hasher},
    sync::Arc,
};

use derive_more::with_trait::Debug;
use once_cell::sync::OnceCell;

use crate::{registry::Registry, Value};

use super::{
    argument::{self, StepArgument},
    error::{DefinitionError, DefinitionResult, InvocationResult},
    executable::{self, Block, Callable, Dispatch, Located, Options},
    invocation::{self, Origin},
    location::Location,
    pattern::{self, Pattern, StepRegex},
};

/// Pattern paired with an executable, invoked for every step text the
/// pattern matches.
///
/// Immutable once constructed, so may be shared between and matched from
/// concurrently running scenarios.
///
/// Two [`StepDefinition`]s are equal if their patterns have the same source
/// text, regardless of [`Flags`].
///
/// [`Flags`]: super::Flags
#[derive(Debug)]
pub struct StepDefinition<World> {
    /// Compiled pattern.
    regex: StepRegex,

    /// Executable to invoke.
    invocable: Located<World>,

    /// [`Registry`] this [`StepDefinition`] reports to.
    #[debug(skip)]
    registry: Arc<dyn Registry>,

    /// Memoized [`StepDefinition::source_location_summary()`].
    summary: OnceCell<String>,
}

impl<World> StepDefinition<World> {
    /// Constructs a new [`StepDefinition`] and notifies the `registry` about
    /// it.
    ///
    /// Method-backed definitions are located at the caller of this function.
    ///
    /// # Errors
    ///
    /// See [`StepDefinition::with_location()`].
    #[track_caller]
    pub fn new(
        registry: Arc<dyn Registry>,
        pattern: impl Into<Pattern>,
        callable: Option<Callable<World>>,
        options: Options,
    ) -> DefinitionResult<Self> {
        Self::with_location(
            registry,
            pattern,
            callable,
            options,
            Some(Location::caller()),
        )
    }

    /// Constructs a new [`StepDefinition`] backed by the given [`Block`].
    ///
    /// # Errors
    ///
    /// See [`StepDefinition::with_location()`].
    #[track_caller]
    pub fn block(
        registry: Arc<dyn Registry>,
        pattern: impl Into<Pattern>,
        block: Block<World>,
    ) -> DefinitionResult<Self> {
        Self::new(registry, pattern, Some(block.into()), Options::default())
    }

    /// Constructs a new [`StepDefinition`] dispatching the given `method`.
    ///
    /// # Errors
    ///
    /// See [`StepDefinition::with_location()`].
    #[track_caller]
    pub fn method(
        registry: Arc<dyn Registry>,
        pattern: impl Into<Pattern>,
        method: &str,
        options: Options,
    ) -> DefinitionResult<Self> {
        Self::new(registry, pattern, Some(method.into()), options)
    }

    /// Constructs a new [`StepDefinition`] with method-backed executables
    /// located at the given `registered_at` [`Location`], and notifies the
    /// `registry` about it.
    ///
    /// # Errors
    ///
    /// - [`DefinitionError::MissingExecutable`] if there is no `callable`, or
    ///   its method name is empty, before anything else is checked.
    /// - [`DefinitionError::InvalidPattern`] if the `pattern` doesn't compile.
    /// - [`DefinitionError::InvalidDispatchTarget`] if the `on` option is
    ///   invalid.
    pub fn with_location(
        registry: Arc<dyn Registry>,
        pattern: impl Into<Pattern>,
        callable: Option<Callable<World>>,
        options: Options,
        registered_at: Option<Location>,
    ) -> DefinitionResult<Self> {
        let Some(callable) = callable.filter(
            |c| !matches!(c, Callable::Method(name) if name.is_empty()),
        ) else {
            return Err(DefinitionError::MissingExecutable);
        };
        let regex = pattern::compile(pattern.into())?;
        let invocable =
            executable::resolve(Some(callable), options, registered_at)?;

        let def =
            Self { regex, invocable, registry, summary: OnceCell::new() };
        let location = def.source_location_summary();
        def.registry.on_definition_constructed(def.regex.source(), location);
        tracing::debug!(
            pattern = def.regex.source(),
            location,
            "step definition constructed",
        );

        Ok(def)
    }

    /// Returns the compiled pattern of this [`StepDefinition`].
    #[must_use]
    pub const fn regex(&self) -> &StepRegex {
        &self.regex
    }

    /// Returns the resolved executable of this [`StepDefinition`].
    #[must_use]
    pub const fn invocable(&self) -> &Located<World> {
        &self.invocable
    }

    /// Matches the `text` against the pattern of this [`StepDefinition`],
    /// returning the captured [`StepArgument`]s.
    ///
    /// [`None`] means this [`StepDefinition`] doesn't apply to the `text`.
    /// Otherwise, the [`Registry`] is notified about the match.
    #[must_use]
    pub fn matches(&self, text: &str) -> Option<Vec<StepArgument>> {
        let args = argument::extract(&self.regex, text)?;

        let location = self.source_location_summary();
        self.registry.on_definition_matched(self.regex.source(), location);
        tracing::debug!(
            pattern = self.regex.source(),
            location,
            text,
            "step definition matched",
        );

        Some(args)
    }

    /// Matches the `text` the same way [`StepDefinition::matches()`] does,
    /// bundling the result into a [`StepMatch`].
    #[must_use]
    pub fn step_match(&self, text: &str) -> Option<StepMatch<'_, World>> {
        self.matches(text).map(|arguments| StepMatch {
            definition: self,
            text: text.to_owned(),
            arguments,
        })
    }

    /// Invokes this [`StepDefinition`] with the given raw `args` against the
    /// `world`.
    ///
    /// The `args` are passed through the [`Registry`] transforms first.
    ///
    /// # Errors
    ///
    /// - [`InvocationError::ArityMismatch`] if the transformed arguments don't
    ///   fit the executable, pointing to the declaration of this
    ///   [`StepDefinition`].
    /// - [`InvocationError::Dispatch`] if a method has no target.
    /// - [`InvocationError::Failed`] with whatever the transforms or the
    ///   executable fail with, unmodified.
    ///
    /// [`InvocationError::ArityMismatch`]: super::InvocationError::ArityMismatch
    /// [`InvocationError::Dispatch`]: super::InvocationError::Dispatch
    /// [`InvocationError::Failed`]: super::InvocationError::Failed
    pub fn invoke(
        &self,
        args: Vec<String>,
        world: &mut World,
    ) -> InvocationResult<Value>
    where
        World: Dispatch,
    {
        invocation::run(
            self.invocable.invocable(),
            args,
            world,
            &*self.registry,
            self.origin(),
        )
    }

    /// Returns the serializable [`Identity`] of this [`StepDefinition`].
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            source: self.regex.source().to_owned(),
            flags: self.regex.flags().to_string(),
        }
    }

    /// Returns `<file>:<line>` of the declaration, or `:<method>` for a
    /// method-backed [`StepDefinition`] with no known [`Location`].
    #[must_use]
    pub fn source_location_summary(&self) -> &str {
        self.summary.get_or_init(|| self.invocable.summary())
    }

    /// Returns the file of the declaration, if known.
    #[must_use]
    pub fn file(&self) -> Option<&'static str> {
        self.invocable.location().map(|loc| loc.path)
    }

    /// Returns the backtrace line pointing to the declaration of this
    /// [`StepDefinition`].
    #[must_use]
    pub fn backtrace_line(&self) -> String {
        self.origin().backtrace_line()
    }

    /// Returns the [`Origin`] of invocations of this [`StepDefinition`].
    fn origin(&self) -> Origin<'_> {
        Origin {
            pattern: self.regex.source(),
            location: self.source_location_summary(),
        }
    }
}

impl<World> PartialEq for StepDefinition<World> {
    fn eq(&self, other: &Self) -> bool {
        self.regex == other.regex
    }
}

impl<World> Eq for StepDefinition<World> {}

impl<World> Hash for StepDefinition<World> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.regex.hash(state);
    }
}

/// Serializable identity of a [`StepDefinition`] pattern, used for reporting
/// across process boundaries.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Identity {
    /// Source text of the pattern.
    pub source: String,

    /// Compact [`Flags`] of the pattern: a subset of `mix`, in this order.
    ///
    /// [`Flags`]: super::Flags
    pub flags: String,
}

/// Successful match of a step text by a [`StepDefinition`].
#[derive(Debug)]
pub struct StepMatch<'d, World> {
    /// Matching [`StepDefinition`].
    pub definition: &'d StepDefinition<World>,

    /// Matched step text.
    pub text: String,

    /// Captured [`StepArgument`]s.
    pub arguments: Vec<StepArgument>,
}

impl<World> StepMatch<'_, World> {
    /// Invokes the matching [`StepDefinition`] with the captured
    /// [`StepArgument`]s.
    ///
    /// # Errors
    ///
    /// See [`StepDefinition::invoke()`].
    pub fn invoke(&self, world: &mut World) -> InvocationResult<Value>
    where
        World: Dispatch,
    {
        let args = self.arguments.iter().map(|a| a.value.clone()).collect();
        self.definition.invoke(args, world)
    }

    /// Renders the step text with every captured argument passed through the
    /// `format` function, e.g. to highlight it.
    ///
    /// Arguments which didn't participate in the match, or which are nested
    /// into another one, are left as is.
    #[must_use]
    pub fn format_args(&self, format: impl Fn(&str) -> String) -> String {
        let mut spans = self
            .arguments
            .iter()
            .filter_map(StepArgument::span)
            .collect::<Vec<_>>();
        spans.sort_unstable_by_key(|&(start, end)| (start, Reverse(end)));

        let mut out = String::with_capacity(self.text.len());
        let mut pos = 0;
        for (start, end) in spans {
            if start < pos {
                continue;
            }
            let (Some(before), Some(arg)) =
                (self.text.get(pos..start), self.text.get(start..end))
            else {
                continue;
            };
            out.push_str(before);
            out.push_str(&format(arg));
            pos = end;
        }
        out.push_str(self.text.get(pos..).unwrap_or_default());
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::step::{executable::Arity, InvocationError};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Vec<Value>>,
    }

    impl Dispatch for Recorder {}

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl Registry for Events {
        fn on_definition_constructed(&self, pattern: &str, location: &str) {
            let event = format!("constructed {pattern} {location}");
            self.0.lock().unwrap().push(event);
        }

        fn on_definition_matched(&self, pattern: &str, location: &str) {
            let event = format!("matched {pattern} {location}");
            self.0.lock().unwrap().push(event);
        }
    }

    #[track_caller]
    fn recording(arity: Arity) -> Block<Recorder> {
        Block::new(arity, |w: &mut Recorder, args| {
            w.calls.push(args);
            Ok(Value::Nil)
        })
    }

    #[test]
    fn notifies_registry_on_construction() {
        let events = Arc::new(Events::default());
        let line = line!() + 1;
        let block = recording(Arity::Exact(0));
        let expected = block.location().file_colon_line();

        let def =
            StepDefinition::block(events.clone(), "I am hungry", block).unwrap();

        assert_eq!(expected, format!("{}:{line}", file!()));
        assert_eq!(def.source_location_summary(), expected);
        assert_eq!(
            *events.0.lock().unwrap(),
            [format!("constructed ^I am hungry$ {expected}")],
        );
    }

    #[test]
    fn missing_executable_never_notifies() {
        let events = Arc::new(Events::default());

        let err = StepDefinition::<Recorder>::new(
            events.clone(),
            "I am hungry",
            None,
            Options::default(),
        )
        .unwrap_err();

        assert!(matches!(err, DefinitionError::MissingExecutable));
        assert!(events.0.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_method_is_rejected_before_pattern() {
        let oversized = "$a ".repeat(200_000);
        let events = Arc::new(Events::default());

        let invalid = StepDefinition::<Recorder>::method(
            events.clone(),
            oversized.as_str(),
            "eat",
            Options::default(),
        )
        .unwrap_err();
        let missing = StepDefinition::<Recorder>::method(
            events.clone(),
            oversized.as_str(),
            "",
            Options::default(),
        )
        .unwrap_err();

        assert!(matches!(invalid, DefinitionError::InvalidPattern(_)));
        assert!(matches!(missing, DefinitionError::MissingExecutable));
        assert!(events.0.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_dispatch_target_never_notifies() {
        let events = Arc::new(Events::default());

        let err = StepDefinition::<Recorder>::method(
            events.clone(),
            "I am hungry",
            "eat",
            Options::default().on("the belly"),
        )
        .unwrap_err();

        assert!(matches!(err, DefinitionError::InvalidDispatchTarget { .. }));
        assert!(events.0.lock().unwrap().is_empty());
    }

    #[test]
    fn notifies_registry_on_match_only() {
        let events = Arc::new(Events::default());
        let def = StepDefinition::block(
            events.clone(),
            "I have $n cucumbers",
            recording(Arity::Exact(1)),
        )
        .unwrap();

        assert!(def.matches("I have 5 cucumbers today").is_none());
        assert_eq!(events.0.lock().unwrap().len(), 1);

        let args = def.matches("I have 5 cucumbers").unwrap();
        assert_eq!(args[0].value, "5");
        assert!(events.0.lock().unwrap()[1]
            .starts_with("matched ^I have (.*) cucumbers$ "));
    }

    #[test]
    fn invokes_with_captured_arguments() {
        let events = Arc::new(Events::default());
        let def = StepDefinition::block(
            events,
            "I have $n cucumbers in my belly",
            recording(Arity::Exact(1)),
        )
        .unwrap();
        let mut world = Recorder::default();

        let m = def.step_match("I have 5 cucumbers in my belly").unwrap();
        _ = m.invoke(&mut world).unwrap();

        assert_eq!(world.calls, [vec![Value::from("5")]]);
    }

    #[test]
    fn arity_mismatch_points_to_declaration() {
        let def = StepDefinition::block(
            Arc::new(Events::default()),
            regex::Regex::new(r"^I eat (\d+) of (\d+) cucumbers$").unwrap(),
            recording(Arity::Exact(2)),
        )
        .unwrap();
        let mut world = Recorder::default();

        let err = def.invoke(vec!["1".into()], &mut world).unwrap_err();

        assert!(matches!(err, InvocationError::ArityMismatch(_)));
        let err = err.as_arity_mismatch().unwrap();
        assert_eq!(err.location, def.source_location_summary());
        assert_eq!(err.backtrace_line(), Some(def.backtrace_line().as_str()));
        assert_eq!(
            def.backtrace_line(),
            format!(
                "{}: in '^I eat (\\d+) of (\\d+) cucumbers$'",
                def.source_location_summary(),
            ),
        );
        assert!(world.calls.is_empty());
    }

    #[test]
    fn method_definition_without_location() {
        let def = StepDefinition::<Recorder>::with_location(
            Arc::new(Events::default()),
            "I eat",
            Some("eat".into()),
            Options::default(),
            None,
        )
        .unwrap();

        assert_eq!(def.source_location_summary(), ":eat");
        assert_eq!(def.file(), None);
        assert_eq!(def.backtrace_line(), ":eat: in '^I eat$'");
    }

    #[test]
    fn method_definition_is_located_at_registration() {
        let line = line!() + 1;
        let def = StepDefinition::<Recorder>::method(
            Arc::new(Events::default()),
            "I eat",
            "eat",
            Options::default(),
        )
        .unwrap();

        assert_eq!(def.file(), Some(file!()));
        assert_eq!(
            def.source_location_summary(),
            format!("{}:{line}", file!()),
        );
    }

    #[test]
    fn equality_is_by_pattern_source() {
        let registry: Arc<dyn Registry> = Arc::new(Events::default());
        let a = StepDefinition::block(
            Arc::clone(&registry),
            "I have $n cucumbers",
            recording(Arity::Exact(1)),
        )
        .unwrap();
        let b = StepDefinition::<Recorder>::method(
            Arc::clone(&registry),
            "I have $count cucumbers",
            "eat",
            Options::default(),
        )
        .unwrap();
        let c = StepDefinition::block(
            registry,
            "I have $n carrots",
            recording(Arity::Exact(1)),
        )
        .unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn identity_of_text_pattern() {
        let def = StepDefinition::block(
            Arc::new(Events::default()),
            "I have $n cucumbers",
            recording(Arity::Exact(1)),
        )
        .unwrap();

        assert_eq!(
            def.identity(),
            Identity {
                source: "^I have (.*) cucumbers$".into(),
                flags: String::new(),
            },
        );
    }

    #[test]
    fn format_args_wraps_each_argument() {
        let def = StepDefinition::block(
            Arc::new(Events::default()),
            "I have $n cucumbers in my $organ",
            recording(Arity::Exact(2)),
        )
        .unwrap();

        let m = def.step_match("I have 5 cucumbers in my belly").unwrap();

        assert_eq!(
            m.format_args(|a| format!("[{a}]")),
            "I have [5] cucumbers in my [belly]",
        );
    }

    #[test]
    fn format_args_skips_nested_and_missing() {
        let def = StepDefinition::block(
            Arc::new(Events::default()),
            regex::Regex::new(r"^I have ((\d+) big)?( cucumbers)$").unwrap(),
            recording(Arity::AtLeast(0)),
        )
        .unwrap();

        let nested = def.step_match("I have 3 big cucumbers").unwrap();
        let missing = def.step_match("I have  cucumbers").unwrap();

        assert_eq!(
            nested.format_args(|a| format!("<{a}>")),
            "I have <3 big>< cucumbers>",
        );
        assert_eq!(
            missing.format_args(|a| format!("<{a}>")),
            "I have < cucumbers>",
        );
    }
}
