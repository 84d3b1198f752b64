// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resolution of step executables into [`Located`] [`Invocable`]s.
//!
//! A [`StepDefinition`] is declared either with an inline [`Block`], or with
//! a method name to be dispatched at invocation time, by default to the
//! `World` itself, or to another [`Dispatch`] target selected by the `on`
//! option.
//!
//! [`StepDefinition`]: crate::StepDefinition

use std::{
    any::Any,
    fmt,
    sync::{Arc, Mutex},
};

use derive_more::with_trait::Debug;
use lazy_regex::regex_is_match;

use crate::Value;

use super::{
    error::{DefinitionError, DefinitionResult, DispatchError},
    location::Location,
};

/// Number of arguments a step executable requires.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Arity {
    /// Exactly this number of arguments.
    Exact(usize),

    /// This number of arguments or more.
    AtLeast(usize),
}

impl Arity {
    /// Indicates whether the given number of arguments fits this [`Arity`].
    #[must_use]
    pub const fn accepts(&self, count: usize) -> bool {
        match *self {
            Self::Exact(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }

    /// Returns the number of arguments which cannot be omitted.
    #[must_use]
    pub const fn required(&self) -> usize {
        match *self {
            Self::Exact(n) | Self::AtLeast(n) => n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.required();
        if matches!(self, Self::AtLeast(_)) {
            f.write_str("at least ")?;
        }
        write!(f, "{n} argument{}", if n == 1 { "" } else { "s" })
    }
}

/// Function backing a [`Block`].
pub type BlockFn<World> =
    dyn Fn(&mut World, Vec<Value>) -> anyhow::Result<Value> + Send + Sync;

/// Inline step executable with a declared [`Arity`].
pub struct Block<World> {
    /// [`Arity`] of the function.
    arity: Arity,

    /// Function to execute.
    fun: Arc<BlockFn<World>>,

    /// Where this [`Block`] was created.
    location: Location,
}

// Implemented manually to omit redundant `World: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<World> Clone for Block<World> {
    fn clone(&self) -> Self {
        Self {
            arity: self.arity,
            fun: Arc::clone(&self.fun),
            location: self.location,
        }
    }
}

// Implemented manually to omit `World: Debug` and print the function as a
// pointer.
impl<World> fmt::Debug for Block<World> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("arity", &self.arity)
            .field("fun", &format_args!("{:p}", Arc::as_ptr(&self.fun)))
            .field("location", &self.location)
            .finish()
    }
}

impl<World> Block<World> {
    /// Creates a new [`Block`] located at the caller.
    #[must_use]
    #[track_caller]
    pub fn new<F>(arity: Arity, fun: F) -> Self
    where
        F: Fn(&mut World, Vec<Value>) -> anyhow::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        Self::with_location(Location::caller(), arity, fun)
    }

    /// Creates a new [`Block`] located at the given [`Location`].
    #[must_use]
    pub fn with_location<F>(location: Location, arity: Arity, fun: F) -> Self
    where
        F: Fn(&mut World, Vec<Value>) -> anyhow::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        Self { arity, fun: Arc::new(fun), location }
    }

    /// Returns the [`Arity`] of this [`Block`].
    #[must_use]
    pub const fn arity(&self) -> Arity {
        self.arity
    }

    /// Returns the [`Location`] this [`Block`] was created at.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Calls this [`Block`] without checking its [`Arity`].
    pub(crate) fn call(
        &self,
        world: &mut World,
        args: Vec<Value>,
    ) -> anyhow::Result<Value> {
        (self.fun)(world, args)
    }
}

/// Something able to execute methods by their names.
///
/// Every `World` invoking [`StepDefinition`]s implements it. Worlds used only
/// with [`Block`]s may rely on the default implementations:
/// ```rust
/// # use cucumber_steps::step::Dispatch;
/// struct World;
///
/// impl Dispatch for World {}
/// ```
///
/// [`StepDefinition`]: crate::StepDefinition
pub trait Dispatch {
    /// Returns the [`Arity`] of the `method`, or [`None`] if there is no such
    /// method.
    fn method_arity(&self, method: &str) -> Option<Arity> {
        _ = method;
        None
    }

    /// Executes the `method` with the given arguments.
    ///
    /// # Errors
    ///
    /// Whatever the `method` fails with.
    fn send(&mut self, method: &str, args: Vec<Value>) -> anyhow::Result<Value> {
        _ = args;
        Err(DispatchError::UndefinedMethod { method: method.to_owned() }.into())
    }

    /// Returns the [`Dispatch`] target named by the `selector`, if any.
    fn select(&mut self, selector: &str) -> Option<&mut dyn Dispatch> {
        _ = selector;
        None
    }
}

/// [`Dispatch`] target shared between invocations.
pub type SharedTarget = Arc<Mutex<dyn Dispatch + Send>>;

/// Value of the `on` option, choosing where a method is dispatched to.
#[derive(Clone)]
pub enum On {
    /// Fixed alternate target.
    Target(SharedTarget),

    /// Name of the selector the `World` is asked for the target with.
    Selector(String),
}

impl On {
    /// Creates an [`On`] option out of a dynamically typed value.
    ///
    /// Accepts [`On`], [`SharedTarget`], [`String`] and `&'static str`.
    ///
    /// # Errors
    ///
    /// With [`DefinitionError::InvalidDispatchTarget`] if the `value` is none
    /// of the above.
    pub fn from_any(value: &dyn Any) -> DefinitionResult<Self> {
        if let Some(on) = value.downcast_ref::<Self>() {
            Ok(on.clone())
        } else if let Some(t) = value.downcast_ref::<SharedTarget>() {
            Ok(Self::Target(Arc::clone(t)))
        } else if let Some(s) = value.downcast_ref::<String>() {
            Ok(Self::Selector(s.clone()))
        } else if let Some(s) = value.downcast_ref::<&'static str>() {
            Ok(Self::Selector((*s).to_owned()))
        } else {
            Err(DefinitionError::invalid_dispatch_target(
                "expected a dispatch target or a selector",
            ))
        }
    }
}

impl fmt::Debug for On {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(t) => write!(f, "Target({:p})", Arc::as_ptr(t)),
            Self::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
        }
    }
}

impl From<SharedTarget> for On {
    fn from(target: SharedTarget) -> Self {
        Self::Target(target)
    }
}

impl From<&str> for On {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_owned())
    }
}

impl From<String> for On {
    fn from(selector: String) -> Self {
        Self::Selector(selector)
    }
}

/// Options of a [`StepDefinition`] registration.
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Where a method-backed executable is dispatched to. The `World`
    /// itself, if [`None`].
    pub on: Option<On>,
}

impl Options {
    /// Sets the [`On`] option.
    #[must_use]
    pub fn on(mut self, on: impl Into<On>) -> Self {
        self.on = Some(on.into());
        self
    }
}

/// Executable a [`StepDefinition`] is declared with.
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Debug)]
pub enum Callable<World> {
    /// Inline [`Block`].
    Block(Block<World>),

    /// Name of a method to [`Dispatch`].
    Method(String),
}

impl<World> From<Block<World>> for Callable<World> {
    fn from(block: Block<World>) -> Self {
        Self::Block(block)
    }
}

impl<World> From<&str> for Callable<World> {
    fn from(method: &str) -> Self {
        Self::Method(method.to_owned())
    }
}

/// Resolved receiver of a method-backed [`Invocable`].
#[derive(Clone, Debug)]
pub enum Receiver {
    /// `World` itself.
    World,

    /// Fixed alternate target.
    Fixed(#[debug("{:p}", Arc::as_ptr(_0))] SharedTarget),

    /// Target the `World` returns for this selector.
    Selector(String),
}

/// Normalized step executable.
#[derive(Debug)]
pub enum Invocable<World> {
    /// Inline [`Block`].
    Block(Block<World>),

    /// Method dispatched to the [`Receiver`] at invocation time.
    Method {
        /// Where the method is dispatched to.
        receiver: Receiver,

        /// Name of the method.
        name: String,
    },
}

// Implemented manually to omit redundant `World: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<World> Clone for Invocable<World> {
    fn clone(&self) -> Self {
        match self {
            Self::Block(b) => Self::Block(b.clone()),
            Self::Method { receiver, name } => Self::Method {
                receiver: receiver.clone(),
                name: name.clone(),
            },
        }
    }
}

/// [`Invocable`] paired with the [`Location`] of its declaration.
#[derive(Debug)]
pub struct Located<World> {
    /// Resolved [`Invocable`].
    invocable: Invocable<World>,

    /// [`Location`] of the declaration, if known.
    location: Option<Location>,
}

// Implemented manually to omit redundant `World: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<World> Clone for Located<World> {
    fn clone(&self) -> Self {
        Self { invocable: self.invocable.clone(), location: self.location }
    }
}

impl<World> Located<World> {
    /// Returns the resolved [`Invocable`].
    #[must_use]
    pub const fn invocable(&self) -> &Invocable<World> {
        &self.invocable
    }

    /// Returns the [`Location`] of the declaration, if known.
    #[must_use]
    pub const fn location(&self) -> Option<Location> {
        self.location
    }

    /// Returns `<path>:<line>` of the declaration, or `:<method>` for a
    /// method-backed [`Invocable`] with no known [`Location`].
    #[must_use]
    pub fn summary(&self) -> String {
        match (&self.location, &self.invocable) {
            (Some(loc), _) => loc.file_colon_line(),
            (None, Invocable::Method { name, .. }) => format!(":{name}"),
            (None, Invocable::Block(b)) => b.location().file_colon_line(),
        }
    }
}

/// Resolves the given [`Callable`] into a [`Located`] [`Invocable`].
///
/// [`Block`]s keep their own [`Location`] and ignore [`Options`]. Methods are
/// located at the given `registered_at` [`Location`], which should be the
/// registration call site in user code.
///
/// # Errors
///
/// - [`DefinitionError::MissingExecutable`] if there is no [`Callable`] or
///   the method name is empty. Checked before anything else.
/// - [`DefinitionError::InvalidDispatchTarget`] if the [`On::Selector`] is not
///   an identifier.
pub fn resolve<World>(
    callable: Option<Callable<World>>,
    options: Options,
    registered_at: Option<Location>,
) -> DefinitionResult<Located<World>> {
    let callable = match callable {
        None => return Err(DefinitionError::MissingExecutable),
        Some(Callable::Method(name)) if name.is_empty() => {
            return Err(DefinitionError::MissingExecutable);
        }
        Some(c) => c,
    };

    match callable {
        Callable::Block(block) => {
            if let Some(on) = &options.on {
                tracing::warn!(
                    on = ?on,
                    location = %block.location(),
                    "`on` option is ignored for a block",
                );
            }
            Ok(Located {
                location: Some(block.location()),
                invocable: Invocable::Block(block),
            })
        }
        Callable::Method(name) => {
            let receiver = match options.on {
                None => Receiver::World,
                Some(On::Target(t)) => Receiver::Fixed(t),
                Some(On::Selector(s)) => {
                    if !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_]*$", &s) {
                        return Err(DefinitionError::invalid_dispatch_target(
                            format!("selector `{s}` is not an identifier"),
                        ));
                    }
                    Receiver::Selector(s)
                }
            };
            Ok(Located {
                invocable: Invocable::Method { receiver, name },
                location: registered_at,
            })
        }
    }
}
