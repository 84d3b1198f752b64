// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compilation of [`StepDefinition`] patterns into [`StepRegex`]es.
//!
//! A [`Pattern`] is either a regular expression, used as is, or a text
//! template with `$name` placeholders, which is escaped and anchored to match
//! a whole step line only.
//!
//! [`StepDefinition`]: crate::StepDefinition

use std::{
    any::Any,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use derive_more::with_trait::{Debug, Deref, Display, Error, From};
use lazy_regex::regex;
use regex::{NoExpand, Regex, RegexBuilder};

use super::error::{DefinitionError, DefinitionResult};

/// Capture group every `$name` placeholder of a text [`Pattern`] turns into.
const PLACEHOLDER_CAPTURE: &str = "(.*)";

/// Options of a [`StepRegex`] which are not part of its source text.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Flags {
    /// `^` and `$` match at line boundaries (`m`).
    pub multiline: bool,

    /// Letters match both upper and lower case (`i`).
    pub case_insensitive: bool,

    /// Whitespace and `#` comments in the pattern are ignored (`x`).
    pub extended: bool,
}

impl Flags {
    /// Indicates whether no flag is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.multiline || self.case_insensitive || self.extended)
    }
}

/// Renders [`Flags`] in their compact form, always in `m`, `i`, `x` order.
impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, c) in [
            (self.multiline, 'm'),
            (self.case_insensitive, 'i'),
            (self.extended, 'x'),
        ] {
            if set {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// Error of parsing [`Flags`] from their compact form.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("unknown regular expression flag `{_0}`, expected one of `m`, `i`, `x`")]
pub struct UnknownFlagError(#[error(not(source))] pub char);

impl FromStr for Flags {
    type Err = UnknownFlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars().try_fold(Self::default(), |mut flags, c| {
            match c {
                'm' => flags.multiline = true,
                'i' => flags.case_insensitive = true,
                'x' => flags.extended = true,
                other => return Err(UnknownFlagError(other)),
            }
            Ok(flags)
        })
    }
}

/// Compiled [`Regex`] of a [`StepDefinition`] along with its [`Flags`].
///
/// Implements [`Eq`], [`Ord`] and [`Hash`] by the source text only, so two
/// patterns differing in [`Flags`] alone are considered the same.
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Debug, Deref, Display)]
#[display("{regex}")]
pub struct StepRegex {
    /// Compiled [`Regex`].
    #[deref]
    regex: Regex,

    /// [`Flags`] the [`Regex`] was compiled with.
    flags: Flags,
}

impl StepRegex {
    /// Compiles the given `source` with the given [`Flags`].
    ///
    /// # Errors
    ///
    /// If the `source` is not a valid regular expression.
    pub fn with_flags(source: &str, flags: Flags) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .multi_line(flags.multiline)
            .case_insensitive(flags.case_insensitive)
            .ignore_whitespace(flags.extended)
            .build()?;
        Ok(Self { regex, flags })
    }

    /// Compiles the given `source` without any [`Flags`].
    ///
    /// # Errors
    ///
    /// If the `source` is not a valid regular expression.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Self::with_flags(source, Flags::default())
    }

    /// Returns the source text of this [`StepRegex`], without [`Flags`].
    #[must_use]
    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the [`Flags`] this [`StepRegex`] was compiled with.
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Returns the inner [`Regex`].
    #[must_use]
    pub const fn as_regex(&self) -> &Regex {
        &self.regex
    }
}

impl From<Regex> for StepRegex {
    fn from(regex: Regex) -> Self {
        Self { regex, flags: Flags::default() }
    }
}

impl Hash for StepRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source().hash(state);
    }
}

impl PartialEq for StepRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source() == other.source()
    }
}

impl Eq for StepRegex {}

impl PartialOrd for StepRegex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StepRegex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source().cmp(other.source())
    }
}

/// Pattern a [`StepDefinition`] is declared with.
///
/// [`StepDefinition`]: crate::StepDefinition
#[derive(Clone, Debug, From)]
pub enum Pattern {
    /// Regular expression, used as is, so the caller controls anchoring and
    /// [`Flags`].
    Regex(StepRegex),

    /// Text template, where every `$name` placeholder captures anything.
    Text(String),
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex.into())
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl Pattern {
    /// Creates a [`Pattern`] out of a dynamically typed value.
    ///
    /// Accepts [`Pattern`], [`StepRegex`], [`Regex`], [`String`] and
    /// `&'static str`.
    ///
    /// # Errors
    ///
    /// With [`DefinitionError::InvalidPatternKind`] if the `value` is none of
    /// the above.
    pub fn from_any(value: &dyn Any) -> DefinitionResult<Self> {
        if let Some(p) = value.downcast_ref::<Self>() {
            Ok(p.clone())
        } else if let Some(re) = value.downcast_ref::<StepRegex>() {
            Ok(Self::Regex(re.clone()))
        } else if let Some(re) = value.downcast_ref::<Regex>() {
            Ok(Self::from(re.clone()))
        } else if let Some(s) = value.downcast_ref::<String>() {
            Ok(Self::Text(s.clone()))
        } else if let Some(s) = value.downcast_ref::<&'static str>() {
            Ok(Self::from(*s))
        } else {
            Err(DefinitionError::InvalidPatternKind)
        }
    }
}

/// Compiles the given [`Pattern`] into a [`StepRegex`].
///
/// # Errors
///
/// With [`DefinitionError::InvalidPattern`] if the resulting regular
/// expression exceeds the size limits of the [`regex`] engine.
pub fn compile(pattern: Pattern) -> DefinitionResult<StepRegex> {
    match pattern {
        Pattern::Regex(re) => Ok(re),
        Pattern::Text(text) => {
            let escaped = regex::escape(&text);
            let source = regex!(r"\\\$\w+")
                .replace_all(&escaped, NoExpand(PLACEHOLDER_CAPTURE));
            StepRegex::new(&format!("^{source}$"))
                .map_err(DefinitionError::InvalidPattern)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(text: &str) -> StepRegex {
        compile(text.into()).unwrap()
    }

    #[test]
    fn text_placeholders_become_captures() {
        let re = compiled("I have $n cucumbers in my $organ");

        assert_eq!(re.source(), "^I have (.*) cucumbers in my (.*)$");
        assert_eq!(re.captures_len(), 3);
    }

    #[test]
    fn text_is_escaped() {
        let re = compiled("I pay $amount (in $$) for 1.5 kg?");

        assert!(re.is_match("I pay 10 (in $$) for 1.5 kg?"));
        assert!(!re.is_match("I pay 10 (in $$) for 105 kg?"));
        assert!(!re.is_match("I pay 10 in $$ for 1.5 kg"));
    }

    #[test]
    fn text_is_anchored() {
        let re = compiled("I have $n cucumbers");

        assert!(re.is_match("I have 5 cucumbers"));
        assert!(!re.is_match("I have 5 cucumbers today"));
        assert!(!re.is_match("Now I have 5 cucumbers"));
    }

    #[test]
    fn regex_is_used_verbatim() {
        let re = compiled_regex(r"foo (\d+)", Flags::default());

        assert_eq!(re.source(), r"foo (\d+)");
        assert!(re.is_match("a foo 42 bar"));
    }

    fn compiled_regex(source: &str, flags: Flags) -> StepRegex {
        compile(StepRegex::with_flags(source, flags).unwrap().into()).unwrap()
    }

    #[test]
    fn equality_ignores_flags() {
        let plain = compiled_regex(r"foo (\d+)", Flags::default());
        let insensitive = compiled_regex(
            r"foo (\d+)",
            Flags { case_insensitive: true, ..Flags::default() },
        );
        let other = compiled_regex(r"foo (\w+)", Flags::default());

        assert_eq!(plain, insensitive);
        assert_ne!(plain, other);
        assert!(insensitive.is_match("FOO 1"));
        assert!(!plain.is_match("FOO 1"));
    }

    #[test]
    fn flags_render_in_fixed_order() {
        let all = Flags { multiline: true, case_insensitive: true, extended: true };
        let ix = Flags { case_insensitive: true, extended: true, ..Flags::default() };

        assert_eq!(all.to_string(), "mix");
        assert_eq!(ix.to_string(), "ix");
        assert_eq!(Flags::default().to_string(), "");
        assert!(Flags::default().is_empty());
    }

    #[test]
    fn flags_parse_in_any_order() {
        let flags: Flags = "xim".parse().unwrap();

        assert_eq!(flags.to_string(), "mix");
        assert_eq!("mq".parse::<Flags>(), Err(UnknownFlagError('q')));
    }

    #[test]
    fn from_any_accepts_regex_and_text() {
        let text = Pattern::from_any(&"I eat $n cucumbers").unwrap();
        let owned = Pattern::from_any(&String::from("I eat $n")).unwrap();
        let re = Pattern::from_any(&Regex::new("^eat$").unwrap()).unwrap();

        assert!(matches!(text, Pattern::Text(t) if t == "I eat $n cucumbers"));
        assert!(matches!(owned, Pattern::Text(t) if t == "I eat $n"));
        assert!(matches!(re, Pattern::Regex(r) if r.source() == "^eat$"));
    }

    #[test]
    fn from_any_rejects_other_kinds() {
        assert!(matches!(
            Pattern::from_any(&42_u8),
            Err(DefinitionError::InvalidPatternKind),
        ));
    }
}
