// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Extraction of [`StepArgument`]s out of step text.

use derive_more::with_trait::{Debug, Deref, Display};
use regex::Regex;

/// Raw capture of a step text, not transformed in any way.
#[derive(Clone, Debug, Deref, Display, Eq, Hash, PartialEq)]
#[display("{value}")]
pub struct StepArgument {
    /// Captured text. Empty if the group didn't participate in the match.
    #[deref]
    pub value: String,

    /// Byte offset of the capture in the step text. [`None`] if the group
    /// didn't participate in the match.
    pub offset: Option<usize>,
}

impl StepArgument {
    /// Returns the byte range of this [`StepArgument`] in the step text.
    #[must_use]
    pub fn span(&self) -> Option<(usize, usize)> {
        self.offset.map(|start| (start, start + self.value.len()))
    }
}

impl From<StepArgument> for String {
    fn from(arg: StepArgument) -> Self {
        arg.value
    }
}

/// Matches the `text` against the `regex`, returning its capture groups in
/// order (the whole match excluded).
///
/// [`None`] means there is no match. An empty [`Vec`] means a match of a
/// [`Regex`] without capture groups.
#[must_use]
pub fn extract(regex: &Regex, text: &str) -> Option<Vec<StepArgument>> {
    let mut captures = regex.capture_locations();
    _ = regex.captures_read(&mut captures, text)?;

    Some(
        (1..captures.len())
            .map(|group_id| {
                captures
                    .get(group_id)
                    .and_then(|(s, e)| Some((s, text.get(s..e)?)))
                    .map_or_else(
                        || StepArgument { value: String::new(), offset: None },
                        |(s, v)| StepArgument {
                            value: v.to_owned(),
                            offset: Some(s),
                        },
                    )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::{extract, StepArgument};

    fn values(args: &[StepArgument]) -> Vec<&str> {
        args.iter().map(|a| a.value.as_str()).collect()
    }

    #[test]
    fn no_match_is_none() {
        let re = Regex::new(r"^I have (\d+) cucumbers$").unwrap();

        assert_eq!(extract(&re, "I have many cucumbers"), None);
    }

    #[test]
    fn captures_in_order_with_offsets() {
        let re = Regex::new(r"^I have (\d+) cucumbers in my (\w+)$").unwrap();

        let args = extract(&re, "I have 5 cucumbers in my belly").unwrap();

        assert_eq!(values(&args), ["5", "belly"]);
        assert_eq!(args[0].offset, Some(7));
        assert_eq!(args[1].span(), Some((25, 30)));
    }

    #[test]
    fn no_groups_is_empty() {
        let re = Regex::new(r"^I am hungry$").unwrap();

        assert_eq!(extract(&re, "I am hungry"), Some(vec![]));
    }

    #[test]
    fn non_participating_group_is_empty_and_unplaced() {
        let re = Regex::new(r"^I (?:have (\d+)|lost) cucumbers$").unwrap();

        let args = extract(&re, "I lost cucumbers").unwrap();

        assert_eq!(
            args,
            [StepArgument { value: String::new(), offset: None }],
        );
    }

    #[test]
    fn captured_text_is_not_coerced() {
        let re = Regex::new(r"^weight: (.*)$").unwrap();

        let args = extract(&re, "weight:  0042.50 ").unwrap();

        assert_eq!(values(&args), [" 0042.50 "]);
    }
}
