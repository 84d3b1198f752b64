// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    trivial_casts,
    trivial_numeric_casts
)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::missing_const_for_fn,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs,
    unreachable_pub,
    unused_results
)]

pub mod registry;
pub mod step;
pub mod transform;
pub mod value;

#[doc(inline)]
pub use self::{
    registry::Registry,
    step::{
        Arity, Block, Callable, DefinitionError, Dispatch, Identity,
        InvocationError, Options, Pattern, StepArgument, StepDefinition,
    },
    transform::Transforms,
    value::Value,
};
