//! Adaptive candidate-narrowing query engine for competitor identities.
//!
//! A [`filter::FilterSpec`] names an optional identity-level bootstrap filter
//! and an ordered list of constraint groups. [`finder::Finder`] folds the
//! groups into a shrinking candidate set, inlining the set into later queries
//! once it is small, and finally fetches the surviving identities in score
//! order.
//!
//! This crate has no database or HTTP dependencies. Stores implement
//! [`backend::Backend`]; see `oifind-store-sqlite` and `oifind-remote`.

// Native `async fn` in traits; the `Send` bounds are spelled out explicitly.
#![allow(async_fn_in_trait)]

pub mod assemble;
pub mod backend;
pub mod compile;
pub mod error;
pub mod filter;
pub mod finder;
pub mod memory;
pub mod model;
pub mod predicate;
pub mod statement;
pub mod tracker;
pub mod value;

pub use error::{Error, ErrorKind, Result};

#[cfg(test)]
mod tests;
