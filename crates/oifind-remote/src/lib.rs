//! Remote, quota-governed backend for the oifind query engine.
//!
//! Talks to a D1-style raw query endpoint: each statement is one HTTP `POST`
//! carrying SQL text and positional parameters. Every top-level query should
//! open its own [`RemoteSession`], which owns the cost counters for that
//! query and nothing else.

mod client;
mod wire;

pub mod error;

pub use client::{DEFAULT_MAX_PARAMETERS, RemoteConfig, RemoteSession, RemoteStore, Usage};
pub use error::{Error, Result};
pub use wire::{Envelope, Message, Meta, QueryRequest, QueryResult, RawRows};
