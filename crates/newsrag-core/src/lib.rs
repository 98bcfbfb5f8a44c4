//! Core types and trait definitions for the newsrag chat service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends, provider clients and the HTTP layer all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod error;
pub mod message;
pub mod passage;
pub mod prompt;
pub mod provider;
pub mod store;

pub use error::{Error, Result};
