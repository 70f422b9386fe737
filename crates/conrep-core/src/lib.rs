//! Core types and trait definitions for the condition repository.
//!
//! This crate is deliberately free of HTTP and terminal dependencies. It holds
//! the subcondition tree store, the attribute requirement rules, the approval
//! state machine and the payload types exchanged with the backing REST API.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod approval;
pub mod attribute;
pub mod condition;
pub mod error;
pub mod order;
pub mod project;
pub mod service;
pub mod subcondition;
pub mod tree;

pub use error::{Error, Result, ValidationError};
