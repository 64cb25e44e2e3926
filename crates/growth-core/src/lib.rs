//! Core types and trait definitions for the Growth plant tracker.
//!
//! This crate is deliberately free of HTTP, process and database
//! dependencies. Every other crate depends on it.

// Native `async fn` in traits; see `store.rs`.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod photo;
pub mod plant;
pub mod store;

pub use error::{Error, Result};
