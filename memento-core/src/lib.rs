//! # memento core
//!
//! Errors and traits for around-advice memoization.
//!
//! This crate provides the building blocks used by the other memento crates:
//!
//! - **Traits**: [`CacheStore`], [`KeyGenerator`], [`JoinPoint`] and [`Advice`]
//! - **Errors**: [`KeyGenerationError`] and [`AdviceError`]
//! - **Join points**: [`Invocation`] for hand-written interception
//!
//! ## Example
//!
//! ```rust
//! use memento_core::{Invocation, JoinPoint};
//!
//! let call = Invocation::new("hello".to_string(), |s: String| Ok::<_, ()>(s.len()));
//! assert_eq!(call.proceed(), Ok(5));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod invocation;
pub mod traits;

pub use constants::*;
pub use error::{AdviceError, KeyGenerationError, Result};
pub use invocation::Invocation;
pub use traits::*;
