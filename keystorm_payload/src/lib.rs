//! The keystorm payloads
//!
//! This library generates the synthetic key space that keystorm pushes into a
//! carbon relay. Keys are a fixed cross-product of dimensions and each key
//! yields a count and a response-time triple in the graphite plaintext line
//! protocol.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

use std::io;

pub use graphite::Graphite;

pub(crate) mod common;
pub mod graphite;

/// Errors related to serialization
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// IO operation failed
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}
