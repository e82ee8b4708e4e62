//! The keystorm carbon relay load generation tool.
//!
//! This library supports the keystorm binary found elsewhere in this
//! project. The bits and pieces here are not intended to be used outside of
//! supporting keystorm.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod generator;
pub mod signals;
