// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This crate provides a safe interface to multi-pattern regex engines that
//! speak the Hyperscan/Chimera C ABI. Many patterns are compiled into one
//! immutable database, which is then scanned against text using per-thread
//! scratch space. Every match is reported with the pattern that produced it.
//!
//! The engine itself is an external component reached through opaque
//! handles and integer result codes. This crate is the layer around it:
//!
//! * [`Flags`] are packed into the engine's flag words.
//! * Engine result codes are translated into [`Error`]s with a precise
//! [`ErrorKind`], and compile failures name the [`Expression`] at fault.
//! * Byte offsets reported by the engine are translated back into
//! character offsets of the scanned text.
//! * Native handles are released exactly once, whether by `close` or by
//! `Drop`, and any use after release is an error rather than a crash.
//!
//! # Example: scan for several patterns at once
//!
//! ```rust
//! use hsmatch::{Database, Expression, Flag};
//!
//! let db = Database::compile_many(vec![
//!     Expression::with_flags("[0-9]{5}", Flag::SingleMatch),
//!     Expression::with_flags("Test", Flag::Caseless),
//! ])?;
//! let mut scanner = db.scanner()?;
//!
//! let matches = scanner.scan(&db, "12345 test string")?;
//! assert_eq!(2, matches.len());
//! assert_eq!((0, 0..5), (matches[0].id(), matches[0].range()));
//! assert_eq!((1, 6..10), (matches[1].id(), matches[1].range()));
//! assert_eq!("Test", matches[1].expression().pattern());
//! # Ok::<(), hsmatch::Error>(())
//! ```
//!
//! # Threads
//!
//! A [`Database`] is `Send` and `Sync` and is typically shared behind an
//! `Arc`. A [`Scanner`] owns mutable scratch space, so it is `Send` but not
//! `Sync`: every thread that scans needs a scanner of its own.
//!
//! # Engines
//!
//! By default the pure Rust [`engine::Portable`] engine is used, which needs
//! nothing from the system. Enabling the `native` feature links `libhs` and
//! `libch` (found with `pkg-config`) and makes `engine::Native` the default.
//! Custom engines implement [`engine::Engine`].
//!
//! # Logging
//!
//! This crate logs through the `log` facade: compiles, allocations and
//! releases at debug level, each scan at trace level.

#![deny(missing_docs)]

pub use crate::{
    database::{Builder, Database},
    error::{CompileError, Error, ErrorKind, Resource},
    expression::{ExpressionInfo, Expression, ValidationResult, Verdict},
    flags::{Flag, Flags},
    scanner::{Match, Scanner},
};

use crate::engine::{DefaultEngine, Engine};

mod database;
pub mod engine;
mod error;
mod expression;
mod flags;
mod scanner;
mod utf8;

/// Returns true if the current CPU can run the default engine.
pub fn is_valid_platform() -> bool {
    DefaultEngine::default().valid_platform()
}

/// Returns the default engine's version string.
pub fn version() -> String {
    DefaultEngine::default().version()
}
