// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{any::Any, ffi::CString, fmt, os::raw::c_uint, ptr, sync::Arc};

use crate::{
    database::Database,
    engine::{self, take_compile_error, DefaultEngine, Engine, Variant},
    error::{Error, ErrorKind},
    flags::Flags,
};

/// A pattern together with the flags it should be compiled with and an
/// optional value of the caller's choosing.
///
/// Expressions are compared by identity, not by pattern text: a database
/// refers to its expressions by their position in the batch it was compiled
/// from, and every [`Match`](crate::Match) points back at the exact
/// expression that produced it.
///
/// # Example
///
/// ```
/// use hsmatch::{Expression, Flag};
///
/// let expr = Expression::with_flags("[0-9]{5}", Flag::SingleMatch)
///     .with_context("zip code");
/// assert_eq!("[0-9]{5}", expr.pattern());
/// assert!(expr.flags().contains(Flag::SingleMatch));
/// assert_eq!(Some(&"zip code"), expr.context_as::<&str>());
/// ```
#[derive(Clone)]
pub struct Expression {
    pattern: String,
    flags: Flags,
    context: Option<Arc<dyn Any + Send + Sync>>,
}

impl Expression {
    /// Creates an expression with no flags.
    pub fn new(pattern: impl Into<String>) -> Expression {
        Expression::with_flags(pattern, Flags::empty())
    }

    /// Creates an expression with the given flags.
    pub fn with_flags(
        pattern: impl Into<String>,
        flags: impl Into<Flags>,
    ) -> Expression {
        Expression {
            pattern: pattern.into(),
            flags: flags.into(),
            context: None,
        }
    }

    /// Attaches an arbitrary value to this expression. It is never looked at
    /// by this crate, but is reachable from every match the expression
    /// produces.
    pub fn with_context<T: Any + Send + Sync>(self, context: T) -> Expression {
        Expression { context: Some(Arc::new(context)), ..self }
    }

    /// The pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The flags this expression is compiled with.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The value attached with [`Expression::with_context`], if any.
    pub fn context(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.context.as_deref()
    }

    /// The attached value, if there is one and it has type `T`.
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context()?.downcast_ref::<T>()
    }

    /// Tries this expression against both engine variants of the default
    /// engine. See [`Expression::validate_with`].
    pub fn validate(&self) -> ValidationResult {
        self.validate_with(&DefaultEngine::default())
    }

    /// Tries this expression against both variants of `engine` without
    /// keeping anything around.
    ///
    /// The base variant is asked for the expression's metadata. The
    /// extended variant compiles a throwaway database. Each variant's
    /// verdict is reported separately.
    ///
    /// ```
    /// use hsmatch::Expression;
    ///
    /// let result = Expression::new(r"test\1").validate();
    /// assert!(!result.is_valid());
    /// assert!(result.base().error_message().is_some());
    /// assert!(result.extended().error_message().is_some());
    /// ```
    pub fn validate_with<E: Engine>(&self, engine: &E) -> ValidationResult {
        let base = match query_info(engine, self) {
            Ok(_) => Verdict::valid(),
            Err(err) => Verdict::invalid(engine_message(&err)),
        };
        let compiled = Database::compile_with(engine.clone(), self.clone());
        let extended = match compiled {
            Ok(_) => Verdict::valid(),
            Err(err) => Verdict::invalid(engine_message(&err)),
        };
        ValidationResult { base, extended }
    }

    /// Asks the default engine's base variant for this expression's
    /// metadata.
    pub fn info(&self) -> Result<ExpressionInfo, Error> {
        self.info_with(&DefaultEngine::default())
    }

    /// Asks the base variant of `engine` for this expression's metadata.
    ///
    /// If the base variant rejects the expression, the error is of kind
    /// [`ErrorKind::CompilerFailure`] and carries the engine's message.
    pub fn info_with<E: Engine>(
        &self,
        engine: &E,
    ) -> Result<ExpressionInfo, Error> {
        query_info(engine, self)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("pattern", &self.pattern)
            .field("flags", &self.flags)
            .field("context", &self.context.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Converts a pattern to the NUL terminated form the engine expects.
pub(crate) fn c_pattern(pattern: &str) -> Result<CString, Error> {
    CString::new(pattern).map_err(|err| {
        Error::invalid(format!(
            "pattern contains a NUL byte at offset {}",
            err.nul_position()
        ))
    })
}

fn query_info<E: Engine>(
    engine: &E,
    expr: &Expression,
) -> Result<ExpressionInfo, Error> {
    let flags: c_uint = expr.flags().encode(Variant::Base)?;
    let pattern = c_pattern(expr.pattern())?;
    let mut info = ptr::null_mut();
    let mut error = ptr::null_mut();
    // SAFETY: the pattern is NUL terminated and outlives the call. Both
    // out-pointers are owned here and handed back to the engine below.
    let code = unsafe {
        engine.expression_info(pattern.as_ptr(), flags, &mut info, &mut error)
    };
    if code != engine::SUCCESS {
        if error.is_null() {
            return Err(Error::from_code(code));
        }
        // SAFETY: a non-null record came from this call.
        let (message, _) =
            unsafe { take_compile_error(engine, Variant::Base, error) };
        return Err(Error::from_code(code).context(message));
    }
    if info.is_null() {
        return Err(Error::invalid("engine returned no expression info"));
    }
    // SAFETY: `info` is non-null and freed exactly once, after the copy.
    let raw = unsafe { *info };
    unsafe { engine.free_expression_info(info) };
    Ok(ExpressionInfo {
        min_width: raw.min_width as usize,
        max_width: if raw.max_width == c_uint::MAX {
            None
        } else {
            Some(raw.max_width as usize)
        },
        unordered_matches: raw.unordered_matches != 0,
        matches_at_eod: raw.matches_at_eod != 0,
        matches_only_at_eod: raw.matches_only_at_eod != 0,
    })
}

/// Picks the message a person fixing the pattern wants to read.
fn engine_message(err: &Error) -> String {
    if let Some(err) = err.compile_error() {
        return err.message().to_string();
    }
    match (err.kind(), err.context_message()) {
        (ErrorKind::CompilerFailure, Some(msg)) => msg.to_string(),
        _ => err.to_string(),
    }
}

/// One engine variant's verdict on an expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Verdict {
    error: Option<String>,
}

impl Verdict {
    fn valid() -> Verdict {
        Verdict { error: None }
    }

    fn invalid(message: String) -> Verdict {
        Verdict { error: Some(message) }
    }

    /// Returns true if the variant accepted the expression.
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// The variant's reason for rejecting the expression.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// The outcome of [`Expression::validate`].
///
/// The two verdicts are independent: a pattern with a backreference is
/// typically rejected by the base variant but accepted by the extended one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationResult {
    base: Verdict,
    extended: Verdict,
}

impl ValidationResult {
    /// The base variant's verdict.
    pub fn base(&self) -> &Verdict {
        &self.base
    }

    /// The extended variant's verdict.
    pub fn extended(&self) -> &Verdict {
        &self.extended
    }

    /// Returns true if the base variant accepted the expression.
    pub fn is_valid_base(&self) -> bool {
        self.base.is_valid()
    }

    /// Returns true if the extended variant accepted the expression.
    pub fn is_valid_extended(&self) -> bool {
        self.extended.is_valid()
    }

    /// Returns true if at least one variant can use the expression.
    pub fn is_valid(&self) -> bool {
        self.is_valid_base() || self.is_valid_extended()
    }
}

/// Metadata about an expression, as reported by the base engine variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExpressionInfo {
    min_width: usize,
    max_width: Option<usize>,
    unordered_matches: bool,
    matches_at_eod: bool,
    matches_only_at_eod: bool,
}

impl ExpressionInfo {
    /// The minimum length in bytes of any match.
    pub fn min_width(&self) -> usize {
        self.min_width
    }

    /// The maximum length in bytes of any match, or `None` if unbounded.
    pub fn max_width(&self) -> Option<usize> {
        self.max_width
    }

    /// Whether matches may be reported out of offset order.
    pub fn unordered_matches(&self) -> bool {
        self.unordered_matches
    }

    /// Whether the expression can match at the end of the data.
    pub fn matches_at_eod(&self) -> bool {
        self.matches_at_eod
    }

    /// Whether the expression can only match at the end of the data.
    pub fn matches_only_at_eod(&self) -> bool {
        self.matches_only_at_eod
    }
}
