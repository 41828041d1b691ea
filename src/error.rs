// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{fmt, os::raw::c_int, sync::Arc};

use crate::{engine, expression::Expression};

/// An error that occurred while compiling, allocating, scanning or querying
/// a resource.
///
/// Errors reported by the engine are translated from its integer result
/// codes into an [`ErrorKind`], so callers can tell a bad pattern apart from
/// an unsupported CPU or a database built by a different engine version.
/// Errors raised by this crate itself, such as using a resource after it has
/// been closed, have kinds of their own.
///
/// When the `std::error::Error` trait's `source` method is used, a
/// [`CompileError`] is returned for errors of kind
/// [`ErrorKind::PatternCompileFailed`].
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    context: Option<String>,
    // Set when `kind` was translated from an engine result code.
    from_engine: bool,
}

/// The kind of an [`Error`].
///
/// This list may grow over time, so matching on it requires a wildcard arm.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ErrorKind {
    /// A parameter was invalid. The engine also reports this when scanning
    /// with scratch space that wasn't allocated for the database.
    InvalidParameter,
    /// A memory allocation failed.
    OutOfMemory,
    /// The scan was stopped by the match callback. The callbacks installed
    /// by this crate never stop a scan.
    TerminatedByCallback,
    /// The pattern compiler failed outside of a database compile, for
    /// example while analyzing a single expression.
    CompilerFailure,
    /// Compiling a database failed because of one of its expressions.
    PatternCompileFailed(CompileError),
    /// The database was built by a different engine version.
    DatabaseVersionMismatch,
    /// The database was built for a different platform.
    DatabasePlatformMismatch,
    /// The database was built for a different scanning mode.
    DatabaseModeMismatch,
    /// A parameter was not correctly aligned.
    MisalignedParameter,
    /// The memory allocator returned misaligned memory.
    AllocatorAlignmentViolation,
    /// The scratch space was already in use by another scan.
    ScratchInUse,
    /// The CPU doesn't support the instructions the engine needs.
    UnsupportedPlatform,
    /// A buffer passed to the engine was too small.
    BufferTooSmall,
    /// A scan was attempted before any scratch space was allocated.
    NotAllocated,
    /// The resource has already been released.
    AlreadyReleased(Resource),
    /// The engine returned a code this crate doesn't know about.
    Unexpected(i32),
}

/// A native resource owned by this crate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Resource {
    /// A compiled database.
    Database,
    /// Scratch space owned by a scanner.
    Scratch,
}

impl Error {
    /// Translates a nonzero engine result code.
    pub(crate) fn from_code(code: c_int) -> Error {
        let kind = match code {
            engine::INVALID => ErrorKind::InvalidParameter,
            engine::NOMEM => ErrorKind::OutOfMemory,
            engine::SCAN_TERMINATED => ErrorKind::TerminatedByCallback,
            engine::COMPILER_ERROR => ErrorKind::CompilerFailure,
            engine::DB_VERSION_ERROR => ErrorKind::DatabaseVersionMismatch,
            engine::DB_PLATFORM_ERROR => ErrorKind::DatabasePlatformMismatch,
            engine::DB_MODE_ERROR => ErrorKind::DatabaseModeMismatch,
            engine::BAD_ALIGN => ErrorKind::MisalignedParameter,
            engine::BAD_ALLOC => ErrorKind::AllocatorAlignmentViolation,
            engine::SCRATCH_IN_USE => ErrorKind::ScratchInUse,
            engine::ARCH_ERROR => ErrorKind::UnsupportedPlatform,
            engine::INSUFFICIENT_SPACE => ErrorKind::BufferTooSmall,
            code => ErrorKind::Unexpected(code),
        };
        Error { kind, context: None, from_engine: true }
    }

    pub(crate) fn compile(err: CompileError) -> Error {
        Error {
            kind: ErrorKind::PatternCompileFailed(err),
            context: None,
            from_engine: true,
        }
    }

    pub(crate) fn invalid(context: impl Into<String>) -> Error {
        Error {
            kind: ErrorKind::InvalidParameter,
            context: Some(context.into()),
            from_engine: false,
        }
    }

    pub(crate) fn not_allocated() -> Error {
        Error {
            kind: ErrorKind::NotAllocated,
            context: None,
            from_engine: false,
        }
    }

    pub(crate) fn released(resource: Resource) -> Error {
        Error {
            kind: ErrorKind::AlreadyReleased(resource),
            context: None,
            from_engine: false,
        }
    }

    /// Prefixes `context` to any context already attached.
    pub(crate) fn context(self, context: impl Into<String>) -> Error {
        let context = match self.context {
            Some(ref inner) => format!("{}: {}", context.into(), inner),
            None => context.into(),
        };
        Error { context: Some(context), ..self }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the engine result code this error corresponds to.
    ///
    /// Errors raised by this crate rather than the engine return `None`.
    /// That includes invalid parameters caught before the engine was
    /// called, such as an empty batch or a pattern containing a NUL byte.
    pub fn code(&self) -> Option<i32> {
        if !self.from_engine {
            return None;
        }
        let code = match self.kind {
            ErrorKind::InvalidParameter => engine::INVALID,
            ErrorKind::OutOfMemory => engine::NOMEM,
            ErrorKind::TerminatedByCallback => engine::SCAN_TERMINATED,
            ErrorKind::CompilerFailure
            | ErrorKind::PatternCompileFailed(_) => engine::COMPILER_ERROR,
            ErrorKind::DatabaseVersionMismatch => engine::DB_VERSION_ERROR,
            ErrorKind::DatabasePlatformMismatch => engine::DB_PLATFORM_ERROR,
            ErrorKind::DatabaseModeMismatch => engine::DB_MODE_ERROR,
            ErrorKind::MisalignedParameter => engine::BAD_ALIGN,
            ErrorKind::AllocatorAlignmentViolation => engine::BAD_ALLOC,
            ErrorKind::ScratchInUse => engine::SCRATCH_IN_USE,
            ErrorKind::UnsupportedPlatform => engine::ARCH_ERROR,
            ErrorKind::BufferTooSmall => engine::INSUFFICIENT_SPACE,
            ErrorKind::Unexpected(code) => code,
            ErrorKind::NotAllocated | ErrorKind::AlreadyReleased(_) => {
                return None
            }
        };
        Some(code)
    }

    /// If this error came from a failed database compile, returns the
    /// expression that caused it along with the engine's message.
    pub fn compile_error(&self) -> Option<&CompileError> {
        match self.kind {
            ErrorKind::PatternCompileFailed(ref err) => Some(err),
            _ => None,
        }
    }

    /// Returns true when this error was caused by using a resource after it
    /// was released.
    pub fn is_released(&self) -> bool {
        matches!(self.kind, ErrorKind::AlreadyReleased(_))
    }

    /// Any extra context attached to this error, such as the engine's
    /// message for a compiler failure.
    pub(crate) fn context_message(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::PatternCompileFailed(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref context) = self.context {
            write!(f, "{}: ", context)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::InvalidParameter => {
                write!(f, "an invalid parameter was passed to the engine")
            }
            ErrorKind::OutOfMemory => write!(f, "a memory allocation failed"),
            ErrorKind::TerminatedByCallback => {
                write!(f, "the scan was terminated by the match callback")
            }
            ErrorKind::CompilerFailure => {
                write!(f, "the pattern compiler failed")
            }
            ErrorKind::PatternCompileFailed(ref err) => {
                fmt::Display::fmt(err, f)
            }
            ErrorKind::DatabaseVersionMismatch => write!(
                f,
                "the database was built for a different version of the engine",
            ),
            ErrorKind::DatabasePlatformMismatch => write!(
                f,
                "the database was built for a different platform (CPU type)",
            ),
            ErrorKind::DatabaseModeMismatch => write!(
                f,
                "the database was built for a different scanning mode",
            ),
            ErrorKind::MisalignedParameter => {
                write!(f, "a parameter was not correctly aligned")
            }
            ErrorKind::AllocatorAlignmentViolation => write!(
                f,
                "the memory allocator did not return correctly aligned memory",
            ),
            ErrorKind::ScratchInUse => {
                write!(f, "the scratch space was already in use")
            }
            ErrorKind::UnsupportedPlatform => write!(
                f,
                "unsupported CPU architecture, at least SSE3 is needed",
            ),
            ErrorKind::BufferTooSmall => {
                write!(f, "the provided buffer was too small")
            }
            ErrorKind::NotAllocated => write!(
                f,
                "scratch space has not been allocated for this scanner",
            ),
            ErrorKind::AlreadyReleased(Resource::Database) => {
                write!(f, "the database has already been released")
            }
            ErrorKind::AlreadyReleased(Resource::Scratch) => {
                write!(f, "the scratch space has already been released")
            }
            ErrorKind::Unexpected(code) => {
                write!(f, "unexpected engine error: {}", code)
            }
        }
    }
}

/// An error that occurred while compiling a database, attributed to the
/// expression that caused it.
///
/// When the engine can't pin a failure on a single expression of a batch,
/// the error is attributed to the first expression and
/// [`CompileError::engine_index`] returns `None`.
#[derive(Clone, Debug)]
pub struct CompileError {
    message: String,
    index: usize,
    engine_index: Option<usize>,
    expression: Arc<Expression>,
}

impl CompileError {
    pub(crate) fn new(
        message: String,
        engine_index: Option<usize>,
        expressions: &[Arc<Expression>],
    ) -> CompileError {
        let index = engine_index.unwrap_or(0);
        CompileError {
            message,
            index,
            engine_index,
            expression: Arc::clone(&expressions[index]),
        }
    }

    /// The message reported by the engine.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The expression this error is attributed to.
    pub fn expression(&self) -> &Arc<Expression> {
        &self.expression
    }

    /// The position of [`CompileError::expression`] in the compiled batch.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The position reported by the engine, if it reported one.
    pub fn engine_index(&self) -> Option<usize> {
        self.engine_index
    }
}

impl std::error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to compile expression {} ({:?}): {}",
            self.index,
            self.expression.pattern(),
            self.message,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_translates() {
        let cases: &[(c_int, &str)] = &[
            (-1, "InvalidParameter"),
            (-2, "OutOfMemory"),
            (-3, "TerminatedByCallback"),
            (-4, "CompilerFailure"),
            (-5, "DatabaseVersionMismatch"),
            (-6, "DatabasePlatformMismatch"),
            (-7, "DatabaseModeMismatch"),
            (-8, "MisalignedParameter"),
            (-9, "AllocatorAlignmentViolation"),
            (-10, "ScratchInUse"),
            (-11, "UnsupportedPlatform"),
            (-12, "BufferTooSmall"),
        ];
        for &(code, name) in cases {
            let err = Error::from_code(code);
            assert_eq!(name, format!("{:?}", err.kind()));
            assert_eq!(Some(code), err.code());
        }
    }

    #[test]
    fn unknown_codes_keep_the_raw_value() {
        for &code in &[-13, -32, 7] {
            let err = Error::from_code(code);
            assert!(matches!(*err.kind(), ErrorKind::Unexpected(c) if c == code));
            assert_eq!(Some(code), err.code());
            assert!(err.to_string().contains(&code.to_string()));
        }
    }

    #[test]
    fn wrapper_errors_have_no_code() {
        assert_eq!(None, Error::not_allocated().code());
        assert_eq!(None, Error::released(Resource::Scratch).code());
        assert!(Error::released(Resource::Database).is_released());

        let err = Error::invalid("at least one expression is required");
        assert!(matches!(err.kind(), ErrorKind::InvalidParameter));
        assert_eq!(None, err.code());
        assert_eq!(None, err.context("expression 0").code());
        assert_eq!(Some(-1), Error::from_code(-1).context("scan").code());
    }

    #[test]
    fn context_prefixes_message() {
        let err = Error::from_code(-10).context("failed to scan");
        assert_eq!(
            "failed to scan: the scratch space was already in use",
            err.to_string(),
        );
        let err = Error::invalid("bad flag").context("expression 3");
        assert_eq!(
            "expression 3: bad flag: an invalid parameter was passed to the \
             engine",
            err.to_string(),
        );
    }

    #[test]
    fn compile_error_falls_back_to_first_expression() {
        let exprs = vec![
            Arc::new(Expression::new("a")),
            Arc::new(Expression::new("b")),
        ];
        let err = CompileError::new("boom".to_string(), None, &exprs);
        assert_eq!(0, err.index());
        assert_eq!(None, err.engine_index());
        assert!(Arc::ptr_eq(&exprs[0], err.expression()));

        let err = CompileError::new("boom".to_string(), Some(1), &exprs);
        assert!(Arc::ptr_eq(&exprs[1], err.expression()));
        let err = Error::compile(err);
        assert_eq!(Some(-4), err.code());
        assert!(std::error::Error::source(&err).is_some());
    }
}
