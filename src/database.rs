// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{
    os::raw::{c_char, c_uint},
    ptr::{self, NonNull},
    sync::Arc,
};

use log::{debug, warn};

use crate::{
    engine::{
        self, take_compile_error, DefaultEngine, Engine, RawDatabase, Variant,
    },
    error::{CompileError, Error, Resource},
    expression::{c_pattern, Expression},
    scanner::Scanner,
};

/// A compiled set of expressions.
///
/// A database owns one engine handle. It is immutable once built and can be
/// shared freely between threads, for example behind an `Arc`. Each thread
/// that scans needs its own [`Scanner`].
///
/// The expressions a database was built from are kept in compile order. An
/// expression's position is the pattern id the engine reports for its
/// matches.
///
/// The engine handle is released when the database is dropped, or earlier
/// with [`Database::close`]. Either way it is released exactly once. Queries
/// on a closed database fail with
/// [`ErrorKind::AlreadyReleased`](crate::ErrorKind::AlreadyReleased).
///
/// # Example
///
/// ```
/// use hsmatch::{Database, Expression, Flag};
///
/// let db = Database::compile_many(vec![
///     Expression::with_flags("[0-9]{5}", Flag::SingleMatch),
///     Expression::with_flags("Test", Flag::Caseless),
/// ])?;
/// assert_eq!(2, db.len());
/// assert_eq!("Test", db.expression(1).unwrap().pattern());
///
/// let mut scanner = db.scanner()?;
/// let matches = scanner.scan(&db, "12345 test string")?;
/// assert_eq!(2, matches.len());
/// # Ok::<(), hsmatch::Error>(())
/// ```
pub struct Database<E: Engine = DefaultEngine> {
    engine: E,
    raw: Option<NonNull<RawDatabase>>,
    expressions: Vec<Arc<Expression>>,
}

// SAFETY: a compiled database is never mutated by the engine, so sharing the
// handle between threads is fine. Closing requires `&mut self`.
unsafe impl<E: Engine> Send for Database<E> {}
unsafe impl<E: Engine> Sync for Database<E> {}

impl Database<DefaultEngine> {
    /// Compiles a single expression with the default engine.
    pub fn compile(
        expression: impl Into<Arc<Expression>>,
    ) -> Result<Database, Error> {
        Builder::new().expression(expression).build()
    }

    /// Compiles a batch of expressions with the default engine. Pattern ids
    /// are assigned by position.
    pub fn compile_many<I>(expressions: I) -> Result<Database, Error>
    where
        I: IntoIterator,
        I::Item: Into<Arc<Expression>>,
    {
        Builder::new().expressions(expressions).build()
    }

    /// Returns a builder for configuring a compile.
    pub fn builder() -> Builder {
        Builder::new()
    }
}

impl<E: Engine> Database<E> {
    /// Compiles a single expression with `engine`.
    pub fn compile_with(
        engine: E,
        expression: impl Into<Arc<Expression>>,
    ) -> Result<Database<E>, Error> {
        Builder::new().engine(engine).expression(expression).build()
    }

    /// Compiles a batch of expressions with `engine`.
    pub fn compile_many_with<I>(
        engine: E,
        expressions: I,
    ) -> Result<Database<E>, Error>
    where
        I: IntoIterator,
        I::Item: Into<Arc<Expression>>,
    {
        Builder::new().engine(engine).expressions(expressions).build()
    }

    /// Returns the size in bytes of the compiled database.
    pub fn size(&self) -> Result<usize, Error> {
        let raw = self.as_raw()?;
        let mut size = 0;
        // SAFETY: `raw` is live until `close`, which needs `&mut self`.
        let code =
            unsafe { self.engine.database_size(raw.as_ptr(), &mut size) };
        if code != engine::SUCCESS {
            return Err(Error::from_code(code));
        }
        Ok(size)
    }

    /// Returns the expression with the given pattern id.
    ///
    /// This returns `None` for ids outside of `0..self.len()`.
    pub fn expression(&self, id: usize) -> Option<&Arc<Expression>> {
        self.expressions.get(id)
    }

    /// Returns every expression in pattern id order.
    pub fn expressions(&self) -> &[Arc<Expression>] {
        &self.expressions
    }

    /// The number of expressions in this database.
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// Always false, since a database can't be compiled from nothing.
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// The engine this database was compiled with.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Creates a scanner with scratch space allocated for this database.
    pub fn scanner(&self) -> Result<Scanner<E>, Error> {
        let mut scanner = Scanner::with_engine(self.engine.clone());
        scanner.alloc(self)?;
        Ok(scanner)
    }

    /// Releases the engine handle.
    ///
    /// Calling this more than once does nothing. Dropping the database
    /// afterwards does nothing either.
    pub fn close(&mut self) {
        let raw = match self.raw.take() {
            None => return,
            Some(raw) => raw,
        };
        // SAFETY: `take` above guarantees this handle is freed only once.
        let code = unsafe { self.engine.free_database(raw.as_ptr()) };
        if code != engine::SUCCESS {
            let err = Error::from_code(code);
            warn!("failed to free database {:p}: {}", raw, err);
        } else {
            debug!("released database {:p}", raw);
        }
    }

    /// Returns true once the engine handle has been released.
    pub fn is_closed(&self) -> bool {
        self.raw.is_none()
    }

    pub(crate) fn as_raw(&self) -> Result<NonNull<RawDatabase>, Error> {
        self.raw.ok_or_else(|| Error::released(Resource::Database))
    }
}

impl<E: Engine> Drop for Database<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E: Engine> std::fmt::Debug for Database<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("engine", &self.engine)
            .field("raw", &self.raw)
            .field("expressions", &self.expressions)
            .finish()
    }
}

/// A builder for compiling a [`Database`].
///
/// # Example
///
/// ```
/// use hsmatch::{engine::Portable, Database, Expression};
///
/// let db = Database::builder()
///     .engine(Portable::new().size_limit(Some(1 << 20)))
///     .groups(false)
///     .expression(Expression::new("foo"))
///     .expressions(vec!["bar", "baz"].into_iter().map(Expression::new))
///     .build()?;
/// assert_eq!(3, db.len());
/// # Ok::<(), hsmatch::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Builder<E: Engine = DefaultEngine> {
    engine: E,
    groups: bool,
    expressions: Vec<Arc<Expression>>,
}

impl Builder<DefaultEngine> {
    /// Creates a builder for the default engine with capture group support
    /// enabled.
    pub fn new() -> Builder {
        Builder {
            engine: DefaultEngine::default(),
            groups: true,
            expressions: vec![],
        }
    }
}

impl Default for Builder<DefaultEngine> {
    fn default() -> Builder {
        Builder::new()
    }
}

impl<E: Engine> Builder<E> {
    /// Compiles with `engine` instead.
    pub fn engine<F: Engine>(self, engine: F) -> Builder<F> {
        Builder { engine, groups: self.groups, expressions: self.expressions }
    }

    /// Whether the engine should track capture groups. Enabled by default.
    pub fn groups(self, yes: bool) -> Builder<E> {
        Builder { groups: yes, ..self }
    }

    /// Adds an expression. Its pattern id is its position among all the
    /// expressions added so far.
    pub fn expression(
        mut self,
        expression: impl Into<Arc<Expression>>,
    ) -> Builder<E> {
        self.expressions.push(expression.into());
        self
    }

    /// Adds every expression yielded by `expressions`, in order.
    pub fn expressions<I>(mut self, expressions: I) -> Builder<E>
    where
        I: IntoIterator,
        I::Item: Into<Arc<Expression>>,
    {
        self.expressions.extend(expressions.into_iter().map(Into::into));
        self
    }

    /// Compiles every expression added so far into one database.
    ///
    /// If the engine rejects the batch because of a pattern, the error is of
    /// kind [`ErrorKind::PatternCompileFailed`](crate::ErrorKind) and names
    /// the offending expression. Other engine failures are reported as
    /// their translated kind.
    pub fn build(&self) -> Result<Database<E>, Error> {
        let count = self.expressions.len();
        if count == 0 {
            return Err(Error::invalid("at least one expression is required"));
        }
        let elements = c_uint::try_from(count)
            .map_err(|_| Error::invalid("too many expressions"))?;
        let mut patterns = Vec::with_capacity(count);
        let mut flags = Vec::with_capacity(count);
        for (i, expr) in self.expressions.iter().enumerate() {
            let context = || format!("expression {}", i);
            patterns.push(
                c_pattern(expr.pattern()).map_err(|e| e.context(context()))?,
            );
            flags.push(
                expr.flags()
                    .encode(Variant::Extended)
                    .map_err(|e| e.context(context()))?,
            );
        }
        let ptrs: Vec<*const c_char> =
            patterns.iter().map(|p| p.as_ptr()).collect();
        let ids: Vec<c_uint> = (0..elements).collect();
        let mode =
            if self.groups { engine::MODE_GROUPS } else { engine::MODE_NOGROUPS };

        let mut db = ptr::null_mut();
        let mut error = ptr::null_mut();
        // SAFETY: the three arrays hold `elements` items each and the
        // patterns they point at outlive the call.
        let code = unsafe {
            self.engine.compile_multi(
                ptrs.as_ptr(),
                flags.as_ptr(),
                ids.as_ptr(),
                elements,
                mode,
                &mut db,
                &mut error,
            )
        };
        if code != engine::SUCCESS {
            let record = if error.is_null() {
                None
            } else {
                // SAFETY: a non-null record came from this compile call.
                Some(unsafe {
                    take_compile_error(&self.engine, Variant::Extended, error)
                })
            };
            return Err(match record {
                Some((message, index)) if code == engine::COMPILER_ERROR => {
                    let index =
                        usize::try_from(index).ok().filter(|&i| i < count);
                    debug!(
                        "compile of {} expression(s) failed at {:?}: {}",
                        count, index, message
                    );
                    Error::compile(CompileError::new(
                        message,
                        index,
                        &self.expressions,
                    ))
                }
                _ => Error::from_code(code).context(format!(
                    "failed to compile {} expression(s)",
                    count
                )),
            });
        }
        let raw = NonNull::new(db).ok_or_else(|| {
            Error::invalid("engine reported success without a database")
        })?;
        debug!("compiled {} expression(s) into database {:p}", count, raw);
        Ok(Database {
            engine: self.engine.clone(),
            raw: Some(raw),
            expressions: self.expressions.clone(),
        })
    }
}
