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
    fmt,
    ops::Range,
    os::raw::{c_int, c_uint, c_ulonglong, c_void},
    ptr::{self, NonNull},
};

use log::{debug, trace, warn};

use crate::{
    database::Database,
    engine::{self, DefaultEngine, Engine, RawScratch},
    error::{Error, Resource},
    expression::Expression,
    flags::Flag,
    utf8::OffsetMap,
};

/// Scratch space for scanning, plus the machinery to turn the engine's match
/// events into [`Match`]es.
///
/// A scanner starts out without scratch space. [`Scanner::alloc`] allocates
/// it for a database, and may be called again with other databases to grow
/// the same scratch space so that it serves all of them. Scanning before
/// allocating fails with
/// [`ErrorKind::NotAllocated`](crate::ErrorKind::NotAllocated).
///
/// # Threads
///
/// The engine writes to scratch space during a scan, so a scanner must not
/// be used by two scans at once. `scan` takes `&mut self`, and a scanner can
/// be sent to another thread but not shared with one. Threads that scan the
/// same [`Database`] concurrently each need their own scanner.
///
/// # Example
///
/// ```
/// use hsmatch::{Database, Expression, Flag, Scanner};
///
/// let db = Database::compile(Expression::with_flags(
///     "测试",
///     Flag::Utf8 | Flag::ExtractMatched,
/// ))?;
/// let mut scanner = Scanner::new();
/// scanner.alloc(&db)?;
/// let matches = scanner.scan(&db, "这是一个测试")?;
/// assert_eq!(1, matches.len());
/// assert_eq!(4..6, matches[0].range());
/// assert_eq!(Some("测试"), matches[0].matched_text());
/// # Ok::<(), hsmatch::Error>(())
/// ```
pub struct Scanner<E: Engine = DefaultEngine> {
    engine: E,
    state: State,
    events: Vec<Event>,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Unallocated,
    Allocated(NonNull<RawScratch>),
    Released,
}

#[derive(Clone, Copy, Debug)]
struct Event {
    id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
}

// SAFETY: scratch space may move between threads as long as it isn't used
// by two of them at once, which `&mut self` on every use guarantees.
unsafe impl<E: Engine> Send for Scanner<E> {}

impl Scanner<DefaultEngine> {
    /// Creates a scanner for the default engine, without scratch space.
    pub fn new() -> Scanner {
        Scanner::with_engine(DefaultEngine::default())
    }
}

impl Default for Scanner<DefaultEngine> {
    fn default() -> Scanner {
        Scanner::new()
    }
}

impl<E: Engine> Scanner<E> {
    /// Creates a scanner for `engine`, without scratch space.
    pub fn with_engine(engine: E) -> Scanner<E> {
        Scanner { engine, state: State::Unallocated, events: vec![] }
    }

    /// Allocates scratch space for `db`, or grows the existing scratch space
    /// so that it also serves `db`.
    ///
    /// On failure the scanner is left as it was.
    pub fn alloc(&mut self, db: &Database<E>) -> Result<(), Error> {
        let raw_db = db.as_raw()?;
        let mut scratch = match self.state {
            State::Unallocated => ptr::null_mut(),
            State::Allocated(scratch) => scratch.as_ptr(),
            State::Released => return Err(Error::released(Resource::Scratch)),
        };
        // SAFETY: the database is live for the duration of the call and
        // `scratch` is either null or owned by this scanner.
        let code = unsafe {
            self.engine.alloc_scratch(raw_db.as_ptr(), &mut scratch)
        };
        if code != engine::SUCCESS {
            return Err(Error::from_code(code)
                .context("failed to allocate scratch space"));
        }
        let scratch = NonNull::new(scratch).ok_or_else(|| {
            Error::invalid("engine reported success without scratch space")
        })?;
        debug!("allocated scratch space {:p} for {:p}", scratch, raw_db);
        self.state = State::Allocated(scratch);
        Ok(())
    }

    /// Scans `text` with `db`, returning every match in the order the engine
    /// reported it.
    ///
    /// Offsets are counted in characters (code points) of `text`, not bytes.
    pub fn scan<'d, 'h>(
        &mut self,
        db: &'d Database<E>,
        text: &'h str,
    ) -> Result<Vec<Match<'d, 'h>>, Error> {
        let scratch = match self.state {
            State::Allocated(scratch) => scratch,
            State::Unallocated => return Err(Error::not_allocated()),
            State::Released => return Err(Error::released(Resource::Scratch)),
        };
        let raw_db = db.as_raw()?;
        let len = c_uint::try_from(text.len()).map_err(|_| {
            Error::invalid(format!(
                "text of {} bytes is too long to scan in one call",
                text.len()
            ))
        })?;

        self.events.clear();
        let events = &mut self.events as *mut Vec<Event>;
        // SAFETY: `text` outlives the call and holds `len` bytes. The
        // context pointer is only dereferenced by `on_match` while the scan
        // runs, during which nothing else touches `self.events`.
        let code = unsafe {
            self.engine.scan(
                raw_db.as_ptr(),
                text.as_ptr().cast(),
                len,
                0,
                scratch.as_ptr(),
                on_match,
                events.cast::<c_void>(),
            )
        };
        if code != engine::SUCCESS {
            return Err(Error::from_code(code).context("failed to scan"));
        }
        trace!(
            "scanned {} bytes with database {:p}: {} event(s)",
            text.len(),
            raw_db,
            self.events.len()
        );
        if self.events.is_empty() {
            return Ok(vec![]);
        }

        let map = OffsetMap::new(text);
        let mut matches = Vec::with_capacity(self.events.len());
        for ev in self.events.iter() {
            let id = ev.id as usize;
            let expression = match db.expression(id) {
                Some(expression) => &**expression,
                None => {
                    return Err(Error::invalid(format!(
                        "engine reported unknown pattern id {}",
                        id
                    )))
                }
            };
            let (start, end) = map.span(offset(ev.from), offset(ev.to));
            let matched = if expression.flags().contains(Flag::ExtractMatched)
            {
                Some(map.slice(text, start, end))
            } else {
                None
            };
            matches.push(Match { id, start, end, matched, expression });
        }
        Ok(matches)
    }

    /// Returns the size in bytes of the scratch space.
    pub fn scratch_size(&self) -> Result<usize, Error> {
        let scratch = self.live_scratch()?;
        let mut size = 0;
        // SAFETY: the scratch space stays live until `close`.
        let code =
            unsafe { self.engine.scratch_size(scratch.as_ptr(), &mut size) };
        if code != engine::SUCCESS {
            return Err(Error::from_code(code));
        }
        Ok(size)
    }

    /// Returns the size in bytes of the base engine variant's share of the
    /// scratch space.
    ///
    /// Engines that keep the base share private report this as an invalid
    /// parameter.
    pub fn base_scratch_size(&self) -> Result<usize, Error> {
        let scratch = self.live_scratch()?;
        let mut size = 0;
        // SAFETY: the scratch space stays live until `close`.
        let code = unsafe {
            self.engine.base_scratch_size(scratch.as_ptr(), &mut size)
        };
        if code != engine::SUCCESS {
            return Err(Error::from_code(code));
        }
        Ok(size)
    }

    /// Returns true once scratch space has been allocated and not yet
    /// released.
    pub fn is_allocated(&self) -> bool {
        matches!(self.state, State::Allocated(_))
    }

    /// Returns true once this scanner has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Released)
    }

    /// Releases the scratch space. A closed scanner can't be allocated
    /// again.
    ///
    /// Calling this more than once does nothing. Dropping the scanner
    /// afterwards does nothing either.
    pub fn close(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Released);
        let scratch = match state {
            State::Allocated(scratch) => scratch,
            State::Unallocated | State::Released => return,
        };
        // SAFETY: the state swap above guarantees this handle is freed only
        // once.
        let code = unsafe { self.engine.free_scratch(scratch.as_ptr()) };
        if code != engine::SUCCESS {
            warn!(
                "failed to free scratch space {:p}: {}",
                scratch,
                Error::from_code(code)
            );
        } else {
            debug!("released scratch space {:p}", scratch);
        }
    }

    fn live_scratch(&self) -> Result<NonNull<RawScratch>, Error> {
        match self.state {
            State::Allocated(scratch) => Ok(scratch),
            State::Unallocated | State::Released => {
                Err(Error::released(Resource::Scratch))
            }
        }
    }
}

impl<E: Engine> Drop for Scanner<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E: Engine> fmt::Debug for Scanner<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("engine", &self.engine)
            .field("state", &self.state)
            .finish()
    }
}

unsafe extern "C" fn on_match(
    id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
    _flags: c_uint,
    context: *mut c_void,
) -> c_int {
    let events = &mut *context.cast::<Vec<Event>>();
    events.push(Event { id, from, to });
    0
}

/// Offsets that don't fit in memory can't be inside the text, so they are
/// saturated and left to the offset map to clamp.
fn offset(at: c_ulonglong) -> usize {
    usize::try_from(at).unwrap_or(usize::MAX)
}

/// A single match reported by a scan.
///
/// Offsets are counted in characters of the scanned text. The match borrows
/// the [`Expression`] that produced it from the database, and the matched
/// text from the haystack.
#[derive(Clone, Copy, Debug)]
pub struct Match<'d, 'h> {
    id: usize,
    start: usize,
    end: usize,
    matched: Option<&'h str>,
    expression: &'d Expression,
}

impl<'d, 'h> Match<'d, 'h> {
    /// The pattern id of the expression that matched.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The character offset at which the match starts.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The character offset at which the match ends, exclusive.
    pub fn end(&self) -> usize {
        self.end
    }

    /// The range of characters covered by the match.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The matched text, if the expression has
    /// [`Flag::ExtractMatched`](crate::Flag::ExtractMatched).
    pub fn matched_text(&self) -> Option<&'h str> {
        self.matched
    }

    /// The expression that matched.
    pub fn expression(&self) -> &'d Expression {
        self.expression
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::Portable, ErrorKind};

    #[test]
    fn scan_before_alloc() {
        let db = Database::compile(Expression::new("a")).unwrap();
        let mut scanner = Scanner::new();
        let err = scanner.scan(&db, "a").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotAllocated));
        assert!(scanner.scratch_size().unwrap_err().is_released());
    }

    #[test]
    fn closed_is_terminal() {
        let db = Database::compile(Expression::new("a")).unwrap();
        let mut scanner = db.scanner().unwrap();
        assert!(scanner.is_allocated());
        scanner.close();
        scanner.close();
        assert!(scanner.is_closed());
        assert!(scanner.scan(&db, "a").unwrap_err().is_released());
        assert!(scanner.alloc(&db).unwrap_err().is_released());
        assert!(scanner.base_scratch_size().unwrap_err().is_released());
    }

    #[test]
    fn accumulator_is_cleared_between_scans() {
        let db = Database::compile(Expression::new("a")).unwrap();
        let mut scanner = db.scanner().unwrap();
        assert_eq!(3, scanner.scan(&db, "aaa").unwrap().len());
        assert_eq!(1, scanner.scan(&db, "a").unwrap().len());
        assert!(scanner.scan(&db, "bbb").unwrap().is_empty());
    }

    #[test]
    fn alloc_grows_for_bigger_database() {
        let engine = Portable::new();
        let small = Database::compile_with(engine, Expression::new("a")).unwrap();
        let big = Database::compile_many_with(
            engine,
            vec![Expression::new("a"), Expression::new("b")],
        )
        .unwrap();
        let mut scanner = small.scanner().unwrap();
        let before = scanner.scratch_size().unwrap();
        let err = scanner.scan(&big, "ab").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidParameter));

        scanner.alloc(&big).unwrap();
        assert!(scanner.scratch_size().unwrap() > before);
        assert_eq!(2, scanner.scan(&big, "ab").unwrap().len());
        assert_eq!(1, scanner.scan(&small, "ab").unwrap().len());
    }

    #[test]
    fn text_is_only_extracted_on_request() {
        let db = Database::compile_many(vec![
            Expression::new("b"),
            Expression::with_flags("c", Flag::ExtractMatched),
        ])
        .unwrap();
        let mut scanner = db.scanner().unwrap();
        let matches = scanner.scan(&db, "abc").unwrap();
        assert_eq!(None, matches[0].matched_text());
        assert_eq!(Some("c"), matches[1].matched_text());
    }
}
