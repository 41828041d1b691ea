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
    ffi::CString,
    os::raw::{c_char, c_int, c_uint, c_ulonglong, c_void},
    ptr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use hsmatch::{
    engine::{
        self, Engine, MatchEventHandler, Portable, RawCompileError,
        RawDatabase, RawExpressionInfo, RawScratch, Variant,
    },
    Database, ErrorKind, Expression, Scanner,
};

/// An engine that wraps `Portable`, counts every handle it gives out and
/// takes back, and can be told to fail specific calls.
#[derive(Clone, Debug, Default)]
pub struct Instrumented {
    inner: Portable,
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    databases: AtomicUsize,
    databases_freed: AtomicUsize,
    scratches: AtomicUsize,
    scratches_freed: AtomicUsize,
    errors: AtomicUsize,
    errors_freed: AtomicUsize,
    infos: AtomicUsize,
    infos_freed: AtomicUsize,
    script: Mutex<Script>,
    // Addresses of error records built by the script rather than `inner`.
    scripted: Mutex<Vec<usize>>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Script {
    compile: Option<(c_int, Option<c_int>)>,
    alloc: Option<c_int>,
    scan: Option<c_int>,
    report_id: Option<c_uint>,
}

/// A snapshot of how many handles of each kind were handed out and freed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counts {
    pub databases: (usize, usize),
    pub scratches: (usize, usize),
    pub errors: (usize, usize),
    pub infos: (usize, usize),
}

impl Counts {
    /// Asserts that everything handed out was freed exactly once.
    pub fn assert_balanced(&self) {
        assert_eq!(self.databases.0, self.databases.1, "{:?}", self);
        assert_eq!(self.scratches.0, self.scratches.1, "{:?}", self);
        assert_eq!(self.errors.0, self.errors.1, "{:?}", self);
        assert_eq!(self.infos.0, self.infos.1, "{:?}", self);
    }
}

impl Instrumented {
    pub fn new() -> Instrumented {
        Instrumented::default()
    }

    pub fn counts(&self) -> Counts {
        let s = &*self.shared;
        let get = |n: &AtomicUsize| n.load(Ordering::SeqCst);
        Counts {
            databases: (get(&s.databases), get(&s.databases_freed)),
            scratches: (get(&s.scratches), get(&s.scratches_freed)),
            errors: (get(&s.errors), get(&s.errors_freed)),
            infos: (get(&s.infos), get(&s.infos_freed)),
        }
    }

    /// Makes every compile fail with `code`, handing back an error record
    /// naming `index` when one is given.
    pub fn fail_compile(&self, code: c_int, index: Option<c_int>) {
        self.shared.script.lock().unwrap().compile = Some((code, index));
    }

    pub fn fail_alloc(&self, code: c_int) {
        self.shared.script.lock().unwrap().alloc = Some(code);
    }

    pub fn fail_scan(&self, code: c_int) {
        self.shared.script.lock().unwrap().scan = Some(code);
    }

    /// Rewrites the pattern id of every reported match.
    pub fn report_id(&self, id: c_uint) {
        self.shared.script.lock().unwrap().report_id = Some(id);
    }

    pub fn reset(&self) {
        *self.shared.script.lock().unwrap() = Script::default();
    }

    fn script(&self) -> Script {
        *self.shared.script.lock().unwrap()
    }

    fn scripted_record(&self, index: c_int) -> *mut RawCompileError {
        let message = CString::new("scripted failure").unwrap().into_raw();
        let record = Box::into_raw(Box::new(RawCompileError {
            message,
            expression: index,
        }));
        self.shared.scripted.lock().unwrap().push(record as usize);
        self.shared.errors.fetch_add(1, Ordering::SeqCst);
        record
    }
}

struct Remap {
    id: c_uint,
    on_event: MatchEventHandler,
    context: *mut c_void,
}

unsafe extern "C" fn remap(
    _id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
    flags: c_uint,
    context: *mut c_void,
) -> c_int {
    let remap = &*context.cast::<Remap>();
    (remap.on_event)(remap.id, from, to, flags, remap.context)
}

unsafe impl Engine for Instrumented {
    fn version(&self) -> String {
        format!("{} instrumented", self.inner.version())
    }

    fn valid_platform(&self) -> bool {
        self.inner.valid_platform()
    }

    unsafe fn compile_multi(
        &self,
        expressions: *const *const c_char,
        flags: *const c_uint,
        ids: *const c_uint,
        elements: c_uint,
        mode: c_uint,
        db: *mut *mut RawDatabase,
        error: *mut *mut RawCompileError,
    ) -> c_int {
        if let Some((code, index)) = self.script().compile {
            *db = ptr::null_mut();
            *error = match index {
                Some(index) => self.scripted_record(index),
                None => ptr::null_mut(),
            };
            return code;
        }
        let code = self.inner.compile_multi(
            expressions,
            flags,
            ids,
            elements,
            mode,
            db,
            error,
        );
        if code == engine::SUCCESS {
            self.shared.databases.fetch_add(1, Ordering::SeqCst);
        } else if !(*error).is_null() {
            self.shared.errors.fetch_add(1, Ordering::SeqCst);
        }
        code
    }

    unsafe fn free_compile_error(
        &self,
        variant: Variant,
        error: *mut RawCompileError,
    ) -> c_int {
        if error.is_null() {
            return engine::SUCCESS;
        }
        self.shared.errors_freed.fetch_add(1, Ordering::SeqCst);
        let mut scripted = self.shared.scripted.lock().unwrap();
        if let Some(i) = scripted.iter().position(|&p| p == error as usize) {
            scripted.swap_remove(i);
            let record = Box::from_raw(error);
            drop(CString::from_raw(record.message));
            return engine::SUCCESS;
        }
        self.inner.free_compile_error(variant, error)
    }

    unsafe fn database_size(
        &self,
        db: *const RawDatabase,
        size: *mut usize,
    ) -> c_int {
        self.inner.database_size(db, size)
    }

    unsafe fn free_database(&self, db: *mut RawDatabase) -> c_int {
        if !db.is_null() {
            self.shared.databases_freed.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.free_database(db)
    }

    unsafe fn alloc_scratch(
        &self,
        db: *const RawDatabase,
        scratch: *mut *mut RawScratch,
    ) -> c_int {
        if let Some(code) = self.script().alloc {
            return code;
        }
        let fresh = (*scratch).is_null();
        let code = self.inner.alloc_scratch(db, scratch);
        if code == engine::SUCCESS && fresh {
            self.shared.scratches.fetch_add(1, Ordering::SeqCst);
        }
        code
    }

    unsafe fn scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int {
        self.inner.scratch_size(scratch, size)
    }

    unsafe fn base_scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int {
        self.inner.base_scratch_size(scratch, size)
    }

    unsafe fn free_scratch(&self, scratch: *mut RawScratch) -> c_int {
        if !scratch.is_null() {
            self.shared.scratches_freed.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.free_scratch(scratch)
    }

    unsafe fn scan(
        &self,
        db: *const RawDatabase,
        data: *const c_char,
        length: c_uint,
        flags: c_uint,
        scratch: *mut RawScratch,
        on_event: MatchEventHandler,
        context: *mut c_void,
    ) -> c_int {
        let script = self.script();
        if let Some(code) = script.scan {
            return code;
        }
        match script.report_id {
            None => self
                .inner
                .scan(db, data, length, flags, scratch, on_event, context),
            Some(id) => {
                let mut state = Remap { id, on_event, context };
                self.inner.scan(
                    db,
                    data,
                    length,
                    flags,
                    scratch,
                    remap,
                    (&mut state as *mut Remap).cast(),
                )
            }
        }
    }

    unsafe fn expression_info(
        &self,
        expression: *const c_char,
        flags: c_uint,
        info: *mut *mut RawExpressionInfo,
        error: *mut *mut RawCompileError,
    ) -> c_int {
        let code = self.inner.expression_info(expression, flags, info, error);
        if code == engine::SUCCESS {
            self.shared.infos.fetch_add(1, Ordering::SeqCst);
        } else if !(*error).is_null() {
            self.shared.errors.fetch_add(1, Ordering::SeqCst);
        }
        code
    }

    unsafe fn free_expression_info(&self, info: *mut RawExpressionInfo) {
        if !info.is_null() {
            self.shared.infos_freed.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.free_expression_info(info)
    }
}

fn pair() -> Vec<Arc<Expression>> {
    vec![Arc::new(Expression::new("a")), Arc::new(Expression::new("b"))]
}

#[test]
fn compiler_error_without_index_blames_first_expression() {
    let engine = Instrumented::new();
    engine.fail_compile(engine::COMPILER_ERROR, Some(-1));
    let exprs = pair();
    let err =
        Database::compile_many_with(engine.clone(), exprs.clone()).unwrap_err();
    let compile = err.compile_error().unwrap();
    assert_eq!("scripted failure", compile.message());
    assert_eq!(0, compile.index());
    assert_eq!(None, compile.engine_index());
    assert!(Arc::ptr_eq(&exprs[0], compile.expression()));
    assert_eq!((1, 1), engine.counts().errors);
}

#[test]
fn compiler_error_out_of_range_blames_first_expression() {
    let engine = Instrumented::new();
    engine.fail_compile(engine::COMPILER_ERROR, Some(7));
    let exprs = pair();
    let err =
        Database::compile_many_with(engine.clone(), exprs.clone()).unwrap_err();
    let compile = err.compile_error().unwrap();
    assert_eq!(0, compile.index());
    assert_eq!(None, compile.engine_index());
    assert!(Arc::ptr_eq(&exprs[0], compile.expression()));
}

#[test]
fn compiler_error_without_record() {
    let engine = Instrumented::new();
    engine.fail_compile(engine::COMPILER_ERROR, None);
    let err = Database::compile_many_with(engine, pair()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::CompilerFailure), "{}", err);
    assert!(err.compile_error().is_none());
}

#[test]
fn other_compile_failure_still_frees_record() {
    let engine = Instrumented::new();
    engine.fail_compile(engine::NOMEM, Some(1));
    let err = Database::compile_many_with(engine.clone(), pair()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OutOfMemory), "{}", err);
    assert!(err.compile_error().is_none());
    assert!(err.to_string().contains("failed to compile 2 expression(s)"));
    engine.counts().assert_balanced();
}

#[test]
fn failed_alloc_leaves_scanner_untouched() {
    let engine = Instrumented::new();
    let db = Database::compile_with(engine.clone(), Expression::new("a"))
        .unwrap();
    engine.fail_alloc(engine::ARCH_ERROR);
    let mut scanner = Scanner::with_engine(engine.clone());
    let err = scanner.alloc(&db).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnsupportedPlatform), "{}", err);
    assert!(!scanner.is_allocated());
    let err = scanner.scan(&db, "a").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotAllocated), "{}", err);

    engine.reset();
    scanner.alloc(&db).unwrap();
    assert_eq!(1, scanner.scan(&db, "a").unwrap().len());
    assert_eq!((1, 0), engine.counts().scratches);
}

#[test]
fn scan_codes_translate() {
    let engine = Instrumented::new();
    let db = Database::compile_with(engine.clone(), Expression::new("a"))
        .unwrap();
    let mut scanner = db.scanner().unwrap();
    for code in -12..=-1 {
        engine.fail_scan(code);
        let err = scanner.scan(&db, "a").unwrap_err();
        assert_eq!(Some(code), err.code(), "{}", err);
        assert!(err.to_string().starts_with("failed to scan: "), "{}", err);
    }
    engine.fail_scan(-99);
    let err = scanner.scan(&db, "a").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Unexpected(-99)), "{}", err);

    engine.reset();
    assert_eq!(1, scanner.scan(&db, "a").unwrap().len());
}

#[test]
fn scan_failures_name_their_cause() {
    let engine = Instrumented::new();
    let db = Database::compile_with(engine.clone(), Expression::new("a"))
        .unwrap();
    let mut scanner = db.scanner().unwrap();
    let cases = [
        (engine::DB_VERSION_ERROR, "DatabaseVersionMismatch"),
        (engine::DB_PLATFORM_ERROR, "DatabasePlatformMismatch"),
        (engine::DB_MODE_ERROR, "DatabaseModeMismatch"),
        (engine::SCRATCH_IN_USE, "ScratchInUse"),
        (engine::SCAN_TERMINATED, "TerminatedByCallback"),
        (engine::INSUFFICIENT_SPACE, "BufferTooSmall"),
    ];
    for &(code, kind) in cases.iter() {
        engine.fail_scan(code);
        let err = scanner.scan(&db, "a").unwrap_err();
        assert_eq!(kind, format!("{:?}", err.kind()), "{}", err);
    }
}

#[test]
fn unknown_pattern_id_is_invalid() {
    let engine = Instrumented::new();
    let db = Database::compile_with(engine.clone(), Expression::new("a"))
        .unwrap();
    let mut scanner = db.scanner().unwrap();
    engine.report_id(5);
    let err = scanner.scan(&db, "a").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidParameter), "{}", err);
    assert!(err.to_string().contains("unknown pattern id 5"), "{}", err);
    // The engine itself reported success.
    assert_eq!(None, err.code());
    // Nothing matched, so nothing is reported either.
    assert!(scanner.scan(&db, "b").unwrap().is_empty());
}

#[test]
fn version_is_forwarded() {
    let engine = Instrumented::new();
    assert!(engine.version().ends_with("instrumented"));
    assert!(engine.valid_platform());
}
