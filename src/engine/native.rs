// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(non_camel_case_types)]

use std::{
    ffi::CStr,
    os::raw::{c_char, c_int, c_uint, c_ulonglong, c_void},
    ptr,
};

use log::warn;

use crate::engine::{
    Engine, MatchEventHandler, RawCompileError, RawDatabase,
    RawExpressionInfo, RawScratch, Variant, SUCCESS,
};

/// An engine backed by the system's `libhs` (base variant) and `libch`
/// (extended variant).
///
/// The libraries are located with `pkg-config` when the crate is built with
/// the `native` feature.
#[derive(Clone, Copy, Debug, Default)]
pub struct Native(());

impl Native {
    /// Creates a handle to the native engine.
    pub fn new() -> Native {
        Native(())
    }
}

type hs_error_t = c_int;
type ch_error_t = c_int;
type ch_callback_t = c_int;
type ch_error_event_t = c_int;

const CH_CALLBACK_CONTINUE: ch_callback_t = 0;
const CH_CALLBACK_TERMINATE: ch_callback_t = 1;
const CH_CALLBACK_SKIP_PATTERN: ch_callback_t = 2;

const CH_ERROR_MATCHLIMIT: ch_error_event_t = 1;
const CH_ERROR_RECURSIONLIMIT: ch_error_event_t = 2;

#[repr(C)]
struct ch_capture_t {
    flags: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
}

type ch_match_event_handler = unsafe extern "C" fn(
    id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
    flags: c_uint,
    size: c_uint,
    captured: *const ch_capture_t,
    ctx: *mut c_void,
) -> ch_callback_t;

type ch_error_event_handler = unsafe extern "C" fn(
    error_type: ch_error_event_t,
    id: c_uint,
    info: *mut c_void,
    ctx: *mut c_void,
) -> ch_callback_t;

extern "C" {
    fn hs_version() -> *const c_char;
    fn hs_valid_platform() -> hs_error_t;
    fn hs_expression_info(
        expression: *const c_char,
        flags: c_uint,
        info: *mut *mut RawExpressionInfo,
        error: *mut *mut RawCompileError,
    ) -> hs_error_t;
    fn hs_free_compile_error(error: *mut RawCompileError) -> hs_error_t;
    fn hs_scratch_size(
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> hs_error_t;

    fn ch_compile_multi(
        expressions: *const *const c_char,
        flags: *const c_uint,
        ids: *const c_uint,
        elements: c_uint,
        mode: c_uint,
        platform: *const c_void,
        db: *mut *mut RawDatabase,
        error: *mut *mut RawCompileError,
    ) -> ch_error_t;
    fn ch_free_compile_error(error: *mut RawCompileError) -> ch_error_t;
    fn ch_database_size(
        db: *const RawDatabase,
        size: *mut usize,
    ) -> ch_error_t;
    fn ch_free_database(db: *mut RawDatabase) -> ch_error_t;
    fn ch_alloc_scratch(
        db: *const RawDatabase,
        scratch: *mut *mut RawScratch,
    ) -> ch_error_t;
    fn ch_scratch_size(
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> ch_error_t;
    fn ch_free_scratch(scratch: *mut RawScratch) -> ch_error_t;
    fn ch_scan(
        db: *const RawDatabase,
        data: *const c_char,
        length: c_uint,
        flags: c_uint,
        scratch: *mut RawScratch,
        on_event: Option<ch_match_event_handler>,
        on_error: Option<ch_error_event_handler>,
        context: *mut c_void,
    ) -> ch_error_t;
}

/// Carries the caller's handler through Chimera's wider callback signature.
struct Forward {
    on_event: MatchEventHandler,
    context: *mut c_void,
}

unsafe extern "C" fn on_chimera_match(
    id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
    flags: c_uint,
    _size: c_uint,
    _captured: *const ch_capture_t,
    ctx: *mut c_void,
) -> ch_callback_t {
    let forward = &*ctx.cast::<Forward>();
    if (forward.on_event)(id, from, to, flags, forward.context) == 0 {
        CH_CALLBACK_CONTINUE
    } else {
        CH_CALLBACK_TERMINATE
    }
}

unsafe extern "C" fn on_chimera_error(
    error_type: ch_error_event_t,
    id: c_uint,
    _info: *mut c_void,
    _ctx: *mut c_void,
) -> ch_callback_t {
    let what = match error_type {
        CH_ERROR_MATCHLIMIT => "match limit",
        CH_ERROR_RECURSIONLIMIT => "recursion limit",
        _ => "unknown error",
    };
    warn!("pattern {} hit the PCRE {}, skipping it", id, what);
    CH_CALLBACK_SKIP_PATTERN
}

unsafe impl Engine for Native {
    fn version(&self) -> String {
        // SAFETY: hs_version returns a pointer to a static string.
        unsafe { CStr::from_ptr(hs_version()).to_string_lossy().into_owned() }
    }

    fn valid_platform(&self) -> bool {
        unsafe { hs_valid_platform() == SUCCESS }
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
        ch_compile_multi(
            expressions,
            flags,
            ids,
            elements,
            mode,
            ptr::null(),
            db,
            error,
        )
    }

    unsafe fn free_compile_error(
        &self,
        variant: Variant,
        error: *mut RawCompileError,
    ) -> c_int {
        match variant {
            Variant::Base => hs_free_compile_error(error),
            Variant::Extended => ch_free_compile_error(error),
        }
    }

    unsafe fn database_size(
        &self,
        db: *const RawDatabase,
        size: *mut usize,
    ) -> c_int {
        ch_database_size(db, size)
    }

    unsafe fn free_database(&self, db: *mut RawDatabase) -> c_int {
        ch_free_database(db)
    }

    unsafe fn alloc_scratch(
        &self,
        db: *const RawDatabase,
        scratch: *mut *mut RawScratch,
    ) -> c_int {
        ch_alloc_scratch(db, scratch)
    }

    unsafe fn scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int {
        ch_scratch_size(scratch, size)
    }

    unsafe fn base_scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int {
        // Chimera scratch doesn't expose its inner Hyperscan scratch, so
        // libhs usually rejects this handle by its magic number.
        hs_scratch_size(scratch, size)
    }

    unsafe fn free_scratch(&self, scratch: *mut RawScratch) -> c_int {
        ch_free_scratch(scratch)
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
        let mut forward = Forward { on_event, context };
        ch_scan(
            db,
            data,
            length,
            flags,
            scratch,
            Some(on_chimera_match),
            Some(on_chimera_error),
            (&mut forward as *mut Forward).cast(),
        )
    }

    unsafe fn expression_info(
        &self,
        expression: *const c_char,
        flags: c_uint,
        info: *mut *mut RawExpressionInfo,
        error: *mut *mut RawCompileError,
    ) -> c_int {
        hs_expression_info(expression, flags, info, error)
    }

    unsafe fn free_expression_info(&self, info: *mut RawExpressionInfo) {
        // Allocated with the misc allocator, which defaults to malloc.
        libc::free(info.cast());
    }
}
