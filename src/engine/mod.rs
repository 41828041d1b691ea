// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/*!
The boundary between this crate and a matching engine.

A matching engine is anything that speaks the Hyperscan/Chimera C ABI: it
compiles a batch of patterns into an opaque database, allocates opaque scratch
space sized for a database and scans a buffer of bytes while reporting every
match to a callback as a `(pattern id, from byte, to byte)` triple. Results are
signalled with small signed integer codes, `0` meaning success.

The [`Engine`] trait mirrors that ABI one method per native call, raw pointers
and all. Everything in this crate that deals with lifetimes, offsets and errors
sits on top of it, so an engine implementation only has to honor the contract
documented on each method.

Two engines are provided:

* [`Portable`] is a pure Rust engine built on `regex-automata`. It needs no
system libraries and is the default.
* `Native` binds `libhs` and `libch` directly. It is only available when the
`native` feature is enabled.

An engine pairs two *variants*. The base variant (Hyperscan) answers pattern
metadata queries. The extended variant (Chimera, which confirms matches with a
backtracking engine) compiles and scans databases. See [`Variant`].
*/

use std::{
    ffi::CStr,
    fmt::Debug,
    os::raw::{c_char, c_int, c_uint, c_ulonglong, c_void},
};

#[cfg(feature = "native")]
pub use self::native::Native;
pub use self::portable::{Portable, DEFAULT_SIZE_LIMIT};

#[cfg(feature = "native")]
mod native;
mod portable;

/// The engine used when none is chosen explicitly.
#[cfg(not(feature = "native"))]
pub type DefaultEngine = Portable;

/// The engine used when none is chosen explicitly.
#[cfg(feature = "native")]
pub type DefaultEngine = Native;

/// The call completed successfully.
pub const SUCCESS: c_int = 0;
/// A parameter was invalid, which includes scanning without scratch.
pub const INVALID: c_int = -1;
/// A memory allocation failed.
pub const NOMEM: c_int = -2;
/// The match callback asked for the scan to stop.
pub const SCAN_TERMINATED: c_int = -3;
/// The pattern compiler failed. Compile calls also hand back an error record.
pub const COMPILER_ERROR: c_int = -4;
/// The database was built by a different engine version.
pub const DB_VERSION_ERROR: c_int = -5;
/// The database was built for a different platform.
pub const DB_PLATFORM_ERROR: c_int = -6;
/// The database was built for a different scanning mode.
pub const DB_MODE_ERROR: c_int = -7;
/// A parameter was not correctly aligned.
pub const BAD_ALIGN: c_int = -8;
/// The allocator returned misaligned memory.
pub const BAD_ALLOC: c_int = -9;
/// The scratch region was already in use by another scan.
pub const SCRATCH_IN_USE: c_int = -10;
/// The CPU is not supported.
pub const ARCH_ERROR: c_int = -11;
/// A caller provided buffer was too small.
pub const INSUFFICIENT_SPACE: c_int = -12;

/// Match case insensitively.
pub const FLAG_CASELESS: c_uint = 1;
/// Let `.` match a line terminator.
pub const FLAG_DOTALL: c_uint = 2;
/// Let `^` and `$` match at line boundaries.
pub const FLAG_MULTILINE: c_uint = 4;
/// Report at most one match per pattern.
pub const FLAG_SINGLEMATCH: c_uint = 8;
/// Permit patterns that can match the empty string. Base variant only.
pub const FLAG_ALLOWEMPTY: c_uint = 16;
/// Treat the pattern and the input as UTF-8.
pub const FLAG_UTF8: c_uint = 32;
/// Use Unicode semantics for character classes.
pub const FLAG_UCP: c_uint = 64;
/// Compile in prefiltering mode. Base variant only.
pub const FLAG_PREFILTER: c_uint = 128;
/// Track the leftmost start of match. Base variant only.
pub const FLAG_SOM_LEFTMOST: c_uint = 256;

/// Every flag bit the base variant recognizes.
pub const BASE_FLAGS: c_uint = FLAG_CASELESS
    | FLAG_DOTALL
    | FLAG_MULTILINE
    | FLAG_SINGLEMATCH
    | FLAG_ALLOWEMPTY
    | FLAG_UTF8
    | FLAG_UCP
    | FLAG_PREFILTER
    | FLAG_SOM_LEFTMOST;

/// Every flag bit the extended variant recognizes.
pub const EXTENDED_FLAGS: c_uint = FLAG_CASELESS
    | FLAG_DOTALL
    | FLAG_MULTILINE
    | FLAG_SINGLEMATCH
    | FLAG_UTF8
    | FLAG_UCP;

/// Compile without capture group support.
pub const MODE_NOGROUPS: c_uint = 0;
/// Compile with capture group support.
pub const MODE_GROUPS: c_uint = 1 << 20;

/// An opaque compiled database owned by an engine.
#[repr(C)]
pub struct RawDatabase {
    _private: [u8; 0],
}

/// Opaque scratch space owned by an engine.
#[repr(C)]
pub struct RawScratch {
    _private: [u8; 0],
}

/// The error record handed back by a failed compile or info call.
///
/// It must be returned to the engine that produced it with
/// [`Engine::free_compile_error`].
#[repr(C)]
#[derive(Debug)]
pub struct RawCompileError {
    /// A NUL terminated, human readable message.
    pub message: *mut c_char,
    /// The index of the offending expression, or `-1` when the failure
    /// can't be pinned on a single expression.
    pub expression: c_int,
}

/// Pattern metadata as reported by [`Engine::expression_info`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RawExpressionInfo {
    /// The minimum length in bytes of any match.
    pub min_width: c_uint,
    /// The maximum length in bytes of any match, `c_uint::MAX` if unbounded.
    pub max_width: c_uint,
    /// Whether matches may be reported out of order.
    pub unordered_matches: c_char,
    /// Whether matches may occur at the end of the data.
    pub matches_at_eod: c_char,
    /// Whether matches occur only at the end of the data.
    pub matches_only_at_eod: c_char,
}

/// The callback invoked by [`Engine::scan`] for every match.
///
/// Returning a nonzero value stops the scan, which then reports
/// [`SCAN_TERMINATED`].
pub type MatchEventHandler = unsafe extern "C" fn(
    id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
    flags: c_uint,
    context: *mut c_void,
) -> c_int;

/// The two halves of an engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Variant {
    /// The automata based engine. It answers metadata queries and accepts
    /// the full set of flags, but no backreferences or lookaround.
    Base,
    /// The backtracking compatible engine. It compiles and scans every
    /// database built by this crate.
    Extended,
}

impl Variant {
    /// Every flag bit this variant recognizes.
    pub fn known_flags(self) -> c_uint {
        match self {
            Variant::Base => BASE_FLAGS,
            Variant::Extended => EXTENDED_FLAGS,
        }
    }
}

/// A matching engine that speaks the Hyperscan/Chimera C ABI.
///
/// Every method returns one of the result codes defined in this module.
/// Out-pointers are only written on success unless stated otherwise.
///
/// # Safety
///
/// Implementations must uphold the contract on each method. In particular,
/// handles returned by one method must stay valid until they are passed to
/// the matching `free_*` method, and the scan callback must be invoked only
/// while `scan` is running. Callers must pass pointers that were produced by
/// the same engine and must not use a scratch handle from two threads at
/// once.
pub unsafe trait Engine: Clone + Debug + Send + Sync + 'static {
    /// Returns a human readable version string for this engine.
    fn version(&self) -> String;

    /// Returns true when the current CPU can run this engine.
    fn valid_platform(&self) -> bool;

    /// Compiles `elements` expressions with the extended variant.
    ///
    /// `expressions`, `flags` and `ids` are parallel arrays. On
    /// [`COMPILER_ERROR`], `*error` may point at a record that the caller
    /// must free with [`Engine::free_compile_error`] and the extended
    /// variant.
    ///
    /// # Safety
    ///
    /// The arrays must each hold `elements` items and every expression must
    /// be a valid NUL terminated string.
    unsafe fn compile_multi(
        &self,
        expressions: *const *const c_char,
        flags: *const c_uint,
        ids: *const c_uint,
        elements: c_uint,
        mode: c_uint,
        db: *mut *mut RawDatabase,
        error: *mut *mut RawCompileError,
    ) -> c_int;

    /// Releases an error record produced by `variant`.
    ///
    /// # Safety
    ///
    /// `error` must be null or a record produced by this engine that hasn't
    /// been freed yet.
    unsafe fn free_compile_error(
        &self,
        variant: Variant,
        error: *mut RawCompileError,
    ) -> c_int;

    /// Writes the size in bytes of the given database to `size`.
    ///
    /// # Safety
    ///
    /// `db` must be a live database produced by this engine.
    unsafe fn database_size(
        &self,
        db: *const RawDatabase,
        size: *mut usize,
    ) -> c_int;

    /// Releases a database. Freeing a null database is a no-op.
    ///
    /// # Safety
    ///
    /// `db` must be null or a live database produced by this engine. It
    /// must not be used again afterwards.
    unsafe fn free_database(&self, db: *mut RawDatabase) -> c_int;

    /// Allocates scratch space for `db`.
    ///
    /// If `*scratch` is null, fresh scratch space is allocated. Otherwise
    /// the existing scratch space is grown so that it can serve `db` in
    /// addition to every database it could serve before. On failure,
    /// `*scratch` is left untouched.
    ///
    /// # Safety
    ///
    /// `db` must be a live database and `*scratch` must be null or live
    /// scratch space produced by this engine.
    unsafe fn alloc_scratch(
        &self,
        db: *const RawDatabase,
        scratch: *mut *mut RawScratch,
    ) -> c_int;

    /// Writes the size in bytes of extended variant scratch space to `size`.
    ///
    /// # Safety
    ///
    /// `scratch` must be live scratch space produced by this engine.
    unsafe fn scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int;

    /// Writes the size in bytes of the base variant's share of the scratch
    /// space to `size`.
    ///
    /// # Safety
    ///
    /// `scratch` must be live scratch space produced by this engine.
    unsafe fn base_scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int;

    /// Releases scratch space. Freeing null scratch space is a no-op.
    ///
    /// # Safety
    ///
    /// `scratch` must be null or live scratch space produced by this engine.
    /// It must not be used again afterwards.
    unsafe fn free_scratch(&self, scratch: *mut RawScratch) -> c_int;

    /// Scans `length` bytes at `data`, calling `on_event` for every match.
    ///
    /// # Safety
    ///
    /// `data` must point at `length` readable bytes, `db` must be a live
    /// database and `scratch` must be live scratch space allocated for it.
    /// `context` is passed through to `on_event` untouched.
    unsafe fn scan(
        &self,
        db: *const RawDatabase,
        data: *const c_char,
        length: c_uint,
        flags: c_uint,
        scratch: *mut RawScratch,
        on_event: MatchEventHandler,
        context: *mut c_void,
    ) -> c_int;

    /// Analyzes a single expression with the base variant.
    ///
    /// On success `*info` must later be released with
    /// [`Engine::free_expression_info`]. On [`COMPILER_ERROR`], `*error`
    /// may point at a record that must be freed with the base variant.
    ///
    /// # Safety
    ///
    /// `expression` must be a valid NUL terminated string.
    unsafe fn expression_info(
        &self,
        expression: *const c_char,
        flags: c_uint,
        info: *mut *mut RawExpressionInfo,
        error: *mut *mut RawCompileError,
    ) -> c_int;

    /// Releases metadata returned by [`Engine::expression_info`].
    ///
    /// # Safety
    ///
    /// `info` must be null or produced by this engine and not yet freed.
    unsafe fn free_expression_info(&self, info: *mut RawExpressionInfo);
}

/// Copies the message and index out of an error record and hands the record
/// back to the engine.
///
/// # Safety
///
/// `error` must be a live record produced by `variant` of `engine`.
pub(crate) unsafe fn take_compile_error<E: Engine>(
    engine: &E,
    variant: Variant,
    error: *mut RawCompileError,
) -> (String, c_int) {
    let record = &*error;
    let message = if record.message.is_null() {
        String::from("unknown compile error")
    } else {
        CStr::from_ptr(record.message).to_string_lossy().into_owned()
    };
    let index = record.expression;
    let code = engine.free_compile_error(variant, error);
    if code != SUCCESS {
        log::warn!("failed to free compile error record: code {}", code);
    }
    (message, index)
}
