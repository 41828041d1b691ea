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
A pure Rust engine that honors the same C ABI as libhs/libch.

Databases are a list of `regex-automata` meta regexes, one per pattern, and
scratch space is an event buffer guarded by an "in use" flag. Handles are
boxed Rust values cast to the opaque handle types and carry a magic number so
that a handle of the wrong kind is rejected with [`INVALID`] instead of being
trusted.

The extended variant is approximated by the `regex-syntax` dialect. Patterns
that need backreferences or lookaround fail to compile with both variants.

Without `FLAG_UTF8` a pattern and the data it scans are plain bytes: `.`
matches a single byte, non-ASCII pattern characters stand for their encoded
bytes and case folding is ASCII only. With `FLAG_UTF8` matching is by
codepoint and case folding is Unicode aware, but `\w`, `\d`, `\s` and `\b`
stay ASCII unless `FLAG_UCP` is also given.
*/

use std::{
    borrow::Cow,
    cell::UnsafeCell,
    ffi::{CStr, CString},
    mem,
    os::raw::{c_char, c_int, c_uint, c_ulonglong, c_void},
    ptr, slice,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use regex_automata::meta;
use regex_syntax::{
    ast::{self, Ast},
    hir::{translate::TranslatorBuilder, Hir, Look},
};

use crate::engine::{
    Engine, MatchEventHandler, RawCompileError, RawDatabase,
    RawExpressionInfo, RawScratch, Variant, COMPILER_ERROR, FLAG_ALLOWEMPTY,
    FLAG_CASELESS, FLAG_DOTALL, FLAG_MULTILINE, FLAG_SINGLEMATCH, FLAG_UCP,
    FLAG_UTF8, INVALID, MODE_GROUPS, SCAN_TERMINATED, SCRATCH_IN_USE, SUCCESS,
};

const DATABASE_MAGIC: u32 = 0xdbdb_5e01;
const SCRATCH_MAGIC: u32 = 0x5c5c_5e01;

/// The default bound on each pattern's compiled automaton, in bytes.
pub const DEFAULT_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A pure Rust engine built on `regex-automata`.
///
/// Each pattern is compiled independently. A scan runs every pattern over
/// the whole buffer and reports leftmost-first, non-overlapping matches per
/// pattern, ordered by end offset, then start offset, then pattern id.
///
/// # Example
///
/// ```
/// use hsmatch::{engine::Portable, Database, Expression, Scanner};
///
/// let engine = Portable::new().size_limit(Some(1 << 20));
/// let db = Database::compile_with(engine, Expression::new("[a-z]+"))?;
/// let mut scanner = Scanner::with_engine(engine);
/// scanner.alloc(&db)?;
/// assert_eq!(2, scanner.scan(&db, "ab 12 cd")?.len());
/// # Ok::<(), hsmatch::Error>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Portable {
    size_limit: Option<usize>,
}

impl Default for Portable {
    fn default() -> Portable {
        Portable::new()
    }
}

impl Portable {
    /// Creates an engine whose automata are bounded by
    /// [`DEFAULT_SIZE_LIMIT`].
    pub fn new() -> Portable {
        Portable { size_limit: Some(DEFAULT_SIZE_LIMIT) }
    }

    /// Bounds the size in bytes of each pattern's compiled automaton.
    /// Patterns that exceed it fail to compile. `None` removes the bound.
    pub fn size_limit(self, limit: Option<usize>) -> Portable {
        Portable { size_limit: limit }
    }

    fn build(
        &self,
        pattern: &str,
        flags: c_uint,
    ) -> Result<meta::Regex, String> {
        let hir = parse(pattern, flags)?;
        let config = meta::Config::new()
            .nfa_size_limit(self.size_limit)
            .utf8_empty(flags & FLAG_UTF8 != 0);
        meta::Builder::new().configure(config).build_from_hir(&hir).map_err(
            |err| match err.size_limit() {
                Some(limit) => format!(
                    "Pattern is too large: exceeds the limit of {} bytes.",
                    limit
                ),
                None => format!("Pattern could not be built: {}.", err),
            },
        )
    }
}

#[repr(C)]
struct Database {
    magic: u32,
    mode: c_uint,
    patterns: Vec<Pattern>,
}

struct Pattern {
    id: c_uint,
    single_match: bool,
    regex: meta::Regex,
}

#[repr(C)]
struct Scratch {
    magic: u32,
    capacity: AtomicUsize,
    in_use: AtomicBool,
    // Only touched by the scan that flipped `in_use`.
    events: UnsafeCell<Vec<Event>>,
}

/// Sort key order: end offset, then start offset, then pattern id.
type Event = (usize, usize, c_uint);

unsafe impl Engine for Portable {
    fn version(&self) -> String {
        format!("{} portable", env!("CARGO_PKG_VERSION"))
    }

    fn valid_platform(&self) -> bool {
        true
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
        if db.is_null() || error.is_null() {
            return INVALID;
        }
        *db = ptr::null_mut();
        *error = ptr::null_mut();
        if elements == 0 || expressions.is_null() {
            *error = new_compile_error(
                "Invalid parameter: elements must be greater than zero.",
                -1,
            );
            return COMPILER_ERROR;
        }
        if mode & !MODE_GROUPS != 0 {
            *error = new_compile_error("Invalid parameter: unknown mode.", -1);
            return COMPILER_ERROR;
        }
        let mut patterns = Vec::with_capacity(elements as usize);
        for i in 0..elements as usize {
            let index = i as c_int;
            let bits = if flags.is_null() { 0 } else { *flags.add(i) };
            let id = if ids.is_null() { 0 } else { *ids.add(i) };
            let pattern = match read_pattern(*expressions.add(i)) {
                Ok(pattern) => pattern,
                Err(msg) => {
                    *error = new_compile_error(msg, index);
                    return COMPILER_ERROR;
                }
            };
            if bits & !Variant::Extended.known_flags() != 0 {
                *error = new_compile_error("Unrecognised flag.", index);
                return COMPILER_ERROR;
            }
            let regex = match self.build(pattern, bits) {
                Ok(regex) => regex,
                Err(msg) => {
                    *error = new_compile_error(&msg, index);
                    return COMPILER_ERROR;
                }
            };
            let single_match = bits & FLAG_SINGLEMATCH != 0;
            patterns.push(Pattern { id, single_match, regex });
        }
        let database =
            Box::new(Database { magic: DATABASE_MAGIC, mode, patterns });
        *db = Box::into_raw(database).cast::<RawDatabase>();
        SUCCESS
    }

    unsafe fn free_compile_error(
        &self,
        _: Variant,
        error: *mut RawCompileError,
    ) -> c_int {
        if error.is_null() {
            return SUCCESS;
        }
        let record = Box::from_raw(error);
        if !record.message.is_null() {
            drop(CString::from_raw(record.message));
        }
        SUCCESS
    }

    unsafe fn database_size(
        &self,
        db: *const RawDatabase,
        size: *mut usize,
    ) -> c_int {
        let db = match database(db) {
            Some(db) if !size.is_null() => db,
            _ => return INVALID,
        };
        *size = mem::size_of::<Database>()
            + db
                .patterns
                .iter()
                .map(|p| mem::size_of::<Pattern>() + p.regex.memory_usage())
                .sum::<usize>();
        SUCCESS
    }

    unsafe fn free_database(&self, db: *mut RawDatabase) -> c_int {
        if db.is_null() {
            return SUCCESS;
        }
        if database(db).is_none() {
            return INVALID;
        }
        let mut db = Box::from_raw(db.cast::<Database>());
        db.magic = 0;
        drop(db);
        SUCCESS
    }

    unsafe fn alloc_scratch(
        &self,
        db: *const RawDatabase,
        scratch: *mut *mut RawScratch,
    ) -> c_int {
        let db = match database(db) {
            Some(db) if !scratch.is_null() => db,
            _ => return INVALID,
        };
        let needed = db.patterns.len();
        if (*scratch).is_null() {
            let fresh = Box::new(Scratch {
                magic: SCRATCH_MAGIC,
                capacity: AtomicUsize::new(needed),
                in_use: AtomicBool::new(false),
                events: UnsafeCell::new(Vec::with_capacity(needed)),
            });
            *scratch = Box::into_raw(fresh).cast::<RawScratch>();
            return SUCCESS;
        }
        let existing = match scratch_ref(*scratch) {
            None => return INVALID,
            Some(existing) => existing,
        };
        if existing.in_use.load(Ordering::Acquire) {
            return SCRATCH_IN_USE;
        }
        existing.capacity.fetch_max(needed, Ordering::AcqRel);
        SUCCESS
    }

    unsafe fn scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int {
        let scratch = match scratch_ref(scratch) {
            Some(scratch) if !size.is_null() => scratch,
            _ => return INVALID,
        };
        // Room for one start/end capture pair per pattern on top of the
        // base share.
        let capacity = scratch.capacity.load(Ordering::Acquire);
        *size = base_share(capacity) + capacity * 2 * mem::size_of::<usize>();
        SUCCESS
    }

    unsafe fn base_scratch_size(
        &self,
        scratch: *const RawScratch,
        size: *mut usize,
    ) -> c_int {
        let scratch = match scratch_ref(scratch) {
            Some(scratch) if !size.is_null() => scratch,
            _ => return INVALID,
        };
        *size = base_share(scratch.capacity.load(Ordering::Acquire));
        SUCCESS
    }

    unsafe fn free_scratch(&self, scratch: *mut RawScratch) -> c_int {
        if scratch.is_null() {
            return SUCCESS;
        }
        match scratch_ref(scratch) {
            None => return INVALID,
            Some(s) if s.in_use.load(Ordering::Acquire) => {
                return SCRATCH_IN_USE
            }
            Some(_) => {}
        }
        let mut scratch = Box::from_raw(scratch.cast::<Scratch>());
        scratch.magic = 0;
        drop(scratch);
        SUCCESS
    }

    unsafe fn scan(
        &self,
        db: *const RawDatabase,
        data: *const c_char,
        length: c_uint,
        _flags: c_uint,
        scratch: *mut RawScratch,
        on_event: MatchEventHandler,
        context: *mut c_void,
    ) -> c_int {
        let (db, scratch) = match (database(db), scratch_ref(scratch)) {
            (Some(db), Some(scratch)) => (db, scratch),
            _ => return INVALID,
        };
        if data.is_null() && length > 0 {
            return INVALID;
        }
        if scratch.capacity.load(Ordering::Acquire) < db.patterns.len() {
            return INVALID;
        }
        if scratch.in_use.swap(true, Ordering::AcqRel) {
            return SCRATCH_IN_USE;
        }
        let haystack: &[u8] = if length == 0 {
            &[]
        } else {
            slice::from_raw_parts(data.cast::<u8>(), length as usize)
        };
        // SAFETY: winning the swap above gives this call exclusive access to
        // the event buffer until `in_use` is cleared again.
        let events = &mut *scratch.events.get();
        events.clear();
        for pattern in db.patterns.iter() {
            for m in pattern.regex.find_iter(haystack) {
                events.push((m.end(), m.start(), pattern.id));
                if pattern.single_match {
                    break;
                }
            }
        }
        events.sort_unstable();

        let mut code = SUCCESS;
        for &(to, from, id) in events.iter() {
            let from = from as c_ulonglong;
            let to = to as c_ulonglong;
            if on_event(id, from, to, 0, context) != 0 {
                code = SCAN_TERMINATED;
                break;
            }
        }
        scratch.in_use.store(false, Ordering::Release);
        code
    }

    unsafe fn expression_info(
        &self,
        expression: *const c_char,
        flags: c_uint,
        info: *mut *mut RawExpressionInfo,
        error: *mut *mut RawCompileError,
    ) -> c_int {
        if info.is_null() || error.is_null() {
            return INVALID;
        }
        *info = ptr::null_mut();
        *error = ptr::null_mut();
        match analyze(expression, flags) {
            Ok(analyzed) => {
                *info = Box::into_raw(Box::new(analyzed));
                SUCCESS
            }
            Err(msg) => {
                *error = new_compile_error(&msg, 0);
                COMPILER_ERROR
            }
        }
    }

    unsafe fn free_expression_info(&self, info: *mut RawExpressionInfo) {
        if !info.is_null() {
            drop(Box::from_raw(info));
        }
    }
}

/// Analyzes a pattern the way the base variant would.
unsafe fn analyze(
    expression: *const c_char,
    flags: c_uint,
) -> Result<RawExpressionInfo, String> {
    let pattern = read_pattern(expression)?;
    if flags & !Variant::Base.known_flags() != 0 {
        return Err("Unrecognised flag.".to_string());
    }
    let hir = parse(pattern, flags)?;
    let props = hir.properties();
    let min = match props.minimum_len() {
        Some(min) => min,
        None => return Err("Pattern can never match.".to_string()),
    };
    if min == 0 && flags & FLAG_ALLOWEMPTY == 0 {
        return Err("Pattern matches empty buffer; use \
                    HS_FLAG_ALLOWEMPTY to enable support."
            .to_string());
    }
    let max = props
        .maximum_len()
        .and_then(|max| c_uint::try_from(max).ok())
        .unwrap_or(c_uint::MAX);
    Ok(RawExpressionInfo {
        min_width: c_uint::try_from(min).unwrap_or(c_uint::MAX),
        max_width: max,
        unordered_matches: 0,
        matches_at_eod: props.look_set().contains(Look::End) as c_char,
        matches_only_at_eod: props.look_set_suffix().contains(Look::End)
            as c_char,
    })
}

fn parse(pattern: &str, flags: c_uint) -> Result<Hir, String> {
    let utf8 = flags & FLAG_UTF8 != 0;
    let pattern =
        if utf8 { Cow::Borrowed(pattern) } else { as_bytes(pattern) };
    let mut ast = ast::parse::ParserBuilder::new()
        .build()
        .parse(&pattern)
        .map_err(|err| syntax_message(&err.into()))?;
    if utf8 && flags & FLAG_UCP == 0 {
        ascii_classes(&mut ast);
    }
    // The HIR is allowed to match invalid UTF-8 in both modes. In UTF-8 mode
    // every construct that could is spelled as an ASCII-only one.
    TranslatorBuilder::new()
        .utf8(false)
        .unicode(utf8)
        .case_insensitive(flags & FLAG_CASELESS != 0)
        .dot_matches_new_line(flags & FLAG_DOTALL != 0)
        .multi_line(flags & FLAG_MULTILINE != 0)
        .build()
        .translate(&pattern, &ast)
        .map_err(|err| syntax_message(&err.into()))
}

/// Spells every non-ASCII character as the `\xNN` escapes of its UTF-8
/// encoding, so that the pattern matches those bytes in byte mode.
fn as_bytes(pattern: &str) -> Cow<'_, str> {
    if pattern.is_ascii() {
        return Cow::Borrowed(pattern);
    }
    let mut out = String::with_capacity(pattern.len() * 4);
    let mut escaped = false;
    for ch in pattern.chars() {
        if ch.is_ascii() {
            escaped = ch == '\\' && !escaped;
            out.push(ch);
            continue;
        }
        // An escaped character is a literal either way.
        if escaped {
            out.pop();
            escaped = false;
        }
        let mut buf = [0; 4];
        for byte in ch.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("\\x{:02X}", byte));
        }
    }
    Cow::Owned(out)
}

/// Rewrites Perl classes as the equivalent ASCII classes and moves word
/// boundaries out of Unicode mode. Everything else stays Unicode aware.
fn ascii_classes(ast: &mut Ast) {
    match *ast {
        Ast::ClassPerl(ref perl) => {
            let span = perl.span;
            let item = ast::ClassSetItem::Ascii(ascii_class(perl));
            *ast = Ast::ClassBracketed(Box::new(ast::ClassBracketed {
                span,
                negated: false,
                kind: ast::ClassSet::Item(item),
            }));
        }
        Ast::Assertion(ref assertion)
            if matches!(
                assertion.kind,
                ast::AssertionKind::WordBoundary
                    | ast::AssertionKind::NotWordBoundary
            ) =>
        {
            let span = assertion.span;
            let inner = Ast::Assertion(assertion.clone());
            let flags = ast::Flags {
                span,
                items: vec![
                    ast::FlagsItem {
                        span,
                        kind: ast::FlagsItemKind::Negation,
                    },
                    ast::FlagsItem {
                        span,
                        kind: ast::FlagsItemKind::Flag(ast::Flag::Unicode),
                    },
                ],
            };
            *ast = Ast::Group(Box::new(ast::Group {
                span,
                kind: ast::GroupKind::NonCapturing(flags),
                ast: Box::new(inner),
            }));
        }
        Ast::ClassBracketed(ref mut class) => ascii_set(&mut class.kind),
        Ast::Repetition(ref mut rep) => ascii_classes(&mut rep.ast),
        Ast::Group(ref mut group) => ascii_classes(&mut group.ast),
        Ast::Alternation(ref mut alt) => {
            alt.asts.iter_mut().for_each(ascii_classes)
        }
        Ast::Concat(ref mut concat) => {
            concat.asts.iter_mut().for_each(ascii_classes)
        }
        _ => {}
    }
}

fn ascii_set(set: &mut ast::ClassSet) {
    match *set {
        ast::ClassSet::Item(ref mut item) => ascii_item(item),
        ast::ClassSet::BinaryOp(ref mut op) => {
            ascii_set(&mut op.lhs);
            ascii_set(&mut op.rhs);
        }
    }
}

fn ascii_item(item: &mut ast::ClassSetItem) {
    match *item {
        ast::ClassSetItem::Perl(ref perl) => {
            *item = ast::ClassSetItem::Ascii(ascii_class(perl));
        }
        ast::ClassSetItem::Bracketed(ref mut class) => {
            ascii_set(&mut class.kind)
        }
        ast::ClassSetItem::Union(ref mut union) => {
            union.items.iter_mut().for_each(ascii_item)
        }
        _ => {}
    }
}

fn ascii_class(perl: &ast::ClassPerl) -> ast::ClassAscii {
    let kind = match perl.kind {
        ast::ClassPerlKind::Digit => ast::ClassAsciiKind::Digit,
        ast::ClassPerlKind::Space => ast::ClassAsciiKind::Space,
        ast::ClassPerlKind::Word => ast::ClassAsciiKind::Word,
    };
    ast::ClassAscii { span: perl.span, kind, negated: perl.negated }
}

/// Turns a syntax error into a one line message, dropping the pattern
/// excerpt that `regex-syntax` prints alongside it.
fn syntax_message(err: &regex_syntax::Error) -> String {
    match *err {
        regex_syntax::Error::Parse(ref err) => format!(
            "Parse error at index {}: {}.",
            err.span().start.offset,
            err.kind()
        ),
        regex_syntax::Error::Translate(ref err) => format!(
            "Parse error at index {}: {}.",
            err.span().start.offset,
            err.kind()
        ),
        ref err => format!("Parse error: {}.", err),
    }
}

unsafe fn read_pattern<'a>(
    expression: *const c_char,
) -> Result<&'a str, &'static str> {
    if expression.is_null() {
        return Err("Invalid parameter: expression is NULL.");
    }
    CStr::from_ptr(expression)
        .to_str()
        .map_err(|_| "Expression is not valid UTF-8.")
}

fn new_compile_error(message: &str, expression: c_int) -> *mut RawCompileError {
    let message = CString::new(message).unwrap_or_default().into_raw();
    Box::into_raw(Box::new(RawCompileError { message, expression }))
}

fn base_share(capacity: usize) -> usize {
    mem::size_of::<Scratch>() + capacity * mem::size_of::<Event>()
}

unsafe fn database<'a>(db: *const RawDatabase) -> Option<&'a Database> {
    if db.is_null() {
        return None;
    }
    // Both handle kinds start with their magic number.
    if *db.cast::<u32>() != DATABASE_MAGIC {
        return None;
    }
    let db = &*db.cast::<Database>();
    debug_assert!(db.mode & !MODE_GROUPS == 0);
    Some(db)
}

unsafe fn scratch_ref<'a>(scratch: *const RawScratch) -> Option<&'a Scratch> {
    if scratch.is_null() {
        return None;
    }
    if *scratch.cast::<u32>() != SCRATCH_MAGIC {
        return None;
    }
    Some(&*scratch.cast::<Scratch>())
}
