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
Translation of byte offsets in UTF-8 encoded text to character offsets.

The engine reports matches as byte offsets into the UTF-8 encoding of the
haystack, while callers of this crate see offsets counted in code points. An
[`OffsetMap`] is built once per scanned text and translates every event of
that scan.
*/

use std::cmp;

/// A mapping from every byte of a text's UTF-8 encoding to the index of the
/// code point that byte belongs to.
#[derive(Clone, Debug)]
pub(crate) struct OffsetMap {
    repr: Repr,
}

#[derive(Clone, Debug)]
enum Repr {
    /// Every byte is its own code point, so offsets translate to themselves.
    Ascii { len: usize },
    Mapped {
        /// One entry per byte, holding the index of its code point.
        chars: Vec<usize>,
        /// One entry per code point, holding its first byte, followed by
        /// the length of the text.
        starts: Vec<usize>,
    },
}

impl OffsetMap {
    pub(crate) fn new(text: &str) -> OffsetMap {
        if text.is_ascii() {
            return OffsetMap { repr: Repr::Ascii { len: text.len() } };
        }
        let mut chars = Vec::with_capacity(text.len());
        let mut starts = Vec::with_capacity(text.len() + 1);
        for (i, (at, c)) in text.char_indices().enumerate() {
            starts.push(at);
            let len = encoded_len(c);
            debug_assert_eq!(c.len_utf8(), len);
            chars.extend(std::iter::repeat(i).take(len));
        }
        starts.push(text.len());
        debug_assert_eq!(text.len(), chars.len());
        OffsetMap { repr: Repr::Mapped { chars, starts } }
    }

    /// The length in bytes of the mapped text.
    pub(crate) fn len(&self) -> usize {
        match self.repr {
            Repr::Ascii { len } => len,
            Repr::Mapped { ref chars, .. } => chars.len(),
        }
    }

    /// The number of code points in the mapped text.
    pub(crate) fn char_len(&self) -> usize {
        match self.repr {
            Repr::Ascii { len } => len,
            Repr::Mapped { ref starts, .. } => starts.len() - 1,
        }
    }

    /// Returns the index of the code point containing byte `at`.
    ///
    /// An offset at or past the end of the text maps to the number of code
    /// points, i.e., one past the last code point.
    pub(crate) fn char_at(&self, at: usize) -> usize {
        match self.repr {
            Repr::Ascii { len } => cmp::min(at, len),
            Repr::Mapped { ref chars, .. } => {
                chars.get(at).copied().unwrap_or_else(|| self.char_len())
            }
        }
    }

    /// Translates a match over bytes `[from, to)` to a half open range of
    /// code points.
    ///
    /// The end is one past the code point holding the last matched byte.
    /// Empty matches have no last byte, so `to` is raised to at least 1
    /// first. An empty match at offset 0 of a non-empty text therefore
    /// ends at code point 1. The end never exceeds the number of code
    /// points, which keeps empty matches on empty text in bounds.
    pub(crate) fn span(&self, from: usize, to: usize) -> (usize, usize) {
        let start = self.char_at(from);
        let last = cmp::max(to, 1) - 1;
        let end = cmp::min(self.char_at(last) + 1, self.char_len());
        (cmp::min(start, end), end)
    }

    /// Returns the code points `[start, end)` of `text`, which must be the
    /// text this map was built from.
    pub(crate) fn slice<'t>(
        &self,
        text: &'t str,
        start: usize,
        end: usize,
    ) -> &'t str {
        debug_assert_eq!(self.len(), text.len());
        match self.repr {
            Repr::Ascii { .. } => &text[start..end],
            Repr::Mapped { ref starts, .. } => {
                &text[starts[start]..starts[end]]
            }
        }
    }
}

/// Returns the number of bytes needed to encode `c` as UTF-8.
pub(crate) fn encoded_len(c: char) -> usize {
    // A `char` is never a surrogate and never exceeds U+10FFFF, so four
    // bytes always suffice.
    match u32::from(c) {
        0..=0x7F => 1,
        0x80..=0x7FF => 2,
        0x800..=0xFFFF => 3,
        _ => 4,
    }
}
