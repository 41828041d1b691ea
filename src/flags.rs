// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{fmt, iter::FromIterator, ops, str::FromStr};

use crate::{
    engine::{self, Variant},
    error::Error,
};

/// A single option that changes how an expression is compiled or how its
/// matches are reported.
///
/// Most flags map to one bit of the engine's flag word. `ExtractMatched` is
/// handled entirely by this crate and never reaches the engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Flag {
    /// Match case insensitively.
    Caseless,
    /// Let `.` match line terminators.
    DotAll,
    /// Let `^` and `$` match at the start and end of lines.
    MultiLine,
    /// Report at most one match for the expression per scan.
    SingleMatch,
    /// Permit expressions that can match the empty string. Base variant only.
    AllowEmpty,
    /// Treat the expression and the input as UTF-8.
    Utf8,
    /// Use Unicode semantics for character classes.
    Ucp,
    /// Compile in prefiltering mode. Base variant only.
    Prefilter,
    /// Track the leftmost start of each match. Base variant only.
    SomLeftmost,
    /// Copy the matched text into each [`Match`](crate::Match).
    ExtractMatched,
}

const ALL: [Flag; 10] = [
    Flag::Caseless,
    Flag::DotAll,
    Flag::MultiLine,
    Flag::SingleMatch,
    Flag::AllowEmpty,
    Flag::Utf8,
    Flag::Ucp,
    Flag::Prefilter,
    Flag::SomLeftmost,
    Flag::ExtractMatched,
];

impl Flag {
    /// Returns the bit this flag sets in the flag word of `variant`.
    ///
    /// This returns `None` when the variant doesn't recognize the flag and
    /// `Some(0)` for flags that never reach the engine.
    pub fn bits(self, variant: Variant) -> Option<u32> {
        let bits = match self {
            Flag::Caseless => engine::FLAG_CASELESS,
            Flag::DotAll => engine::FLAG_DOTALL,
            Flag::MultiLine => engine::FLAG_MULTILINE,
            Flag::SingleMatch => engine::FLAG_SINGLEMATCH,
            Flag::AllowEmpty => engine::FLAG_ALLOWEMPTY,
            Flag::Utf8 => engine::FLAG_UTF8,
            Flag::Ucp => engine::FLAG_UCP,
            Flag::Prefilter => engine::FLAG_PREFILTER,
            Flag::SomLeftmost => engine::FLAG_SOM_LEFTMOST,
            Flag::ExtractMatched => return Some(0),
        };
        if bits & variant.known_flags() == 0 {
            return None;
        }
        Some(bits)
    }

    /// The name used to refer to this flag on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Flag::Caseless => "caseless",
            Flag::DotAll => "dotall",
            Flag::MultiLine => "multiline",
            Flag::SingleMatch => "single-match",
            Flag::AllowEmpty => "allow-empty",
            Flag::Utf8 => "utf8",
            Flag::Ucp => "ucp",
            Flag::Prefilter => "prefilter",
            Flag::SomLeftmost => "som-leftmost",
            Flag::ExtractMatched => "extract-matched",
        }
    }

    fn mask(self) -> u16 {
        1 << (self as u16)
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Flag, Error> {
        ALL.iter().copied().find(|f| f.name() == s).ok_or_else(|| {
            Error::invalid(format!("unrecognized flag '{}'", s))
        })
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`Flag`]s.
///
/// A set is built with `|`, from an iterator or one flag at a time:
///
/// ```
/// use hsmatch::{Flag, Flags};
///
/// let flags = Flag::Caseless | Flag::Utf8;
/// assert!(flags.contains(Flag::Utf8));
/// assert!(!flags.contains(Flag::SingleMatch));
/// assert_eq!(flags, [Flag::Utf8, Flag::Caseless].iter().copied().collect::<Flags>());
/// ```
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Flags(u16);

impl Flags {
    /// The empty set.
    pub const fn empty() -> Flags {
        Flags(0)
    }

    /// Adds a flag to this set.
    pub fn insert(&mut self, flag: Flag) {
        self.0 |= flag.mask();
    }

    /// Removes a flag from this set.
    pub fn remove(&mut self, flag: Flag) {
        self.0 &= !flag.mask();
    }

    /// Returns true if this set holds `flag`.
    pub fn contains(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Returns true if this set holds no flags.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the flags in this set in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Flag> {
        ALL.iter().copied().filter(move |&f| self.contains(f))
    }

    /// Packs this set into the flag word understood by `variant`.
    ///
    /// Flags handled by this crate contribute no bits. A flag `variant`
    /// doesn't recognize is rejected rather than silently dropped.
    ///
    /// ```
    /// use hsmatch::{engine::Variant, Flag, Flags};
    ///
    /// assert_eq!(0, Flags::empty().encode(Variant::Extended)?);
    /// assert_eq!(33, (Flag::Caseless | Flag::Utf8).encode(Variant::Base)?);
    /// let base_only = Flags::from(Flag::AllowEmpty);
    /// assert!(base_only.encode(Variant::Extended).is_err());
    /// # Ok::<(), hsmatch::Error>(())
    /// ```
    pub fn encode(self, variant: Variant) -> Result<u32, Error> {
        let mut word = 0;
        for flag in self.iter() {
            match flag.bits(variant) {
                Some(bits) => word |= bits,
                None => {
                    return Err(Error::invalid(format!(
                        "flag '{}' is not supported by the {:?} engine",
                        flag, variant,
                    )))
                }
            }
        }
        Ok(word)
    }

    /// Unpacks a flag word produced for `variant`.
    ///
    /// Flags that never reach the engine can't be recovered. Bits that
    /// `variant` doesn't define are an error.
    pub fn decode(variant: Variant, word: u32) -> Result<Flags, Error> {
        let mut flags = Flags::empty();
        let mut rest = word;
        for &flag in ALL.iter() {
            match flag.bits(variant) {
                Some(bits) if bits != 0 && word & bits == bits => {
                    flags.insert(flag);
                    rest &= !bits;
                }
                _ => {}
            }
        }
        if rest != 0 {
            return Err(Error::invalid(format!(
                "unknown flag bits 0x{:x} for the {:?} engine",
                rest, variant,
            )));
        }
        Ok(flags)
    }
}

impl From<Flag> for Flags {
    fn from(flag: Flag) -> Flags {
        let mut flags = Flags::empty();
        flags.insert(flag);
        flags
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(it: I) -> Flags {
        let mut flags = Flags::empty();
        for flag in it {
            flags.insert(flag);
        }
        flags
    }
}

impl Extend<Flag> for Flags {
    fn extend<I: IntoIterator<Item = Flag>>(&mut self, it: I) {
        for flag in it {
            self.insert(flag);
        }
    }
}

impl ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl ops::BitOr<Flag> for Flags {
    type Output = Flags;

    fn bitor(mut self, rhs: Flag) -> Flags {
        self.insert(rhs);
        self
    }
}

impl ops::BitOr for Flag {
    type Output = Flags;

    fn bitor(self, rhs: Flag) -> Flags {
        Flags::from(self) | rhs
    }
}

impl ops::BitOrAssign<Flag> for Flags {
    fn bitor_assign(&mut self, rhs: Flag) {
        self.insert(rhs);
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (i, flag) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{}", flag)?;
        }
        Ok(())
    }
}
