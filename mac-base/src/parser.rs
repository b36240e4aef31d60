//! Program text tokenizer.
//!
//! A program is plain text made of decimal integers separated by any ASCII
//! whitespace. There is no header and no instruction delimiter.
//!
//! # Examples
//!
//! ```
//! # use mac_base::parser::{Parser, ParserError};
//! let words: Result<Vec<i64>, ParserError> = Parser::new("1 3\n1 -4\n3\n0")
//!     .into_iter() // -> ParserIter
//!     .collect();
//!
//! assert_eq!(words.unwrap(), &[1, 3, 1, -4, 3, 0]);
//! ```

use core::fmt;
use core::num::IntErrorKind;

use crate::Word;

/// Basic tokenizer. Can be turned into an iterator using [`Parser::into_iter`].
pub struct Parser<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Parser<'a> {
    pub fn new(buffer: &'a str) -> Self {
        Self::from_bytes(buffer.as_bytes())
    }

    /// Tokenizes raw bytes. A token that is not valid UTF-8 is reported as
    /// malformed, the tokens before it are still returned.
    pub fn from_bytes(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Parses and returns the next word. If the input is exhausted returns
    /// [`ParserErrorKind::EOF`].
    pub fn next_word(&mut self) -> Result<Word, ParserError> {
        let bytes = self.buffer;
        while bytes.get(self.offset).is_some_and(u8::is_ascii_whitespace) {
            self.offset += 1;
        }

        let start = self.offset;
        if start == bytes.len() {
            return Err(ParserError {
                kind: ParserErrorKind::EOF,
                start,
                offset: start,
            });
        }

        while bytes.get(self.offset).is_some_and(|b| !b.is_ascii_whitespace()) {
            self.offset += 1;
        }

        let Ok(token) = core::str::from_utf8(&bytes[start..self.offset]) else {
            return Err(ParserError {
                kind: ParserErrorKind::MalformedToken(
                    String::from_utf8_lossy(&bytes[start..self.offset]).into_owned(),
                ),
                start,
                offset: self.offset,
            });
        };
        token.parse::<Word>().map_err(|e| {
            let kind = match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    ParserErrorKind::OutOfRange(token.into())
                }
                _ => ParserErrorKind::MalformedToken(token.into()),
            };
            ParserError {
                kind,
                start,
                offset: self.offset,
            }
        })
    }
}

impl<'a> IntoIterator for Parser<'a> {
    type IntoIter = ParserIter<'a>;
    type Item = <Self::IntoIter as Iterator>::Item;

    fn into_iter(self) -> Self::IntoIter {
        ParserIter(self)
    }
}

/// Iterator wrapper over [`Parser`].
pub struct ParserIter<'a>(Parser<'a>);

impl<'a> ParserIter<'a> {
    pub fn new(parser: Parser<'a>) -> Self {
        Self(parser)
    }
    pub fn parser(self) -> Parser<'a> {
        self.0
    }
}

impl<'a> Iterator for ParserIter<'a> {
    type Item = Result<Word, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.0.next_word() {
            Err(ParserError {
                kind: ParserErrorKind::EOF,
                ..
            }) => None,
            v => Some(v),
        }
    }
}

/// Represents error that may occur while tokenizing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserError {
    kind: ParserErrorKind,
    start: usize,
    offset: usize,
}

impl ParserError {
    pub fn kind(&self) -> &ParserErrorKind {
        &self.kind
    }

    /// Byte range of the offending token.
    pub fn span(&self) -> core::ops::Range<usize> {
        self.start..self.offset
    }
}

impl std::error::Error for ParserError {}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}..{}", self.kind, self.start, self.offset)
    }
}

/// Represents an error kind that may occur while tokenizing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParserErrorKind {
    /// No more tokens
    EOF,
    /// Token is not a decimal integer
    MalformedToken(String),
    /// Token is an integer that does not fit into a [`Word`]
    OutOfRange(String),
}

impl fmt::Display for ParserErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserErrorKind::EOF => write!(f, "end of file"),
            ParserErrorKind::MalformedToken(t) => write!(f, "malformed token `{t}`"),
            ParserErrorKind::OutOfRange(t) => write!(f, "integer `{t}` out of range"),
        }
    }
}
