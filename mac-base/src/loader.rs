//! Program loader.
//!
//! Reads a whole source, tokenizes it with [`Parser`] and fills a
//! [`Program`] in order. A token that is not an integer rejects the
//! whole program.

use std::{fs, io::Read, path::Path};

use thiserror::Error;

use crate::{
    parser::{Parser, ParserError},
    program::Program,
    Word,
};

#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be opened or read.
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] std::io::Error),
    /// The source contains a token that is not a decimal integer.
    #[error("malformed program: {0}")]
    MalformedProgram(#[from] ParserError),
}

/// Loads a program from any readable source.
///
/// ```
/// # use mac_base::loader;
/// let program = loader::load("1 3 1 4 3 0".as_bytes()).unwrap();
/// assert_eq!(program.as_slice(), &[1, 3, 1, 4, 3, 0]);
/// ```
pub fn load(source: impl Read) -> Result<Program, LoadError> {
    load_with(source, |_| {})
}

/// Like [`load`], but calls `on_word` for every value as soon as it is read.
pub fn load_with(
    mut source: impl Read,
    mut on_word: impl FnMut(Word),
) -> Result<Program, LoadError> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;

    let mut program = Program::new();
    for word in Parser::from_bytes(&bytes) {
        let word = word?;
        on_word(word);
        program.push(word);
    }

    Ok(program)
}

/// Opens `path` and loads it with [`load_with`].
pub fn load_file(path: impl AsRef<Path>, on_word: impl FnMut(Word)) -> Result<Program, LoadError> {
    let file = fs::File::open(path)?;
    load_with(file, on_word)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::parser::ParserErrorKind;

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope"))
        }
    }

    #[test]
    fn loads_in_order() {
        let program = load("9 0 5\n10 0\n0\n".as_bytes()).unwrap();

        assert_eq!(program.as_slice(), &[9, 0, 5, 10, 0, 0]);
        assert_eq!(program.len(), 6);
        assert_eq!(program.capacity(), 8);
    }

    #[test]
    fn echoes_every_word() {
        let mut seen = Vec::new();
        let program = load_with("1 2 3 4 5".as_bytes(), |w| seen.push(w)).unwrap();

        assert_eq!(seen, program.as_slice());
    }

    #[test]
    fn empty_source_is_empty_program() {
        let program = load("".as_bytes()).unwrap();

        assert!(program.is_empty());
    }

    #[test]
    fn malformed_token_is_reported() {
        let mut seen = Vec::new();
        let err = load_with("1 2 three 4".as_bytes(), |w| seen.push(w)).unwrap_err();

        let LoadError::MalformedProgram(err) = err else {
            panic!("expected malformed program, got {err:?}");
        };
        assert_eq!(err.kind(), &ParserErrorKind::MalformedToken("three".into()));
        assert_eq!(err.span(), 4..9);
        // words before the bad token were already echoed
        assert_eq!(seen, &[1, 2]);
    }

    #[test]
    fn unreadable_source() {
        let err = load(Broken).unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable(_)));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut seen = Vec::new();
        let err = load_with(&b"1 \xff 0"[..], |w| seen.push(w)).unwrap_err();

        let LoadError::MalformedProgram(err) = err else {
            panic!("expected malformed program, got {err:?}");
        };
        assert_eq!(err.kind(), &ParserErrorKind::MalformedToken("\u{fffd}".into()));
        assert_eq!(err.span(), 2..3);
        assert_eq!(seen, &[1]);
    }

    #[test]
    fn missing_file() {
        let path = std::env::temp_dir().join("mac-base-loader-missing-file.mac");
        let _ = fs::remove_file(&path);

        let err = load_file(&path, |_| {}).unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable(_)));
    }
}
