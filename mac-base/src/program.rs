//! Program store.
//!
//! Flat sequence of words: every opcode cell is directly followed by its
//! operand cells. The store grows by doubling its capacity, starting from
//! [`DEFAULT_CAPACITY`].

use crate::Word;

/// Initial capacity of a freshly created store.
pub const DEFAULT_CAPACITY: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    cells: Vec<Word>,
    capacity: usize,
}

impl Program {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            cells: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a word, doubling the capacity first if the store is full.
    pub fn push(&mut self, word: Word) {
        if self.cells.len() >= self.capacity {
            self.capacity *= 2;
            self.cells.reserve_exact(self.capacity - self.cells.len());
        }
        self.cells.push(word);
    }

    /// Count of valid cells.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Logical capacity: [`DEFAULT_CAPACITY`] doubled once per growth.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn get(&self, idx: usize) -> Option<Word> {
        self.cells.get(idx).copied()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Word> for Program {
    fn from_iter<T: IntoIterator<Item = Word>>(iter: T) -> Self {
        let mut program = Self::new();
        for word in iter {
            program.push(word);
        }
        program
    }
}

impl From<&[Word]> for Program {
    fn from(words: &[Word]) -> Self {
        words.iter().copied().collect()
    }
}
