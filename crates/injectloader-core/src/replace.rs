//! Sequential in-place text replacement using original offsets.
//!
//! Ranges handed to [`SourceReplacer::replace_in`] are measured against the
//! source text the replacer was created with. The replacer keeps the signed
//! difference between the original and the mutated text so each edit lands in
//! the right place.
//!
//! Edits must arrive in ascending order of their start offset and must not
//! overlap. Both are checked; a rejected edit leaves the text untouched.

use crate::errors::ReplaceError;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct SourceReplacer {
    source: String,
    original_len: usize,
    offset: isize,
    previous_end: usize,
}

impl SourceReplacer {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            original_len: source.len(),
            source,
            offset: 0,
            previous_end: 0,
        }
    }

    /// Replace `index_from..index_to` (original coordinates) with `replacement`
    /// and return the text as it stands after the edit.
    pub fn replace_in(
        &mut self,
        index_from: usize,
        index_to: usize,
        replacement: &str,
    ) -> Result<&str, ReplaceError> {
        if index_from > index_to {
            return Err(ReplaceError::Inverted {
                from: index_from,
                to: index_to,
            });
        }
        if index_from < self.previous_end {
            return Err(ReplaceError::OutOfOrder {
                from: index_from,
                previous_end: self.previous_end,
            });
        }
        if index_to > self.original_len {
            return Err(ReplaceError::OutOfBounds {
                to: index_to,
                len: self.original_len,
            });
        }

        let actual_from = self.shift(index_from);
        let actual_to = self.shift(index_to);
        for offset in [actual_from, actual_to] {
            if !self.source.is_char_boundary(offset) {
                return Err(ReplaceError::NotCharBoundary { offset });
            }
        }

        trace!(
            "Replacing {}..{} (mutated {}..{}) with {} bytes",
            index_from,
            index_to,
            actual_from,
            actual_to,
            replacement.len()
        );

        self.source.replace_range(actual_from..actual_to, replacement);
        self.offset += replacement.len() as isize - (index_to - index_from) as isize;
        self.previous_end = index_to;

        Ok(&self.source)
    }

    /// Accumulated length difference between the mutated and original text
    pub fn offset(&self) -> isize {
        self.offset
    }

    pub fn finish(self) -> String {
        self.source
    }

    fn shift(&self, index: usize) -> usize {
        // previous_end <= index keeps this non-negative
        (index as isize + self.offset) as usize
    }
}
