use std::ops::Range;

/// Walks the indices of a table of `len` rows `batch_size` at a time, forever.
///
/// Once the cursor reaches the end of the table it goes back to 0, so the last batch of a pass
/// may be shorter than `batch_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialBatcher {
    len: usize,
    batch_size: usize,
    cursor: usize,
}

impl SequentialBatcher {
    pub fn new(len: usize, batch_size: usize) -> SequentialBatcher {
        SequentialBatcher {
            len,
            batch_size,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

impl Iterator for SequentialBatcher {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 || self.batch_size == 0 {
            return None;
        }
        let start = self.cursor;
        let end = (start + self.batch_size).min(self.len);
        self.cursor += self.batch_size;
        if self.cursor >= self.len {
            self.cursor = 0;
        }
        Some(start..end)
    }
}
