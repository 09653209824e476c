use std::fmt;

/// Human readable position in the source, 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn increment_column(&mut self) {
        self.column += 1;
    }

    pub fn increment_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    /// Translate a byte offset into a line and column.
    ///
    /// Columns count characters, not bytes. Offsets past the end of the source map to the
    /// position right after the last character.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut position = Self::default();
        for (ix, ch) in source.char_indices() {
            if ix >= offset {
                break;
            }
            if ch == '\n' {
                position.increment_line();
            } else {
                position.increment_column();
            }
        }
        position
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
