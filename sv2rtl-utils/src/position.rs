//! Source locations attached to design constructs.

use crate::Id;

/// A span in a source file. Lines and columns are one-based.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Deserialize))]
pub struct SourceLoc {
    pub file: Id,
    pub line: u32,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub col: u32,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub end_line: u32,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub end_col: u32,
}

impl SourceLoc {
    pub fn new(file: impl Into<Id>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            line,
            col,
            end_line: line,
            end_col: col,
        }
    }
}

/// Rendered in the `file:line.col-line.col` form used by `src` attributes.
impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end_line = self.end_line.max(self.line);
        write!(
            f,
            "{}:{}.{}-{}.{}",
            self.file, self.line, self.col, end_line, self.end_col
        )
    }
}

/// Constructs that may know where they came from.
pub trait WithLoc {
    fn loc(&self) -> Option<&SourceLoc>;
}
