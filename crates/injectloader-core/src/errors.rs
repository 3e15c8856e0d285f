use thiserror::Error;

/// Errors produced while rewriting a module.
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid require pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to load JavaScript grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("Parse error at line {line}, column {column}")]
    Parse { line: usize, column: usize },

    #[error("Source replacement failed: {0}")]
    Replace(#[from] ReplaceError),
}

/// Precondition violations reported by [`crate::replace::SourceReplacer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplaceError {
    #[error("Replacement range {from}..{to} is inverted")]
    Inverted { from: usize, to: usize },

    #[error("Replacement at {from} starts before the previous replacement ended at {previous_end}")]
    OutOfOrder { from: usize, previous_end: usize },

    #[error("Replacement range ends at {to}, past the end of the source ({len})")]
    OutOfBounds { to: usize, len: usize },

    #[error("Replacement offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

pub type Result<T> = std::result::Result<T, InjectError>;
