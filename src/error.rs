//! Error types
//!
//! One enum per concern. Parse and compile errors carry enough context to
//! point at the failing fragment or character offset.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed flat expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unmatched ')' at offset {offset}")]
    UnmatchedClose { offset: usize },

    #[error("unclosed '(' at offset {offset}")]
    UnclosedGroup { offset: usize },

    #[error("unclosed '[' at offset {offset}")]
    UnclosedHeader { offset: usize },

    #[error("stray ']' at offset {offset}")]
    StrayHeaderClose { offset: usize },

    #[error("invalid fragment id '{text}' at offset {offset}")]
    InvalidId { text: String, offset: usize },

    #[error("empty kind in header at offset {offset}")]
    EmptyKind { offset: usize },

    #[error("group at offset {offset} has no fragment to attach to")]
    OrphanGroup { offset: usize },

    #[error("empty fragment at offset {offset}")]
    EmptyItem { offset: usize },

    #[error("unexpected '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

impl SyntaxError {
    /// Byte offset of the offending character
    pub fn offset(&self) -> usize {
        match self {
            SyntaxError::UnmatchedClose { offset }
            | SyntaxError::UnclosedGroup { offset }
            | SyntaxError::UnclosedHeader { offset }
            | SyntaxError::StrayHeaderClose { offset }
            | SyntaxError::InvalidId { offset, .. }
            | SyntaxError::EmptyKind { offset }
            | SyntaxError::OrphanGroup { offset }
            | SyntaxError::EmptyItem { offset }
            | SyntaxError::UnexpectedChar { offset, .. } => *offset,
        }
    }
}

/// Fragment levels that do not describe a valid hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("fragment {id} jumps from level {previous} to level {level}")]
    LevelJump { id: u32, previous: u32, level: u32 },

    #[error("fragment {id} has level 0; levels start at 1")]
    ZeroLevel { id: u32 },

    #[error("fragment id {id} is used more than once")]
    DuplicateId { id: u32 },
}

/// Non-numeric field in a table row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} '{value}': expected a non-negative integer")]
pub struct FormatError {
    pub field: &'static str,
    pub value: String,
}

/// Failure to build an executable query from fragments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("fragment {id}: unknown relation kind '{kind}'")]
    UnknownKind { id: u32, kind: String },

    #[error(transparent)]
    Structure(#[from] StructureError),
}

/// The matching primitive rejected a query
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("empty query")]
    Empty,

    #[error("query syntax: {0}")]
    Syntax(#[from] Box<pest::error::Error<crate::query::Rule>>),

    #[error("invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("capture label '{0}' is used more than once")]
    DuplicateLabel(String),
}

/// Failure while reading bracketed trees
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tree parse error at line {line_num}: {message}")]
pub struct TreeParseError {
    pub line_num: usize,
    pub message: String,
}

/// Corpus loading failure for one file
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: TreeParseError,
    },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Rule repository failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("rule index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("IO error for rules file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rules document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure turning scratchpad text into a rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScratchpadError {
    #[error("pattern expression: {0}")]
    Pattern(#[source] SyntaxError),

    #[error("question template expression: {0}")]
    Question(#[source] SyntaxError),

    #[error("answer template expression: {0}")]
    Answer(#[source] SyntaxError),

    #[error(transparent)]
    Structure(#[from] StructureError),
}

/// Search could not be started
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no pattern")]
    NoPattern,

    #[error("no data selected")]
    NoData,

    #[error(transparent)]
    Scratchpad(#[from] ScratchpadError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("bad pattern: {0}")]
    Pattern(#[from] PatternError),
}
