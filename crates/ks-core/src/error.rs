//! Error types for ks-core

use thiserror::Error;

/// Core error type for Keystone
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Malformed control line
    #[error("[E001] Malformed control line at line {line}: {message}")]
    MalformedLine { line: usize, message: String },

    /// E002: Same (source, target) pair declared twice
    #[error("[E002] Segment \"{src}\" --> \"{target}\" is declared twice")]
    DuplicateSegment { src: String, target: String },

    /// E003: Declared segment has no body block
    #[error("[E003] Block \"{src}\" --> \"{target}\" not found")]
    BlockNotFound { src: String, target: String },

    /// E004: Block opened but never closed
    #[error("[E004] {block} opened at line {line} is never closed")]
    UnterminatedBlock { block: String, line: usize },

    /// E005: Branch does not rejoin a declared version
    #[error("[E005] Rejoin version \"{version}\" of branch \"{branch}\" not found in the definition")]
    BranchRejoinNotFound { branch: String, version: String },

    /// E006: Upgrade file has no definition section
    #[error("[E006] Upgrade file contains no DEFINITION section")]
    MissingDefinition,

    /// E007: No route from the current version to the requested target
    #[error("[E007] No upgrade path found from {current} to \"{target}\"")]
    PathNotFound { current: String, target: String },

    /// E008: Unrecognized transient command
    #[error("[E008] Unknown command at line {line}: {text}")]
    UnknownCommand { text: String, line: usize },

    /// E009: Body block for a segment the definition never declared
    #[error("[E009] Block \"{src}\" --> \"{target}\" at line {line} is not declared in the definition section")]
    UndeclaredBlock {
        src: String,
        target: String,
        line: usize,
    },

    /// E010: Reposition request for a line the source has not visited
    #[error("[E010] Cannot reposition to unvisited line {line}")]
    SeekUnvisited { line: usize },

    /// E011: IO error with file path context
    #[error("[E011] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E012: IO error
    #[error("[E012] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Helper for scan/tokenizer errors tied to a line.
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        CoreError::MalformedLine {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
