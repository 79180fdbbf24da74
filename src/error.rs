//! Error types for the IR core

use thiserror::Error;

/// Errors produced while tokenizing, parsing, or constructing IR
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Syntax error encountered by the tokenizer
    ///
    /// Carries the 1-indexed line number where the unexpected input was
    /// found. All tokenizer-level failures (unexpected token, unexpected end
    /// of input, reading a delimiter or reserved word as an identifier) use
    /// this variant.
    #[error("Syntax error on line {line}: {message}")]
    Syntax {
        /// Line number where the error occurred
        line: usize,
        /// Error description
        message: String,
    },

    /// Structural parse error without a useful line position
    ///
    /// Used for failures above the token level: conflicting types for one
    /// variable name, duplicate struct/field/label names in the input text,
    /// or an unmatched raw-region delimiter.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Two function definitions share a name
    #[error("Duplicate function name: {0}")]
    DuplicateFunction(String),

    /// The verifier rejected the program
    ///
    /// The payload is the full multi-line report, one line per offense.
    /// Program construction never returns a partially built program: either
    /// verification passes or this error carries everything that is wrong.
    #[error("Malformed program:\n{0}")]
    Malformed(String),
}

/// Result type for IR operations
pub type Result<T> = std::result::Result<T, Error>;
