use crate::token::Token;
use rowan::TextRange;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Subscript,
    Superscript,
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptKind::Subscript => f.write_str("subscript"),
            ScriptKind::Superscript => f.write_str("superscript"),
        }
    }
}

/// What went wrong during a parse.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseErrorKind {
    #[error("expected {expected}, found `{found}`")]
    UnexpectedToken { expected: String, found: String },
    #[error("expected {expected}, found end of input")]
    UnexpectedEof { expected: String },
    #[error("invalid character `{text}`")]
    InvalidCharacter { text: String },
    #[error("command `{command}` expects {expected} argument(s), found {found}")]
    ArityMismatch {
        command: String,
        expected: usize,
        found: usize,
    },
    #[error("missing \\right for \\left opened at line {line}, column {column}")]
    MissingRight { line: u32, column: u32 },
    #[error("environment `{open}` closed by \\end{{{close}}}")]
    MismatchedEnvironment { open: String, close: String },
    #[error("environment `{name}` is never closed")]
    UnclosedEnvironment { name: String },
    #[error("double {script}")]
    DuplicateScript { script: ScriptKind },
    #[error("command `{command}` does not take a {script}")]
    ScriptNotAllowed { command: String, script: ScriptKind },
    #[error("malformed number `{text}`")]
    InvalidNumber { text: String },
    #[error("nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
}

/// A fatal syntax error with the position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{line}:{column}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: u32,
    pub column: u32,
    #[serde(skip)]
    pub range: TextRange,
}

impl ParseError {
    pub fn at(token: &Token<'_>, kind: ParseErrorKind) -> Self {
        Self {
            kind,
            line: token.line,
            column: token.column,
            range: token.range,
        }
    }

    /// The error description without its position prefix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
