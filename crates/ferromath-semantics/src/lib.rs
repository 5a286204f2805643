//! Semantic validation of parsed LaTeX math.
//!
//! The analyzer never fails. It walks a fully parsed tree and collects
//! [`SemanticError`]s for mathematically unsound literals: division by zero,
//! negative square roots, logarithms of non-positive numbers and assignments
//! to a number.
//!
//! ```
//! let errors = ferromath_semantics::analyze_source("1/0").unwrap();
//! assert_eq!(errors[0].to_string(), "1:3: Division by zero");
//! ```

use ferromath_syntax::{Parse, ParseError};
use serde::Serialize;
use thiserror::Error;

pub mod analysis;
pub mod validators;

pub use analysis::SemanticAnalyzer;
pub use validators::Validator;

/// The kind of a semantic diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticErrorKind {
    #[error("Invalid number value")]
    InvalidNumber,
    #[error("Cannot assign to a literal value")]
    LiteralAssignment,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Square root of negative number (requires complex numbers)")]
    NegativeSquareRoot,
    #[error("Logarithm of non-positive number is undefined")]
    LogarithmOfNonPositive,
    #[error("Logarithm of negative number is undefined")]
    LogarithmOfNegative,
}

/// A non-fatal diagnostic at a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{line}:{column}: {kind}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub line: u32,
    pub column: u32,
}

impl SemanticError {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Runs a fresh [`SemanticAnalyzer`] over `parse`.
pub fn analyze(parse: &Parse<'_>) -> Vec<SemanticError> {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.analyze(parse);
    analyzer.into_errors()
}

/// Tokenizes, parses and analyzes `input`. A parse error aborts before analysis.
pub fn analyze_source(input: &str) -> Result<Vec<SemanticError>, ParseError> {
    let parse = ferromath_syntax::parse_str(input)?;
    Ok(analyze(&parse))
}
