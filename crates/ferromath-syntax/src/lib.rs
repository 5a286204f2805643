//! Front-end for LaTeX math: a command registry, a byte-dispatch lexer, an
//! arena-backed syntax tree and a precedence-climbing parser.
//!
//! ```
//! use ferromath_syntax::{parse, tokenize};
//!
//! let tokens = tokenize(r"\frac{1}{2} + x");
//! let parsed = parse(&tokens).unwrap();
//! assert!(parsed.root().is_some());
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod token;

#[cfg(test)]
mod coverage_tests;

pub use ast::{Ast, Node, NodeId, NodeKind};
pub use error::{ParseError, ParseErrorKind};
pub use lexer::tokenize;
pub use parser::{Parse, Parser, ParserConfig, parse};
pub use registry::{CommandClass, CommandInfo};
pub use rowan::{TextRange, TextSize};
pub use token::{Token, TokenKind};

/// Tokenizes and parses `input` in one step.
pub fn parse_str(input: &str) -> Result<Parse<'_>, ParseError> {
    parse(&tokenize(input))
}
