use crate::registry::CommandInfo;
use rowan::TextRange;
use serde::Serialize;

/// The lexical category of a [`Token`].
///
/// Commands that the registry recognizes may carry a more specific kind than
/// [`TokenKind::Command`], e.g. `\leq` lexes as [`TokenKind::LessEqual`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Number,
    Identifier,
    Command,
    Symbol,

    // Grouping
    BraceOpen,
    BraceClose,
    EscapedBraceOpen,  // \{
    EscapedBraceClose, // \}
    BracketOpen,
    BracketClose,
    ParenOpen,
    ParenClose,
    DisplayMathOpen,  // \[
    DisplayMathClose, // \]
    InlineMathOpen,   // \(
    InlineMathClose,  // \)

    // Operators
    Plus,
    Minus,
    PlusMinus,
    MinusPlus,
    Star,
    Slash,
    Caret,
    Subscript,
    Superscript,
    Dollar,
    Alignment,
    Punctuation,
    Spacing,
    Newline,
    Equal,
    Factorial,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    NotEqual,

    // Structural commands
    LeftWrap,
    RightWrap,
    EnvBegin,
    EnvEnd,

    EndOfFile,
    Invalid,
    Unknown,
}

impl TokenKind {
    /// Returns true for kinds that open a new operand under implicit multiplication.
    pub fn starts_factor(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::Identifier
                | TokenKind::Command
                | TokenKind::Symbol
                | TokenKind::Unknown
                | TokenKind::ParenOpen
                | TokenKind::BraceOpen
                | TokenKind::EscapedBraceOpen
                | TokenKind::Spacing
                | TokenKind::LeftWrap
                | TokenKind::EnvBegin
        )
    }
}

/// A single lexeme borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Token<'src> {
    pub text: &'src str,
    /// Registry metadata, present only for recognized commands.
    pub info: Option<&'static CommandInfo>,
    pub kind: TokenKind,
    /// 1-based line of the first character.
    pub line: u32,
    /// 1-based column of the first character.
    pub column: u32,
    #[serde(skip)]
    pub range: TextRange,
}

impl<'src> Token<'src> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EndOfFile
    }
}
