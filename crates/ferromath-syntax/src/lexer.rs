use crate::registry;
use crate::token::{Token, TokenKind};
use log::{debug, trace};
use rowan::{TextRange, TextSize};

/// A lexer for LaTeX math source.
///
/// ## Overview
///
/// The lexer performs **byte-level dispatch** over the source: the current
/// byte indexes a 256-entry table that selects how the next token is scanned.
/// It produces [`Token`]s that borrow their text from the input:
///
/// - **Numbers**: `42`, `3.14` (at most one decimal point, no exponent)
/// - **Identifiers**: a single ASCII letter, so `xy` is two tokens
/// - **Commands**: `\frac` (backslash + letters) or `\{` (backslash + one character),
///   resolved against the [command registry](crate::registry)
/// - **Operators**: `+ - * / ^ _ = & !` and the two-character `<= >= !=`
/// - **Comments**: `%` through end of line, skipped
/// - **Paragraph breaks**: a line break followed by a blank line lexes as
///   [`TokenKind::Newline`]; any other whitespace is skipped
///
/// ## Error Handling
///
/// Lexing is total. Bytes with no meaning in math mode become
/// [`TokenKind::Invalid`] tokens and unregistered commands become
/// [`TokenKind::Unknown`]; the parser decides what to do with them.
///
/// ## Positions
///
/// Every token records the 1-based line and column of its first character.
/// Columns count characters, not bytes. The byte range is kept alongside for
/// slicing back into the source.
///
/// ## Examples
///
/// ```
/// use ferromath_syntax::lexer::Lexer;
/// use ferromath_syntax::TokenKind;
///
/// let kinds: Vec<_> = Lexer::new(r"\frac{a}{2}").map(|t| t.kind).collect();
///
/// assert_eq!(kinds[0], TokenKind::Command);   // \frac
/// assert_eq!(kinds[1], TokenKind::BraceOpen); // {
/// assert_eq!(kinds[2], TokenKind::Identifier); // a
/// ```
pub struct Lexer<'src> {
    /// The input source text being lexed.
    input: &'src str,
    /// Current byte position in the input.
    position: usize,
    line: u32,
    column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteClass {
    Digit,
    Letter,
    Backslash,
    /// A byte that always forms a token of its own.
    Single(TokenKind),
    /// A byte that may combine with a following `=`.
    Compare(TokenKind, TokenKind),
    Whitespace,
    LineBreak,
    Comment,
    Invalid,
}

const fn build_dispatch() -> [ByteClass; 256] {
    let mut table = [ByteClass::Invalid; 256];
    let mut i = 0;
    while i < 256 {
        let byte = i as u8;
        table[i] = if byte.is_ascii_digit() {
            ByteClass::Digit
        } else if byte.is_ascii_alphabetic() {
            ByteClass::Letter
        } else {
            match byte {
                b'\\' => ByteClass::Backslash,
                b'{' => ByteClass::Single(TokenKind::BraceOpen),
                b'}' => ByteClass::Single(TokenKind::BraceClose),
                b'[' => ByteClass::Single(TokenKind::BracketOpen),
                b']' => ByteClass::Single(TokenKind::BracketClose),
                b'(' => ByteClass::Single(TokenKind::ParenOpen),
                b')' => ByteClass::Single(TokenKind::ParenClose),
                b'+' => ByteClass::Single(TokenKind::Plus),
                b'-' => ByteClass::Single(TokenKind::Minus),
                b'*' => ByteClass::Single(TokenKind::Star),
                b'/' => ByteClass::Single(TokenKind::Slash),
                b'^' => ByteClass::Single(TokenKind::Caret),
                b'_' => ByteClass::Single(TokenKind::Subscript),
                b'$' => ByteClass::Single(TokenKind::Dollar),
                b'&' => ByteClass::Single(TokenKind::Alignment),
                b'=' => ByteClass::Single(TokenKind::Equal),
                b'~' => ByteClass::Single(TokenKind::Spacing),
                b',' | b';' | b':' | b'.' | b'|' | b'\'' | b'?' => {
                    ByteClass::Single(TokenKind::Punctuation)
                }
                b'<' => ByteClass::Compare(TokenKind::Less, TokenKind::LessEqual),
                b'>' => ByteClass::Compare(TokenKind::Greater, TokenKind::GreaterEqual),
                b'!' => ByteClass::Compare(TokenKind::Factorial, TokenKind::NotEqual),
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => ByteClass::Whitespace,
                b'\n' => ByteClass::LineBreak,
                b'%' => ByteClass::Comment,
                _ => ByteClass::Invalid,
            }
        };
        i += 1;
    }
    table
}

static DISPATCH: [ByteClass; 256] = build_dispatch();

impl<'src> Lexer<'src> {
    /// Creates a new `Lexer` for the given input string.
    pub fn new(input: &'src str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Returns the next token, or an [`TokenKind::EndOfFile`] token once the
    /// input is exhausted. Calling it again after the end keeps returning EOF.
    pub fn next_token(&mut self) -> Token<'src> {
        loop {
            let Some(&byte) = self.input.as_bytes().get(self.position) else {
                return self.token_from(self.position, self.line, self.column, TokenKind::EndOfFile);
            };

            let (start, line, column) = (self.position, self.line, self.column);
            match DISPATCH[usize::from(byte)] {
                ByteClass::Digit => return self.lex_number(),
                ByteClass::Letter => {
                    self.bump();
                    return self.token_from(start, line, column, TokenKind::Identifier);
                }
                ByteClass::Backslash => return self.lex_command(),
                ByteClass::Single(kind) => {
                    self.bump();
                    return self.token_from(start, line, column, kind);
                }
                ByteClass::Compare(single, with_equal) => {
                    self.bump();
                    let kind = if self.peek_byte() == Some(b'=') {
                        self.bump();
                        with_equal
                    } else {
                        single
                    };
                    return self.token_from(start, line, column, kind);
                }
                ByteClass::Whitespace => {
                    self.bump();
                }
                ByteClass::LineBreak => {
                    if self.at_paragraph_break() {
                        self.eat_while(|c| c.is_ascii_whitespace());
                        return self.token_from(start, line, column, TokenKind::Newline);
                    }
                    self.bump();
                }
                ByteClass::Comment => {
                    self.eat_while(|c| c != '\n');
                }
                ByteClass::Invalid => {
                    self.bump();
                    return self.token_from(start, line, column, TokenKind::Invalid);
                }
            }
        }
    }

    fn lex_number(&mut self) -> Token<'src> {
        let (start, line, column) = (self.position, self.line, self.column);
        self.eat_while(|c| c.is_ascii_digit());

        // A single fractional part, only when a digit follows the dot
        let bytes = self.input.as_bytes();
        if bytes.get(self.position) == Some(&b'.')
            && bytes.get(self.position + 1).is_some_and(u8::is_ascii_digit)
        {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }

        self.token_from(start, line, column, TokenKind::Number)
    }

    fn lex_command(&mut self) -> Token<'src> {
        let (start, line, column) = (self.position, self.line, self.column);
        self.bump(); // Consume '\'

        match self.peek_char() {
            // Named command: \frac
            Some(c) if c.is_ascii_alphabetic() => self.eat_while(|c| c.is_ascii_alphabetic()),
            // Short escape: \{ or \\
            Some(_) => self.bump(),
            None => {}
        }

        let mut token = self.token_from(start, line, column, TokenKind::Unknown);
        match registry::find(token.text) {
            Some(info) => {
                token.kind = info.token_override.unwrap_or(TokenKind::Command);
                token.info = Some(info);
            }
            None => trace!("unregistered command {} at {}:{}", token.text, line, column),
        }
        token
    }

    /// True when the line break at the cursor is followed by a blank line.
    fn at_paragraph_break(&self) -> bool {
        self.input[self.position + 1..]
            .bytes()
            .find(|b| !matches!(b, b' ' | b'\t' | b'\r'))
            == Some(b'\n')
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Advances past one character, keeping line and column current.
    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.position += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if !predicate(c) {
                break;
            }
            self.bump();
        }
    }

    fn token_from(&self, start: usize, line: u32, column: u32, kind: TokenKind) -> Token<'src> {
        Token {
            text: &self.input[start..self.position],
            info: None,
            kind,
            line,
            column,
            range: TextRange::new(
                TextSize::from(start as u32),
                TextSize::from(self.position as u32),
            ),
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.is_eof() { None } else { Some(token) }
    }
}

/// Tokenizes `input` completely.
///
/// The returned vector always ends with exactly one
/// [`TokenKind::EndOfFile`] token, so `tokenize("")` has length one.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::with_capacity(input.len() / 2 + 1);
    loop {
        let token = lexer.next_token();
        let done = token.is_eof();
        tokens.push(token);
        if done {
            break;
        }
    }
    debug!("tokenized {} bytes into {} tokens", input.len(), tokens.len());
    tokens
}
