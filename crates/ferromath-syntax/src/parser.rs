use crate::ast::{
    AssignOperator, Ast, BinaryOperator, GroupDelimiter, NodeId, NodeKind, NodeList,
    UnaryOperator,
};
use crate::error::{ParseError, ParseErrorKind, ScriptKind};
use crate::registry::{CommandClass, CommandInfo};
use crate::token::{Token, TokenKind};
use log::debug;
use rowan::TextRange;
use std::borrow::Cow;

/// Environments whose `\begin{name}` is followed by a column layout such as `{cc}`.
const LAYOUT_ENVIRONMENTS: &[&str] = &[
    "array",
    "subarray",
    "tabular",
    "alignat",
    "alignat*",
    "alignedat",
];

/// Tunables for [`Parser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum syntactic nesting depth. The statement itself is one level,
    /// and every group, argument, script body and prefix sign inside it adds one.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { max_depth: 128 }
    }
}

/// A successfully parsed input: the arena and its root, if the input had any content.
#[derive(Debug)]
pub struct Parse<'src> {
    ast: Ast<'src>,
    root: Option<NodeId>,
}

impl<'src> Parse<'src> {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn ast(&self) -> &Ast<'src> {
        &self.ast
    }

    /// Outline of the whole tree; empty for empty input.
    pub fn debug_tree(&self) -> String {
        self.root
            .map(|root| self.ast.debug_tree(root))
            .unwrap_or_default()
    }
}

/// Precedence-climbing parser over a token slice.
///
/// Binding strength, tightest first: primary, postfix (calls, scripts, `!`,
/// `'`, implicit multiplication), prefix sign, power, term, expression,
/// relational, assignment. Statements are separated by `\\` or blank lines.
/// The first violation aborts the parse.
pub struct Parser<'t, 'src> {
    tokens: &'t [Token<'src>],
    position: usize,
    eof: Token<'src>,
    ast: Ast<'src>,
    config: ParserConfig,
    depth: usize,
    /// Inside an environment `&` separates cells instead of acting as an operator.
    alignment_separates: bool,
    /// Set while parsing an unbraced script body, consumed by the next postfix chain.
    script_body: Option<ScriptKind>,
}

impl<'t, 'src> Parser<'t, 'src> {
    pub fn new(tokens: &'t [Token<'src>]) -> Self {
        Self::with_config(tokens, ParserConfig::default())
    }

    pub fn with_config(tokens: &'t [Token<'src>], config: ParserConfig) -> Self {
        let eof = match tokens.last() {
            Some(last) if last.is_eof() => *last,
            Some(last) => Token {
                text: "",
                info: None,
                kind: TokenKind::EndOfFile,
                line: last.line,
                column: last.column + last.text.chars().count() as u32,
                range: TextRange::empty(last.range.end()),
            },
            None => Token {
                text: "",
                info: None,
                kind: TokenKind::EndOfFile,
                line: 1,
                column: 1,
                range: TextRange::default(),
            },
        };

        Self {
            tokens,
            position: 0,
            eof,
            ast: Ast::with_capacity(tokens.len()),
            config,
            depth: 0,
            alignment_separates: false,
            script_body: None,
        }
    }

    pub fn parse(mut self) -> Result<Parse<'src>, ParseError> {
        match self.parse_root() {
            Ok(root) => {
                debug!("parsed {} tokens into {} nodes", self.tokens.len(), self.ast.len());
                Ok(Parse {
                    ast: self.ast,
                    root,
                })
            }
            Err(err) => {
                debug!("parse failed: {err}");
                Err(err)
            }
        }
    }

    fn parse_root(&mut self) -> Result<Option<NodeId>, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.eat(TokenKind::Newline).is_some() {}
            if self.at(TokenKind::EndOfFile) {
                break;
            }

            statements.push(self.parse_assignment()?);

            match self.peek_kind() {
                TokenKind::Newline => continue,
                TokenKind::EndOfFile => break,
                _ => return Err(self.unexpected("end of statement")),
            }
        }

        Ok(match statements.as_slice() {
            [] => None,
            [single] => Some(*single),
            [first, ..] => {
                let (line, column) = self.position_of(*first);
                let elements = self.ast.alloc_list(&statements);
                Some(self.ast.alloc(NodeKind::Sequence(elements), line, column))
            }
        })
    }

    // Token cursor

    fn current(&self) -> Token<'src> {
        match self.tokens.get(self.position) {
            Some(token) if !token.is_eof() => *token,
            _ => self.eof,
        }
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_punctuation(&self, text: &str) -> bool {
        let token = self.current();
        token.kind == TokenKind::Punctuation && token.text == text
    }

    fn bump(&mut self) -> Token<'src> {
        let token = self.current();
        if !token.is_eof() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token<'src>, ParseError> {
        self.eat(kind).ok_or_else(|| self.unexpected(expected))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        let kind = match token.kind {
            TokenKind::EndOfFile => ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
            TokenKind::Invalid => ParseErrorKind::InvalidCharacter {
                text: token.text.to_string(),
            },
            _ => ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: token.text.to_string(),
            },
        };
        ParseError::at(&token, kind)
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= self.config.max_depth {
            let limit = self.config.max_depth;
            return Err(ParseError::at(
                &self.current(),
                ParseErrorKind::NestingTooDeep { limit },
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // Node helpers

    fn alloc(&mut self, kind: NodeKind<'src>, token: &Token<'src>) -> NodeId {
        self.ast.alloc(kind, token.line, token.column)
    }

    fn position_of(&self, id: NodeId) -> (u32, u32) {
        let node = self.ast.get(id);
        (node.line, node.column)
    }

    fn group(&mut self, delimiter: GroupDelimiter, items: &[NodeId], token: &Token<'src>) -> NodeId {
        let elements = self.ast.alloc_list(items);
        self.alloc(NodeKind::Group { delimiter, elements }, token)
    }

    /// An empty operand standing in for something the source left out.
    fn placeholder(&mut self, token: &Token<'src>) -> NodeId {
        self.group(GroupDelimiter::Implicit, &[], token)
    }

    // Grammar

    fn parse_assignment(&mut self) -> Result<NodeId, ParseError> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current();
        let target = if self.assignment_operator().is_some() {
            // `= x` with nothing before it
            self.placeholder(&start)
        } else {
            self.parse_relational()?
        };

        let Some(op) = self.assignment_operator() else {
            return Ok(target);
        };
        self.bump();

        let value = self.parse_assignment()?;
        let (line, column) = self.position_of(target);
        Ok(self.ast.alloc(NodeKind::Assign { op, target, value }, line, column))
    }

    fn assignment_operator(&self) -> Option<AssignOperator> {
        match self.peek_kind() {
            TokenKind::Equal => Some(AssignOperator::Equal),
            TokenKind::Alignment if !self.alignment_separates => Some(AssignOperator::Align),
            _ => None,
        }
    }

    fn parse_relational(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_expression()?;
        while let Some(op) = self.relational_operator() {
            let token = self.bump();
            let right = self.parse_expression()?;
            left = self.alloc(NodeKind::BinaryOp { op, left, right }, &token);
        }
        Ok(left)
    }

    fn relational_operator(&self) -> Option<BinaryOperator> {
        let token = self.current();
        match token.kind {
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
            TokenKind::Command => token
                .info
                .filter(|info| info.class == CommandClass::Relation)
                .map(|info| BinaryOperator::Relation(info.name)),
            _ => None,
        }
    }

    fn parse_expression(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                TokenKind::PlusMinus => BinaryOperator::PlusMinus,
                TokenKind::MinusPlus => BinaryOperator::MinusPlus,
                _ => return Ok(left),
            };
            let token = self.bump();
            let right = self.parse_term()?;
            left = self.alloc(NodeKind::BinaryOp { op, left, right }, &token);
        }
    }

    fn parse_term(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => return Ok(left),
            };
            let token = self.bump();
            let right = self.parse_power()?;
            left = self.alloc(NodeKind::BinaryOp { op, left, right }, &token);
        }
    }

    /// Only reached by `^` that the postfix tier declined, i.e. after a
    /// command that does not take superscripts.
    fn parse_power(&mut self) -> Result<NodeId, ParseError> {
        let base = self.parse_prefix()?;
        if !matches!(self.peek_kind(), TokenKind::Caret | TokenKind::Superscript) {
            return Ok(base);
        }
        let token = self.bump();
        let exponent = self.nested(Self::parse_power)?;
        Ok(self.alloc(
            NodeKind::BinaryOp {
                op: BinaryOperator::Power,
                left: base,
                right: exponent,
            },
            &token,
        ))
    }

    fn parse_prefix(&mut self) -> Result<NodeId, ParseError> {
        match self.unary_sign() {
            Some(op) => {
                let token = self.bump();
                let operand = self.nested(Self::parse_prefix)?;
                Ok(self.alloc(NodeKind::UnaryOp { op, operand }, &token))
            }
            None => self.parse_postfix(),
        }
    }

    fn unary_sign(&self) -> Option<UnaryOperator> {
        match self.peek_kind() {
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            _ => None,
        }
    }

    fn parse_postfix(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_postfix_chain()?;
        while self.starts_implicit_factor() {
            let token = self.current();
            let right = self.parse_postfix_chain()?;
            left = self.alloc(
                NodeKind::BinaryOp {
                    op: BinaryOperator::Multiply,
                    left,
                    right,
                },
                &token,
            );
        }
        Ok(left)
    }

    fn starts_implicit_factor(&self) -> bool {
        let token = self.current();
        token.kind.starts_factor() && !is_relation(&token)
    }

    /// A primary followed by calls, scripts, `!` and `'`, without implicit multiplication.
    fn parse_postfix_chain(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current();
        let script_body = self.script_body.take();
        let mut node = self.parse_primary()?;
        let mut callable = match start.kind {
            TokenKind::Identifier | TokenKind::Symbol | TokenKind::Unknown => true,
            TokenKind::Command => matches!(self.ast.kind(node), NodeKind::Symbol(_)),
            _ => false,
        };

        loop {
            match self.peek_kind() {
                TokenKind::ParenOpen if callable => {
                    self.bump();
                    let args = self.parse_comma_list(TokenKind::ParenClose)?;
                    self.expect(TokenKind::ParenClose, "`)`")?;
                    node = self.call(node, &args);
                    callable = false;
                }
                TokenKind::BraceOpen if callable => {
                    let arg = self.parse_braced_argument()?;
                    node = self.call(node, &[arg]);
                    callable = false;
                }
                TokenKind::EscapedBraceOpen if callable => {
                    self.bump();
                    let arg = self.parse_assignment()?;
                    self.expect(TokenKind::EscapedBraceClose, "`\\}`")?;
                    node = self.call(node, &[arg]);
                    callable = false;
                }
                // `x_1_2` is a double subscript, `x^2^3` is `x^{2^3}`
                TokenKind::Subscript if script_body.is_some() => break,
                TokenKind::Caret | TokenKind::Superscript
                    if script_body == Some(ScriptKind::Subscript) =>
                {
                    break;
                }
                TokenKind::Subscript | TokenKind::Caret | TokenKind::Superscript => {
                    match self.parse_scripts(node)? {
                        Some(script) => node = script,
                        None => break,
                    }
                }
                TokenKind::Factorial => {
                    let token = self.bump();
                    node = self.alloc(
                        NodeKind::UnaryOp {
                            op: UnaryOperator::Factorial,
                            operand: node,
                        },
                        &token,
                    );
                    callable = false;
                }
                TokenKind::Punctuation if self.at_punctuation("'") => {
                    let token = self.bump();
                    node = self.alloc(
                        NodeKind::UnaryOp {
                            op: UnaryOperator::Prime,
                            operand: node,
                        },
                        &token,
                    );
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn call(&mut self, callee: NodeId, args: &[NodeId]) -> NodeId {
        let (line, column) = self.position_of(callee);
        let args = self.ast.alloc_list(args);
        self.ast.alloc(NodeKind::FunctionCall { callee, args }, line, column)
    }

    /// Attaches a run of `_`/`^` scripts to `base`.
    ///
    /// Returns `None` without consuming anything when `base` is a command
    /// that does not take a superscript, leaving `^` to the power tier.
    fn parse_scripts(&mut self, base: NodeId) -> Result<Option<NodeId>, ParseError> {
        let info = match self.ast.kind(base) {
            NodeKind::Command { info, .. } => Some(*info),
            _ => None,
        };

        let mut sub = None;
        let mut sup = None;
        loop {
            let token = self.current();
            let script = match token.kind {
                TokenKind::Subscript => ScriptKind::Subscript,
                TokenKind::Caret | TokenKind::Superscript => ScriptKind::Superscript,
                _ => break,
            };

            if let Some(info) = info.filter(|info| !allows(info, script)) {
                if script == ScriptKind::Superscript {
                    break;
                }
                return Err(ParseError::at(
                    &token,
                    ParseErrorKind::ScriptNotAllowed {
                        command: info.name.to_string(),
                        script,
                    },
                ));
            }

            let taken = match script {
                ScriptKind::Subscript => sub.is_some(),
                ScriptKind::Superscript => sup.is_some(),
            };
            if taken {
                return Err(ParseError::at(&token, ParseErrorKind::DuplicateScript { script }));
            }
            self.bump();
            let body = self.parse_script_body(script)?;
            match script {
                ScriptKind::Subscript => sub = Some(body),
                ScriptKind::Superscript => sup = Some(body),
            }
        }

        if sub.is_none() && sup.is_none() {
            return Ok(None);
        }
        let (line, column) = self.position_of(base);
        Ok(Some(self.ast.alloc(NodeKind::Script { base, sub, sup }, line, column)))
    }

    /// A braced expression, or a single prefix-level operand without implicit multiplication.
    ///
    /// An unbraced subscript body takes no scripts of its own. An unbraced
    /// superscript body takes further superscripts only.
    fn parse_script_body(&mut self, script: ScriptKind) -> Result<NodeId, ParseError> {
        if self.at(TokenKind::BraceOpen) {
            return self.parse_braced_argument();
        }
        match self.unary_sign() {
            Some(op) => {
                let token = self.bump();
                let operand = self.nested(|parser| parser.parse_script_body(script))?;
                Ok(self.alloc(NodeKind::UnaryOp { op, operand }, &token))
            }
            None => self.nested(|parser| {
                parser.script_body = Some(script);
                parser.parse_postfix_chain()
            }),
        }
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let token = self.current();
        match token.kind {
            TokenKind::Number => {
                self.bump();
                let value = token.text.parse::<f64>().map_err(|_| {
                    ParseError::at(
                        &token,
                        ParseErrorKind::InvalidNumber {
                            text: token.text.to_string(),
                        },
                    )
                })?;
                Ok(self.alloc(NodeKind::Number(value), &token))
            }
            TokenKind::Identifier => {
                self.bump();
                Ok(self.alloc(NodeKind::Variable(token.text), &token))
            }
            TokenKind::Command => self.parse_command(),
            TokenKind::Symbol
            | TokenKind::Unknown
            | TokenKind::Spacing
            | TokenKind::Punctuation => {
                self.bump();
                Ok(self.alloc(NodeKind::Symbol(Cow::Borrowed(token.text)), &token))
            }
            TokenKind::BraceOpen => {
                self.parse_group(TokenKind::BraceClose, "`}`", GroupDelimiter::Brace)
            }
            TokenKind::ParenOpen => {
                self.parse_group(TokenKind::ParenClose, "`)`", GroupDelimiter::Paren)
            }
            TokenKind::BracketOpen => {
                self.parse_group(TokenKind::BracketClose, "`]`", GroupDelimiter::Bracket)
            }
            TokenKind::EscapedBraceOpen => self.parse_group(
                TokenKind::EscapedBraceClose,
                "`\\}`",
                GroupDelimiter::EscapedBrace,
            ),
            TokenKind::DisplayMathOpen => self.parse_group(
                TokenKind::DisplayMathClose,
                "`\\]`",
                GroupDelimiter::DisplayMath,
            ),
            TokenKind::InlineMathOpen => self.parse_group(
                TokenKind::InlineMathClose,
                "`\\)`",
                GroupDelimiter::InlineMath,
            ),
            TokenKind::Dollar => self.parse_dollar_group(),
            TokenKind::EnvBegin => self.parse_environment(),
            TokenKind::LeftWrap => self.parse_left_right(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_group(
        &mut self,
        close: TokenKind,
        expected: &str,
        delimiter: GroupDelimiter,
    ) -> Result<NodeId, ParseError> {
        let open = self.bump();
        let elements = self.parse_comma_list(close)?;
        self.expect(close, expected)?;
        Ok(self.group(delimiter, &elements, &open))
    }

    fn parse_dollar_group(&mut self) -> Result<NodeId, ParseError> {
        let open = self.bump();
        let display = self.eat(TokenKind::Dollar).is_some();
        let elements = self.parse_comma_list(TokenKind::Dollar)?;
        self.expect(TokenKind::Dollar, "`$`")?;
        let delimiter = if display {
            self.expect(TokenKind::Dollar, "`$`")?;
            GroupDelimiter::DoubleDollar
        } else {
            GroupDelimiter::Dollar
        };
        Ok(self.group(delimiter, &elements, &open))
    }

    /// Comma-separated assignment-level expressions up to (not including) `close`.
    fn parse_comma_list(&mut self, close: TokenKind) -> Result<Vec<NodeId>, ParseError> {
        let mut items = Vec::new();
        if self.at(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_assignment()?);
            if !self.at_punctuation(",") {
                return Ok(items);
            }
            self.bump();
        }
    }

    /// `{...}` yielding its content directly; `{}` yields an empty group.
    fn parse_braced_argument(&mut self) -> Result<NodeId, ParseError> {
        let open = self.expect(TokenKind::BraceOpen, "`{`")?;
        let elements = self.parse_comma_list(TokenKind::BraceClose)?;
        self.expect(TokenKind::BraceClose, "`}`")?;
        Ok(match elements.as_slice() {
            [single] => *single,
            _ => self.group(GroupDelimiter::Brace, &elements, &open),
        })
    }

    fn parse_command(&mut self) -> Result<NodeId, ParseError> {
        let token = self.bump();
        let Some(info) = token.info else {
            return Ok(self.alloc(NodeKind::Symbol(Cow::Borrowed(token.text)), &token));
        };

        match info.class {
            CommandClass::Relation => {
                return Ok(self.alloc(NodeKind::Symbol(Cow::Borrowed(token.text)), &token));
            }
            // `\sin(x)` and `\sin^2 x` use the operator name as a callee or script base
            CommandClass::Math
                if info.is_named_operator()
                    && matches!(
                        self.peek_kind(),
                        TokenKind::ParenOpen
                            | TokenKind::Caret
                            | TokenKind::Subscript
                            | TokenKind::Superscript
                    ) =>
            {
                return Ok(self.alloc(NodeKind::Symbol(Cow::Borrowed(token.text)), &token));
            }
            _ => {}
        }

        let mut args = Vec::with_capacity(info.arity());
        for _ in 0..info.optional_args {
            args.push(self.parse_optional_argument()?);
        }
        for found in 0..usize::from(info.mandatory_args) {
            let arg = if info.class == CommandClass::Text {
                self.parse_text_argument(info, found)?
            } else if self.at(TokenKind::BraceOpen) {
                self.parse_braced_argument()?
            } else if info.mandatory_args == 1 && self.starts_unbraced_argument() {
                self.nested(Self::parse_primary)?
            } else {
                return Err(arity_mismatch(&token, info, found));
            };
            args.push(Some(arg));
        }

        let args = self.ast.alloc_args(&args);
        Ok(self.alloc(
            NodeKind::Command {
                name: token.text,
                args,
                info,
            },
            &token,
        ))
    }

    fn parse_optional_argument(&mut self) -> Result<Option<NodeId>, ParseError> {
        let Some(open) = self.eat(TokenKind::BracketOpen) else {
            return Ok(None);
        };
        let arg = if self.at(TokenKind::BracketClose) {
            self.placeholder(&open)
        } else {
            self.parse_assignment()?
        };
        self.expect(TokenKind::BracketClose, "`]`")?;
        Ok(Some(arg))
    }

    fn starts_unbraced_argument(&self) -> bool {
        let token = self.current();
        match token.kind {
            TokenKind::Number
            | TokenKind::Identifier
            | TokenKind::Symbol
            | TokenKind::Unknown
            | TokenKind::ParenOpen
            | TokenKind::EscapedBraceOpen
            | TokenKind::LeftWrap
            | TokenKind::EnvBegin => true,
            TokenKind::Command => !is_relation(&token),
            _ => false,
        }
    }

    /// The argument of `\text`-like commands, kept verbatim as a symbol.
    fn parse_text_argument(
        &mut self,
        info: &'static CommandInfo,
        found: usize,
    ) -> Result<NodeId, ParseError> {
        let token = self.current();
        if !self.at(TokenKind::BraceOpen) {
            if !matches!(
                token.kind,
                TokenKind::Identifier | TokenKind::Number | TokenKind::Symbol
            ) {
                return Err(arity_mismatch(&token, info, found));
            }
            self.bump();
            return Ok(self.alloc(NodeKind::Symbol(Cow::Borrowed(token.text)), &token));
        }

        let open = self.bump();
        let mut depth = 0usize;
        let mut pieces: Vec<Token<'src>> = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::EndOfFile => return Err(self.unexpected("`}`")),
                TokenKind::BraceClose if depth == 0 => break,
                TokenKind::BraceClose => depth -= 1,
                TokenKind::BraceOpen => depth += 1,
                _ => {}
            }
            pieces.push(self.bump());
        }
        self.bump(); // Consume '}'

        let text = match pieces.as_slice() {
            [] => Cow::Borrowed(""),
            [single] => Cow::Borrowed(single.text),
            _ => {
                // Whitespace between tokens collapses to one space
                let mut text = String::new();
                let mut previous_end = None;
                for piece in &pieces {
                    if previous_end.is_some_and(|end| end != piece.range.start()) {
                        text.push(' ');
                    }
                    text.push_str(piece.text);
                    previous_end = Some(piece.range.end());
                }
                Cow::Owned(text)
            }
        };
        Ok(self.alloc(NodeKind::Symbol(text), &open))
    }

    fn parse_environment(&mut self) -> Result<NodeId, ParseError> {
        let begin = self.bump();
        let name = self.parse_environment_name()?;
        if LAYOUT_ENVIRONMENTS.contains(&&*name) && self.at(TokenKind::BraceOpen) {
            self.skip_braced()?;
        }

        let outer = std::mem::replace(&mut self.alignment_separates, true);
        let rows = self.parse_rows();
        self.alignment_separates = outer;
        let rows = rows?;

        if self.at(TokenKind::EndOfFile) {
            return Err(ParseError::at(
                &begin,
                ParseErrorKind::UnclosedEnvironment {
                    name: name.into_owned(),
                },
            ));
        }
        let end = self.expect(TokenKind::EnvEnd, "\\end")?;
        let close = self.parse_environment_name()?;
        if close != name {
            return Err(ParseError::at(
                &end,
                ParseErrorKind::MismatchedEnvironment {
                    open: name.into_owned(),
                    close: close.into_owned(),
                },
            ));
        }

        let rows = self.ast.alloc_rows(&rows);
        Ok(self.alloc(NodeKind::Environment { name, rows }, &begin))
    }

    /// `{name}` after `\begin` or `\end`, e.g. `matrix` or `align*`.
    fn parse_environment_name(&mut self) -> Result<Cow<'src, str>, ParseError> {
        self.expect(TokenKind::BraceOpen, "`{`")?;
        let mut parts: Vec<&'src str> = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Identifier | TokenKind::Star) {
            parts.push(self.bump().text);
        }
        if parts.is_empty() {
            return Err(self.unexpected("environment name"));
        }
        self.expect(TokenKind::BraceClose, "`}`")?;
        Ok(match parts.as_slice() {
            [single] => Cow::Borrowed(*single),
            _ => Cow::Owned(parts.concat()),
        })
    }

    fn skip_braced(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::BraceOpen, "`{`")?;
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::EndOfFile => return Err(self.unexpected("`}`")),
                TokenKind::BraceClose if depth == 0 => {
                    self.bump();
                    return Ok(());
                }
                TokenKind::BraceClose => depth -= 1,
                TokenKind::BraceOpen => depth += 1,
                _ => {}
            }
            self.bump();
        }
    }

    fn parse_rows(&mut self) -> Result<Vec<NodeList>, ParseError> {
        let mut rows = Vec::new();
        let mut cells = Vec::new();
        loop {
            let cell = if matches!(
                self.peek_kind(),
                TokenKind::Alignment | TokenKind::Newline | TokenKind::EnvEnd | TokenKind::EndOfFile
            ) {
                let token = self.current();
                self.placeholder(&token)
            } else {
                self.parse_assignment()?
            };
            cells.push(cell);

            match self.peek_kind() {
                TokenKind::Alignment => {
                    self.bump();
                }
                TokenKind::Newline => {
                    self.bump();
                    rows.push(self.ast.alloc_list(&cells));
                    cells.clear();
                    // A trailing `\\` does not open another row
                    if matches!(self.peek_kind(), TokenKind::EnvEnd | TokenKind::EndOfFile) {
                        return Ok(rows);
                    }
                }
                TokenKind::EnvEnd | TokenKind::EndOfFile => {
                    rows.push(self.ast.alloc_list(&cells));
                    return Ok(rows);
                }
                _ => return Err(self.unexpected("`&`, `\\\\` or \\end")),
            }
        }
    }

    fn parse_left_right(&mut self) -> Result<NodeId, ParseError> {
        let left_token = self.bump();
        let left = self.parse_delimiter("delimiter after \\left")?;

        let content = if self.at(TokenKind::RightWrap) {
            self.placeholder(&left_token)
        } else {
            let elements = self.parse_comma_list(TokenKind::RightWrap)?;
            match elements.as_slice() {
                [single] => *single,
                _ => self.group(GroupDelimiter::Implicit, &elements, &left_token),
            }
        };

        if !self.at(TokenKind::RightWrap) {
            return Err(ParseError::at(
                &self.current(),
                ParseErrorKind::MissingRight {
                    line: left_token.line,
                    column: left_token.column,
                },
            ));
        }
        self.bump();
        let right = self.parse_delimiter("delimiter after \\right")?;

        Ok(self.alloc(NodeKind::LeftRight { left, right, content }, &left_token))
    }

    fn parse_delimiter(&mut self, expected: &str) -> Result<&'src str, ParseError> {
        let token = self.current();
        let is_delimiter = match token.kind {
            TokenKind::ParenOpen
            | TokenKind::ParenClose
            | TokenKind::BracketOpen
            | TokenKind::BracketClose
            | TokenKind::EscapedBraceOpen
            | TokenKind::EscapedBraceClose
            | TokenKind::Slash
            | TokenKind::Less
            | TokenKind::Greater => true,
            TokenKind::Punctuation => matches!(token.text, "|" | "."),
            TokenKind::Symbol => token.text == "\\|"
                || token.info.is_some_and(|info| {
                    matches!(
                        info.class,
                        CommandClass::PrefixDelimiter | CommandClass::PostfixDelimiter
                    )
                }),
            _ => false,
        };
        if !is_delimiter {
            return Err(self.unexpected(expected));
        }
        self.bump();
        Ok(token.text)
    }
}

fn is_relation(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Command
        && token
            .info
            .is_some_and(|info| info.class == CommandClass::Relation)
}

fn allows(info: &CommandInfo, script: ScriptKind) -> bool {
    match script {
        ScriptKind::Subscript => info.allows_subscript,
        ScriptKind::Superscript => info.allows_superscript,
    }
}

fn arity_mismatch(token: &Token<'_>, info: &CommandInfo, found: usize) -> ParseError {
    ParseError::at(
        token,
        ParseErrorKind::ArityMismatch {
            command: info.name.to_string(),
            expected: usize::from(info.mandatory_args),
            found,
        },
    )
}

/// Parses a complete token stream with the default [`ParserConfig`].
///
/// Empty input (only whitespace, comments or the end-of-input token) parses
/// to a [`Parse`] without a root.
pub fn parse<'src>(tokens: &[Token<'src>]) -> Result<Parse<'src>, ParseError> {
    Parser::new(tokens).parse()
}
