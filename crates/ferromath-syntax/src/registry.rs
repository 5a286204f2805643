//! The command registry.
//!
//! Maps every recognized backslash command (including the backslash) to a
//! [`CommandInfo`] describing its arity and syntactic role. The table is built
//! once on first use and never mutated afterwards, so concurrent lookups need
//! no synchronization.

use crate::token::TokenKind;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Syntactic role of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandClass {
    /// A standalone glyph such as `\alpha` or `\infty`.
    Symbol,
    /// A command with one argument, e.g. `\sqrt`.
    Unary,
    /// A command with two arguments, e.g. `\frac`.
    Binary,
    /// A named operator (`\sin`, `\log`) or large operator (`\sum`, `\int`).
    Math,
    /// A command whose argument is text rather than math, e.g. `\text`.
    Text,
    /// An accent over its argument, e.g. `\hat`.
    Accent,
    PrefixDelimiter,
    PostfixDelimiter,
    /// A named infix relation or operator, e.g. `\approx`, `\in`, `\to`.
    Relation,
    Unknown,
}

/// Static description of a recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: &'static str,
    pub class: CommandClass,
    pub mandatory_args: u8,
    pub optional_args: u8,
    pub allows_subscript: bool,
    pub allows_superscript: bool,
    /// Overrides the generic [`TokenKind::Command`] assigned by the lexer.
    pub token_override: Option<TokenKind>,
}

impl CommandInfo {
    const fn new(name: &'static str, class: CommandClass, mandatory: u8, optional: u8) -> Self {
        Self {
            name,
            class,
            mandatory_args: mandatory,
            optional_args: optional,
            allows_subscript: true,
            allows_superscript: true,
            token_override: None,
        }
    }

    const fn symbol(name: &'static str) -> Self {
        Self::new(name, CommandClass::Symbol, 0, 0).with_kind(TokenKind::Symbol)
    }

    /// A command that lexes directly as a dedicated token kind.
    const fn keyword(name: &'static str, kind: TokenKind) -> Self {
        Self::new(name, CommandClass::Symbol, 0, 0)
            .with_kind(kind)
            .without_scripts()
    }

    const fn with_kind(mut self, kind: TokenKind) -> Self {
        self.token_override = Some(kind);
        self
    }

    const fn without_scripts(mut self) -> Self {
        self.allows_subscript = false;
        self.allows_superscript = false;
        self
    }

    /// Total number of argument slots a parsed command carries.
    pub fn arity(&self) -> usize {
        usize::from(self.mandatory_args) + usize::from(self.optional_args)
    }

    /// True for named operators like `\sin` that take a single operand.
    pub fn is_named_operator(&self) -> bool {
        self.class == CommandClass::Math && self.mandatory_args == 1
    }
}

/// Immutable lookup table of every recognized command.
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandInfo>,
}

impl CommandRegistry {
    fn new() -> Self {
        use CommandClass::*;

        let mut registry = Self {
            commands: HashMap::new(),
        };

        // Greek letters
        for name in [
            "\\alpha", "\\beta", "\\gamma", "\\delta", "\\epsilon", "\\varepsilon", "\\zeta",
            "\\eta", "\\theta", "\\vartheta", "\\iota", "\\kappa", "\\lambda", "\\mu", "\\nu",
            "\\xi", "\\omicron", "\\pi", "\\varpi", "\\rho", "\\varrho", "\\sigma", "\\varsigma",
            "\\tau", "\\upsilon", "\\phi", "\\varphi", "\\chi", "\\psi", "\\omega", "\\Gamma",
            "\\Delta", "\\Theta", "\\Lambda", "\\Xi", "\\Pi", "\\Sigma", "\\Upsilon", "\\Phi",
            "\\Psi", "\\Omega",
        ] {
            registry.insert(CommandInfo::symbol(name));
        }

        // Special symbols
        for name in [
            "\\infty", "\\partial", "\\nabla", "\\forall", "\\exists", "\\nexists", "\\emptyset",
            "\\varnothing", "\\neg", "\\lnot", "\\hbar", "\\ell", "\\Re", "\\Im", "\\aleph",
            "\\wp", "\\prime", "\\dots", "\\ldots", "\\cdots", "\\vdots", "\\ddots", "\\angle",
            "\\triangle", "\\top", "\\bot", "\\|", "\\%", "\\$", "\\&", "\\#", "\\_",
        ] {
            registry.insert(CommandInfo::symbol(name));
        }

        // Arithmetic operators
        registry.insert(CommandInfo::keyword("\\times", TokenKind::Star));
        registry.insert(CommandInfo::keyword("\\cdot", TokenKind::Star));
        registry.insert(CommandInfo::keyword("\\ast", TokenKind::Star));
        registry.insert(CommandInfo::keyword("\\div", TokenKind::Slash));
        registry.insert(CommandInfo::keyword("\\pm", TokenKind::PlusMinus));
        registry.insert(CommandInfo::keyword("\\mp", TokenKind::MinusPlus));

        // Comparison operators
        registry.insert(CommandInfo::keyword("\\leq", TokenKind::LessEqual));
        registry.insert(CommandInfo::keyword("\\le", TokenKind::LessEqual));
        registry.insert(CommandInfo::keyword("\\geq", TokenKind::GreaterEqual));
        registry.insert(CommandInfo::keyword("\\ge", TokenKind::GreaterEqual));
        registry.insert(CommandInfo::keyword("\\neq", TokenKind::NotEqual));
        registry.insert(CommandInfo::keyword("\\ne", TokenKind::NotEqual));
        registry.insert(CommandInfo::keyword("\\lt", TokenKind::Less));
        registry.insert(CommandInfo::keyword("\\gt", TokenKind::Greater));

        // Relations, arrows, set and logic operators
        for name in [
            "\\approx", "\\equiv", "\\sim", "\\simeq", "\\cong", "\\propto", "\\in", "\\notin",
            "\\ni", "\\subset", "\\subseteq", "\\supset", "\\supseteq", "\\perp", "\\parallel",
            "\\mid", "\\ll", "\\gg", "\\prec", "\\succ", "\\to", "\\rightarrow", "\\leftarrow",
            "\\leftrightarrow", "\\Rightarrow", "\\Leftarrow", "\\Leftrightarrow",
            "\\longrightarrow", "\\implies", "\\iff", "\\mapsto", "\\gets", "\\cup", "\\cap",
            "\\setminus", "\\wedge", "\\vee", "\\land", "\\lor", "\\oplus", "\\otimes", "\\circ",
        ] {
            registry.insert(CommandInfo::new(name, Relation, 0, 0).without_scripts());
        }

        // Named operators: trigonometric, logarithmic and friends
        for name in [
            "\\sin", "\\cos", "\\tan", "\\cot", "\\sec", "\\csc", "\\arcsin", "\\arccos",
            "\\arctan", "\\sinh", "\\cosh", "\\tanh", "\\coth", "\\ln", "\\log", "\\lg", "\\exp",
            "\\max", "\\min", "\\sup", "\\inf", "\\det", "\\dim", "\\ker", "\\gcd", "\\deg",
            "\\arg", "\\hom", "\\Pr",
        ] {
            registry.insert(CommandInfo::new(name, Math, 1, 0));
        }

        // Large operators take no operand; their limits come from scripts
        for name in [
            "\\sum", "\\prod", "\\coprod", "\\int", "\\iint", "\\iiint", "\\oint", "\\lim",
            "\\limsup", "\\liminf", "\\bigcup", "\\bigcap", "\\bigoplus", "\\bigotimes",
        ] {
            registry.insert(CommandInfo::new(name, Math, 0, 0));
        }

        // Two-argument constructions
        for name in [
            "\\frac", "\\dfrac", "\\tfrac", "\\cfrac", "\\binom", "\\dbinom", "\\tbinom",
            "\\overset", "\\underset", "\\stackrel",
        ] {
            registry.insert(CommandInfo::new(name, Binary, 2, 0).without_scripts());
        }

        registry.insert(CommandInfo::new("\\sqrt", Unary, 1, 1).without_scripts());
        registry.insert(CommandInfo::new("\\boxed", Unary, 1, 0));
        registry.insert(CommandInfo::new("\\phantom", Unary, 1, 0));

        for name in [
            "\\text", "\\textrm", "\\textbf", "\\textit", "\\mathrm", "\\mathbf", "\\mathit",
            "\\mathsf", "\\mathtt", "\\mathbb", "\\mathcal", "\\mathfrak", "\\operatorname",
        ] {
            registry.insert(CommandInfo::new(name, Text, 1, 0));
        }

        for name in [
            "\\hat", "\\widehat", "\\bar", "\\overline", "\\underline", "\\vec", "\\dot",
            "\\ddot", "\\tilde", "\\widetilde", "\\check", "\\breve", "\\acute", "\\grave",
            "\\overrightarrow", "\\overbrace", "\\underbrace",
        ] {
            registry.insert(CommandInfo::new(name, Accent, 1, 0));
        }

        for name in ["\\langle", "\\lfloor", "\\lceil", "\\lvert", "\\lVert"] {
            registry.insert(CommandInfo::new(name, PrefixDelimiter, 0, 0).with_kind(TokenKind::Symbol));
        }
        for name in ["\\rangle", "\\rfloor", "\\rceil", "\\rvert", "\\rVert"] {
            registry.insert(CommandInfo::new(name, PostfixDelimiter, 0, 0).with_kind(TokenKind::Symbol));
        }

        // Structure
        registry.insert(CommandInfo::keyword("\\left", TokenKind::LeftWrap));
        registry.insert(CommandInfo::keyword("\\right", TokenKind::RightWrap));
        registry.insert(CommandInfo::keyword("\\begin", TokenKind::EnvBegin));
        registry.insert(CommandInfo::keyword("\\end", TokenKind::EnvEnd));
        registry.insert(CommandInfo::keyword("\\{", TokenKind::EscapedBraceOpen));
        registry.insert(CommandInfo::keyword("\\}", TokenKind::EscapedBraceClose));
        registry.insert(CommandInfo::keyword("\\[", TokenKind::DisplayMathOpen));
        registry.insert(CommandInfo::keyword("\\]", TokenKind::DisplayMathClose));
        registry.insert(CommandInfo::keyword("\\(", TokenKind::InlineMathOpen));
        registry.insert(CommandInfo::keyword("\\)", TokenKind::InlineMathClose));
        registry.insert(CommandInfo::keyword("\\\\", TokenKind::Newline));
        registry.insert(CommandInfo::keyword("\\sp", TokenKind::Superscript));
        registry.insert(CommandInfo::keyword("\\sb", TokenKind::Subscript));

        // Spacing
        for name in ["\\,", "\\;", "\\:", "\\!", "\\ ", "\\quad", "\\qquad"] {
            registry.insert(CommandInfo::keyword(name, TokenKind::Spacing));
        }

        registry
    }

    fn insert(&mut self, info: CommandInfo) {
        self.commands.insert(info.name, info);
    }

    /// Looks up a command by its exact, case-sensitive name (backslash included).
    pub fn lookup(&self, name: &str) -> Option<&CommandInfo> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandInfo> {
        self.commands.values()
    }
}

/// The process-wide registry.
pub static COMMANDS: Lazy<CommandRegistry> = Lazy::new(CommandRegistry::new);

/// Looks up `name` in the process-wide registry.
///
/// A miss is not an error: callers treat unknown commands as opaque symbols.
pub fn find(name: &str) -> Option<&'static CommandInfo> {
    COMMANDS.lookup(name)
}
