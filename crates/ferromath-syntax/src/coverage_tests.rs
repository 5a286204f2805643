use crate::error::{ParseErrorKind, ScriptKind};
use crate::lexer::tokenize;
use crate::parser::{Parser, ParserConfig};
use crate::token::TokenKind;
use crate::{ParseError, parse, parse_str};

fn parse_err(input: &str) -> ParseError {
    parse_str(input).expect_err("input should not parse")
}

#[test]
fn test_tokens_reconstruct_input() {
    let inputs = [
        r"\int_{\alpha}^{\beta} f'(x) \, dx = f(\beta) - f(\alpha)",
        r"\frac{1}{2} + \sqrt[3]{x_1^2} % trailing comment",
        "a <= b != c\n\n@ é 3.14.15",
        r"\begin{matrix} 1 & 2 \\ 3 & 4 \end{matrix}",
    ];
    for input in inputs {
        let rebuilt: String = tokenize(input)
            .iter()
            .map(|t| t.text)
            .filter(|text| !text.trim().is_empty())
            .collect();

        let expected: String = input
            .lines()
            .map(|line| line.split('%').next().unwrap_or(""))
            .flat_map(|line| line.chars())
            .filter(|c| !c.is_whitespace())
            .collect();
        assert_eq!(rebuilt, expected, "input: {input}");
    }
}

#[test]
fn test_eof_token_then_empty_parse() {
    let tokens = tokenize("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::EndOfFile);
    assert!(parse(&tokens).unwrap().root().is_none());
}

#[test]
fn test_missing_right() {
    let err = parse_err(r"\left( x");
    assert_eq!(
        err.kind,
        ParseErrorKind::MissingRight { line: 1, column: 1 }
    );
    assert!(err.to_string().contains("missing \\right"));
    assert_eq!((err.line, err.column), (1, 9));
}

#[test]
fn test_mismatched_environment() {
    let err = parse_err(r"\begin{matrix} x \end{vector}");
    assert_eq!(
        err.kind,
        ParseErrorKind::MismatchedEnvironment {
            open: "matrix".to_string(),
            close: "vector".to_string(),
        }
    );
    assert_eq!(err.message(), "environment `matrix` closed by \\end{vector}");
}

#[test]
fn test_unclosed_environment() {
    let err = parse_err(r"\begin{cases} x & 1");
    assert_eq!(
        err.kind,
        ParseErrorKind::UnclosedEnvironment {
            name: "cases".to_string()
        }
    );
    assert_eq!((err.line, err.column), (1, 1));
}

#[test]
fn test_arity_mismatch() {
    let err = parse_err(r"\frac{1}");
    assert_eq!(
        err.kind,
        ParseErrorKind::ArityMismatch {
            command: "\\frac".to_string(),
            expected: 2,
            found: 1,
        }
    );
    assert_eq!(err.message(), "command `\\frac` expects 2 argument(s), found 1");

    // Only single-argument commands accept an unbraced operand
    assert!(matches!(
        parse_err(r"\frac12").kind,
        ParseErrorKind::ArityMismatch { found: 0, .. }
    ));
    assert!(matches!(
        parse_err(r"\sqrt").kind,
        ParseErrorKind::ArityMismatch { expected: 1, found: 0, .. }
    ));
}

#[test]
fn test_duplicate_scripts() {
    // An unbraced superscript body takes its own superscripts
    assert!(parse_str("x^2^3").is_ok());
    assert!(parse_str("x^2_1").is_ok());

    let err = parse_err("x_1_2");
    assert_eq!(
        err.kind,
        ParseErrorKind::DuplicateScript {
            script: ScriptKind::Subscript
        }
    );
    assert_eq!(err.column, 4);
    assert!(matches!(
        parse_err(r"x_a \sb b").kind,
        ParseErrorKind::DuplicateScript {
            script: ScriptKind::Subscript
        }
    ));
    assert!(matches!(
        parse_err("x_-1_2").kind,
        ParseErrorKind::DuplicateScript { .. }
    ));
    assert_eq!(
        parse_err("x^{2}^{3}").kind,
        ParseErrorKind::DuplicateScript {
            script: ScriptKind::Superscript
        }
    );
    let err = parse_err("x_{1}^{2}_{3}");
    assert_eq!(
        err.kind,
        ParseErrorKind::DuplicateScript {
            script: ScriptKind::Subscript
        }
    );
    assert_eq!(err.column, 10);
    assert_eq!(err.message(), "double subscript");
}

#[test]
fn test_subscript_not_allowed() {
    assert_eq!(
        parse_err(r"\sqrt{x}_1").kind,
        ParseErrorKind::ScriptNotAllowed {
            command: "\\sqrt".to_string(),
            script: ScriptKind::Subscript,
        }
    );
}

#[test]
fn test_invalid_character_surfaces_in_parser() {
    let err = parse_err("x @ y");
    assert_eq!(
        err.kind,
        ParseErrorKind::InvalidCharacter {
            text: "@".to_string()
        }
    );
    assert_eq!((err.line, err.column), (1, 3));
}

#[test]
fn test_unexpected_tokens() {
    let err = parse_err("(x");
    assert_eq!(
        err.kind,
        ParseErrorKind::UnexpectedEof {
            expected: "`)`".to_string()
        }
    );
    assert_eq!(err.to_string(), "1:3: expected `)`, found end of input");

    let err = parse_err("x)");
    assert_eq!(err.message(), "expected end of statement, found `)`");

    let err = parse_err("1 +");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEof { .. }));
}

#[test]
fn test_error_positions_span_lines() {
    let err = parse_err("a = 1 \\\\\n b = (");
    assert_eq!((err.line, err.column), (2, 7));
}

#[test]
fn test_nesting_limit() {
    let deep = format!("{}x{}", "(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(
        parse_err(&deep).kind,
        ParseErrorKind::NestingTooDeep { limit: 128 }
    );

    let tokens = tokenize("(((x)))");
    let config = ParserConfig { max_depth: 4 };
    assert!(Parser::with_config(&tokens, config).parse().is_ok());

    let tokens = tokenize("((((x))))");
    let err = Parser::with_config(&tokens, config).parse().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NestingTooDeep { limit: 4 });
}

#[test]
fn test_nesting_levels_are_uniform() {
    // The statement is one level, so 127 nested constructs fit under the default
    let nest = |open: &str, close: &str, levels: usize| {
        format!("{}x{}", open.repeat(levels), close.repeat(levels))
    };
    let constructs = [
        ("{", "}"),
        (r"\left(", r"\right)"),
        (r"\sqrt{", "}"),
        (r"\frac{1}{", "}"),
        ("x^{", "}"),
    ];
    for (open, close) in constructs {
        assert!(parse_str(&nest(open, close, 127)).is_ok(), "{open}");
        assert_eq!(
            parse_err(&nest(open, close, 128)).kind,
            ParseErrorKind::NestingTooDeep { limit: 128 },
            "{open}"
        );
    }

    // Unbraced operands count too
    assert!(parse_str(&format!("{}x", r"\sqrt ".repeat(127))).is_ok());
    assert!(matches!(
        parse_err(&format!("{}x", r"\sqrt ".repeat(128))).kind,
        ParseErrorKind::NestingTooDeep { .. }
    ));
}

#[test]
fn test_unary_chain_is_bounded() {
    let input = "-".repeat(5_000) + "1";
    assert!(matches!(
        parse_err(&input).kind,
        ParseErrorKind::NestingTooDeep { .. }
    ));
}

#[test]
fn test_stream_without_eof_token() {
    let mut tokens = tokenize("x + 1");
    tokens.pop();
    let parsed = parse(&tokens).unwrap();
    assert!(parsed.root().is_some());
}

#[test]
fn test_bare_bars_are_not_absolute_value() {
    // `|` is punctuation, so absolute value needs `\left| ... \right|`
    let err = parse_err("|x|");
    assert_eq!(err.message(), "expected end of statement, found `|`");
    assert_eq!((err.line, err.column), (1, 3));
    assert!(parse_str(r"\left| x \right|").is_ok());
}
