use ferromath_syntax::{NodeKind, ParseErrorKind, TextSize, TokenKind, parse, parse_str, tokenize};

#[test]
fn test_incomplete_environment() {
    let input = "\\begin{matrix";
    let err = parse_str(input).unwrap_err();

    // Should not panic; the name is never closed.
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEof { .. }));
}

#[test]
fn test_incomplete_group() {
    let input = "\\frac{1}{2";
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.message(), "expected `}`, found end of input");
    assert_eq!(err.range.start(), TextSize::from(input.len() as u32));
}

#[test]
fn test_stray_braces() {
    let err = parse_str("\\} \\{").unwrap_err();
    assert_eq!((err.line, err.column), (1, 1));
}

#[test]
fn test_lexer_is_total_on_garbage() {
    let input = "\u{0}\u{7f}@#\"`é中\\";
    let tokens = tokenize(input);
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfFile));
    assert!(
        tokens[..tokens.len() - 1]
            .iter()
            .all(|t| matches!(t.kind, TokenKind::Invalid | TokenKind::Unknown))
    );
}

#[test]
fn test_parser_never_panics_on_prefixes() {
    let input = r"\begin{pmatrix} \left( \frac{a}{b} \right)^{2} & \sqrt[n]{x_i} \\ \sum_{k=0}^{n} k! & \{1, 2\} \end{pmatrix}";
    assert!(parse_str(input).is_ok());

    // Every truncation either parses or reports an error
    for end in (0..=input.len()).filter(|&i| input.is_char_boundary(i)) {
        let _ = parse(&tokenize(&input[..end]));
    }
}

#[test]
fn test_large_flat_input() {
    let input = (0..2_000)
        .map(|i| format!("x_{{{i}}}"))
        .collect::<Vec<_>>()
        .join(" + ");
    let parsed = parse_str(&input).unwrap();
    let root = parsed.root().unwrap();
    assert!(matches!(parsed.ast().kind(root), NodeKind::BinaryOp { .. }));
    assert!(parsed.ast().len() > 6_000);
}
