use ferromath_semantics::{SemanticErrorKind, analyze, analyze_source};
use ferromath_syntax::{ParseErrorKind, parse, tokenize};

#[test]
fn test_analysis_is_idempotent() {
    let input = r"\frac{1}{0} + \sqrt{-3} = \log{0} \\ 1 = \ln{-x}";
    let first = analyze_source(input).unwrap();
    let second = analyze_source(input).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);

    // Analyzing the same tree twice agrees as well
    let tokens = tokenize(input);
    let parsed = parse(&tokens).unwrap();
    assert_eq!(analyze(&parsed), analyze(&parsed));
    assert_eq!(analyze(&parsed), first);
}

#[test]
fn test_division_by_zero_at_divisor() {
    let errors = analyze_source("1/0").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, SemanticErrorKind::DivisionByZero);
    assert_eq!((errors[0].line, errors[0].column), (1, 3));
}

#[test]
fn test_negative_radicand_is_literal_only() {
    let errors = analyze_source(r"\sqrt{-1}").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message(),
        "Square root of negative number (requires complex numbers)"
    );

    // Not folded, so this evaluates negative without a diagnostic
    assert!(analyze_source(r"\sqrt{1-2}").unwrap().is_empty());
}

#[test]
fn test_logarithm_domain() {
    let kinds = |input: &str| -> Vec<SemanticErrorKind> {
        analyze_source(input)
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    };
    assert_eq!(kinds(r"\log{0}"), [SemanticErrorKind::LogarithmOfNonPositive]);
    assert_eq!(kinds(r"\ln{-5}"), [SemanticErrorKind::LogarithmOfNegative]);
    assert_eq!(kinds(r"\ln(-5)"), [SemanticErrorKind::LogarithmOfNegative]);
    assert!(kinds(r"\log{10}").is_empty());
    assert!(kinds(r"\log x").is_empty());
}

#[test]
fn test_literal_assignment_target() {
    let errors = analyze_source("3 = x + 1").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "1:1: Cannot assign to a literal value");

    let errors = analyze_source("1 & 2").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, SemanticErrorKind::LiteralAssignment);
}

#[test]
fn test_parse_error_aborts_analysis() {
    let err = analyze_source(r"\left( 1/0").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::MissingRight { .. }));
}

#[test]
fn test_empty_input_has_no_diagnostics() {
    assert!(analyze_source("").unwrap().is_empty());
    assert!(analyze_source("  % only a comment").unwrap().is_empty());
}
