use crate::validators::{Finding, Validator, check_division};
use crate::{SemanticError, SemanticErrorKind};
use ferromath_syntax::ast::{Ast, BinaryOperator, NodeId, NodeKind};
use ferromath_syntax::Parse;
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Walks a parsed tree once and collects diagnostics.
///
/// Each node is visited exactly once, children before the node itself, so
/// diagnostics come out in post-order. The walk uses an explicit stack and
/// does not recurse, so long left-leaning operator chains are fine.
#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
    errors: Vec<SemanticError>,
    defined: BTreeSet<String>,
    usage: HashMap<String, (u32, u32)>,
}

enum Visit {
    Enter(NodeId),
    Exit(NodeId),
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzes `parse`, replacing the results of any earlier run.
    pub fn analyze(&mut self, parse: &Parse<'_>) -> &[SemanticError] {
        self.errors.clear();
        self.defined.clear();
        self.usage.clear();

        if let Some(root) = parse.root() {
            self.walk(parse.ast(), root);
        }
        debug!(
            "analyzed {} nodes, {} diagnostics",
            parse.ast().len(),
            self.errors.len()
        );
        &self.errors
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<SemanticError> {
        self.errors
    }

    /// Names that appear as the target of an `=` or `&` assignment.
    pub fn defined_variables(&self) -> &BTreeSet<String> {
        &self.defined
    }

    /// Line and column of the last occurrence of the variable `name`.
    pub fn last_usage(&self, name: &str) -> Option<(u32, u32)> {
        self.usage.get(name).copied()
    }

    fn walk(&mut self, ast: &Ast<'_>, root: NodeId) {
        let mut stack = vec![Visit::Enter(root)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    stack.push(Visit::Exit(id));
                    stack.extend(ast.children(id).into_iter().rev().map(Visit::Enter));
                }
                Visit::Exit(id) => self.visit(ast, id),
            }
        }
    }

    fn visit(&mut self, ast: &Ast<'_>, id: NodeId) {
        let node = ast.get(id);
        let finding: Option<Finding> = match &node.kind {
            NodeKind::Number(value) => {
                (!value.is_finite()).then_some((SemanticErrorKind::InvalidNumber, None))
            }
            NodeKind::Variable(name) => {
                self.usage
                    .insert((*name).to_string(), (node.line, node.column));
                None
            }
            NodeKind::Assign { target, .. } => match ast.kind(*target) {
                NodeKind::Variable(name) => {
                    self.defined.insert((*name).to_string());
                    None
                }
                NodeKind::Number(_) => Some((SemanticErrorKind::LiteralAssignment, None)),
                _ => None,
            },
            NodeKind::BinaryOp {
                op: BinaryOperator::Divide,
                right,
                ..
            } => check_division(ast, *right),
            NodeKind::Command { name, args, .. } => Validator::for_command(name)
                .and_then(|validator| validator.check(ast, ast.args(*args))),
            // `\ln(-1)` and `\log_2(-1)` are calls of the operator name
            NodeKind::FunctionCall { callee, args } => {
                match (operator_name(ast, *callee), ast.list(*args)) {
                    (Some((operator, name)), [argument]) => Validator::for_command(name)
                        .and_then(|validator| validator.check(ast, &[Some(*argument)]))
                        .map(|(kind, at)| (kind, at.or(Some(operator)))),
                    _ => None,
                }
            }
            NodeKind::Symbol(_)
            | NodeKind::Group { .. }
            | NodeKind::BinaryOp { .. }
            | NodeKind::UnaryOp { .. }
            | NodeKind::Script { .. }
            | NodeKind::Sequence(_)
            | NodeKind::Environment { .. }
            | NodeKind::LeftRight { .. } => None,
        };

        if let Some((kind, at)) = finding {
            let position = ast.get(at.unwrap_or(id));
            self.errors.push(SemanticError {
                kind,
                line: position.line,
                column: position.column,
            });
        }
    }
}

/// The operator symbol of a callee, looking through scripts such as `\log_2`.
fn operator_name<'a>(ast: &'a Ast<'_>, callee: NodeId) -> Option<(NodeId, &'a str)> {
    let operator = match ast.kind(callee) {
        NodeKind::Script { base, .. } => *base,
        _ => callee,
    };
    match ast.kind(operator) {
        NodeKind::Symbol(name) => Some((operator, &**name)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{Expect, expect};
    use ferromath_syntax::parse_str;

    fn check(input: &str, expected: Expect) {
        let parsed = parse_str(input).unwrap();
        let mut analyzer = SemanticAnalyzer::new();
        let rendered: Vec<String> = analyzer
            .analyze(&parsed)
            .iter()
            .map(ToString::to_string)
            .collect();
        expected.assert_eq(&rendered.join("\n"));
    }

    #[test]
    fn test_division_by_zero() {
        check("1/0", expect![[r#"1:3: Division by zero"#]]);
        check(r"\frac{x}{0}", expect![[r#"1:10: Division by zero"#]]);
        check(r"1 \div 0", expect![[r#"1:8: Division by zero"#]]);
        check("1/(0)", expect![[""]]);
        check("0/1", expect![[""]]);
    }

    #[test]
    fn test_domain_errors_report_at_command() {
        check(
            r"x + \sqrt{-1}",
            expect![[r#"1:5: Square root of negative number (requires complex numbers)"#]],
        );
        check(
            r"\log{0} + \ln{-x}",
            expect![[r#"
                1:1: Logarithm of non-positive number is undefined
                1:11: Logarithm of negative number is undefined"#]],
        );
        check(
            r"\ln(-1)",
            expect![[r#"1:1: Logarithm of negative number is undefined"#]],
        );
        check(
            r"y + \log_2(-1)",
            expect![[r#"1:5: Logarithm of negative number is undefined"#]],
        );
        check(
            r"\log_{10}{0}",
            expect![[r#"1:1: Logarithm of non-positive number is undefined"#]],
        );
        check(
            r"\ln^2(-1)",
            expect![[r#"1:1: Logarithm of negative number is undefined"#]],
        );
        check(r"\log_2(8)", expect![[""]]);
    }

    #[test]
    fn test_literal_assignment() {
        check("1 = x", expect![[r#"1:1: Cannot assign to a literal value"#]]);
        check("x = 1", expect![[""]]);
        // A top-level `&` is an assignment too
        check("2 & 3", expect![[r#"1:1: Cannot assign to a literal value"#]]);
        check(r"\begin{cases} 1 & 2 \end{cases}", expect![[""]]);
    }

    #[test]
    fn test_post_order() {
        check(
            r"\frac{1}{0} / 0",
            expect![[r#"
                1:10: Division by zero
                1:15: Division by zero"#]],
        );
        check(
            r"\sqrt{\frac{1}{0} - \log{-1}}",
            expect![[r#"
                1:16: Division by zero
                1:21: Logarithm of negative number is undefined"#]],
        );
    }

    #[test]
    fn test_invalid_number() {
        let input = "1".repeat(400);
        let parsed = parse_str(&input).unwrap();
        let errors = crate::analyze(&parsed);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, SemanticErrorKind::InvalidNumber);
        assert_eq!(errors[0].message(), "Invalid number value");
    }

    #[test]
    fn test_variables_are_tracked() {
        let parsed = parse_str(r"y = 2x \\ z = x + 1").unwrap();
        let mut analyzer = SemanticAnalyzer::new();
        analyzer.analyze(&parsed);

        assert!(!analyzer.has_errors());
        let defined: Vec<&str> = analyzer.defined_variables().iter().map(String::as_str).collect();
        assert_eq!(defined, ["y", "z"]);
        assert_eq!(analyzer.last_usage("x"), Some((1, 15)));
        assert_eq!(analyzer.last_usage("w"), None);
    }

    #[test]
    fn test_reuse_resets_state() {
        let mut analyzer = SemanticAnalyzer::new();
        analyzer.analyze(&parse_str("a = 1/0").unwrap());
        assert_eq!(analyzer.errors().len(), 1);

        analyzer.analyze(&parse_str("b").unwrap());
        assert!(!analyzer.has_errors());
        assert!(analyzer.defined_variables().is_empty());
        assert_eq!(analyzer.last_usage("a"), None);
        assert_eq!(analyzer.last_usage("b"), Some((1, 1)));
    }

    #[test]
    fn test_structural_nodes_are_traversed() {
        check(
            r"\begin{pmatrix} 1/0 & \left( \sqrt{-2} \right) \\ f(\frac{1}{0}) & x_{1/0} \end{pmatrix}",
            expect![[r#"
                1:19: Division by zero
                1:30: Square root of negative number (requires complex numbers)
                1:63: Division by zero
                1:75: Division by zero"#]],
        );
    }
}
