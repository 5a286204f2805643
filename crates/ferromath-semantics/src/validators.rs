//! Per-command checks run after a command's arguments have been visited.
//!
//! Every check is literal-based: an operand is only flagged when it is a
//! number literal or a directly negated one. `\sqrt{1-2}` passes.

use crate::SemanticErrorKind;
use ferromath_syntax::ast::{Ast, NodeId, NodeKind, UnaryOperator};

/// A command with argument constraints the analyzer knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// `\frac` and its display variants: the denominator must not be zero.
    Fraction,
    /// `\sqrt`: the radicand must not be negative.
    SquareRoot,
    /// `\log`, `\ln`, `\lg`: the argument must be positive.
    Logarithm,
}

/// A failed check and the node whose position it should be reported at.
///
/// `None` means the position of the command itself.
pub(crate) type Finding = (SemanticErrorKind, Option<NodeId>);

impl Validator {
    pub fn for_command(name: &str) -> Option<Self> {
        match name {
            "\\frac" | "\\dfrac" | "\\tfrac" | "\\cfrac" => Some(Validator::Fraction),
            "\\sqrt" => Some(Validator::SquareRoot),
            "\\log" | "\\ln" | "\\lg" => Some(Validator::Logarithm),
            _ => None,
        }
    }

    /// Checks the arguments of a command node. Absent optional arguments
    /// appear as `None` and are ignored.
    pub(crate) fn check(self, ast: &Ast<'_>, args: &[Option<NodeId>]) -> Option<Finding> {
        match self {
            Validator::Fraction => {
                let denominator = args.get(1).copied().flatten()?;
                is_zero(ast, denominator)
                    .then_some((SemanticErrorKind::DivisionByZero, Some(denominator)))
            }
            // The optional index comes first, so the radicand is the last argument.
            Validator::SquareRoot => {
                let radicand = args.last().copied().flatten()?;
                check_radicand(ast, radicand).map(|kind| (kind, None))
            }
            Validator::Logarithm => {
                let argument = args.first().copied().flatten()?;
                check_logarithm(ast, argument).map(|kind| (kind, None))
            }
        }
    }
}

/// Checks the denominator of a `/` operator.
pub(crate) fn check_division(ast: &Ast<'_>, denominator: NodeId) -> Option<Finding> {
    is_zero(ast, denominator).then_some((SemanticErrorKind::DivisionByZero, Some(denominator)))
}

fn is_zero(ast: &Ast<'_>, id: NodeId) -> bool {
    matches!(ast.kind(id), NodeKind::Number(value) if *value == 0.0)
}

fn negated_literal(ast: &Ast<'_>, id: NodeId) -> Option<f64> {
    match ast.kind(id) {
        NodeKind::UnaryOp {
            op: UnaryOperator::Minus,
            operand,
        } => match ast.kind(*operand) {
            NodeKind::Number(value) => Some(*value),
            _ => None,
        },
        _ => None,
    }
}

fn check_radicand(ast: &Ast<'_>, radicand: NodeId) -> Option<SemanticErrorKind> {
    let negative = match ast.kind(radicand) {
        NodeKind::Number(value) => *value < 0.0,
        // -0 is zero
        _ => negated_literal(ast, radicand).is_some_and(|value| value != 0.0),
    };
    negative.then_some(SemanticErrorKind::NegativeSquareRoot)
}

fn check_logarithm(ast: &Ast<'_>, argument: NodeId) -> Option<SemanticErrorKind> {
    match ast.kind(argument) {
        NodeKind::Number(value) if *value <= 0.0 => Some(SemanticErrorKind::LogarithmOfNonPositive),
        NodeKind::UnaryOp {
            op: UnaryOperator::Minus,
            ..
        } => Some(SemanticErrorKind::LogarithmOfNegative),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferromath_syntax::parse_str;

    fn command_findings(input: &str) -> Option<SemanticErrorKind> {
        let parsed = parse_str(input).unwrap();
        let ast = parsed.ast();
        let root = parsed.root().unwrap();
        let NodeKind::Command { name, args, .. } = ast.kind(root) else {
            panic!("expected a command at the root of {input}");
        };
        let validator = Validator::for_command(name).unwrap();
        validator.check(ast, ast.args(*args)).map(|(kind, _)| kind)
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Validator::for_command("\\frac"), Some(Validator::Fraction));
        assert_eq!(Validator::for_command("\\dfrac"), Some(Validator::Fraction));
        assert_eq!(Validator::for_command("\\sqrt"), Some(Validator::SquareRoot));
        assert_eq!(Validator::for_command("\\lg"), Some(Validator::Logarithm));
        assert_eq!(Validator::for_command("\\sin"), None);
        assert_eq!(Validator::for_command("sqrt"), None);
    }

    #[test]
    fn test_fraction() {
        assert_eq!(
            command_findings(r"\frac{1}{0}"),
            Some(SemanticErrorKind::DivisionByZero)
        );
        assert_eq!(command_findings(r"\frac{0}{1}"), None);
        assert_eq!(command_findings(r"\frac{1}{0.0}"), Some(SemanticErrorKind::DivisionByZero));
        assert_eq!(command_findings(r"\frac{1}{x}"), None);
    }

    #[test]
    fn test_square_root() {
        assert_eq!(
            command_findings(r"\sqrt{-4}"),
            Some(SemanticErrorKind::NegativeSquareRoot)
        );
        assert_eq!(
            command_findings(r"\sqrt[3]{-8}"),
            Some(SemanticErrorKind::NegativeSquareRoot)
        );
        assert_eq!(command_findings(r"\sqrt{-0}"), None);
        assert_eq!(command_findings(r"\sqrt{-x}"), None);
        assert_eq!(command_findings(r"\sqrt{1-2}"), None);
        // Only the radicand is checked, never the index
        assert_eq!(command_findings(r"\sqrt[-2]{4}"), None);
    }

    #[test]
    fn test_logarithm() {
        assert_eq!(
            command_findings(r"\log{0}"),
            Some(SemanticErrorKind::LogarithmOfNonPositive)
        );
        assert_eq!(
            command_findings(r"\ln{-x}"),
            Some(SemanticErrorKind::LogarithmOfNegative)
        );
        assert_eq!(
            command_findings(r"\lg{-2}"),
            Some(SemanticErrorKind::LogarithmOfNegative)
        );
        assert_eq!(command_findings(r"\ln{2}"), None);
        assert_eq!(command_findings(r"\ln{x-1}"), None);
    }
}
