//! The abstract syntax tree and the arena that owns it.
//!
//! All nodes of one parse live in a single [`Ast`]. Nodes refer to each other
//! through [`NodeId`] handles, and variable-length children (argument lists,
//! group elements, environment rows) are stored contiguously in side tables
//! addressed by small `start/len` ranges. Dropping the `Ast` frees the whole
//! tree at once.

use crate::registry::CommandInfo;
use std::borrow::Cow;
use std::fmt::Write;
use std::ops::Index;

/// Handle to a node inside an [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A contiguous run of node handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeList {
    start: u32,
    len: u32,
}

/// A contiguous run of command arguments; absent optional arguments are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArgList {
    start: u32,
    len: u32,
}

/// A contiguous run of environment rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowList {
    start: u32,
    len: u32,
}

impl NodeList {
    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

impl ArgList {
    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

impl RowList {
    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    PlusMinus,
    MinusPlus,
    Multiply,
    Divide,
    Power,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    NotEqual,
    /// A named relation such as `\approx` or `\in`.
    Relation(&'static str),
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::PlusMinus => "\\pm",
            BinaryOperator::MinusPlus => "\\mp",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Relation(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Factorial,
    Prime,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Factorial => "!",
            UnaryOperator::Prime => "'",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOperator {
    /// `=`
    Equal,
    /// `&`, the alignment point of a multi-line equation.
    Align,
}

/// The bracketing a [`NodeKind::Group`] was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDelimiter {
    Brace,
    Paren,
    Bracket,
    EscapedBrace,
    DisplayMath,
    InlineMath,
    Dollar,
    DoubleDollar,
    /// No source delimiter: an omitted operand, an empty environment cell,
    /// or a comma list inside `\left...\right`.
    Implicit,
}

impl GroupDelimiter {
    fn pair(self) -> &'static str {
        match self {
            GroupDelimiter::Brace => "{}",
            GroupDelimiter::Paren => "()",
            GroupDelimiter::Bracket => "[]",
            GroupDelimiter::EscapedBrace => "\\{\\}",
            GroupDelimiter::DisplayMath => "\\[\\]",
            GroupDelimiter::InlineMath => "\\(\\)",
            GroupDelimiter::Dollar => "$$",
            GroupDelimiter::DoubleDollar => "$$$$",
            GroupDelimiter::Implicit => "<implicit>",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'src> {
    Number(f64),
    Variable(&'src str),
    Symbol(Cow<'src, str>),
    Assign {
        op: AssignOperator,
        target: NodeId,
        value: NodeId,
    },
    Group {
        delimiter: GroupDelimiter,
        elements: NodeList,
    },
    BinaryOp {
        op: BinaryOperator,
        left: NodeId,
        right: NodeId,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: NodeId,
    },
    Command {
        name: &'src str,
        args: ArgList,
        info: &'static CommandInfo,
    },
    Script {
        base: NodeId,
        sub: Option<NodeId>,
        sup: Option<NodeId>,
    },
    FunctionCall {
        callee: NodeId,
        args: NodeList,
    },
    Sequence(NodeList),
    Environment {
        name: Cow<'src, str>,
        rows: RowList,
    },
    LeftRight {
        left: &'src str,
        right: &'src str,
        content: NodeId,
    },
}

/// A node and the 1-based source position it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<'src> {
    pub kind: NodeKind<'src>,
    pub line: u32,
    pub column: u32,
}

/// Arena owning every node of one parse.
#[derive(Debug, Default)]
pub struct Ast<'src> {
    nodes: Vec<Node<'src>>,
    lists: Vec<NodeId>,
    args: Vec<Option<NodeId>>,
    rows: Vec<NodeList>,
}

impl<'src> Ast<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an arena sized for roughly `nodes` nodes.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            lists: Vec::with_capacity(nodes / 2),
            args: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn alloc(&mut self, kind: NodeKind<'src>, line: u32, column: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, line, column });
        id
    }

    pub fn alloc_list(&mut self, items: &[NodeId]) -> NodeList {
        let start = self.lists.len() as u32;
        self.lists.extend_from_slice(items);
        NodeList {
            start,
            len: items.len() as u32,
        }
    }

    pub fn alloc_args(&mut self, items: &[Option<NodeId>]) -> ArgList {
        let start = self.args.len() as u32;
        self.args.extend_from_slice(items);
        ArgList {
            start,
            len: items.len() as u32,
        }
    }

    pub fn alloc_rows(&mut self, items: &[NodeList]) -> RowList {
        let start = self.rows.len() as u32;
        self.rows.extend_from_slice(items);
        RowList {
            start,
            len: items.len() as u32,
        }
    }

    pub fn get(&self, id: NodeId) -> &Node<'src> {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind<'src> {
        &self.nodes[id.index()].kind
    }

    pub fn list(&self, list: NodeList) -> &[NodeId] {
        &self.lists[list.start as usize..(list.start + list.len) as usize]
    }

    pub fn args(&self, args: ArgList) -> &[Option<NodeId>] {
        &self.args[args.start as usize..(args.start + args.len) as usize]
    }

    pub fn rows(&self, rows: RowList) -> &[NodeList] {
        &self.rows[rows.start as usize..(rows.start + rows.len) as usize]
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node handle in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Direct children of `id` in source order. Absent optional arguments are skipped.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::Number(_) | NodeKind::Variable(_) | NodeKind::Symbol(_) => Vec::new(),
            NodeKind::Assign { target, value, .. } => vec![*target, *value],
            NodeKind::Group { elements, .. } => self.list(*elements).to_vec(),
            NodeKind::BinaryOp { left, right, .. } => vec![*left, *right],
            NodeKind::UnaryOp { operand, .. } => vec![*operand],
            NodeKind::Command { args, .. } => self.args(*args).iter().flatten().copied().collect(),
            NodeKind::Script { base, sub, sup } => {
                let mut children = vec![*base];
                children.extend(sub.iter().chain(sup.iter()).copied());
                children
            }
            NodeKind::FunctionCall { callee, args } => {
                let mut children = vec![*callee];
                children.extend_from_slice(self.list(*args));
                children
            }
            NodeKind::Sequence(elements) => self.list(*elements).to_vec(),
            NodeKind::Environment { rows, .. } => self
                .rows(*rows)
                .iter()
                .flat_map(|row| self.list(*row).iter().copied())
                .collect(),
            NodeKind::LeftRight { content, .. } => vec![*content],
        }
    }

    /// Renders the subtree under `id` as an indented outline without
    /// positions, so two trees of the same shape render identically.
    pub fn debug_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id, 0, None);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, depth: usize, label: Option<&str>) {
        let indent = "  ".repeat(depth);
        let label = label.map(|l| format!("{l}: ")).unwrap_or_default();
        let _ = write!(out, "{indent}{label}");

        match self.kind(id) {
            NodeKind::Number(value) => {
                let _ = writeln!(out, "Number {value}");
            }
            NodeKind::Variable(name) => {
                let _ = writeln!(out, "Variable {name}");
            }
            NodeKind::Symbol(name) => {
                let _ = writeln!(out, "Symbol {name}");
            }
            NodeKind::Assign { op, target, value } => {
                let op = match op {
                    AssignOperator::Equal => "=",
                    AssignOperator::Align => "&",
                };
                let _ = writeln!(out, "Assign {op}");
                self.write_node(out, *target, depth + 1, None);
                self.write_node(out, *value, depth + 1, None);
            }
            NodeKind::Group { delimiter, elements } => {
                let _ = writeln!(out, "Group {}", delimiter.pair());
                for element in self.list(*elements) {
                    self.write_node(out, *element, depth + 1, None);
                }
            }
            NodeKind::BinaryOp { op, left, right } => {
                let _ = writeln!(out, "BinaryOp {}", op.symbol());
                self.write_node(out, *left, depth + 1, None);
                self.write_node(out, *right, depth + 1, None);
            }
            NodeKind::UnaryOp { op, operand } => {
                let _ = writeln!(out, "UnaryOp {}", op.symbol());
                self.write_node(out, *operand, depth + 1, None);
            }
            NodeKind::Command { name, args, .. } => {
                let _ = writeln!(out, "Command {name}");
                for arg in self.args(*args) {
                    match arg {
                        Some(arg) => self.write_node(out, *arg, depth + 1, None),
                        None => {
                            let _ = writeln!(out, "{indent}  <none>");
                        }
                    }
                }
            }
            NodeKind::Script { base, sub, sup } => {
                let _ = writeln!(out, "Script");
                self.write_node(out, *base, depth + 1, None);
                if let Some(sub) = sub {
                    self.write_node(out, *sub, depth + 1, Some("sub"));
                }
                if let Some(sup) = sup {
                    self.write_node(out, *sup, depth + 1, Some("sup"));
                }
            }
            NodeKind::FunctionCall { callee, args } => {
                let _ = writeln!(out, "FunctionCall");
                self.write_node(out, *callee, depth + 1, Some("callee"));
                for arg in self.list(*args) {
                    self.write_node(out, *arg, depth + 1, None);
                }
            }
            NodeKind::Sequence(elements) => {
                let _ = writeln!(out, "Sequence");
                for element in self.list(*elements) {
                    self.write_node(out, *element, depth + 1, None);
                }
            }
            NodeKind::Environment { name, rows } => {
                let _ = writeln!(out, "Environment {name}");
                for row in self.rows(*rows) {
                    let _ = writeln!(out, "{indent}  Row");
                    for cell in self.list(*row) {
                        self.write_node(out, *cell, depth + 2, None);
                    }
                }
            }
            NodeKind::LeftRight { left, right, content } => {
                let _ = writeln!(out, "LeftRight {left} {right}");
                self.write_node(out, *content, depth + 1, None);
            }
        }
    }
}

impl<'src> Index<NodeId> for Ast<'src> {
    type Output = Node<'src>;

    fn index(&self, id: NodeId) -> &Self::Output {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_alloc_and_lists() {
        let mut ast = Ast::new();
        let one = ast.alloc(NodeKind::Number(1.0), 1, 1);
        let x = ast.alloc(NodeKind::Variable("x"), 1, 3);
        let elements = ast.alloc_list(&[one, x]);
        let group = ast.alloc(
            NodeKind::Group {
                delimiter: GroupDelimiter::Paren,
                elements,
            },
            1,
            1,
        );

        assert_eq!(ast.len(), 3);
        assert_eq!(ast.list(elements), &[one, x]);
        assert_eq!(ast.children(group), vec![one, x]);
        assert_eq!(ast[x].column, 3);
    }

    #[test]
    fn test_children_skip_absent_arguments() {
        let mut ast = Ast::new();
        let two = ast.alloc(NodeKind::Number(2.0), 1, 7);
        let args = ast.alloc_args(&[None, Some(two)]);
        let sqrt = ast.alloc(
            NodeKind::Command {
                name: "\\sqrt",
                args,
                info: registry::find("\\sqrt").unwrap(),
            },
            1,
            1,
        );

        assert_eq!(ast.args(args).len(), 2);
        assert_eq!(ast.children(sqrt), vec![two]);
        assert_eq!(ast.debug_tree(sqrt), "Command \\sqrt\n  <none>\n  Number 2\n");
    }

    #[test]
    fn test_environment_rows() {
        let mut ast = Ast::new();
        let a = ast.alloc(NodeKind::Variable("a"), 1, 1);
        let b = ast.alloc(NodeKind::Variable("b"), 1, 5);
        let c = ast.alloc(NodeKind::Variable("c"), 2, 1);
        let first = ast.alloc_list(&[a, b]);
        let second = ast.alloc_list(&[c]);
        let rows = ast.alloc_rows(&[first, second]);
        let env = ast.alloc(
            NodeKind::Environment {
                name: Cow::Borrowed("matrix"),
                rows,
            },
            1,
            1,
        );

        assert_eq!(ast.children(env), vec![a, b, c]);
        assert_eq!(
            ast.debug_tree(env),
            "Environment matrix\n  Row\n    Variable a\n    Variable b\n  Row\n    Variable c\n"
        );
    }
}
