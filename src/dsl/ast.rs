//! Binary syntax tree produced by the AST builder.

use std::fmt;

use super::lexer::{Token, TokenKind};

/// Operator associativity. Every operator of the filter language is left
/// associative; the variant exists so the climbing loop reads like the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

impl TokenKind {
    /// Binding strength: NOT=3 > AND=2 > OR=1. Variables have none.
    pub fn precedence(self) -> Option<u8> {
        match self {
            TokenKind::Not => Some(3),
            TokenKind::And => Some(2),
            TokenKind::Or => Some(1),
            TokenKind::Variable => None,
        }
    }

    pub fn associativity(self) -> Option<Assoc> {
        match self {
            TokenKind::Not | TokenKind::And | TokenKind::Or => Some(Assoc::Left),
            TokenKind::Variable => None,
        }
    }

    /// AND and OR are the only infix operators. NOT is prefix only.
    pub fn is_binary(self) -> bool {
        matches!(self, TokenKind::And | TokenKind::Or)
    }
}

/// A node of the syntax tree.
///
/// Leaves hold a variable token. NOT nodes carry their operand in `left`,
/// AND/OR nodes use both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub token: Token,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
}

impl Node {
    pub fn leaf(token: Token) -> Self {
        Node {
            token,
            left: None,
            right: None,
        }
    }

    pub fn unary(token: Token, operand: Node) -> Self {
        Node {
            token,
            left: Some(Box::new(operand)),
            right: None,
        }
    }

    pub fn binary(token: Token, left: Node, right: Node) -> Self {
        Node {
            token,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let left = self.left.as_ref().map_or(0, |n| n.depth());
        let right = self.right.as_ref().map_or(0, |n| n.depth());
        1 + left.max(right)
    }
}

/// Fully parenthesized rendering, handy when asserting on tree shape.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.left, &self.right) {
            (Some(l), Some(r)) => write!(f, "({} {} {})", l, self.token.text.to_uppercase(), r),
            (Some(operand), None) => write!(f, "NOT {}", operand),
            _ => write!(f, "{}", self.token.text),
        }
    }
}
