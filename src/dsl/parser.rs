//! Precedence-climbing parser for the `q` expression.
//!
//! Grammar (in rough EBNF):
//!
//! expr    = primary (binop primary)*
//! primary = "not" primary | VARIABLE
//! binop   = "and" | "or"
//!
//! Grouping comes from precedence only (NOT=3 > AND=2 > OR=1, all left
//! associative). There are no parentheses in the wire syntax.

use serde::{Deserialize, Serialize};

use super::ast::{Assoc, Node};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::FilterError;

/// Upper bounds applied before and during parsing.
///
/// `max_depth` bounds the height of the tree, so a flat chain such as
/// `p1 OR p2 OR p3` counts one level per operand. The token count is
/// additionally capped at `2 * max_depth`, which keeps every tree the parser
/// accepts shallow enough to walk and drop recursively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of words in `q`.
    pub max_tokens: usize,
    /// Maximum height of the resulting tree.
    pub max_depth: usize,
}

impl Limits {
    /// Largest token count accepted, after clamping to the height bound.
    pub fn token_budget(&self) -> usize {
        self.max_tokens.min(self.max_depth.saturating_mul(2))
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            max_depth: 256,
        }
    }
}

/// Parser state.
struct AstBuilder<'a> {
    lexer: Lexer<'a>,
    limits: Limits,
    nesting: usize,
}

impl<'a> AstBuilder<'a> {
    fn new(lexer: Lexer<'a>, limits: Limits) -> Self {
        AstBuilder {
            lexer,
            limits,
            nesting: 0,
        }
    }

    /// Parse the whole stream: `parse_node(primary(), 0)`.
    fn build(&mut self) -> Result<Node, FilterError> {
        if self.lexer.is_empty() {
            return Err(FilterError::syntax("empty expression"));
        }

        let primary = self.primary()?;
        let root = self.parse_node(primary, 0)?;

        // Anything left over has no operator joining it to the tree,
        // e.g. "p1 p2" or "p1 NOT p2".
        if let Some(token) = self.lexer.peek() {
            return Err(FilterError::syntax(format!(
                "unexpected token '{}' after expression",
                token.text
            )));
        }

        Ok(root)
    }

    /// Parse a primary: a variable, or NOT applied to the next primary.
    fn primary(&mut self) -> Result<Node, FilterError> {
        let Some(token) = self.lexer.next() else {
            return Err(FilterError::syntax("unexpected end of expression"));
        };

        match token.kind {
            TokenKind::Variable => Ok(Node::leaf(token)),
            TokenKind::Not => {
                self.nesting += 1;
                if self.nesting > self.limits.max_depth {
                    return Err(FilterError::LimitExceeded {
                        what: "nesting depth",
                        max: self.limits.max_depth,
                        actual: self.nesting,
                    });
                }
                let operand = self.primary()?;
                self.nesting -= 1;
                Ok(Node::unary(token, operand))
            }
            TokenKind::And | TokenKind::Or => Err(FilterError::syntax(format!(
                "expected variable, got operator '{}'",
                token.text
            ))),
        }
    }

    /// Next token if it is a binary operator binding at least `min_precedence`.
    fn binary_operator(&self, min_precedence: u8) -> Option<(Token, u8)> {
        let token = self.lexer.peek().filter(|t| t.kind.is_binary())?;
        let precedence = token.kind.precedence()?;
        (precedence >= min_precedence).then_some((token, precedence))
    }

    fn parse_node(&mut self, mut left: Node, min_precedence: u8) -> Result<Node, FilterError> {
        while let Some((operator, precedence)) = self.binary_operator(min_precedence) {
            self.lexer.next();
            let mut right = self.primary()?;

            while let Some((lookahead, lookahead_precedence)) = self.binary_operator(0) {
                let raises = lookahead_precedence > precedence
                    || (lookahead.kind.associativity() == Some(Assoc::Right)
                        && lookahead_precedence == precedence);
                if !raises {
                    break;
                }
                right = self.parse_node(right, lookahead_precedence)?;
            }

            left = Node::binary(operator, left, right);
        }

        Ok(left)
    }
}

/// Parse a `q` expression into a syntax tree.
pub fn build_ast(input: &str, limits: &Limits) -> Result<Node, FilterError> {
    let lexer = Lexer::from_query(input);
    let budget = limits.token_budget();
    if lexer.len() > budget {
        return Err(FilterError::LimitExceeded {
            what: "token count",
            max: budget,
            actual: lexer.len(),
        });
    }

    let mut builder = AstBuilder::new(lexer, *limits);
    let root = builder.build()?;

    let depth = root.depth();
    if depth > limits.max_depth {
        return Err(FilterError::LimitExceeded {
            what: "tree height",
            max: limits.max_depth,
            actual: depth,
        });
    }

    Ok(root)
}
