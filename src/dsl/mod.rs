//! The `q` expression language.
//!
//! Syntax:
//!   p1                  - variable, refers to the `filter[p1][...]` group
//!   NOT expr            - negation of the next primary only
//!   expr AND expr       - conjunction
//!   expr OR expr        - disjunction (lower precedence than AND)
//!
//! Keywords are case-insensitive. Words are separated by whitespace. There is
//! no grouping syntax, so a variable literally named `and`, `or` or `not` can
//! never be referenced.

mod ast;
mod lexer;
mod parser;

pub use ast::{Assoc, Node};
pub use lexer::{Lexer, Token, TokenKind, split_words};
pub use parser::{Limits, build_ast};
