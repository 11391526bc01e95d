//! Tokenizer for the `q` expression.
//!
//! The wire syntax is a whitespace-delimited stream of words. The reserved
//! words `and`, `or` and `not` (any case) are operators; every other word is a
//! variable naming a `filter[<id>]` parameter group. Identifier shape is not
//! checked here, unknown ids fail later when their group is resolved.

use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// Classification of a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    And,
    Or,
    Not,
    Variable,
}

/// A classified word of the `q` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    /// Classify a word. Keywords match case-insensitively.
    pub fn classify(text: &str) -> Self {
        let kind = if text.eq_ignore_ascii_case("and") {
            TokenKind::And
        } else if text.eq_ignore_ascii_case("or") {
            TokenKind::Or
        } else if text.eq_ignore_ascii_case("not") {
            TokenKind::Not
        } else {
            TokenKind::Variable
        };

        Token {
            text: text.to_string(),
            kind,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.kind == TokenKind::Variable
    }
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Lex one word, skipping leading whitespace.
fn lex_word<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(0.., char::is_whitespace).parse_next(input)?;
    take_till(1.., char::is_whitespace).parse_next(input)
}

/// Split the input into whitespace-delimited words.
pub fn split_words(input: &str) -> Vec<&str> {
    let mut remaining = input;
    let mut words = Vec::new();

    while let Ok(word) = lex_word(&mut remaining) {
        words.push(word);
    }

    words
}

/// Cursor over a word stream.
///
/// `peek` never moves the cursor; `next` advances and yields `None` once the
/// stream is exhausted.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    words: Vec<&'a str>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(words: Vec<&'a str>) -> Self {
        Lexer { words, position: 0 }
    }

    /// Build a lexer directly from a `q` string.
    pub fn from_query(input: &'a str) -> Self {
        Lexer::new(split_words(input))
    }

    pub fn peek(&self) -> Option<Token> {
        self.words.get(self.position).map(|w| Token::classify(w))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Total number of words in the stream.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words not yet consumed.
    pub fn remaining(&self) -> &[&'a str] {
        &self.words[self.position.min(self.words.len())..]
    }
}
