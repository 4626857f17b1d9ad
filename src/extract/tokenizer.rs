//! Tokenizer and grammar for dependency clauses.
//!
//! A clause is the text after `Premises and steps required:`, e.g.
//! `Premise 1 and Steps 2, 3`. It is read as a sequence of groups:
//!
//! ```text
//! clause := (group | other)*
//! group  := KIND NUMBER (SEP+ NUMBER)*
//! KIND   := "Premise" | "Premises" | "Step" | "Steps"
//! SEP    := "," | ";" | "and"
//! ```
//!
//! Tokens outside a group (e.g. `None`, `the`) are skipped.

use crate::types::{Reference, StepId};

/// Kind of reference introduced by a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Premise,
    Step,
}

impl RefKind {
    fn reference(self, number: u32) -> Reference {
        match self {
            Self::Premise => Reference::Premise(number),
            Self::Step => Reference::Step(StepId::new(number)),
        }
    }
}

/// A lexical token of a dependency clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Kind(RefKind),
    Number(u32),
    /// A comma, semicolon, or the conjunction "and".
    Separator,
    Other(&'a str),
}

/// Split a clause into tokens.
pub fn tokenize(clause: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = clause.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == ',' || c == ';' {
            chars.next();
            tokens.push(Token::Separator);
        } else if c.is_ascii_digit() {
            let end = take_while(&mut chars, |c| c.is_ascii_digit(), start);
            let digits = &clause[start..end];
            tokens.push(match digits.parse::<u32>() {
                Ok(n) => Token::Number(n),
                Err(_) => Token::Other(digits),
            });
        } else if c.is_alphabetic() {
            let end = take_while(&mut chars, |c| c.is_alphabetic(), start);
            tokens.push(classify_word(&clause[start..end]));
        } else {
            chars.next();
            tokens.push(Token::Other(&clause[start..start + c.len_utf8()]));
        }
    }

    tokens
}

fn take_while(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    pred: impl Fn(char) -> bool,
    start: usize,
) -> usize {
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    end
}

fn classify_word(word: &str) -> Token<'_> {
    match word.to_ascii_lowercase().as_str() {
        "and" => Token::Separator,
        "premise" | "premises" => Token::Kind(RefKind::Premise),
        "step" | "steps" => Token::Kind(RefKind::Step),
        _ => Token::Other(word),
    }
}

/// Read every reference group out of a token stream, in order of appearance.
pub fn parse_references(tokens: &[Token<'_>]) -> Vec<Reference> {
    let mut references = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let Token::Kind(kind) = tokens[i] else {
            i += 1;
            continue;
        };
        i += 1;

        let Some(Token::Number(first)) = tokens.get(i) else {
            continue;
        };
        references.push(kind.reference(*first));
        i += 1;

        // Continuation numbers: "Steps 1, 2 and 3"
        loop {
            let mut j = i;
            while tokens.get(j) == Some(&Token::Separator) {
                j += 1;
            }
            match tokens.get(j) {
                Some(Token::Number(n)) if j > i => {
                    references.push(kind.reference(*n));
                    i = j + 1;
                }
                _ => break,
            }
        }
    }

    references
}

/// Tokenize and parse a clause in one call.
pub fn parse_clause(clause: &str) -> Vec<Reference> {
    parse_references(&tokenize(clause))
}
