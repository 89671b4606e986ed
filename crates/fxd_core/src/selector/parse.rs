//! Selector query tokenizing and parsing.
//!
//! # Responsibility
//! - Turn query text into a compound/combinator sequence.
//! - Name the offending token and byte offset on syntax errors.
//!
//! # Invariants
//! - A parsed selector has at least one compound and never starts or ends
//!   with a child combinator.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for selector parsing and evaluation.
pub type SelectorResult<T> = Result<T, SelectorError>;

/// Selector syntax errors. Offsets are byte positions into the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Query is empty or whitespace-only.
    Empty,
    /// Character that starts no known selector token.
    UnexpectedToken {
        query: String,
        offset: usize,
        token: String,
    },
    /// `#` or `[` without a following identifier.
    ExpectedIdent { query: String, offset: usize },
    /// `[key=value]` without `=`, closing bracket or closing quote.
    UnterminatedAttribute { query: String, offset: usize },
    /// `>` with no compound on one side.
    DanglingCombinator { query: String },
    /// Scope path for a scoped query does not resolve to a node.
    ScopeNotFound { path: String },
}

impl Display for SelectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "selector query must not be empty"),
            Self::UnexpectedToken {
                query,
                offset,
                token,
            } => write!(
                f,
                "unexpected token `{token}` at offset {offset} in selector `{query}`"
            ),
            Self::ExpectedIdent { query, offset } => write!(
                f,
                "expected identifier at offset {offset} in selector `{query}`"
            ),
            Self::UnterminatedAttribute { query, offset } => write!(
                f,
                "unterminated attribute at offset {offset} in selector `{query}`"
            ),
            Self::DanglingCombinator { query } => {
                write!(f, "dangling `>` combinator in selector `{query}`")
            }
            Self::ScopeNotFound { path } => {
                write!(f, "selector scope path `{path}` does not exist")
            }
        }
    }
}

impl Error for SelectorError {}

/// Relationship between two adjacent compounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any depth below.
    Descendant,
    /// `>`: immediate child only.
    Child,
}

/// One simple-selector group matched against a single node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    /// `#id` constraint against `id` metadata.
    pub id: Option<String>,
    /// `[key=value]` constraints against metadata, all required.
    pub attrs: Vec<(String, String)>,
    /// `*` was written. A compound of only `*` matches every node.
    pub universal: bool,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.attrs.is_empty() && !self.universal
    }
}

/// Parsed selector: first compound plus combinator-linked rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub first: Compound,
    pub rest: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// Parses a selector query string.
    pub fn parse(query: &str) -> SelectorResult<Self> {
        assemble(query, tokenize(query)?)
    }

    /// Total number of compounds.
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Compound at position `index` (0 = first).
    pub fn compound(&self, index: usize) -> &Compound {
        if index == 0 {
            &self.first
        } else {
            &self.rest[index - 1].1
        }
    }

    /// Combinator preceding compound `index`; the first compound is an
    /// implicit descendant of the scope root.
    pub fn combinator(&self, index: usize) -> Combinator {
        if index == 0 {
            Combinator::Descendant
        } else {
            self.rest[index - 1].0
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Id(String),
    Attr(String, String),
    Star,
    Child,
    Space,
}

fn tokenize(query: &str) -> SelectorResult<Vec<Token>> {
    let bytes = query.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            c if c.is_ascii_whitespace() => {
                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                tokens.push(Token::Space);
            }
            b'>' => {
                pos += 1;
                tokens.push(Token::Child);
            }
            b'*' => {
                pos += 1;
                tokens.push(Token::Star);
            }
            b'#' => {
                pos += 1;
                let ident = read_ident(query, &mut pos)?;
                tokens.push(Token::Id(ident));
            }
            b'[' => {
                let open = pos;
                pos += 1;
                let key = read_ident(query, &mut pos)?;
                if bytes.get(pos) != Some(&b'=') {
                    return Err(SelectorError::UnterminatedAttribute {
                        query: query.to_string(),
                        offset: open,
                    });
                }
                pos += 1;
                let value = read_attr_value(query, &mut pos, open)?;
                if bytes.get(pos) != Some(&b']') {
                    return Err(SelectorError::UnterminatedAttribute {
                        query: query.to_string(),
                        offset: open,
                    });
                }
                pos += 1;
                tokens.push(Token::Attr(key, value));
            }
            other => {
                return Err(SelectorError::UnexpectedToken {
                    query: query.to_string(),
                    offset: pos,
                    token: char::from(other).to_string(),
                });
            }
        }
    }
    Ok(tokens)
}

fn read_ident(query: &str, pos: &mut usize) -> SelectorResult<String> {
    let bytes = query.as_bytes();
    let start = *pos;
    while *pos < bytes.len()
        && (bytes[*pos].is_ascii_alphanumeric() || bytes[*pos] == b'_' || bytes[*pos] == b'-')
    {
        *pos += 1;
    }
    if *pos == start {
        return Err(SelectorError::ExpectedIdent {
            query: query.to_string(),
            offset: start,
        });
    }
    Ok(query[start..*pos].to_string())
}

fn read_attr_value(query: &str, pos: &mut usize, open: usize) -> SelectorResult<String> {
    let bytes = query.as_bytes();
    if bytes.get(*pos) == Some(&b'"') {
        *pos += 1;
        let start = *pos;
        while *pos < bytes.len() && bytes[*pos] != b'"' {
            *pos += 1;
        }
        if bytes.get(*pos) != Some(&b'"') {
            return Err(SelectorError::UnterminatedAttribute {
                query: query.to_string(),
                offset: open,
            });
        }
        let value = query[start..*pos].to_string();
        *pos += 1;
        Ok(value)
    } else {
        let start = *pos;
        while *pos < bytes.len() && bytes[*pos] != b']' {
            *pos += 1;
        }
        Ok(query[start..*pos].to_string())
    }
}

fn assemble(query: &str, tokens: Vec<Token>) -> SelectorResult<Selector> {
    let mut compounds: Vec<Compound> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut current = Compound::default();
    let mut space_break = false;

    let dangling = || SelectorError::DanglingCombinator {
        query: query.to_string(),
    };

    for token in tokens {
        match token {
            Token::Space => {
                if !current.is_empty() {
                    space_break = true;
                }
            }
            Token::Child => {
                if current.is_empty() {
                    return Err(dangling());
                }
                compounds.push(std::mem::take(&mut current));
                combinators.push(Combinator::Child);
                space_break = false;
            }
            part => {
                if space_break && !current.is_empty() {
                    compounds.push(std::mem::take(&mut current));
                    combinators.push(Combinator::Descendant);
                }
                space_break = false;
                match part {
                    Token::Id(id) => current.id = Some(id),
                    Token::Attr(key, value) => current.attrs.push((key, value)),
                    Token::Star => current.universal = true,
                    Token::Space | Token::Child => unreachable!("handled above"),
                }
            }
        }
    }

    if current.is_empty() {
        if compounds.is_empty() {
            return Err(SelectorError::Empty);
        }
        // Combinator list is one longer than it should be: trailing `>`.
        return Err(dangling());
    }
    compounds.push(current);

    let mut iter = compounds.into_iter();
    let first = iter.next().ok_or(SelectorError::Empty)?;
    let rest = combinators.into_iter().zip(iter).collect();
    Ok(Selector { first, rest })
}
