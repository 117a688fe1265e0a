//! Parser: builds a tree of syntax tokens from tokenizer fragments.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, ErrorKind, Result};
use crate::lexer::{Lexeme, tokenize};
use crate::numeric::Number;

// ============================================================================
// Syntax Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    FixedInteger,
    FloatingPoint,
}

/// The four binding forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKeyword {
    Let,
    LetM,
    Def,
    DefM,
}

impl BindingKeyword {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "let" => Some(BindingKeyword::Let),
            "letm" => Some(BindingKeyword::LetM),
            "def" => Some(BindingKeyword::Def),
            "defm" => Some(BindingKeyword::DefM),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKeyword::Let => "let",
            BindingKeyword::LetM => "letm",
            BindingKeyword::Def => "def",
            BindingKeyword::DefM => "defm",
        }
    }

    /// `def` and `defm` bind into the outermost frame
    pub fn is_global(&self) -> bool {
        matches!(self, BindingKeyword::Def | BindingKeyword::DefM)
    }

    /// `letm` and `defm` create rebindable bindings
    pub fn is_mutable(&self) -> bool {
        matches!(self, BindingKeyword::LetM | BindingKeyword::DefM)
    }
}

impl fmt::Display for BindingKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    List(Vec<Token>),
    Identifier,
    BindingKeyword(BindingKeyword),
    Literal(LiteralKind),
    TypeAnnotationMarker,
}

/// A syntax node. `text` is the raw lexeme (empty for lists) and `line` is the
/// source line of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn list(children: Vec<Token>, line: usize) -> Self {
        Token {
            kind: TokenKind::List(children),
            text: String::new(),
            line,
        }
    }

    pub fn identifier(text: impl Into<String>, line: usize) -> Self {
        Token {
            kind: TokenKind::Identifier,
            text: text.into(),
            line,
        }
    }

    pub fn literal(text: impl Into<String>, kind: LiteralKind, line: usize) -> Self {
        Token {
            kind: TokenKind::Literal(kind),
            text: text.into(),
            line,
        }
    }

    /// Children of a list token, `None` for every other kind
    pub fn children(&self) -> Option<&[Token]> {
        match &self.kind {
            TokenKind::List(children) => Some(children),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, TokenKind::List(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::List(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            _ => write!(f, "{}", self.text),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Digits and dots with at least one digit somewhere
static NUMERIC_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9.]*[0-9][0-9.]*$").expect("numeric literal pattern is valid"));

/// Deepest list nesting a source text may use
pub const MAX_NESTING: usize = 1024;

fn classify(word: &str, line: usize) -> Result<Token> {
    if NUMERIC_SHAPE.is_match(word) {
        let kind = match word.matches('.').count() {
            0 if Number::parse_fixed(word).is_some() => LiteralKind::FixedInteger,
            1 => LiteralKind::FloatingPoint,
            _ => return Err(Error::new(ErrorKind::MalformedLiteral(word.to_string()), line)),
        };
        return Ok(Token::literal(word, kind, line));
    }

    let kind = if let Some(keyword) = BindingKeyword::from_word(word) {
        TokenKind::BindingKeyword(keyword)
    } else if word == ":" {
        TokenKind::TypeAnnotationMarker
    } else {
        TokenKind::Identifier
    };

    Ok(Token {
        kind,
        text: word.to_string(),
        line,
    })
}

/// Parse a fragment slice into one list token whose children are the
/// slice's items. Line numbers start at `starting_line`.
pub fn parse(lexemes: &[Lexeme<'_>], starting_line: usize) -> Result<Token> {
    Ok(Token::list(parse_items(lexemes, starting_line)?, starting_line))
}

/// Lists are collected on an explicit stack, so nesting costs heap rather
/// than native stack and is bounded by [`MAX_NESTING`].
fn parse_items(lexemes: &[Lexeme<'_>], starting_line: usize) -> Result<Vec<Token>> {
    let fail = |kind: ErrorKind, line: usize| Error::new(kind, line).in_caller("parse");
    let mut top = Vec::new();
    // Lists still waiting for their `)`, with the line each was opened on
    let mut open: Vec<(Vec<Token>, usize)> = Vec::new();
    let mut line = starting_line;

    for lexeme in lexemes {
        let finished = match *lexeme {
            Lexeme::LineBreak => {
                line += 1;
                continue;
            }
            Lexeme::Open => {
                if open.len() >= MAX_NESTING {
                    return Err(fail(ErrorKind::NestingTooDeep(MAX_NESTING), line));
                }
                open.push((Vec::new(), line));
                continue;
            }
            Lexeme::Close => {
                let Some((children, opened)) = open.pop() else {
                    return Err(fail(ErrorKind::UnmatchedParen, line));
                };
                Token::list(children, opened)
            }
            Lexeme::Word(word) => classify(word, line).map_err(|e| e.in_caller("parse"))?,
        };

        match open.last_mut() {
            Some((siblings, _)) => siblings.push(finished),
            None => top.push(finished),
        }
    }

    if let Some((_, opened)) = open.first() {
        return Err(fail(ErrorKind::UnmatchedParen, *opened));
    }
    Ok(top)
}

/// Every top-level form in `source`, in order.
pub fn parse_program(source: &str) -> Result<Vec<Token>> {
    parse_items(&tokenize(source), 1)
}

/// Tokenize and parse exactly one balanced top-level form.
pub fn parse_top_level_form(source: &str) -> Result<Token> {
    let mut forms = parse_program(source)?;
    if forms.len() != 1 {
        let line = forms.get(1).map_or(1, |f| f.line);
        return Err(
            Error::new(ErrorKind::ExpectedSingleForm { found: forms.len() }, line)
                .in_caller("parse"),
        );
    }
    Ok(forms.remove(0))
}
