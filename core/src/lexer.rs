//! Tokenizer: splits source text into fragments.
//!
//! Parentheses become their own fragments and every line break, whatever its
//! encoding, becomes a single [`Lexeme::LineBreak`] so the parser can count
//! lines without rescanning the source. Tokenizing never fails.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme<'a> {
    Open,
    Close,
    LineBreak,
    Word(&'a str),
}

impl fmt::Display for Lexeme<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Open => write!(f, "("),
            Lexeme::Close => write!(f, ")"),
            Lexeme::LineBreak => writeln!(f),
            Lexeme::Word(w) => write!(f, "{w}"),
        }
    }
}

pub fn tokenize(input: &str) -> Vec<Lexeme<'_>> {
    let mut lexemes = Vec::new();
    let mut chars = input.char_indices().peekable();
    let mut word_start: Option<usize> = None;

    while let Some((pos, ch)) = chars.next() {
        let delimiter = ch == '(' || ch == ')' || ch.is_whitespace();
        if !delimiter {
            word_start.get_or_insert(pos);
            continue;
        }

        if let Some(start) = word_start.take() {
            lexemes.push(Lexeme::Word(&input[start..pos]));
        }

        match ch {
            '(' => lexemes.push(Lexeme::Open),
            ')' => lexemes.push(Lexeme::Close),
            '\n' | '\r' => {
                // \r\n and \n\r are one break
                let partner = if ch == '\n' { '\r' } else { '\n' };
                if let Some(&(_, next)) = chars.peek() {
                    if next == partner {
                        chars.next();
                    }
                }
                lexemes.push(Lexeme::LineBreak);
            }
            _ => {}
        }
    }

    if let Some(start) = word_start {
        lexemes.push(Lexeme::Word(&input[start..]));
    }

    lexemes
}
