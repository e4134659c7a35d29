//! Tokenizer for `--*` control lines.
//!
//! The grammar is deliberately small: case-insensitive keywords, quoted
//! version labels and message text, the `-->` arrow, and comma-separated
//! error-code lists. Everything else in the upgrade file is opaque SQL text.

use crate::error::{CoreError, CoreResult};

/// One structural token of a control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare word: keyword, identifier, or error code.
    Word(String),
    /// Double-quoted text with the quotes stripped. No escape processing.
    Quoted(String),
    /// `-->`
    Arrow,
    /// `,`
    Comma,
}

impl Token {
    /// Case-insensitive keyword comparison.
    pub fn is_word(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '*' | '/')
}

/// Tokenize the text of a control line (the part after `--*`).
pub fn tokenize(text: &str, line: usize) -> CoreResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '"' {
            chars.next();
            let content_start = start + 1;
            let mut end = None;
            for (i, c) in chars.by_ref() {
                if c == '"' {
                    end = Some(i);
                    break;
                }
            }
            let end = end
                .ok_or_else(|| CoreError::malformed(line, "unterminated quoted label"))?;
            tokens.push(Token::Quoted(text[content_start..end].to_string()));
        } else if ch == ',' {
            chars.next();
            tokens.push(Token::Comma);
        } else if ch == '-' {
            if text[start..].starts_with("-->") {
                chars.next();
                chars.next();
                chars.next();
                tokens.push(Token::Arrow);
            } else {
                return Err(CoreError::malformed(line, "expected '-->'"));
            }
        } else if is_word_char(ch) {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if is_word_char(c) {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(text[start..end].to_string()));
        } else {
            return Err(CoreError::malformed(
                line,
                format!("unexpected character '{ch}'"),
            ));
        }
    }

    Ok(tokens)
}

/// Forward-only cursor over a token list.
///
/// The `take_*` methods return `None` on mismatch without consuming, so
/// callers can turn a failed match into their own error (the directive parser
/// maps every mismatch to an unknown-command error, the scan to a malformed
/// control line).
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consume a word matching `keyword` case-insensitively.
    pub fn take_keyword(&mut self, keyword: &str) -> Option<()> {
        if self.peek()?.is_word(keyword) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// Consume any bare word.
    pub fn take_word(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Word(w) => {
                let w = w.clone();
                self.pos += 1;
                Some(w)
            }
            _ => None,
        }
    }

    /// Consume a quoted label.
    pub fn take_quoted(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Quoted(q) => {
                let q = q.clone();
                self.pos += 1;
                Some(q)
            }
            _ => None,
        }
    }

    pub fn take_arrow(&mut self) -> Option<()> {
        match self.peek()? {
            Token::Arrow => {
                self.pos += 1;
                Some(())
            }
            _ => None,
        }
    }

    pub fn take_comma(&mut self) -> Option<()> {
        match self.peek()? {
            Token::Comma => {
                self.pos += 1;
                Some(())
            }
            _ => None,
        }
    }

    /// `Some(())` only when every token has been consumed.
    pub fn take_end(&mut self) -> Option<()> {
        if self.at_end() {
            Some(())
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
