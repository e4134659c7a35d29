//! Command and directive types.
//!
//! Persistent commands are SQL statements executed against the database and
//! counted toward resumable progress. Transient commands are directives
//! interpreted by the processor itself; they are parsed into the exhaustive
//! [`Directive`] enum so the processor can match on variants instead of raw
//! text patterns.

use crate::error::{CoreError, CoreResult};
use crate::token::{tokenize, TokenCursor};

/// Whether a command executes against the database or steers the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Executed against the database; advances the resumable counter.
    Persistent,
    /// A directive interpreted by the processor; never sent to the database.
    Transient,
}

/// One command of an upgrade segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Raw command text. For transient commands this is the directive text
    /// without the `--*` prefix.
    pub text: String,
    /// 1-based line number where the command starts.
    pub line: usize,
    pub kind: CommandKind,
}

impl Command {
    pub fn persistent(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            line,
            kind: CommandKind::Persistent,
        }
    }

    pub fn transient(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            line,
            kind: CommandKind::Transient,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.kind == CommandKind::Persistent
    }

    /// The first `max` characters of the command text, for error display.
    pub fn display_text(&self, max: usize) -> &str {
        match self.text.char_indices().nth(max) {
            Some((i, _)) => &self.text[..i],
            None => &self.text,
        }
    }
}

/// A parsed transient directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `IGNORE SQL ERROR <code>[, <code>...]` — push a code set on the
    /// ignore stack.
    IgnoreSqlError(Vec<String>),
    /// `/IGNORE SQL ERROR` — pop the most recently pushed code set.
    EndIgnoreSqlError,
    /// `SET USER <name>` — switch the acting user on the current database.
    SetUser(String),
    /// `SELECT CONNECTION <name>` — switch the current database.
    SelectConnection(String),
    /// `SET MESSAGE "<text>"` / `MESSAGE START "<text>"` — label shown when
    /// the next persistent command starts.
    SetMessage(String),
}

impl Directive {
    /// Parse transient command text. Anything unrecognized is an
    /// unknown-command error carrying the line number.
    pub fn parse(text: &str, line: usize) -> CoreResult<Directive> {
        let unknown = || CoreError::UnknownCommand {
            text: text.to_string(),
            line,
        };
        let tokens = tokenize(text, line).map_err(|_| unknown())?;
        let mut cursor = TokenCursor::new(&tokens);
        try_parse(&mut cursor).ok_or_else(unknown)
    }
}

fn try_parse(c: &mut TokenCursor<'_>) -> Option<Directive> {
    if c.take_keyword("IGNORE").is_some() {
        c.take_keyword("SQL")?;
        c.take_keyword("ERROR")?;
        let mut codes = vec![c.take_word()?.to_ascii_uppercase()];
        while c.take_comma().is_some() {
            codes.push(c.take_word()?.to_ascii_uppercase());
        }
        c.take_end()?;
        Some(Directive::IgnoreSqlError(codes))
    } else if c.take_keyword("/IGNORE").is_some() {
        c.take_keyword("SQL")?;
        c.take_keyword("ERROR")?;
        c.take_end()?;
        Some(Directive::EndIgnoreSqlError)
    } else if c.take_keyword("SET").is_some() {
        if c.take_keyword("USER").is_some() {
            let user = c.take_word()?;
            c.take_end()?;
            Some(Directive::SetUser(user))
        } else if c.take_keyword("MESSAGE").is_some() {
            let message = c.take_quoted()?;
            c.take_end()?;
            Some(Directive::SetMessage(message))
        } else {
            None
        }
    } else if c.take_keyword("MESSAGE").is_some() {
        c.take_keyword("START")?;
        let message = c.take_quoted()?;
        c.take_end()?;
        Some(Directive::SetMessage(message))
    } else if c.take_keyword("SELECT").is_some() {
        c.take_keyword("CONNECTION")?;
        let name = c.take_word()?;
        c.take_end()?;
        Some(Directive::SelectConnection(name))
    } else {
        None
    }
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
