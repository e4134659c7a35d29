//! Repositionable line sources for upgrade files.
//!
//! The scan pass visits every line of the upgrade file once to record each
//! segment's body range; execution later seeks back to those ranges and reads
//! the command bodies lazily. Only lines the source has already visited can be
//! repositioned to, which lets the file-backed source keep a byte-offset index
//! instead of the whole file in memory.

use crate::error::{CoreError, CoreResult};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// A repositionable sequence of text lines.
pub trait LineSource {
    /// The next line with its 1-based line number, or `None` at end of input.
    fn next_line(&mut self) -> CoreResult<Option<(usize, String)>>;

    /// Reposition so that `next_line` returns line `line` again. The line
    /// must have been read before.
    fn seek_line(&mut self, line: usize) -> CoreResult<()>;
}

/// File-backed line source that records the byte offset of every line it
/// reads, so earlier lines can be sought without re-reading the file.
pub struct FileLineSource {
    path: String,
    reader: BufReader<File>,
    /// `offsets[i]` is the byte offset where line `i + 1` starts.
    offsets: Vec<u64>,
    next_line: usize,
    pos: u64,
}

impl FileLineSource {
    /// Open the upgrade file at `path`.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let file = File::open(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Self {
            path: path.display().to_string(),
            reader: BufReader::new(file),
            offsets: vec![0],
            next_line: 1,
            pos: 0,
        })
    }
}

impl LineSource for FileLineSource {
    fn next_line(&mut self) -> CoreResult<Option<(usize, String)>> {
        let mut buf = String::new();
        let read = self
            .reader
            .read_line(&mut buf)
            .map_err(|e| CoreError::IoWithPath {
                path: self.path.clone(),
                source: e,
            })?;
        if read == 0 {
            return Ok(None);
        }

        self.pos += read as u64;
        let number = self.next_line;
        self.next_line += 1;
        if self.offsets.len() == number {
            // First visit: record where the next line starts.
            self.offsets.push(self.pos);
        }

        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some((number, buf)))
    }

    fn seek_line(&mut self, line: usize) -> CoreResult<()> {
        let offset = line
            .checked_sub(1)
            .and_then(|i| self.offsets.get(i))
            .copied()
            .ok_or(CoreError::SeekUnvisited { line })?;
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| CoreError::IoWithPath {
                path: self.path.clone(),
                source: e,
            })?;
        self.pos = offset;
        self.next_line = line;
        Ok(())
    }
}

/// In-memory line source, used by tests and embedded upgrade scripts.
pub struct StringLineSource {
    lines: Vec<String>,
    next_line: usize,
}

impl StringLineSource {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            next_line: 1,
        }
    }
}

impl LineSource for StringLineSource {
    fn next_line(&mut self) -> CoreResult<Option<(usize, String)>> {
        match self.lines.get(self.next_line - 1) {
            Some(text) => {
                let number = self.next_line;
                self.next_line += 1;
                Ok(Some((number, text.clone())))
            }
            None => Ok(None),
        }
    }

    fn seek_line(&mut self, line: usize) -> CoreResult<()> {
        if line == 0 || line > self.lines.len() + 1 {
            return Err(CoreError::SeekUnvisited { line });
        }
        self.next_line = line;
        Ok(())
    }
}

#[cfg(test)]
#[path = "line_source_test.rs"]
mod tests;
