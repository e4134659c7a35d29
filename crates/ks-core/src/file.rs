//! Upgrade file scanning and lazy command reading.
//!
//! `scan` parses structure only — the definition section, branch groups, and
//! the body blocks with their line ranges — so a malformed file fails before
//! any statement runs. Command bodies are read lazily, segment by segment,
//! by repositioning the line source.

use crate::command::Command;
use crate::error::{CoreError, CoreResult};
use crate::graph::{pair_display, LineRange, PatchGraph, Segment, SegmentKind};
use crate::line_source::LineSource;
use crate::token::{tokenize, TokenCursor};

/// A scanned upgrade file: the patch graph plus the line source the commands
/// are lazily read from.
pub struct UpgradeFile<S: LineSource> {
    source: S,
    graph: PatchGraph,
}

/// A declaration collected from the definition section, before its body
/// block has been located.
struct Declaration {
    source: Option<String>,
    target: String,
    kind: SegmentKind,
    branch: Option<String>,
    declared_at: usize,
    body: Option<LineRange>,
}

/// The control-line text of `line`, if it is one (`--*` prefix stripped).
fn control_text(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix("--*").map(str::trim)
}

/// Lines the scan skips entirely: blank lines, plain `--` comments, and
/// `--* //` control comments.
fn is_skippable(line: &str, control: Option<&str>) -> bool {
    match control {
        Some(text) => text.is_empty() || text.starts_with("//"),
        None => {
            let trimmed = line.trim();
            trimmed.is_empty() || trimmed.starts_with("--")
        }
    }
}

impl<S: LineSource> UpgradeFile<S> {
    /// Parse the upgrade file's structure without executing anything.
    pub fn scan(mut source: S) -> CoreResult<Self> {
        let definition_line = find_definition(&mut source)?;
        let declarations = scan_definition(&mut source, definition_line)?;
        let declarations = scan_bodies(&mut source, declarations)?;

        let mut segments = Vec::with_capacity(declarations.len());
        for decl in declarations {
            let body = decl.body.ok_or_else(|| CoreError::BlockNotFound {
                src: decl.source.clone().unwrap_or_default(),
                target: decl.target.clone(),
            })?;
            segments.push(Segment {
                source: decl.source,
                target: decl.target,
                kind: decl.kind,
                branch: decl.branch,
                declared_at: decl.declared_at,
                body,
            });
        }
        log::debug!("scanned upgrade file: {} segments", segments.len());

        Ok(Self {
            source,
            graph: PatchGraph::build(segments)?,
        })
    }

    pub fn graph(&self) -> &PatchGraph {
        &self.graph
    }

    /// Read the commands of a segment by repositioning the line source to
    /// its body range.
    pub fn read_commands(&mut self, segment: usize) -> CoreResult<Vec<Command>> {
        let range = self.graph.segment(segment).body;
        self.source.seek_line(range.start)?;

        let mut commands = Vec::new();
        let mut statement: Vec<String> = Vec::new();
        let mut statement_line = 0;

        while let Some((line, text)) = self.source.next_line()? {
            if line >= range.end {
                break;
            }
            let control = control_text(&text);
            if let Some(directive) = control {
                if directive.is_empty() || directive.starts_with("//") {
                    continue;
                }
                if !statement.is_empty() {
                    return Err(CoreError::malformed(
                        line,
                        "directive inside an unterminated statement (missing ';')",
                    ));
                }
                commands.push(Command::transient(directive, line));
                continue;
            }

            if statement.is_empty() {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.starts_with("--") {
                    continue;
                }
                statement_line = line;
            }

            let trimmed_end = text.trim_end();
            if trimmed_end.ends_with(';') {
                statement.push(trimmed_end[..trimmed_end.len() - 1].to_string());
                commands.push(Command::persistent(statement.join("\n"), statement_line));
                statement.clear();
            } else {
                statement.push(text);
            }
        }

        // A final statement without a terminator still executes.
        if !statement.is_empty() {
            commands.push(Command::persistent(statement.join("\n"), statement_line));
        }

        Ok(commands)
    }
}

/// Advance to the `--* DEFINITION` line, returning its line number.
fn find_definition<S: LineSource>(source: &mut S) -> CoreResult<usize> {
    while let Some((line, text)) = source.next_line()? {
        let control = control_text(&text);
        if is_skippable(&text, control) {
            continue;
        }
        let Some(control) = control else {
            return Err(CoreError::malformed(
                line,
                "unexpected text before the DEFINITION section",
            ));
        };
        let tokens = tokenize(control, line)?;
        let mut cursor = TokenCursor::new(&tokens);
        if cursor.take_keyword("DEFINITION").is_some() && cursor.take_end().is_some() {
            return Ok(line);
        }
        return Err(CoreError::malformed(line, "expected DEFINITION"));
    }
    Err(CoreError::MissingDefinition)
}

/// Parse the declarations between `DEFINITION` and `/DEFINITION`.
fn scan_definition<S: LineSource>(
    source: &mut S,
    definition_line: usize,
) -> CoreResult<Vec<Declaration>> {
    let mut declarations: Vec<Declaration> = Vec::new();
    // (name, open line, declaration indices)
    let mut open_branch: Option<(String, usize, Vec<usize>)> = None;
    let mut branch_groups: Vec<(String, Vec<usize>)> = Vec::new();

    loop {
        let Some((line, text)) = source.next_line()? else {
            return Err(CoreError::UnterminatedBlock {
                block: "DEFINITION".to_string(),
                line: definition_line,
            });
        };
        let control = control_text(&text);
        if is_skippable(&text, control) {
            continue;
        }
        let Some(control) = control else {
            return Err(CoreError::malformed(
                line,
                "only control lines are allowed in the definition section",
            ));
        };
        let tokens = tokenize(control, line)?;
        let mut cursor = TokenCursor::new(&tokens);

        if cursor.take_keyword("/DEFINITION").is_some() {
            if let Some((name, open_line, _)) = open_branch {
                return Err(CoreError::UnterminatedBlock {
                    block: format!("BRANCH \"{name}\""),
                    line: open_line,
                });
            }
            break;
        } else if cursor.take_keyword("INIT").is_some() {
            if open_branch.is_some() {
                return Err(CoreError::malformed(
                    line,
                    "INIT is not allowed inside a branch",
                ));
            }
            let (source_version, target) = parse_version_pair(&mut cursor, line)?;
            if !source_version.is_empty() {
                return Err(CoreError::malformed(
                    line,
                    "INIT source must be the empty label \"\"",
                ));
            }
            push_declaration(
                &mut declarations,
                Declaration {
                    source: None,
                    target,
                    kind: SegmentKind::Init,
                    branch: None,
                    declared_at: line,
                    body: None,
                },
            )?;
        } else if cursor.take_keyword("UPGRADE").is_some() {
            let (source_version, target) = parse_version_pair(&mut cursor, line)?;
            if source_version.is_empty() {
                return Err(CoreError::malformed(
                    line,
                    "UPGRADE source must not be empty; use INIT to bootstrap",
                ));
            }
            let index = declarations.len();
            push_declaration(
                &mut declarations,
                Declaration {
                    source: Some(source_version),
                    target,
                    kind: SegmentKind::Upgrade,
                    branch: open_branch.as_ref().map(|(name, _, _)| name.clone()),
                    declared_at: line,
                    body: None,
                },
            )?;
            if let Some((_, _, members)) = open_branch.as_mut() {
                members.push(index);
            }
        } else if cursor.take_keyword("BRANCH").is_some() {
            if open_branch.is_some() {
                return Err(CoreError::malformed(line, "branches cannot be nested"));
            }
            let name = cursor
                .take_quoted()
                .and_then(|n| cursor.take_end().map(|()| n))
                .ok_or_else(|| CoreError::malformed(line, "expected BRANCH \"<name>\""))?;
            open_branch = Some((name, line, Vec::new()));
        } else if cursor.take_keyword("/BRANCH").is_some() {
            let Some((name, open_line, members)) = open_branch.take() else {
                return Err(CoreError::malformed(line, "/BRANCH without an open branch"));
            };
            if members.is_empty() {
                return Err(CoreError::malformed(
                    open_line,
                    format!("branch \"{name}\" declares no segments"),
                ));
            }
            branch_groups.push((name, members));
        } else {
            return Err(CoreError::malformed(
                line,
                "expected INIT, UPGRADE, BRANCH, or /DEFINITION",
            ));
        }
    }

    validate_branch_rejoins(&declarations, &branch_groups)?;
    Ok(declarations)
}

/// Every branch must rejoin the main line: its terminal target has to be a
/// version declared outside the branch.
fn validate_branch_rejoins(
    declarations: &[Declaration],
    branch_groups: &[(String, Vec<usize>)],
) -> CoreResult<()> {
    for (name, members) in branch_groups {
        let terminal = &declarations[*members.last().expect("branch is non-empty")];
        let rejoin = terminal.target.as_str();
        let declared_outside = declarations
            .iter()
            .filter(|d| d.branch.as_deref() != Some(name.as_str()))
            .any(|d| d.target == rejoin || d.source.as_deref() == Some(rejoin));
        if !declared_outside {
            return Err(CoreError::BranchRejoinNotFound {
                branch: name.clone(),
                version: rejoin.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_version_pair(cursor: &mut TokenCursor<'_>, line: usize) -> CoreResult<(String, String)> {
    let parsed = cursor.take_quoted().and_then(|source| {
        cursor.take_arrow()?;
        let target = cursor.take_quoted()?;
        cursor.take_end()?;
        Some((source, target))
    });
    let (source, target) =
        parsed.ok_or_else(|| CoreError::malformed(line, "expected \"<source>\" --> \"<target>\""))?;
    if target.is_empty() {
        return Err(CoreError::malformed(line, "target version must not be empty"));
    }
    Ok((source, target))
}

fn push_declaration(declarations: &mut Vec<Declaration>, decl: Declaration) -> CoreResult<()> {
    let duplicate = declarations
        .iter()
        .any(|d| d.source == decl.source && d.target == decl.target);
    if duplicate {
        return Err(CoreError::DuplicateSegment {
            src: decl.source.unwrap_or_default(),
            target: decl.target,
        });
    }
    declarations.push(decl);
    Ok(())
}

/// Locate every body block and record its line range on the matching
/// declaration. Bodies are not parsed into commands here.
fn scan_bodies<S: LineSource>(
    source: &mut S,
    mut declarations: Vec<Declaration>,
) -> CoreResult<Vec<Declaration>> {
    loop {
        let Some((line, text)) = source.next_line()? else {
            break;
        };
        let control = control_text(&text);
        if is_skippable(&text, control) {
            continue;
        }
        let Some(control) = control else {
            return Err(CoreError::malformed(line, "unexpected text outside of a block"));
        };
        let tokens = tokenize(control, line)?;
        let mut cursor = TokenCursor::new(&tokens);

        let kind = if cursor.take_keyword("INIT").is_some() {
            SegmentKind::Init
        } else if cursor.take_keyword("UPGRADE").is_some() {
            SegmentKind::Upgrade
        } else {
            return Err(CoreError::malformed(line, "expected an INIT or UPGRADE block"));
        };

        let (source_version, target) = parse_version_pair(&mut cursor, line)?;
        let source_version = if source_version.is_empty() {
            None
        } else {
            Some(source_version)
        };

        let decl = declarations
            .iter_mut()
            .find(|d| d.source == source_version && d.target == target)
            .ok_or_else(|| CoreError::UndeclaredBlock {
                src: source_version.clone().unwrap_or_default(),
                target: target.clone(),
                line,
            })?;
        if decl.kind != kind {
            return Err(CoreError::malformed(
                line,
                format!(
                    "block {} opens as {} but is declared as {}",
                    pair_display(source_version.as_deref(), &target),
                    kind.keyword(),
                    decl.kind.keyword()
                ),
            ));
        }
        if decl.body.is_some() {
            return Err(CoreError::DuplicateSegment {
                src: source_version.unwrap_or_default(),
                target,
            });
        }

        decl.body = Some(scan_body_block(source, kind, line)?);
    }

    Ok(declarations)
}

/// Scan forward to the closing marker of a body block opened at `open_line`.
fn scan_body_block<S: LineSource>(
    source: &mut S,
    kind: SegmentKind,
    open_line: usize,
) -> CoreResult<LineRange> {
    let close_keyword = match kind {
        SegmentKind::Init => "/INIT",
        SegmentKind::Upgrade => "/UPGRADE",
    };
    loop {
        let Some((line, text)) = source.next_line()? else {
            return Err(CoreError::UnterminatedBlock {
                block: format!("{} block", kind.keyword()),
                line: open_line,
            });
        };
        let Some(control) = control_text(&text) else {
            continue;
        };
        if control.is_empty() || control.starts_with("//") {
            continue;
        }
        let tokens = tokenize(control, line)?;
        let mut cursor = TokenCursor::new(&tokens);
        if cursor.take_keyword(close_keyword).is_some() && cursor.take_end().is_some() {
            return Ok(LineRange {
                start: open_line + 1,
                end: line,
            });
        }
        // A new block opening inside the body means the close marker is missing.
        let mut probe = TokenCursor::new(&tokens);
        let opens_block = (probe.take_keyword("INIT").is_some()
            || probe.take_keyword("UPGRADE").is_some())
            && probe.take_quoted().is_some();
        if opens_block || tokens.first().is_some_and(|t| t.is_word("DEFINITION")) {
            return Err(CoreError::UnterminatedBlock {
                block: format!("{} block", kind.keyword()),
                line: open_line,
            });
        }
        // Anything else is a directive, validated at execution time.
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;
