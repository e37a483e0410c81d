//! Directive extraction from raw model output.
//!
//! Two documented patterns, tried in order: a single-quoted command after
//! `CMD:`, then an unquoted rest-of-line. Everything else is plain text.

use crate::types::Directive;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Literal line the model emits when an autonomous task is done.
pub const TASK_COMPLETED_SENTINEL: &str = "Task completed";

/// Interpretation of one model response inside the autonomous task loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResponse {
    /// The model reported a fatal error; terminal.
    Fatal(String),
    /// The completion sentinel; terminal success.
    Completed,
    /// The next command to execute.
    Command(String),
    /// Anything else; terminal failure for the loop.
    Unexpected(String),
}

/// Remove every `<think>…</think>` block from the raw text.
///
/// Blocks may span lines; the first closing tag ends a block; an
/// unterminated block is left intact. Applied to every model response
/// before any other processing.
pub fn strip_think_blocks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    loop {
        match rest.find(THINK_OPEN) {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => {
                let after = &rest[start + THINK_OPEN.len()..];
                match after.find(THINK_CLOSE) {
                    Some(end) => {
                        out.push_str(&rest[..start]);
                        rest = &after[end + THINK_CLOSE.len()..];
                    }
                    None => {
                        out.push_str(rest);
                        break;
                    }
                }
            }
        }
    }
    out.trim().to_string()
}

/// First line of the cleaned response, trimmed.
pub fn clean_first_line(raw: &str) -> String {
    let cleaned = strip_think_blocks(raw);
    cleaned.lines().next().unwrap_or("").trim().to_string()
}

/// Extract the directive from one raw model response.
pub fn parse_directive(raw: &str) -> Directive {
    let line = clean_first_line(raw);
    if let Some(command) = match_quoted(&line) {
        return Directive::Command(command);
    }
    if let Some(command) = match_bare(&line) {
        return Directive::Command(command);
    }
    Directive::Text(line)
}

/// `CMD:` followed by optional whitespace and a single-quoted command.
/// Searches every `CMD:` occurrence so a quoted form anywhere in the line
/// wins over the bare fallback.
fn match_quoted(line: &str) -> Option<String> {
    let mut rest = line;
    while let Some(idx) = rest.find("CMD:") {
        let after = rest[idx + 4..].trim_start();
        if let Some(quoted) = after.strip_prefix('\'') {
            if let Some(end) = quoted.find('\'') {
                return Some(quoted[..end].to_string());
            }
        }
        rest = &rest[idx + 4..];
    }
    None
}

/// `CMD:` followed by anything: the rest of the line, trimmed.
fn match_bare(line: &str) -> Option<String> {
    let idx = line.find("CMD:")?;
    let rest = line[idx + 4..].trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Task-loop response parsing. The completion sentinel is matched by exact
/// equality before the `CMD:` prefix is tried; commands are taken verbatim
/// after the prefix with no quote handling.
pub fn parse_task_response(raw: &str) -> TaskResponse {
    let line = clean_first_line(raw);
    if line.starts_with("Error:") {
        TaskResponse::Fatal(line)
    } else if line == TASK_COMPLETED_SENTINEL {
        TaskResponse::Completed
    } else if let Some(rest) = line.strip_prefix("CMD:") {
        TaskResponse::Command(rest.trim().to_string())
    } else {
        TaskResponse::Unexpected(line)
    }
}
