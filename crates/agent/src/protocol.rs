//! Action block protocol
//!
//! Turns one raw model completion into typed actions. Recognized blocks:
//!
//! ~~~~text
//! FILE: src/main.py
//! ```python
//! print("hi")
//! ```
//!
//! SHELL:
//! ```
//! python src/main.py
//! ```
//!
//! MESSAGE:
//! free text up to the next label
//!
//! DONE
//! ~~~~
//!
//! Labels only count at the start of a line. Parsing never fails: anything
//! that is not a complete block is ignored.

use std::sync::LazyLock;

use regex::Regex;

/// Literal token that ends the agent loop
pub const DONE_MARKER: &str = "DONE";

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:FILE:[ \t]*(?P<path>.*?)[ \t]*$|(?P<shell>SHELL:)[ \t]*$|MESSAGE:[ \t]*(?P<message>.*?)[ \t]*$|(?P<done>DONE)\b)",
    )
    .expect("label pattern compiles")
});

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?P<fence>`{3,}|~{3,})(?P<info>[^`]*)$")
        .expect("fence pattern compiles")
});

/// One typed instruction extracted from model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    WriteFile { path: String, content: String },
    RunShell { command: String },
    Emit { message: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::WriteFile { .. } => ActionKind::File,
            Action::RunShell { .. } => ActionKind::Shell,
            Action::Emit { .. } => ActionKind::Message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    File,
    Shell,
    Message,
}

/// Order in which parsed actions are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionOrder {
    /// Files, then shell commands, then messages; encounter order within each
    #[default]
    Grouped,
    /// Encounter order across all kinds
    Interleaved,
}

impl From<autocoder_config::ActionOrderSetting> for ActionOrder {
    fn from(setting: autocoder_config::ActionOrderSetting) -> Self {
        match setting {
            autocoder_config::ActionOrderSetting::Grouped => ActionOrder::Grouped,
            autocoder_config::ActionOrderSetting::Interleaved => ActionOrder::Interleaved,
        }
    }
}

enum Label<'a> {
    File(&'a str),
    Shell,
    Message(&'a str),
    Done,
}

fn label(line: &str) -> Option<Label<'_>> {
    let caps = LABEL_RE.captures(line)?;
    if let Some(path) = caps.name("path") {
        let path = path
            .as_str()
            .trim_matches(|c| c == '`' || c == '"' || c == '\'')
            .trim();
        return (!path.is_empty()).then_some(Label::File(path));
    }
    if caps.name("shell").is_some() {
        return Some(Label::Shell);
    }
    if let Some(message) = caps.name("message") {
        return Some(Label::Message(message.as_str()));
    }
    caps.name("done").map(|_| Label::Done)
}

/// Index of the first line at or after `start` that begins a label
fn next_label(lines: &[&str], start: usize) -> usize {
    (start..lines.len())
        .find(|&i| label(lines[i]).is_some())
        .unwrap_or(lines.len())
}

fn is_closing_fence(line: &str, fence: &str) -> bool {
    let trimmed = line.trim();
    let Some(fence_char) = fence.chars().next() else {
        return false;
    };
    trimmed.len() >= fence.len() && trimmed.chars().all(|c| c == fence_char)
}

/// A fence line of the same kind carrying an info string opens a nested block
fn opens_nested_fence(line: &str, fence: &str) -> bool {
    let Some(caps) = FENCE_RE.captures(line) else {
        return false;
    };
    let inner = caps.name("fence").map(|m| m.as_str()).unwrap_or_default();
    let info = caps.name("info").map(|m| m.as_str().trim()).unwrap_or_default();
    inner.starts_with(fence) && !info.is_empty()
}

/// Index of the line closing the fence opened at `open`. Nested blocks such
/// as a code sample inside a Markdown file must close before the outer one.
fn closing_fence(lines: &[&str], open: usize, fence: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, line) in lines.iter().enumerate().skip(open + 1) {
        if opens_nested_fence(line, fence) {
            depth += 1;
        } else if is_closing_fence(line, fence) {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

/// Body of a file or shell block starting at `start`, plus the index of the
/// line after it. `None` when a fence is opened but never closed.
fn block_body(lines: &[&str], start: usize) -> Option<(String, usize)> {
    let first = (start..lines.len()).find(|&i| !lines[i].trim().is_empty());

    if let Some(open) = first {
        if let Some(caps) = FENCE_RE.captures(lines[open]) {
            let fence = caps.name("fence").map(|m| m.as_str()).unwrap_or("```");
            let close = closing_fence(lines, open, fence)?;
            let body = lines[open + 1..close].join("\n");
            return Some((body.trim().to_string(), close + 1));
        }
    }

    let end = next_label(lines, start);
    let body = lines[start..end].join("\n");
    Some((body.trim().to_string(), end))
}

/// Parse with the default grouped ordering
pub fn parse(response: &str) -> Vec<Action> {
    parse_with(response, ActionOrder::Grouped)
}

/// Parse one completion into actions
pub fn parse_with(response: &str, order: ActionOrder) -> Vec<Action> {
    let lines: Vec<&str> = response.lines().collect();
    let mut actions = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        match label(lines[i]) {
            Some(Label::File(path)) => match block_body(&lines, i + 1) {
                Some((content, next)) => {
                    actions.push(Action::WriteFile {
                        path: path.to_string(),
                        content,
                    });
                    i = next;
                }
                None => i += 1,
            },
            Some(Label::Shell) => match block_body(&lines, i + 1) {
                Some((command, next)) => {
                    actions.push(Action::RunShell { command });
                    i = next;
                }
                None => i += 1,
            },
            Some(Label::Message(inline)) => {
                let end = next_label(&lines, i + 1);
                let mut parts = vec![inline];
                parts.extend_from_slice(&lines[i + 1..end]);
                actions.push(Action::Emit {
                    message: parts.join("\n").trim().to_string(),
                });
                i = end;
            }
            Some(Label::Done) | None => i += 1,
        }
    }

    if order == ActionOrder::Grouped {
        // stable: encounter order is kept within each kind
        actions.sort_by_key(Action::kind);
    }
    actions
}

/// Whether the completion carries the termination marker anywhere
pub fn contains_done(response: &str) -> bool {
    response.contains(DONE_MARKER)
}
