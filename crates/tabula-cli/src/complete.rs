//! Tab completion for the prompt.
//!
//! Scans backwards from the cursor for a traversal-looking chunk of
//! identifiers and dots, then completes either root names (defined
//! symbols and built-in functions) or, after a dot, the attribute names
//! of the symbol's object value. Directive names complete when the line
//! starts with a period.

use rustyline::completion::{Completer, Pair};
use std::sync::Arc;
use tabula_calc::SharedTable;
use tabula_expr::{funcs, Value};

const DIRECTIVES: &[&str] = &["clear", "defs", "vals"];

#[derive(rustyline::Helper, rustyline::Hinter, rustyline::Highlighter, rustyline::Validator)]
pub(crate) struct ReplHelper {
    table: Arc<SharedTable>,
}

impl ReplHelper {
    pub(crate) fn new(table: Arc<SharedTable>) -> Self {
        Self { table }
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(complete_at(&self.table, line, pos))
    }
}

fn pair(text: String) -> Pair {
    Pair {
        display: text.clone(),
        replacement: text,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn complete_at(table: &SharedTable, line: &str, pos: usize) -> (usize, Vec<Pair>) {
    let before = &line[..pos.min(line.len())];

    // Directive-name completion: the line so far is `.` plus part of a
    // name.
    let trimmed = before.trim_start();
    if let Some(rest) = trimmed.strip_prefix('.') {
        if rest.chars().all(is_word_char) {
            let candidates: Vec<Pair> = DIRECTIVES
                .iter()
                .filter(|d| d.starts_with(rest))
                .map(|d| pair(d.to_string()))
                .collect();
            return (before.len() - rest.len(), candidates);
        }
    }

    // Seek backwards through identifier characters and dots.
    let start = before
        .rfind(|c: char| !is_word_char(c) && c != '.')
        .map(|i| i + 1)
        .unwrap_or(0);
    let chunk = &before[start..];
    if chunk.is_empty() || chunk.starts_with('.') {
        return (pos, Vec::new());
    }

    match chunk.rsplit_once('.') {
        // A bare identifier: complete symbol and function names.
        None => {
            let mut names = table.names_with_prefix(chunk);
            names.extend(
                funcs::builtin_names()
                    .filter(|name| name.starts_with(chunk))
                    .map(str::to_string),
            );
            names.sort_unstable();
            names.dedup();
            (start, names.into_iter().map(pair).collect())
        }
        // `path.partial`: complete attributes of the value at `path`.
        Some((path, partial)) => {
            let word_start = start + path.len() + 1;
            let Some(attrs) = object_attrs_at(table, path) else {
                return (pos, Vec::new());
            };
            let mut names: Vec<String> = attrs
                .into_iter()
                .filter(|name| name.starts_with(partial) && name != partial)
                .collect();
            names.sort_unstable();
            (word_start, names.into_iter().map(pair).collect())
        }
    }
}

/// Attribute names of the object value reached by walking `path` through
/// the table, or `None` when the path does not lead to an object.
fn object_attrs_at(table: &SharedTable, path: &str) -> Option<Vec<String>> {
    let mut segments = path.split('.');
    let root = segments.next()?;
    let (mut value, _) = table.value(root);
    for segment in segments {
        match value {
            Value::Object(attrs) => value = attrs.get(segment)?.clone(),
            _ => return None,
        }
    }
    match value {
        Value::Object(attrs) => Some(attrs.keys().cloned().collect()),
        _ => None,
    }
}
