//! Terminal rendering for diagnostics.
//!
//! Layout per diagnostic: a coloured severity prefix and bold summary, a
//! source snippet with the subject range highlighted, then the detail
//! text wrapped to a readable width. Labelled subjects pull their source
//! from the table; unlabelled ones (ad-hoc input) use the current line.

use tabula_expr::{Diagnostics, Severity};

const WRAP_WIDTH: usize = 100;

struct Style {
    error: &'static str,
    warning: &'static str,
    bold: &'static str,
    highlight: &'static str,
    reset: &'static str,
}

const ANSI: Style = Style {
    error: "\x1b[1;31m",
    warning: "\x1b[1;33m",
    bold: "\x1b[1m",
    highlight: "\x1b[1;4m",
    reset: "\x1b[0m",
};

const PLAIN: Style = Style {
    error: "",
    warning: "",
    bold: "",
    highlight: "",
    reset: "",
};

/// Render `diags` to a displayable block. `source_of` resolves a subject
/// label to the source text it was parsed from; `line_src` is the source
/// for unlabelled subjects.
pub(crate) fn render(
    diags: &Diagnostics,
    source_of: impl Fn(&str) -> String,
    line_src: &str,
    color: bool,
) -> String {
    if diags.is_empty() {
        return String::new();
    }
    let style = if color { &ANSI } else { &PLAIN };

    let mut out = String::from("\n");
    for diag in diags {
        match diag.severity {
            Severity::Error => {
                out.push_str(&format!("{}Error: {}", style.error, style.reset));
            }
            Severity::Warning => {
                out.push_str(&format!("{}Warning: {}", style.warning, style.reset));
            }
        }
        out.push_str(&format!("{}{}{}\n", style.bold, diag.summary, style.reset));

        if let Some(subject) = &diag.subject {
            let (source, prefix) = if subject.label.is_empty() {
                (line_src.to_string(), "> ".to_string())
            } else {
                (source_of(&subject.label), format!("{} = ", subject.label))
            };
            if !source.is_empty() {
                out.push_str(&snippet(
                    &source,
                    subject.start.byte as usize,
                    subject.end.byte as usize,
                    &prefix,
                    style,
                ));
            }
        }

        out.push_str(&wrap(&diag.detail, WRAP_WIDTH));
        out.push_str("\n\n");
    }
    out
}

/// Render every line of `source`, highlighting the byte range
/// `start..end` where it overlaps. The prefix appears on the first line
/// only.
fn snippet(source: &str, start: usize, end: usize, prefix: &str, style: &Style) -> String {
    // A zero-length range cannot be illustrated; widen it by one byte.
    let end = if start == end { end + 1 } else { end };

    let mut out = String::new();
    let mut line_start = 0;
    let mut first = true;
    for line in source.split('\n') {
        let line_end = line_start + line.len();
        let pad = if first { prefix } else { "" };
        let pad_width = prefix.len();

        let hl_start = start.clamp(line_start, line_end) - line_start;
        let hl_end = end.clamp(line_start, line_end) - line_start;
        if hl_start < hl_end {
            let before = &line[..hl_start];
            let mid = &line[hl_start..hl_end];
            let after = &line[hl_end..];
            out.push_str(&format!(
                "    {pad:>pad_width$}{}{}{mid}{}{after}\n",
                before.trim_start(),
                style.highlight,
                style.reset,
            ));
        } else {
            out.push_str(&format!("    {pad:>pad_width$}{}\n", line.trim()));
        }

        line_start = line_end + 1;
        first = false;
    }
    out
}

/// Greedy word wrap.
fn wrap(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for word in text.split_whitespace() {
        if line_len > 0 && line_len + 1 + word.len() > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(word);
        line_len += word.len();
    }
    out
}
