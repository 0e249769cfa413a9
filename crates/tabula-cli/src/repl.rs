//! The read-eval-print loop: line classification and execution.
//!
//! Each input line is lexed and classified:
//!
//! - blank lines are ignored
//! - a leading `.` starts a directive (`.clear`, `.defs`, `.vals`)
//! - a `=` token outside any `()`/`[]`/`{}` nesting makes the line an
//!   assignment; the left-hand side must be a single identifier
//! - anything else parses and evaluates as an expression
//!
//! String contents never confuse the `=` scan because a quoted string is
//! a single token by the time the scan runs.

use crate::complete::ReplHelper;
use crate::render;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::sync::Arc;
use tabula_calc::SharedTable;
use tabula_expr::{
    lexer::{self, Token},
    parse_expression, Diagnostic, DiagnosticKind, Diagnostics, Span,
};

/// Run the interactive loop until end of input.
pub fn run(color: bool) -> rustyline::Result<()> {
    let table = Arc::new(SharedTable::new());
    let repl = Repl {
        table: Arc::clone(&table),
        color,
    };

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut editor: Editor<ReplHelper, DefaultHistory> = Editor::with_config(config)?;
    editor.set_helper(Some(ReplHelper::new(table)));

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                repl.execute(&line);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

/// How a lexed input line should be handled.
#[derive(Debug, Clone, PartialEq)]
enum LineKind {
    Empty,
    Directive(String),
    /// A `.` not followed by a directive name.
    BadDirective,
    /// A top-level `=` was found at this span.
    Assignment(Span),
    Expression,
}

fn classify(tokens: &[(Token, Span)]) -> LineKind {
    let Some((first, _)) = tokens.first() else {
        return LineKind::Empty;
    };
    if matches!(first, Token::Dot) {
        return match tokens.get(1) {
            Some((Token::Ident(name), _)) => LineKind::Directive(name.clone()),
            _ => LineKind::BadDirective,
        };
    }
    match find_assignment(tokens) {
        Some(eq) => LineKind::Assignment(eq),
        None => LineKind::Expression,
    }
}

/// Find the first `=` outside any bracketed context.
fn find_assignment(tokens: &[(Token, Span)]) -> Option<Span> {
    let mut depth = 0i32;
    for (token, span) in tokens {
        match token {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => depth -= 1,
            Token::Eq if depth == 0 => return Some(*span),
            _ => {}
        }
    }
    None
}

struct Repl {
    table: Arc<SharedTable>,
    color: bool,
}

impl Repl {
    fn execute(&self, line: &str) {
        let (tokens, _) = lexer::lex(line);
        match classify(&tokens) {
            LineKind::Empty => {}
            LineKind::Directive(name) => self.directive(&name),
            LineKind::BadDirective => {
                let diags: Diagnostics = Diagnostic::error(
                    DiagnosticKind::InvalidDirective,
                    "Invalid directive",
                    "A period starting a directive line must be immediately followed by a \
                     directive name.",
                )
                .into();
                self.show(&diags, line);
            }
            LineKind::Assignment(eq) => self.assign(line, eq),
            LineKind::Expression => self.expression(line),
        }
    }

    fn assign(&self, line: &str, eq: Span) {
        let lvalue_src = line[..eq.start as usize].trim();
        let expr_src = &line[eq.end as usize..];

        let (lvalue, mut diags) = parse_expression(lvalue_src, "");
        let symbol = match lvalue.as_traversal() {
            Some(traversal) if traversal.steps.is_empty() && !diags.has_errors() => traversal.root,
            _ => {
                diags.push(Diagnostic::error(
                    DiagnosticKind::InvalidAssignmentTarget,
                    "Invalid assignment target",
                    format!("Cannot assign to {lvalue_src}: a single identifier is required."),
                ));
                self.show(&diags, line);
                return;
            }
        };

        let (expr, expr_diags) = parse_expression(expr_src, &symbol);
        diags.extend(expr_diags);
        self.show(&diags, line);
        if diags.has_errors() {
            return;
        }

        self.table.define(&symbol, expr);
    }

    fn expression(&self, src: &str) {
        let (expr, mut diags) = parse_expression(src, "");
        if diags.has_errors() {
            self.show(&diags, src);
            return;
        }

        let (value, eval_diags) = self.table.eval(&expr);
        diags.extend(eval_diags);
        self.show(&diags, src);

        let known = value.is_wholly_known();
        if diags.has_errors() && !known {
            // The result of a failed expression is unknown, which is not
            // interesting enough to print.
            return;
        }
        match value.to_json() {
            Some(json) => println!("{json}\n"),
            None => println!("(not yet known)"),
        }
    }

    fn directive(&self, name: &str) {
        match name {
            "clear" => print!("\x1b[2J\x1b[0;0H"),
            "defs" => self.show_defs(),
            "vals" => self.show_vals(),
            _ => {
                let diags: Diagnostics = Diagnostic::error(
                    DiagnosticKind::InvalidDirective,
                    "Invalid directive",
                    format!("{name:?} is not a valid directive."),
                )
                .into();
                self.show(&diags, "");
            }
        }
    }

    /// `.defs`: every symbol with its source text, in dependency order.
    fn show_defs(&self) {
        let snapshot = self.table.values();
        let width = name_width(&snapshot.entries);
        for entry in &snapshot.entries {
            let source = self.table.source(&entry.symbol);
            let source = source.trim();
            if source.is_empty() {
                println!("{:>width$} = (not yet defined)", entry.symbol);
            } else {
                println!("{:>width$} = {}", entry.symbol, source);
            }
        }
    }

    /// `.vals`: every symbol with its value; entries that are not fully
    /// known fall back to their source text.
    fn show_vals(&self) {
        let snapshot = self.table.values();
        self.show(&snapshot.diagnostics, "");

        let width = name_width(&snapshot.entries);
        for entry in &snapshot.entries {
            match entry.value.to_json() {
                Some(json) => println!("{:>width$} = {}", entry.symbol, json),
                None => {
                    let source = self.table.source(&entry.symbol);
                    let source = source.trim();
                    if source.is_empty() {
                        println!("{:>width$} = (not yet defined)", entry.symbol);
                    } else {
                        println!("{:>width$} = {}", entry.symbol, source);
                    }
                }
            }
        }
    }

    fn show(&self, diags: &Diagnostics, line_src: &str) {
        let text = render::render(
            diags,
            |name| self.table.source(name),
            line_src,
            self.color,
        );
        print!("{text}");
    }
}

fn name_width(entries: &[tabula_calc::SymbolValue]) -> usize {
    entries.iter().map(|e| e.symbol.len()).max().unwrap_or(0)
}
