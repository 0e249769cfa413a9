//! Parse errors and their conversion into diagnostics.

use crate::diag::{Diagnostic, DiagnosticKind, Subject};
use crate::lexer::Token;
use crate::span::Span;
use std::fmt;

/// Parse failure with source location and context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

/// Category of parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A different token appeared than the grammar allows here.
    UnexpectedToken,
    /// Input ended while a construct was incomplete.
    UnexpectedEof,
    /// Tokens were present but violate the grammar structurally.
    InvalidSyntax,
}

impl ParseError {
    /// The parser required one specific token and found another.
    pub fn expected_token(expected: Token, found: Option<Token>, span: Span) -> Self {
        let message = match &found {
            Some(token) => format!("expected `{expected}`, found `{token}`"),
            None => format!("expected `{expected}`, found end of input"),
        };
        Self {
            kind: if found.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }

    /// The parser found a token that fits nowhere in `context`.
    pub fn unexpected_token(found: Option<&Token>, context: &str, span: Span) -> Self {
        let message = match found {
            Some(token) => format!("unexpected `{token}` {context}"),
            None => format!("unexpected end of input {context}"),
        };
        Self {
            kind: if found.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    /// Convert into a structured diagnostic against the source the
    /// tokens came from.
    pub fn into_diagnostic(self, src: &str, label: &str) -> Diagnostic {
        let summary = match self.kind {
            ParseErrorKind::UnexpectedToken => "Unexpected token",
            ParseErrorKind::UnexpectedEof => "Unexpected end of expression",
            ParseErrorKind::InvalidSyntax => "Invalid expression",
        };
        Diagnostic::error(DiagnosticKind::Parse, summary, self.message)
            .with_subject(Subject::new(label, src, self.span))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}
