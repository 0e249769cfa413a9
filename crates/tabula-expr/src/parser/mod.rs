//! Hand-written recursive descent parser.
//!
//! - `stream`: token cursor with lookahead and span tracking
//! - `error`: [`ParseError`] and its diagnostic conversion
//! - `expr`: the expression grammar (Pratt core)
//!
//! Parsing is best-effort: when a whole expression parses but trailing
//! tokens remain, the parsed prefix is kept and the leftovers are
//! reported, so callers still get a usable tree for the shape that was
//! recognised.

mod error;
mod expr;
mod stream;

pub use error::{ParseError, ParseErrorKind};
use stream::TokenStream;

use crate::ast::Expr;
use crate::lexer::Token;
use crate::span::Span;

/// Parse a token list into an expression.
///
/// Returns the tree (absent when nothing could be recognised) along with
/// any parse errors.
pub(crate) fn parse(tokens: &[(Token, Span)]) -> (Option<Expr>, Vec<ParseError>) {
    if tokens.is_empty() {
        return (
            None,
            vec![ParseError::invalid_syntax(
                "expected an expression",
                Span::zero(),
            )],
        );
    }

    let mut stream = TokenStream::new(tokens);
    match expr::parse_expr(&mut stream) {
        Ok(parsed) => {
            let mut errors = Vec::new();
            if !stream.at_end() {
                errors.push(ParseError::unexpected_token(
                    stream.peek(),
                    "after expression",
                    stream.current_span(),
                ));
            }
            (Some(parsed), errors)
        }
        Err(error) => (None, vec![error]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ExprKind};
    use crate::lexer;
    use crate::value::Value;

    fn parse_ok(src: &str) -> Expr {
        let (tokens, invalid) = lexer::lex(src);
        assert!(invalid.is_empty());
        let (parsed, errors) = parse(&tokens);
        assert!(errors.is_empty(), "parse errors for {src:?}: {errors:?}");
        parsed.expect("no tree")
    }

    fn parse_err(src: &str) -> (Option<Expr>, Vec<ParseError>) {
        let (tokens, _) = lexer::lex(src);
        parse(&tokens)
    }

    #[test]
    fn precedence_mul_over_add() {
        let expr = parse_ok("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = &expr.kind else {
            panic!("expected binary, got {expr:?}");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn left_associative_subtraction() {
        // (10 - 4) - 3, not 10 - (4 - 3)
        let expr = parse_ok("10 - 4 - 3");
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Sub);
        assert!(matches!(
            left.kind,
            ExprKind::Binary {
                op: BinaryOp::Sub,
                ..
            }
        ));
    }

    #[test]
    fn comparison_binds_tighter_than_logic() {
        let expr = parse_ok("a < 1 && b > 2");
        assert!(matches!(
            expr.kind,
            ExprKind::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn conditional_is_loosest_and_right_nested() {
        let expr = parse_ok("a ? 1 : b ? 2 : 3");
        let ExprKind::Conditional { else_value, .. } = &expr.kind else {
            panic!("expected conditional");
        };
        assert!(matches!(else_value.kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn postfix_chain() {
        let expr = parse_ok(r#"obj.attr[0]["k"]"#);
        assert!(matches!(expr.kind, ExprKind::Index { .. }));
        assert!(expr.as_traversal().is_some());
    }

    #[test]
    fn call_with_trailing_comma() {
        let expr = parse_ok("max(1, 2,)");
        let ExprKind::Call { name, args } = &expr.kind else {
            panic!("expected call");
        };
        assert_eq!(name, "max");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn object_keys_accept_both_separators() {
        let expr = parse_ok(r#"{a = 1, "b c": 2}"#);
        let ExprKind::Object(entries) = &expr.kind else {
            panic!("expected object");
        };
        assert_eq!(entries[0].0, "a");
        assert_eq!(entries[1].0, "b c");
    }

    #[test]
    fn unary_nests() {
        let expr = parse_ok("-(1 + 2)");
        assert!(matches!(expr.kind, ExprKind::Unary { .. }));
        let expr = parse_ok("!!true");
        let ExprKind::Unary { operand, .. } = &expr.kind else {
            panic!("expected unary");
        };
        assert!(matches!(operand.kind, ExprKind::Unary { .. }));
    }

    #[test]
    fn empty_input_is_an_error() {
        let (parsed, errors) = parse_err("");
        assert!(parsed.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn trailing_tokens_keep_the_parsed_prefix() {
        let (parsed, errors) = parse_err("1 + 2 5");
        let parsed = parsed.expect("prefix should survive");
        assert!(matches!(
            parsed.kind,
            ExprKind::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::UnexpectedToken);
    }

    #[test]
    fn unclosed_paren_is_eof_error() {
        let (parsed, errors) = parse_err("(1 + 2");
        assert!(parsed.is_none());
        assert_eq!(errors[0].kind, ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn calling_a_non_name_is_rejected() {
        let (_, errors) = parse_err("[1](0)");
        assert_eq!(errors[0].kind, ParseErrorKind::InvalidSyntax);
    }

    #[test]
    fn string_literal_atom() {
        let expr = parse_ok(r#""hi there""#);
        assert_eq!(
            expr.kind,
            ExprKind::Literal(Value::String("hi there".into()))
        );
    }
}
