//! Pratt parser for Quill.
//!
//! Binding powers come from the shared table in [`crate::ast`]. The
//! comparison/range tier is non-associative: chaining it is rejected here,
//! at parse time, with a syntax error naming the operator.

use crate::ast::{BinOp, Expr, ExprKind, Pos, Stmt, UnaryOp, INDEX_PRECEDENCE};
use crate::lexer::{Lexer, Token, TokenKind};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unrecognized input at the lexical level.
    Lexical,
    /// A grammar violation, e.g. chained use of a non-associative operator.
    Syntax,
}

/// A lexing or parsing error. Either kind aborts compilation of the whole
/// unit — no partial AST is compiled further.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parse a whole program: statements separated by newlines or `;`.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = Parser::new(source);
    parser.program()
}

/// Parse a single expression (the whole input must be consumed).
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(source);
    parser.skip_separators();
    let expr = parser.expression(0)?;
    parser.skip_separators();
    parser.expect_eof()?;
    Ok(expr)
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            tokens: Lexer::tokenize(source),
            pos: 0,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn token_pos(token: &Token) -> Pos {
        Pos::new(token.line, token.col)
    }

    fn error(kind: ParseErrorKind, message: String, token: &Token) -> ParseError {
        ParseError {
            kind,
            message,
            line: token.line,
            col: token.col,
        }
    }

    fn syntax_error(&self, message: String) -> ParseError {
        Self::error(ParseErrorKind::Syntax, message, self.peek())
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Semicolon
        ) {
            self.advance();
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        match &self.peek().kind {
            TokenKind::Eof => Ok(()),
            TokenKind::Error(message) => Err(Self::error(
                ParseErrorKind::Lexical,
                message.clone(),
                self.peek(),
            )),
            other => Err(self.syntax_error(format!("unexpected '{}'", other.describe()))),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.peek().kind == TokenKind::Eof {
                return Ok(stmts);
            }
            stmts.push(self.statement()?);
            // A statement ends at a separator or at end of input.
            match &self.peek().kind {
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => {}
                TokenKind::Error(message) => {
                    return Err(Self::error(
                        ParseErrorKind::Lexical,
                        message.clone(),
                        self.peek(),
                    ))
                }
                other => {
                    return Err(
                        self.syntax_error(format!("unexpected '{}'", other.describe()))
                    )
                }
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.peek().kind == TokenKind::Let {
            let let_token = self.advance();
            let name = match &self.peek().kind {
                TokenKind::Ident(name) => {
                    let name = name.clone();
                    self.advance();
                    name
                }
                other => {
                    return Err(self.syntax_error(format!(
                        "expected a name after 'let', found '{}'",
                        other.describe()
                    )))
                }
            };
            if self.peek().kind != TokenKind::Assign {
                return Err(self.syntax_error(format!(
                    "expected '=' after 'let {}', found '{}'",
                    name,
                    self.peek().kind.describe()
                )));
            }
            self.advance();
            let value = self.expression(0)?;
            return Ok(Stmt::Let {
                name,
                value,
                pos: Self::token_pos(&let_token),
            });
        }
        Ok(Stmt::Expr(self.expression(0)?))
    }

    // -----------------------------------------------------------------------
    // Expressions (Pratt loop)
    // -----------------------------------------------------------------------

    fn expression(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.prefix()?;

        loop {
            // Postfix indexing binds tightest.
            if self.peek().kind == TokenKind::LBracket && INDEX_PRECEDENCE >= min_prec {
                let bracket = self.advance();
                let index = self.expression(0)?;
                if self.peek().kind != TokenKind::RBracket {
                    return Err(self.syntax_error(format!(
                        "expected ']', found '{}'",
                        self.peek().kind.describe()
                    )));
                }
                self.advance();
                lhs = Expr::new(
                    ExprKind::Index {
                        seq: Box::new(lhs),
                        index: Box::new(index),
                    },
                    Self::token_pos(&bracket),
                );
                continue;
            }

            let op = match Self::binary_op(&self.peek().kind) {
                Some(op) => op,
                None => break,
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            let op_token = self.advance();
            // Non-associative tiers parse their right side one level up,
            // same as left-assoc — the difference is the chain check below.
            let rhs = self.expression(prec + 1)?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                Self::token_pos(&op_token),
            );

            if op.is_non_associative() {
                if let Some(next) = Self::binary_op(&self.peek().kind) {
                    if next.precedence() == prec {
                        return Err(self.syntax_error(format!(
                            "operator '{}' is non-associative and cannot be chained with '{}'",
                            op.lexeme(),
                            next.lexeme()
                        )));
                    }
                }
            }
        }

        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let pos = Self::token_pos(&token);
        let kind = match token.kind {
            TokenKind::Int(n) => ExprKind::Int(n),
            TokenKind::Float(f) => ExprKind::Float(f),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::Ident(name) => ExprKind::Var(name),
            TokenKind::Minus => {
                let operand = self.unary_operand()?;
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                }
            }
            TokenKind::Bang => {
                let operand = self.unary_operand()?;
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                }
            }
            TokenKind::LParen => {
                let inner = self.expression(0)?;
                if self.peek().kind != TokenKind::RParen {
                    return Err(self.syntax_error(format!(
                        "expected ')', found '{}'",
                        self.peek().kind.describe()
                    )));
                }
                self.advance();
                return Ok(inner);
            }
            TokenKind::If => {
                let cond = self.expression(0)?;
                self.expect_keyword(TokenKind::Then)?;
                let then_branch = self.expression(0)?;
                self.expect_keyword(TokenKind::Else)?;
                let else_branch = self.expression(0)?;
                ExprKind::If {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                }
            }
            // `token.kind` has been moved out above; both error arms build
            // from the captured position.
            TokenKind::Error(message) => {
                return Err(ParseError {
                    kind: ParseErrorKind::Lexical,
                    message,
                    line: pos.line,
                    col: pos.col,
                })
            }
            other => {
                return Err(ParseError {
                    kind: ParseErrorKind::Syntax,
                    message: format!("unexpected '{}'", other.describe()),
                    line: pos.line,
                    col: pos.col,
                })
            }
        };
        Ok(Expr::new(kind, pos))
    }

    fn unary_operand(&mut self) -> Result<Expr, ParseError> {
        // Prefix operators bind tighter than any binary operator but
        // looser than postfix indexing: `-xs[0]` negates the element.
        self.expression(INDEX_PRECEDENCE)
    }

    fn expect_keyword(&mut self, expected: TokenKind) -> Result<(), ParseError> {
        if self.peek().kind == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_error(format!(
                "expected '{}', found '{}'",
                expected.describe(),
                self.peek().kind.describe()
            )))
        }
    }

    fn binary_op(kind: &TokenKind) -> Option<BinOp> {
        let op = match kind {
            TokenKind::OrOr => BinOp::Or,
            TokenKind::AndAnd => BinOp::And,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::NotEq => BinOp::Ne,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::DotDot => BinOp::Range,
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Mod,
            _ => return None,
        };
        Some(op)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, ExprKind};

    fn parse(source: &str) -> Expr {
        parse_expression(source).expect("parse error")
    }

    fn parse_err(source: &str) -> ParseError {
        parse_expression(source).expect_err("expected parse error")
    }

    fn binary_op_of(expr: &Expr) -> BinOp {
        match &expr.kind {
            ExprKind::Binary { op, .. } => *op,
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn range_parses_as_binary_node() {
        let e = parse("1 .. 5");
        assert_eq!(binary_op_of(&e), BinOp::Range);
    }

    #[test]
    fn arithmetic_binds_tighter_than_range() {
        // 1 + 2 .. 10 - 1  ⇒  (1 + 2) .. (10 - 1)
        let e = parse("1 + 2 .. 10 - 1");
        assert_eq!(binary_op_of(&e), BinOp::Range);
        match &e.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                assert_eq!(binary_op_of(lhs), BinOp::Add);
                assert_eq!(binary_op_of(rhs), BinOp::Sub);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn logic_binds_looser_than_range() {
        // a .. b && c  would be (a .. b) && c — range is an operand of &&.
        let e = parse("1 .. 2 && true");
        assert_eq!(binary_op_of(&e), BinOp::And);
    }

    #[test]
    fn chained_range_is_a_syntax_error() {
        let err = parse_err("1 .. 2 .. 3");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert!(err.message.contains("non-associative"), "{}", err.message);
    }

    #[test]
    fn chained_comparison_is_a_syntax_error() {
        let err = parse_err("1 < 2 < 3");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert!(err.message.contains("non-associative"));
    }

    #[test]
    fn mixed_chain_on_the_range_tier_is_rejected() {
        let err = parse_err("1 .. 2 == 3");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn parenthesized_chain_is_fine() {
        // Explicit grouping takes the chain off the shared tier.
        let e = parse("(1 .. 2) == (1 .. 2)");
        assert_eq!(binary_op_of(&e), BinOp::Eq);
    }

    #[test]
    fn left_associative_arithmetic() {
        let e = parse("1 - 2 - 3");
        match &e.kind {
            ExprKind::Binary { op, lhs, .. } => {
                assert_eq!(*op, BinOp::Sub);
                assert_eq!(binary_op_of(lhs), BinOp::Sub);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn unary_minus_on_range_operands() {
        let e = parse("-3 .. -1");
        assert_eq!(binary_op_of(&e), BinOp::Range);
    }

    #[test]
    fn indexing_binds_tightest() {
        let e = parse("-xs[0]");
        match &e.kind {
            ExprKind::Unary { operand, .. } => {
                assert!(matches!(operand.kind, ExprKind::Index { .. }));
            }
            _ => panic!("expected unary"),
        }
    }

    #[test]
    fn if_then_else_expression() {
        let e = parse("if 1 < 2 then 1 .. 3 else 0 .. 0");
        assert!(matches!(e.kind, ExprKind::If { .. }));
    }

    #[test]
    fn lexical_error_reported_with_kind() {
        let err = parse_err("1 ~ 2");
        assert_eq!(err.kind, ParseErrorKind::Lexical);
    }

    #[test]
    fn lexical_error_in_prefix_position() {
        let err = parse_err("~ 1");
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn unexpected_token_in_prefix_position() {
        let err = parse_err(") 1");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert!(err.message.contains("unexpected"));
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn error_positions_are_one_based() {
        let err = parse_err("1 .. 2 .. 3");
        assert_eq!(err.line, 1);
        assert!(err.col > 1);
    }

    #[test]
    fn program_with_let_bindings() {
        let stmts = parse_program("let lo = 1\nlet hi = 5\nlo .. hi").unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0], Stmt::Let { .. }));
        assert!(matches!(stmts[2], Stmt::Expr(_)));
    }

    #[test]
    fn semicolons_separate_statements() {
        let stmts = parse_program("let x = 1; x + 1").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn let_requires_a_name() {
        let err = parse_program("let 1 = 2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn trailing_garbage_rejected() {
        let err = parse_err("1 2");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
    }

    // -- Round trips (the printer law, spot checks; the property test in
    //    tests/property_tests.rs covers arbitrary nesting) --

    #[test]
    fn print_reparse_round_trip() {
        for src in [
            "1 .. 5",
            "1 + 2 .. 10 - 1",
            "(1 .. 2) == (1 .. 2)",
            "-3 .. 3 * 4",
            "if a < b then a .. b else b .. a",
            "xs[0] .. xs[1]",
            "!a && b || c",
            "1.5 .. 2.5e3",
        ] {
            let ast = parse(src);
            let printed = ast.to_source();
            let reparsed = parse(&printed);
            assert_eq!(ast, reparsed, "round trip failed for {:?} -> {:?}", src, printed);
        }
    }
}
