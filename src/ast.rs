//! AST for Quill expressions, plus the shared precedence table and the
//! source re-serializer ("pretty printer").
//!
//! Parser and printer both read precedence from [`BinOp::precedence`] —
//! a single table, so the printed parenthesization cannot drift from the
//! grammar.

use std::fmt;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Source position (1-based line, 1-based column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(line: usize, col: usize) -> Self {
        Pos { line, col }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `a .. b` — inclusive range, materializes a packed sequence.
    Range,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Precedence of an `if/then/else` expression (binds loosest).
pub const IF_PRECEDENCE: u8 = 0;
/// Precedence of prefix `-` and `!`.
pub const UNARY_PRECEDENCE: u8 = 6;
/// Precedence of postfix indexing `a[i]`.
pub const INDEX_PRECEDENCE: u8 = 7;

impl BinOp {
    /// Precedence tier, low binds loosest. The range operator shares the
    /// comparison tier: lower than arithmetic, higher than `&&`.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq
            | BinOp::Ne
            | BinOp::Lt
            | BinOp::Le
            | BinOp::Gt
            | BinOp::Ge
            | BinOp::Range => 3,
            BinOp::Add | BinOp::Sub => 4,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 5,
        }
    }

    /// The comparison tier cannot chain: `a .. b .. c` and `a < b < c`
    /// are grammar errors, not runtime ones. A range is not a sensible
    /// input to another range, so rejecting at parse time gives the
    /// earlier, clearer error.
    pub fn is_non_associative(self) -> bool {
        self.precedence() == 3
    }

    pub fn lexeme(self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Range => "..",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An expression node with its source position.
///
/// Equality is structural: positions do not participate, so a printed and
/// re-parsed tree compares equal to the original.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Exactly two children, both present by construction.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Index {
        seq: Box<Expr>,
        index: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Expr { kind, pos }
    }

    /// Precedence of this node when it appears as an operand.
    fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Unary { .. } => UNARY_PRECEDENCE,
            ExprKind::Index { .. } => INDEX_PRECEDENCE,
            ExprKind::If { .. } => IF_PRECEDENCE,
            _ => u8::MAX, // atoms never need parens
        }
    }

    /// Re-serialize to source text with minimal parenthesization.
    /// Round-trip law: `parse(expr.to_source()) == expr`.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    /// Write this node, wrapping in parens when its precedence is below
    /// what the surrounding context requires.
    fn write(&self, out: &mut String, min_prec: u8) {
        let prec = self.precedence();
        let parens = prec < min_prec;
        if parens {
            out.push('(');
        }
        match &self.kind {
            ExprKind::Int(n) => out.push_str(&n.to_string()),
            // {:?} keeps the decimal point (`3.0`, not `3`) so the text
            // re-lexes as a float.
            ExprKind::Float(f) => out.push_str(&format!("{:?}", f)),
            ExprKind::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ExprKind::Str(s) => {
                out.push('"');
                for c in s.chars() {
                    match c {
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            ExprKind::Var(name) => out.push_str(name),
            ExprKind::Unary { op, operand } => {
                out.push_str(op.lexeme());
                operand.write(out, UNARY_PRECEDENCE);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let p = op.precedence();
                // Left-assoc tiers reassociate an equal-precedence right
                // child; the non-assoc tier cannot chain on either side.
                let (lhs_min, rhs_min) = if op.is_non_associative() {
                    (p + 1, p + 1)
                } else {
                    (p, p + 1)
                };
                lhs.write(out, lhs_min);
                out.push(' ');
                out.push_str(op.lexeme());
                out.push(' ');
                rhs.write(out, rhs_min);
            }
            ExprKind::Index { seq, index } => {
                seq.write(out, INDEX_PRECEDENCE);
                out.push('[');
                index.write(out, 0);
                out.push(']');
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.push_str("if ");
                cond.write(out, IF_PRECEDENCE + 1);
                out.push_str(" then ");
                then_branch.write(out, 0);
                out.push_str(" else ");
                else_branch.write(out, 0);
            }
        }
        if parens {
            out.push(')');
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source())
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A top-level statement. A program is a statement list; its value is the
/// value of the last expression statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: String, value: Expr, pos: Pos },
    Expr(Expr),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
