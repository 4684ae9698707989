//! AST → three-address bytecode lowering.
//!
//! Post-order: an expression's operands are lowered to readable slots
//! before the instruction that consumes them is emitted. `compile_expr`
//! returns the operand where the result lives — a Constant for literals,
//! a Var for named bindings, a fresh Temp for anything computed.

use crate::ast::{BinOp, Expr, ExprKind, Pos, Stmt, UnaryOp};

use super::chunk::{Chunk, Instruction, Opcode, Operand};
use super::value::Value;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Compiler {
    chunk: Chunk,
    next_temp: u16,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a statement list. The chunk returns the value of the last
    /// expression statement (Unit if there is none).
    pub fn compile_program(mut self, stmts: &[Stmt]) -> Result<Chunk, CompileError> {
        let mut result = Operand::Unused;
        for stmt in stmts {
            match stmt {
                Stmt::Let { name, value, pos } => {
                    let src = self.compile_expr(value)?;
                    let slot = self.declare_var(name, *pos)?;
                    self.emit(
                        Instruction::new(Opcode::Move, src, Operand::Unused, Operand::Var(slot)),
                        *pos,
                    );
                    result = Operand::Unused;
                }
                Stmt::Expr(expr) => {
                    result = self.compile_expr(expr)?;
                }
            }
        }
        let pos = stmts
            .last()
            .map(|s| match s {
                Stmt::Let { pos, .. } => *pos,
                Stmt::Expr(e) => e.pos,
            })
            .unwrap_or_default();
        self.emit(
            Instruction::new(Opcode::Return, result, Operand::Unused, Operand::Unused),
            pos,
        );
        self.chunk.temp_count = self.next_temp;
        debug_assert!(self.chunk.validate().is_ok(), "compiler emitted invalid chunk");
        Ok(self.chunk)
    }

    /// Compile a single expression as a whole program.
    pub fn compile_expression(self, expr: &Expr) -> Result<Chunk, CompileError> {
        self.compile_program(std::slice::from_ref(&Stmt::Expr(expr.clone())))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) -> Result<Operand, CompileError> {
        match &expr.kind {
            ExprKind::Int(n) => self.constant(Value::Int(*n), expr.pos),
            ExprKind::Float(f) => self.constant(Value::Float(*f), expr.pos),
            ExprKind::Bool(b) => self.constant(Value::Bool(*b), expr.pos),
            ExprKind::Str(s) => self.constant(Value::str(s), expr.pos),
            ExprKind::Var(name) => match self.lookup_var(name) {
                Some(slot) => Ok(Operand::Var(slot)),
                None => Err(CompileError {
                    message: format!("Undefined variable: {}", name),
                    line: expr.pos.line,
                    col: expr.pos.col,
                }),
            },
            ExprKind::Unary { op, operand } => {
                let a = self.compile_expr(operand)?;
                let dst = self.fresh_temp(expr.pos)?;
                let opcode = match op {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                };
                self.emit(Instruction::new(opcode, a, Operand::Unused, dst), expr.pos);
                Ok(dst)
            }
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinOp::Range => self.compile_range(lhs, rhs, expr.pos),
                BinOp::And => self.compile_and(lhs, rhs, expr.pos),
                BinOp::Or => self.compile_or(lhs, rhs, expr.pos),
                _ => {
                    let a = self.compile_expr(lhs)?;
                    let b = self.compile_expr(rhs)?;
                    let dst = self.fresh_temp(expr.pos)?;
                    let opcode = match op {
                        BinOp::Add => Opcode::Add,
                        BinOp::Sub => Opcode::Sub,
                        BinOp::Mul => Opcode::Mul,
                        BinOp::Div => Opcode::Div,
                        BinOp::Mod => Opcode::Mod,
                        BinOp::Eq => Opcode::Eq,
                        BinOp::Ne => Opcode::Ne,
                        BinOp::Lt => Opcode::Lt,
                        BinOp::Le => Opcode::Le,
                        BinOp::Gt => Opcode::Gt,
                        BinOp::Ge => Opcode::Ge,
                        BinOp::Range | BinOp::And | BinOp::Or => unreachable!(),
                    };
                    self.emit(Instruction::new(opcode, a, b, dst), expr.pos);
                    Ok(dst)
                }
            },
            ExprKind::Index { seq, index } => {
                let a = self.compile_expr(seq)?;
                let b = self.compile_expr(index)?;
                let dst = self.fresh_temp(expr.pos)?;
                self.emit(Instruction::new(Opcode::Index, a, b, dst), expr.pos);
                Ok(dst)
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let dst = self.fresh_temp(expr.pos)?;
                let c = self.compile_expr(cond)?;
                let to_else = self.emit(Instruction::jump_if_false(c, None), expr.pos);
                let t = self.compile_expr(then_branch)?;
                self.emit(Instruction::new(Opcode::Move, t, Operand::Unused, dst), then_branch.pos);
                let to_end = self.emit(Instruction::jump(None), then_branch.pos);
                self.chunk.patch_jump(to_else);
                let e = self.compile_expr(else_branch)?;
                self.emit(Instruction::new(Opcode::Move, e, Operand::Unused, dst), else_branch.pos);
                self.chunk.patch_jump(to_end);
                Ok(dst)
            }
        }
    }

    /// Lower `lhs .. rhs`: both sides first (post-order), then exactly one
    /// Range instruction into a fresh Temp. The result never aliases a Var
    /// slot — a range is always freshly synthesized.
    fn compile_range(&mut self, lhs: &Expr, rhs: &Expr, pos: Pos) -> Result<Operand, CompileError> {
        let a = self.compile_expr(lhs)?;
        let b = self.compile_expr(rhs)?;
        let dst = self.fresh_temp(pos)?;
        self.emit(Instruction::new(Opcode::Range, a, b, dst), pos);
        Ok(dst)
    }

    fn compile_and(&mut self, lhs: &Expr, rhs: &Expr, pos: Pos) -> Result<Operand, CompileError> {
        let dst = self.fresh_temp(pos)?;
        let a = self.compile_expr(lhs)?;
        let to_false = self.emit(Instruction::jump_if_false(a, None), pos);
        let b = self.compile_expr(rhs)?;
        self.emit(Instruction::new(Opcode::Move, b, Operand::Unused, dst), pos);
        let to_end = self.emit(Instruction::jump(None), pos);
        self.chunk.patch_jump(to_false);
        let f = self.constant(Value::Bool(false), pos)?;
        self.emit(Instruction::new(Opcode::Move, f, Operand::Unused, dst), pos);
        self.chunk.patch_jump(to_end);
        Ok(dst)
    }

    fn compile_or(&mut self, lhs: &Expr, rhs: &Expr, pos: Pos) -> Result<Operand, CompileError> {
        let dst = self.fresh_temp(pos)?;
        let a = self.compile_expr(lhs)?;
        let to_rhs = self.emit(Instruction::jump_if_false(a, None), pos);
        let t = self.constant(Value::Bool(true), pos)?;
        self.emit(Instruction::new(Opcode::Move, t, Operand::Unused, dst), pos);
        let to_end = self.emit(Instruction::jump(None), pos);
        self.chunk.patch_jump(to_rhs);
        let b = self.compile_expr(rhs)?;
        self.emit(Instruction::new(Opcode::Move, b, Operand::Unused, dst), pos);
        self.chunk.patch_jump(to_end);
        Ok(dst)
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    fn overflow(what: &str, pos: Pos) -> CompileError {
        CompileError {
            message: format!("Too many {} in one compiled unit", what),
            line: pos.line,
            col: pos.col,
        }
    }

    fn constant(&mut self, value: Value, pos: Pos) -> Result<Operand, CompileError> {
        match self.chunk.add_constant(value) {
            Some(idx) => Ok(Operand::Constant(idx)),
            None => Err(Self::overflow("constants", pos)),
        }
    }

    fn fresh_temp(&mut self, pos: Pos) -> Result<Operand, CompileError> {
        if self.next_temp == u16::MAX {
            return Err(Self::overflow("temporaries", pos));
        }
        let slot = self.next_temp;
        self.next_temp += 1;
        Ok(Operand::Temp(slot))
    }

    /// Resolve or create the Var slot for a `let`. Re-binding a name
    /// reuses its slot.
    fn declare_var(&mut self, name: &str, pos: Pos) -> Result<u16, CompileError> {
        if let Some(slot) = self.lookup_var(name) {
            return Ok(slot);
        }
        if self.chunk.var_names.len() > usize::from(u16::MAX) {
            return Err(Self::overflow("variables", pos));
        }
        let slot = self.chunk.var_count();
        self.chunk.var_names.push(name.to_string());
        Ok(slot)
    }

    fn lookup_var(&self, name: &str) -> Option<u16> {
        self.chunk
            .var_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as u16)
    }

    fn emit(&mut self, instruction: Instruction, pos: Pos) -> usize {
        self.chunk.emit(instruction, pos.line, pos.col)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
