//! The bytecode executor: a synchronous dispatch loop over three-address
//! instructions. Each execution owns its own temp/var slots; the chunk is
//! shared read-only. Evaluating an instruction never yields control —
//! it runs to completion or raises.

pub mod range;

use super::chunk::{Chunk, Opcode, Operand};
use super::value::Value;
use range::{execute_range, RangeErrorKind};

/// Default capacity bound for sequences built by the range operator.
/// Hosts with tighter memory budgets lower it via `Vm::with_sequence_limit`.
pub const DEFAULT_MAX_SEQUENCE_LEN: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    RangeOrder,
    RangeSize,
    UnsupportedOperand,
    DivisionByZero,
    TypeMismatch,
    IndexOutOfBounds,
    /// The chunk failed validation. Compiler output never does; this is
    /// only reachable with a hand-built chunk.
    InvalidProgram,
}

/// A runtime failure. Aborts the current instruction and propagates to the
/// caller; the instruction's result slot is left unpopulated.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

// ---------------------------------------------------------------------------
// VM
// ---------------------------------------------------------------------------

const UNIT: Value = Value::Unit;

/// The execution engine. One logical thread of control per execution;
/// independent executions never share slot state.
pub struct Vm {
    temps: Vec<Value>,
    vars: Vec<Value>,
    max_sequence_len: u64,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            temps: Vec::new(),
            vars: Vec::new(),
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
        }
    }

    /// Create a VM with a specific sequence capacity bound.
    pub fn with_sequence_limit(max_sequence_len: u64) -> Self {
        let mut vm = Self::new();
        vm.max_sequence_len = max_sequence_len;
        vm
    }

    /// Execute a chunk to completion. The chunk is validated first, so
    /// slot and jump access inside the loop needs no bounds checks.
    pub fn execute(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        if let Err(message) = chunk.validate() {
            return Err(RuntimeError {
                kind: RuntimeErrorKind::InvalidProgram,
                message,
                line: 0,
                col: 0,
            });
        }
        self.temps.clear();
        self.temps.resize(chunk.temp_count as usize, Value::Unit);
        self.vars.clear();
        self.vars.resize(chunk.var_count() as usize, Value::Unit);

        let mut ip = 0usize;
        while ip < chunk.code.len() {
            let inst = &chunk.code[ip];
            let (line, col) = chunk.source_map[ip];

            match inst.op {
                Opcode::Move => {
                    let v = self.read(chunk, inst.a).clone();
                    self.write(inst.dst, v);
                }

                Opcode::Neg => {
                    let v = match self.read(chunk, inst.a) {
                        Value::Int(n) => Value::Int(n.wrapping_neg()),
                        Value::Float(f) => Value::Float(-f),
                        other => {
                            return Err(self.error(
                                RuntimeErrorKind::TypeMismatch,
                                format!("Cannot negate a {}", other.type_name()),
                                line,
                                col,
                            ))
                        }
                    };
                    self.write(inst.dst, v);
                }

                Opcode::Not => {
                    let v = match self.read(chunk, inst.a) {
                        Value::Bool(b) => Value::Bool(!b),
                        other => {
                            return Err(self.error(
                                RuntimeErrorKind::TypeMismatch,
                                format!("'!' requires a boolean, got {}", other.type_name()),
                                line,
                                col,
                            ))
                        }
                    };
                    self.write(inst.dst, v);
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                    let v = self.arithmetic(chunk, inst.op, inst.a, inst.b, line, col)?;
                    self.write(inst.dst, v);
                }

                Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
                    let v = self.comparison(chunk, inst.op, inst.a, inst.b, line, col)?;
                    self.write(inst.dst, v);
                }

                Opcode::Range => {
                    // Operand borrows end before the result is written.
                    let result = {
                        let a = self.read(chunk, inst.a);
                        let b = self.read(chunk, inst.b);
                        execute_range(a, b, self.max_sequence_len)
                    };
                    match result {
                        Ok(seq) => self.write(inst.dst, Value::seq(seq)),
                        Err(e) => {
                            let kind = match e.kind {
                                RangeErrorKind::Order => RuntimeErrorKind::RangeOrder,
                                RangeErrorKind::Size => RuntimeErrorKind::RangeSize,
                                RangeErrorKind::UnsupportedOperand => {
                                    RuntimeErrorKind::UnsupportedOperand
                                }
                            };
                            return Err(self.error(kind, e.message, line, col));
                        }
                    }
                }

                Opcode::Index => {
                    let v = self.index(chunk, inst.a, inst.b, line, col)?;
                    self.write(inst.dst, v);
                }

                Opcode::Jump => {
                    ip = inst.extra.unwrap_or_default() as usize;
                    continue;
                }

                Opcode::JumpIfFalse => {
                    let cond = match self.read(chunk, inst.a) {
                        Value::Bool(b) => *b,
                        other => {
                            return Err(self.error(
                                RuntimeErrorKind::TypeMismatch,
                                format!("Condition must be a boolean, got {}", other.type_name()),
                                line,
                                col,
                            ))
                        }
                    };
                    if !cond {
                        ip = inst.extra.unwrap_or_default() as usize;
                        continue;
                    }
                }

                Opcode::Return => {
                    return Ok(self.read(chunk, inst.a).clone());
                }
            }
            ip += 1;
        }
        Ok(Value::Unit)
    }

    // -----------------------------------------------------------------------
    // Operand access
    // -----------------------------------------------------------------------

    /// Dereference an operand slot. Chunk validation guarantees indices are
    /// in bounds; an Unused operand reads as Unit (only Return takes one).
    fn read<'a>(&'a self, chunk: &'a Chunk, operand: Operand) -> &'a Value {
        match operand {
            Operand::Constant(i) => &chunk.constants[i as usize],
            Operand::Temp(i) => &self.temps[i as usize],
            Operand::Var(i) => &self.vars[i as usize],
            Operand::Unused => &UNIT,
        }
    }

    fn write(&mut self, operand: Operand, value: Value) {
        match operand {
            Operand::Temp(i) => self.temps[i as usize] = value,
            Operand::Var(i) => self.vars[i as usize] = value,
            // Constants are immutable and Unused has no slot; chunk
            // validation rejects both as results.
            Operand::Constant(_) | Operand::Unused => unreachable!("unwritable result operand"),
        }
    }

    fn error(
        &self,
        kind: RuntimeErrorKind,
        message: String,
        line: usize,
        col: usize,
    ) -> RuntimeError {
        RuntimeError {
            kind,
            message,
            line,
            col,
        }
    }

    // -----------------------------------------------------------------------
    // Numeric dispatch
    // -----------------------------------------------------------------------

    fn arithmetic(
        &self,
        chunk: &Chunk,
        op: Opcode,
        a: Operand,
        b: Operand,
        line: usize,
        col: usize,
    ) -> Result<Value, RuntimeError> {
        let lhs = self.read(chunk, a);
        let rhs = self.read(chunk, b);
        match (lhs, rhs) {
            (Value::Int(x), Value::Int(y)) => {
                let (x, y) = (*x, *y);
                let v = match op {
                    Opcode::Add => Value::Int(x.wrapping_add(y)),
                    Opcode::Sub => Value::Int(x.wrapping_sub(y)),
                    Opcode::Mul => Value::Int(x.wrapping_mul(y)),
                    Opcode::Div => {
                        if y == 0 {
                            return Err(self.error(
                                RuntimeErrorKind::DivisionByZero,
                                "Division by zero".into(),
                                line,
                                col,
                            ));
                        }
                        Value::Int(x.wrapping_div(y))
                    }
                    Opcode::Mod => {
                        if y == 0 {
                            return Err(self.error(
                                RuntimeErrorKind::DivisionByZero,
                                "Modulo by zero".into(),
                                line,
                                col,
                            ));
                        }
                        Value::Int(x.wrapping_rem(y))
                    }
                    _ => unreachable!(),
                };
                Ok(v)
            }
            (lhs, rhs) if lhs.is_numeric() && rhs.is_numeric() && op != Opcode::Mod => {
                let x = as_f64(lhs);
                let y = as_f64(rhs);
                let v = match op {
                    Opcode::Add => x + y,
                    Opcode::Sub => x - y,
                    Opcode::Mul => x * y,
                    Opcode::Div => x / y,
                    _ => unreachable!(),
                };
                Ok(Value::Float(v))
            }
            (lhs, rhs) => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!(
                    "Cannot apply '{:?}' to {} and {}",
                    op,
                    lhs.type_name(),
                    rhs.type_name()
                ),
                line,
                col,
            )),
        }
    }

    fn comparison(
        &self,
        chunk: &Chunk,
        op: Opcode,
        a: Operand,
        b: Operand,
        line: usize,
        col: usize,
    ) -> Result<Value, RuntimeError> {
        let lhs = self.read(chunk, a);
        let rhs = self.read(chunk, b);
        // Equality is structural over any value; ordering is numeric only.
        match op {
            Opcode::Eq => return Ok(Value::Bool(lhs == rhs)),
            Opcode::Ne => return Ok(Value::Bool(lhs != rhs)),
            _ => {}
        }
        if !lhs.is_numeric() || !rhs.is_numeric() {
            return Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!(
                    "Cannot compare {} and {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                line,
                col,
            ));
        }
        let ordered = match (lhs, rhs) {
            (Value::Int(x), Value::Int(y)) => match op {
                Opcode::Lt => x < y,
                Opcode::Le => x <= y,
                Opcode::Gt => x > y,
                Opcode::Ge => x >= y,
                _ => unreachable!(),
            },
            (lhs, rhs) => {
                let x = as_f64(lhs);
                let y = as_f64(rhs);
                match op {
                    Opcode::Lt => x < y,
                    Opcode::Le => x <= y,
                    Opcode::Gt => x > y,
                    Opcode::Ge => x >= y,
                    _ => unreachable!(),
                }
            }
        };
        Ok(Value::Bool(ordered))
    }

    fn index(
        &self,
        chunk: &Chunk,
        a: Operand,
        b: Operand,
        line: usize,
        col: usize,
    ) -> Result<Value, RuntimeError> {
        let seq = self.read(chunk, a);
        let idx = self.read(chunk, b);
        let (seq, idx) = match (seq, idx) {
            (Value::Seq(seq), Value::Int(i)) => (seq, *i),
            (seq, idx) => {
                return Err(self.error(
                    RuntimeErrorKind::TypeMismatch,
                    format!(
                        "Indexing requires a sequence and an integer, got {} and {}",
                        seq.type_name(),
                        idx.type_name()
                    ),
                    line,
                    col,
                ))
            }
        };
        if idx < 0 {
            return Err(self.error(
                RuntimeErrorKind::IndexOutOfBounds,
                format!("Negative index {} (len {})", idx, seq.len()),
                line,
                col,
            ));
        }
        match seq.get(idx as usize) {
            Some(v) => Ok(v.clone()),
            None => Err(self.error(
                RuntimeErrorKind::IndexOutOfBounds,
                format!("Index {} out of bounds (len {})", idx, seq.len()),
                line,
                col,
            )),
        }
    }
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int(n) => *n as f64,
        Value::Float(f) => *f,
        _ => unreachable!("caller checked is_numeric"),
    }
}
