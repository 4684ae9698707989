//! Three-address bytecode: operand slots, instructions, and compiled chunks.
//!
//! An instruction names where its inputs live (constant pool, temporary
//! slot, or variable slot) and where its result goes. A chunk is produced
//! once by the compiler, then treated as immutable — re-entrant and safe
//! for unsynchronized concurrent reads.

use super::value::Value;

// ---------------------------------------------------------------------------
// Operands
// ---------------------------------------------------------------------------

/// A tagged reference to where a value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Index into the chunk's literal pool. Needs no cleanup.
    Constant(u16),
    /// A temporary slot holding a freshly computed value.
    Temp(u16),
    /// A named variable's slot.
    Var(u16),
    /// No operand in this position.
    Unused,
}

impl Operand {
    /// Whether this operand can be read as an instruction input.
    pub fn is_readable(self) -> bool {
        !matches!(self, Operand::Unused)
    }

    /// Whether this operand can receive an instruction result.
    pub fn is_writable(self) -> bool {
        matches!(self, Operand::Temp(_) | Operand::Var(_))
    }
}

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// dst = a
    Move,
    /// dst = -a
    Neg,
    /// dst = !a
    Not,
    // -- Arithmetic --
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // -- Comparison --
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// dst = sequence of a ..= b. Result is always freshly synthesized,
    /// so dst must be a Temp — never a Var slot.
    Range,
    /// dst = a[b]
    Index,
    /// ip = extra
    Jump,
    /// if !a { ip = extra }
    JumpIfFalse,
    /// Finish execution with a (or Unit when a is Unused).
    Return,
}

impl Opcode {
    /// How many input operands this opcode reads (`a`, then `b`).
    pub fn input_arity(self) -> usize {
        match self {
            Opcode::Jump => 0,
            Opcode::Move
            | Opcode::Neg
            | Opcode::Not
            | Opcode::JumpIfFalse
            | Opcode::Return => 1,
            _ => 2,
        }
    }

    pub fn has_result(self) -> bool {
        !matches!(self, Opcode::Jump | Opcode::JumpIfFalse | Opcode::Return)
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIfFalse)
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// One bytecode operation: `dst = op(a, b)`, with `extra` holding the
/// absolute jump target for Jump/JumpIfFalse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub a: Operand,
    pub b: Operand,
    pub dst: Operand,
    pub extra: Option<u32>,
}

impl Instruction {
    pub fn new(op: Opcode, a: Operand, b: Operand, dst: Operand) -> Self {
        Instruction {
            op,
            a,
            b,
            dst,
            extra: None,
        }
    }

    pub fn jump(target: Option<u32>) -> Self {
        Instruction {
            op: Opcode::Jump,
            a: Operand::Unused,
            b: Operand::Unused,
            dst: Operand::Unused,
            extra: target,
        }
    }

    pub fn jump_if_false(cond: Operand, target: Option<u32>) -> Self {
        Instruction {
            op: Opcode::JumpIfFalse,
            a: cond,
            b: Operand::Unused,
            dst: Operand::Unused,
            extra: target,
        }
    }

    /// Check the operand-kind rules for this opcode.
    pub fn check(&self) -> Result<(), String> {
        let arity = self.op.input_arity();
        if arity >= 1 && self.op != Opcode::Return && !self.a.is_readable() {
            return Err(format!("{:?}: operand 'a' must be readable", self.op));
        }
        if arity >= 2 && !self.b.is_readable() {
            return Err(format!("{:?}: operand 'b' must be readable", self.op));
        }
        if arity < 2 && self.b != Operand::Unused {
            return Err(format!("{:?}: operand 'b' must be unused", self.op));
        }
        if self.op.has_result() {
            if !self.dst.is_writable() {
                return Err(format!("{:?}: result must be a Temp or Var slot", self.op));
            }
            // A range's result is always freshly synthesized; it must land
            // in a temporary, never alias a variable slot.
            if self.op == Opcode::Range && !matches!(self.dst, Operand::Temp(_)) {
                return Err("Range: result must be a Temp slot".into());
            }
        } else if self.dst != Operand::Unused {
            return Err(format!("{:?}: result must be unused", self.op));
        }
        if self.op.is_jump() && self.extra.is_none() {
            return Err(format!("{:?}: missing jump target", self.op));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A compiled unit: instruction array, literal pool, slot counts, and
/// per-instruction source locations.
#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<Instruction>,
    pub constants: Vec<Value>,
    /// Source locations: (line, col) per instruction index.
    pub source_map: Vec<(usize, usize)>,
    /// Number of temporary slots the executor must provide.
    pub temp_count: u16,
    /// Variable slot names, in slot order.
    pub var_names: Vec<String>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var_count(&self) -> u16 {
        self.var_names.len() as u16
    }

    /// Emit an instruction, recording its source location. Returns the
    /// instruction's index (used for later jump patching).
    pub fn emit(&mut self, instruction: Instruction, line: usize, col: usize) -> usize {
        let idx = self.code.len();
        self.code.push(instruction);
        self.source_map.push((line, col));
        idx
    }

    /// Add a constant to the pool, returning its index, or `None` once the
    /// pool can no longer be addressed by a u16.
    /// Deduplicates: if an equal constant already exists, returns its index.
    pub fn add_constant(&mut self, value: Value) -> Option<u16> {
        if let Some(idx) = self.constants.iter().position(|v| v == &value) {
            return Some(idx as u16);
        }
        if self.constants.len() > usize::from(u16::MAX) {
            return None;
        }
        let idx = self.constants.len() as u16;
        self.constants.push(value);
        Some(idx)
    }

    /// Point the jump at `offset` to the next instruction to be emitted.
    pub fn patch_jump(&mut self, offset: usize) {
        let target = self.code.len() as u32;
        let instruction = &mut self.code[offset];
        debug_assert!(instruction.op.is_jump(), "patch_jump on non-jump");
        instruction.extra = Some(target);
    }

    /// Validate every instruction: operand kinds legal for the opcode and
    /// all slot/pool/jump indices in bounds. Compiler output always passes.
    pub fn validate(&self) -> Result<(), String> {
        for (idx, instruction) in self.code.iter().enumerate() {
            instruction
                .check()
                .map_err(|e| format!("instruction {}: {}", idx, e))?;
            for operand in [instruction.a, instruction.b, instruction.dst] {
                let ok = match operand {
                    Operand::Constant(i) => (i as usize) < self.constants.len(),
                    Operand::Temp(i) => i < self.temp_count,
                    Operand::Var(i) => i < self.var_count(),
                    Operand::Unused => true,
                };
                if !ok {
                    return Err(format!(
                        "instruction {}: operand {:?} out of bounds",
                        idx, operand
                    ));
                }
            }
            if let Some(target) = instruction.extra {
                // A jump may target one past the end (fallthrough to Return
                // is still emitted after patching), but never beyond.
                if target as usize > self.code.len() {
                    return Err(format!("instruction {}: jump target {} out of bounds", idx, target));
                }
            }
        }
        Ok(())
    }

    /// Human-readable disassembly (for `quillc disasm`).
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (idx, instruction) in self.code.iter().enumerate() {
            out.push_str(&format!("{:04}  {:<12}", idx, format!("{:?}", instruction.op)));
            for operand in [instruction.a, instruction.b] {
                match operand {
                    Operand::Constant(i) => {
                        out.push_str(&format!(" const[{}]={}", i, self.constants[i as usize]))
                    }
                    Operand::Temp(i) => out.push_str(&format!(" t{}", i)),
                    Operand::Var(i) => {
                        out.push_str(&format!(" {}", self.var_names[i as usize]))
                    }
                    Operand::Unused => {}
                }
            }
            if let Operand::Temp(i) = instruction.dst {
                out.push_str(&format!(" -> t{}", i));
            } else if let Operand::Var(i) = instruction.dst {
                out.push_str(&format!(" -> {}", self.var_names[i as usize]));
            }
            if let Some(target) = instruction.extra {
                out.push_str(&format!(" @{:04}", target));
            }
            out.push('\n');
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
