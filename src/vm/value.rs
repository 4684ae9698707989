//! Runtime values and the packed sequence type.

use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Tagged runtime value. Int/Float/Bool are copy-by-value; strings and
/// sequences carry shared ownership so cloning a value is cheap.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Arc<str>),
    Seq(Arc<Sequence>),
    Unit,
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    pub fn seq(seq: Sequence) -> Value {
        Value::Seq(Arc::new(seq))
    }

    /// Type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Unit => "unit",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Seq(seq) => {
                write!(f, "[")?;
                for (i, item) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Unit => write!(f, "()"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// Packed, densely indexed collection: indices are exactly `0..len`, and
/// the index of an element IS its insertion order. Capacity is declared up
/// front; the range handler builds one of these per evaluation and hands
/// ownership to the result slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    items: Vec<Value>,
}

impl Sequence {
    pub fn with_capacity(capacity: usize) -> Self {
        Sequence {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Append a value at the next dense index.
    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

impl FromIterator<Value> for Sequence {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Sequence {
            items: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
