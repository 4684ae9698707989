//! The range operator's evaluation: `execute_range` builds a packed
//! sequence from two numeric bounds, or reports why it cannot.
//!
//! Three branches, selected by dynamic operand type:
//!   1. both integers          — exact 64-bit path
//!   2. at least one float     — both bounds promote to `Decimal`
//!                               (96-bit mantissa, i64 converts losslessly)
//!   3. anything else          — unsupported operand, no partial sequence

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::vm::value::{Sequence, Value};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeErrorKind {
    /// start > end.
    Order,
    /// The element count exceeds the sequence capacity bound.
    Size,
    /// An operand is neither integer nor float (or not a finite float).
    UnsupportedOperand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeError {
    pub kind: RangeErrorKind,
    pub message: String,
}

impl RangeError {
    fn order(message: String) -> Self {
        RangeError {
            kind: RangeErrorKind::Order,
            message,
        }
    }

    fn size(max_len: u64) -> Self {
        RangeError {
            kind: RangeErrorKind::Size,
            message: format!("Range too large (max {} elements)", max_len.saturating_sub(1)),
        }
    }

    fn unsupported(message: String) -> Self {
        RangeError {
            kind: RangeErrorKind::UnsupportedOperand,
            message,
        }
    }
}

impl std::fmt::Display for RangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// execute_range
// ---------------------------------------------------------------------------

/// Evaluate `start .. end` into a packed sequence.
///
/// `max_len` is the capacity bound of the sequence implementation; a range
/// whose inclusive span reaches `max_len - 1` elements is rejected before
/// any allocation.
pub fn execute_range(start: &Value, end: &Value, max_len: u64) -> Result<Sequence, RangeError> {
    match (start, end) {
        (Value::Int(min), Value::Int(max)) => int_range(*min, *max, max_len),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            float_range(numeric_f64(a), numeric_f64(b), a, b, max_len)
        }
        (a, b) => Err(RangeError::unsupported(format!(
            "Range requires integers or floats, got {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn numeric_f64(v: &Value) -> f64 {
    match v {
        Value::Int(n) => *n as f64,
        Value::Float(f) => *f,
        _ => unreachable!("caller checked is_numeric"),
    }
}

/// Promote to Decimal without a lossy trip through f64 for integers.
fn numeric_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Int(n) => Some(Decimal::from(*n)),
        Value::Float(f) => Decimal::from_f64(*f),
        _ => None,
    }
}

fn int_range(min: i64, max: i64, max_len: u64) -> Result<Sequence, RangeError> {
    if min > max {
        return Err(RangeError::order(format!(
            "Range start must be <= end ({} > {})",
            min, max
        )));
    }
    // Unsigned subtraction: correct even for i64::MIN .. i64::MAX, where
    // the signed difference would overflow.
    let span = (max as u64).wrapping_sub(min as u64);
    // Bound check BEFORE the +1, so the i64::MIN..i64::MAX span (u64::MAX)
    // cannot overflow into a tiny count.
    if span >= max_len.saturating_sub(1) {
        return Err(RangeError::size(max_len));
    }
    let mut seq = Sequence::with_capacity((span + 1) as usize);
    for i in 0..=span {
        // min + i never exceeds max, so the wrap never actually happens.
        seq.push(Value::Int(min.wrapping_add(i as i64)));
    }
    Ok(seq)
}

/// Float branch. Ordering, bound check, and element synthesis all happen
/// in `Decimal` so a 64-bit integer bound keeps full precision. Doubles
/// outside Decimal's range (|x| ≈ 7.9e28) fall back to the same checks in
/// f64 — at that magnitude adjacent doubles are further than 1 apart, so
/// no precision is being protected anyway.
fn float_range(
    min: f64,
    max: f64,
    start: &Value,
    end: &Value,
    max_len: u64,
) -> Result<Sequence, RangeError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(RangeError::unsupported(
            "Range bounds must be finite numbers".into(),
        ));
    }

    let bound = Decimal::from(max_len.saturating_sub(1));
    match (numeric_decimal(start), numeric_decimal(end)) {
        (Some(dmin), Some(dmax)) => {
            if dmin > dmax {
                return Err(RangeError::order(format!(
                    "Range start must be <= end ({} > {})",
                    dmin, dmax
                )));
            }
            let span = dmax - dmin;
            if span >= bound {
                return Err(RangeError::size(max_len));
            }
            // Truncate only after the bound check passed.
            let count = span.floor().to_u64().unwrap_or(0) + 1;
            let mut seq = Sequence::with_capacity(count as usize);
            for i in 0..count {
                let v = dmin + Decimal::from(i);
                seq.push(Value::Float(v.to_f64().unwrap_or(min + i as f64)));
            }
            Ok(seq)
        }
        _ => {
            if min > max {
                return Err(RangeError::order(format!(
                    "Range start must be <= end ({} > {})",
                    min, max
                )));
            }
            let span = max - min;
            if span >= max_len.saturating_sub(1) as f64 {
                return Err(RangeError::size(max_len));
            }
            let count = span.floor() as u64 + 1;
            let mut seq = Sequence::with_capacity(count as usize);
            for i in 0..count {
                seq.push(Value::Float(min + i as f64));
            }
            Ok(seq)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::exec::DEFAULT_MAX_SEQUENCE_LEN;

    fn ints(seq: &Sequence) -> Vec<i64> {
        seq.iter()
            .map(|v| match v {
                Value::Int(n) => *n,
                other => panic!("expected Int, got {:?}", other),
            })
            .collect()
    }

    fn floats(seq: &Sequence) -> Vec<f64> {
        seq.iter()
            .map(|v| match v {
                Value::Float(f) => *f,
                other => panic!("expected Float, got {:?}", other),
            })
            .collect()
    }

    fn range(a: Value, b: Value) -> Result<Sequence, RangeError> {
        execute_range(&a, &b, DEFAULT_MAX_SEQUENCE_LEN)
    }

    // -- Integer branch --

    #[test]
    fn ascending_ints_inclusive() {
        let seq = range(Value::Int(1), Value::Int(5)).unwrap();
        assert_eq!(ints(&seq), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn single_element_when_equal() {
        let seq = range(Value::Int(7), Value::Int(7)).unwrap();
        assert_eq!(ints(&seq), vec![7]);
    }

    #[test]
    fn negative_bounds() {
        let seq = range(Value::Int(-3), Value::Int(1)).unwrap();
        assert_eq!(ints(&seq), vec![-3, -2, -1, 0, 1]);
    }

    #[test]
    fn reversed_ints_raise_order_error() {
        let err = range(Value::Int(5), Value::Int(1)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Order);
        assert!(err.message.contains("start must be <= end"));
    }

    #[test]
    fn too_large_raises_size_error() {
        let err = range(Value::Int(0), Value::Int(i64::MAX)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Size);
    }

    #[test]
    fn full_i64_span_does_not_overflow() {
        // max - min here is u64::MAX; the unsigned span plus the
        // pre-increment bound check must reject it cleanly.
        let err = range(Value::Int(i64::MIN), Value::Int(i64::MAX)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Size);
    }

    #[test]
    fn size_boundary_is_exclusive() {
        // span == max_len - 1 is rejected; span == max_len - 2 fits.
        let max_len = 10;
        let err = execute_range(&Value::Int(0), &Value::Int(9), max_len).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Size);
        let seq = execute_range(&Value::Int(0), &Value::Int(8), max_len).unwrap();
        assert_eq!(seq.len(), 9);
    }

    #[test]
    fn span_near_i64_min_works() {
        let seq = range(Value::Int(i64::MIN), Value::Int(i64::MIN + 2)).unwrap();
        assert_eq!(ints(&seq), vec![i64::MIN, i64::MIN + 1, i64::MIN + 2]);
    }

    // -- Float branch --

    #[test]
    fn mixed_float_int_counts_by_floor() {
        let seq = range(Value::Float(2.5), Value::Int(5)).unwrap();
        assert_eq!(floats(&seq), vec![2.5, 3.5, 4.5]);
    }

    #[test]
    fn float_float_range() {
        let seq = range(Value::Float(0.5), Value::Float(3.5)).unwrap();
        assert_eq!(floats(&seq), vec![0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn int_then_float_promotes() {
        let seq = range(Value::Int(1), Value::Float(3.25)).unwrap();
        assert_eq!(floats(&seq), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn equal_floats_yield_one_element() {
        let seq = range(Value::Float(2.5), Value::Float(2.5)).unwrap();
        assert_eq!(floats(&seq), vec![2.5]);
    }

    #[test]
    fn reversed_floats_raise_order_error() {
        let err = range(Value::Float(5.0), Value::Float(1.0)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Order);
        let err = range(Value::Int(3), Value::Float(2.5)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Order);
    }

    #[test]
    fn float_span_size_error() {
        let err = range(Value::Float(0.0), Value::Float(2e9)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Size);
    }

    #[test]
    fn large_int_bound_is_not_rounded() {
        // 2^53 + 1 is not representable as f64; the Decimal promotion must
        // keep it exact so the span (and count) is right.
        let big = (1i64 << 53) + 1;
        let end = ((1i64 << 53) + 4) as f64; // exactly representable
        let seq = range(Value::Int(big), Value::Float(end)).unwrap();
        // Exact span is 3 (count 4). A lossy f64 promotion of `big` would
        // round it down to 2^53 and produce 5 elements.
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn nonfinite_bound_is_unsupported() {
        let err = range(Value::Float(f64::NAN), Value::Int(1)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::UnsupportedOperand);
        let err = range(Value::Float(0.0), Value::Float(f64::INFINITY)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::UnsupportedOperand);
    }

    #[test]
    fn out_of_decimal_range_falls_back_to_f64() {
        // 1e30 exceeds Decimal's range; the f64 fallback still applies the
        // order and size checks.
        let seq = range(Value::Float(1e30), Value::Float(1e30)).unwrap();
        assert_eq!(seq.len(), 1);
        let err = range(Value::Float(1e30), Value::Float(2e30)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Size);
        let err = range(Value::Float(2e30), Value::Float(1e30)).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Order);
    }

    // -- Unsupported operands --

    #[test]
    fn string_operand_is_unsupported() {
        let err = range(Value::Int(1), Value::str("1")).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::UnsupportedOperand);
        assert!(err.message.contains("integers or floats"));
    }

    #[test]
    fn non_numeric_operands_are_unsupported() {
        for bad in [
            Value::Bool(true),
            Value::Unit,
            Value::seq(Sequence::with_capacity(0)),
        ] {
            let err = range(bad.clone(), Value::Int(1)).unwrap_err();
            assert_eq!(err.kind, RangeErrorKind::UnsupportedOperand, "{:?}", bad);
            let err = range(Value::Int(1), bad.clone()).unwrap_err();
            assert_eq!(err.kind, RangeErrorKind::UnsupportedOperand, "{:?}", bad);
        }
    }

    #[test]
    fn no_partial_sequence_on_failure() {
        // Every failure returns Err alone; nothing half-built escapes.
        assert!(range(Value::Int(5), Value::Int(1)).is_err());
        assert!(range(Value::str("a"), Value::str("b")).is_err());
    }
}
