//! Property-based tests using proptest
//!
//! Tests invariants that should hold for all inputs:
//! 1. Round trip: printing an expression and re-parsing it yields an
//!    identical tree
//! 2. Totality: the parser never panics on arbitrary input
//! 3. Range laws: element count and contents of evaluated ranges
//! 4. Determinism: evaluating the same source twice gives the same value

use proptest::prelude::*;

use quillc::ast::{BinOp, Expr, ExprKind, Pos, UnaryOp};
use quillc::parser::{parse_expression, parse_program};
use quillc::vm::exec::range::{execute_range, RangeErrorKind};
use quillc::vm::exec::DEFAULT_MAX_SEQUENCE_LEN;
use quillc::vm::value::Value;

/// Generate an arbitrary expression tree.
///
/// Numeric atoms are non-negative: a negative literal prints as `-n`,
/// which re-parses as a unary negation node, so negatives are expressed
/// through `Unary` instead. Floats are built from two small integers to
/// stay clear of exponent notation, which the printer never emits.
fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0i64..1000).prop_map(|n| Expr::new(ExprKind::Int(n), Pos::default())),
        (0i32..1000, 0i32..100).prop_map(|(a, b)| {
            Expr::new(ExprKind::Float(a as f64 + b as f64 / 100.0), Pos::default())
        }),
        any::<bool>().prop_map(|b| Expr::new(ExprKind::Bool(b), Pos::default())),
        "v[a-z]{0,4}".prop_map(|name| Expr::new(ExprKind::Var(name), Pos::default())),
        "[ -~]{0,8}".prop_map(|s| Expr::new(ExprKind::Str(s), Pos::default())),
    ];

    leaf.prop_recursive(5, 64, 3, |inner| {
        let op = prop_oneof![
            Just(BinOp::Or),
            Just(BinOp::And),
            Just(BinOp::Eq),
            Just(BinOp::Ne),
            Just(BinOp::Lt),
            Just(BinOp::Le),
            Just(BinOp::Gt),
            Just(BinOp::Ge),
            Just(BinOp::Range),
            Just(BinOp::Add),
            Just(BinOp::Sub),
            Just(BinOp::Mul),
            Just(BinOp::Div),
            Just(BinOp::Mod),
        ];
        prop_oneof![
            (op, inner.clone(), inner.clone()).prop_map(|(op, lhs, rhs)| {
                Expr::new(
                    ExprKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    Pos::default(),
                )
            }),
            (
                prop_oneof![Just(UnaryOp::Neg), Just(UnaryOp::Not)],
                inner.clone()
            )
                .prop_map(|(op, operand)| {
                    Expr::new(
                        ExprKind::Unary {
                            op,
                            operand: Box::new(operand),
                        },
                        Pos::default(),
                    )
                }),
            (inner.clone(), inner.clone()).prop_map(|(seq, index)| {
                Expr::new(
                    ExprKind::Index {
                        seq: Box::new(seq),
                        index: Box::new(index),
                    },
                    Pos::default(),
                )
            }),
            (inner.clone(), inner.clone(), inner).prop_map(|(cond, t, e)| {
                Expr::new(
                    ExprKind::If {
                        cond: Box::new(cond),
                        then_branch: Box::new(t),
                        else_branch: Box::new(e),
                    },
                    Pos::default(),
                )
            }),
        ]
    })
}

proptest! {
    /// Printing an expression and re-parsing it yields a structurally
    /// identical tree.
    #[test]
    fn print_parse_round_trip(expr in arb_expr()) {
        let text = expr.to_source();
        let reparsed = parse_expression(&text)
            .unwrap_or_else(|e| panic!("failed to re-parse {:?}: {}", text, e));
        prop_assert_eq!(&reparsed, &expr, "text was {:?}", text);
    }

    /// The parser returns a Result on arbitrary input rather than panicking.
    #[test]
    fn parse_never_panics(input in "\\PC{0,200}") {
        let _ = parse_program(&input);
    }

    /// An in-order integer range has exactly `end - start + 1` elements,
    /// and element `i` is `start + i`.
    #[test]
    fn int_range_length_and_contents(start in -10_000i64..10_000, span in 0i64..500) {
        let end = start + span;
        let seq = execute_range(
            &Value::Int(start),
            &Value::Int(end),
            DEFAULT_MAX_SEQUENCE_LEN,
        ).unwrap();
        prop_assert_eq!(seq.len() as i64, span + 1);
        for (i, item) in seq.iter().enumerate() {
            prop_assert_eq!(item, &Value::Int(start + i as i64));
        }
    }

    /// A reversed integer range is always an Order error.
    #[test]
    fn reversed_int_range_is_order_error(start in -10_000i64..10_000, span in 1i64..500) {
        let err = execute_range(
            &Value::Int(start),
            &Value::Int(start - span),
            DEFAULT_MAX_SEQUENCE_LEN,
        ).unwrap_err();
        prop_assert_eq!(err.kind, RangeErrorKind::Order);
    }

    /// A float range steps by exactly 1.0 from the start and never
    /// exceeds the end bound. Quarter fractions are exactly representable,
    /// so every comparison below is exact.
    #[test]
    fn float_range_steps_by_one(a in 0i32..1000, quarter in 0i32..4, span in 0i32..200) {
        let start = a as f64 + quarter as f64 * 0.25;
        let end = start + span as f64;
        let seq = execute_range(
            &Value::Float(start),
            &Value::Float(end),
            DEFAULT_MAX_SEQUENCE_LEN,
        ).unwrap();
        prop_assert_eq!(seq.len() as i32, span + 1);
        for (i, item) in seq.iter().enumerate() {
            match item {
                Value::Float(x) => {
                    prop_assert_eq!(*x, start + i as f64);
                    prop_assert!(*x <= end);
                }
                other => prop_assert!(false, "non-float element {:?}", other),
            }
        }
    }

    /// The capacity bound is exact: a range of `n` elements succeeds with
    /// a bound of `n + 1` and fails with a bound of `n`.
    #[test]
    fn sequence_limit_is_exact(start in 0i64..1000, span in 1u64..200) {
        let end = start + span as i64;
        let n = span + 1;
        prop_assert!(execute_range(&Value::Int(start), &Value::Int(end), n + 1).is_ok());
        let err = execute_range(&Value::Int(start), &Value::Int(end), n).unwrap_err();
        prop_assert_eq!(err.kind, RangeErrorKind::Size);
    }

    /// Evaluation is deterministic: the same source yields the same value.
    #[test]
    fn evaluation_is_deterministic(start in -100i64..100, span in 0i64..50) {
        let source = format!("{} .. {}", start, start + span);
        let a = quillc::vm::eval_source(&source).unwrap();
        let b = quillc::vm::eval_source(&source).unwrap();
        prop_assert_eq!(a, b);
    }
}
