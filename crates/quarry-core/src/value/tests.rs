use crate::{
    traits::FieldValue,
    types::Key,
    value::{Float64, Value, canonical_cmp, widened_cmp},
};
use proptest::prelude::*;
use std::cmp::Ordering;

fn int(v: i64) -> Value {
    Value::Int(v)
}

fn float(v: f64) -> Value {
    Value::Float(Float64::new(v))
}

#[test]
fn widened_cmp_null_is_incomparable() {
    assert_eq!(widened_cmp(&Value::Null, &Value::Null), None);
    assert_eq!(widened_cmp(&Value::Null, &int(1)), None);
    assert_eq!(widened_cmp(&int(1), &Value::Null), None);
}

#[test]
fn widened_cmp_mixed_numeric() {
    assert_eq!(widened_cmp(&int(3), &float(3.0)), Some(Ordering::Equal));
    assert_eq!(widened_cmp(&int(3), &float(3.5)), Some(Ordering::Less));
    assert_eq!(widened_cmp(&float(-1.0), &int(0)), Some(Ordering::Less));
}

#[test]
fn widened_cmp_incompatible_variants() {
    assert_eq!(widened_cmp(&int(1), &Value::Text("1".into())), None);
    assert_eq!(widened_cmp(&Value::Bool(true), &int(1)), None);
}

#[test]
fn widened_cmp_exact_above_float_precision() {
    // 2^53 + 1 has no exact f64 representation; a lossy cast would
    // compare equal to 2^53.
    let big = (1_i64 << 53) + 1;
    assert_eq!(
        widened_cmp(&int(big), &float((1_i64 << 53) as f64)),
        Some(Ordering::Greater)
    );
    assert_eq!(
        widened_cmp(&float((1_i64 << 53) as f64), &int(big)),
        Some(Ordering::Less)
    );
}

#[test]
fn widened_cmp_nan_and_infinities() {
    assert_eq!(
        widened_cmp(&float(f64::NAN), &float(f64::INFINITY)),
        Some(Ordering::Greater)
    );
    assert_eq!(widened_cmp(&int(i64::MAX), &float(f64::NAN)), Some(Ordering::Less));
    assert_eq!(
        widened_cmp(&int(i64::MIN), &float(f64::NEG_INFINITY)),
        Some(Ordering::Greater)
    );
}

#[test]
fn canonical_cmp_ranks_variants() {
    let ordered = [
        Value::Null,
        Value::Bool(false),
        int(0),
        float(0.0),
        Value::Text(String::new()),
        Value::Key(Key(0)),
        Value::List(Vec::new()),
    ];
    for window in ordered.windows(2) {
        assert_eq!(canonical_cmp(&window[0], &window[1]), Ordering::Less);
    }
}

#[test]
fn to_text_skips_null_and_lists() {
    assert_eq!(int(7).to_text().as_deref(), Some("7"));
    assert_eq!(Value::Null.to_text(), None);
    assert_eq!(Value::List(vec![int(1)]).to_text(), None);
}

#[test]
fn field_value_round_trips() {
    assert_eq!(i64::from_value(&42_i64.to_value()), Some(42));
    assert_eq!(String::from_value(&"hi".to_value()).as_deref(), Some("hi"));
    assert_eq!(Option::<i64>::from_value(&Value::Null), Some(None));
    assert_eq!(Key::from_value(&Key(9).to_value()), Some(Key(9)));
    assert_eq!(i64::from_value(&Value::Text("42".into())), None);
}

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(|v| Value::Float(Float64::new(v))),
        ".{0,8}".prop_map(Value::Text),
        any::<u64>().prop_map(|v| Value::Key(Key(v))),
    ]
}

proptest! {
    #[test]
    fn canonical_cmp_is_antisymmetric(a in scalar_value(), b in scalar_value()) {
        prop_assert_eq!(canonical_cmp(&a, &b), canonical_cmp(&b, &a).reverse());
    }

    #[test]
    fn canonical_cmp_is_transitive(
        a in scalar_value(),
        b in scalar_value(),
        c in scalar_value(),
    ) {
        let mut sorted = vec![a, b, c];
        sorted.sort_by(canonical_cmp);
        prop_assert_ne!(canonical_cmp(&sorted[0], &sorted[2]), Ordering::Greater);
    }

    #[test]
    fn widened_cmp_is_reflexive_for_non_null(v in scalar_value()) {
        if !v.is_null() {
            prop_assert_eq!(widened_cmp(&v, &v), Some(Ordering::Equal));
        }
    }

    #[test]
    fn widened_cmp_int_float_agrees_in_safe_band(
        int_val in -(1_i64 << 52)..(1_i64 << 52),
        float_val in -1.0e15_f64..1.0e15,
    ) {
        let expected = (int_val as f64).total_cmp(&float_val);
        prop_assert_eq!(
            widened_cmp(&Value::Int(int_val), &Value::Float(Float64::new(float_val))),
            Some(expected)
        );
    }
}
