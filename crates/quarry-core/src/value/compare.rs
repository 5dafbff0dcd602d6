use crate::value::Value;
use std::cmp::Ordering;

/// Integers up to 2^53 convert to f64 without precision loss; larger
/// magnitudes take the exact int/float comparison path.
const F64_SAFE_I64: u64 = 1 << 53;

/// Total canonical comparator used by grouping, dedup, and list ordering.
///
/// Ordering rules:
/// 1. Canonical variant rank
/// 2. Variant-specific comparison for same-ranked values
///
/// Mixed-variant comparisons are rank-only and must remain deterministic.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    canonical_cmp_same_rank(left, right)
}

/// Widening comparator used by predicate evaluation and sort keys.
///
/// Int and Float compare numerically (exact, no silent precision loss on
/// large ints). Same-variant values compare directly. `None` means the
/// operands are incomparable (either side null, or incompatible variants);
/// predicate evaluation treats that as unknown → false.
#[must_use]
pub fn widened_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => Some(cmp_int_float(*a, b.get())),
        (Value::Float(a), Value::Int(b)) => Some(cmp_int_float(*b, a.get()).reverse()),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Key(a), Value::Key(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => Some(widened_cmp_list(a, b)),
        _ => None,
    }
}

fn canonical_cmp_same_rank(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Key(a), Value::Key(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => canonical_cmp_list(a, b),
        _ => Ordering::Equal,
    }
}

fn canonical_cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = canonical_cmp(left, right);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

fn widened_cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = widened_cmp(left, right).unwrap_or_else(|| canonical_cmp(left, right));
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

/// Exact `i64` vs `f64` comparison.
///
/// NaN sorts greatest (total-order semantics), infinities clamp, and
/// values beyond the 2^53 safe band compare via truncation plus the
/// fractional remainder instead of a lossy cast.
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    if float.is_nan() {
        return Ordering::Less;
    }
    if float == f64::INFINITY {
        return Ordering::Less;
    }
    if float == f64::NEG_INFINITY {
        return Ordering::Greater;
    }

    if int.unsigned_abs() <= F64_SAFE_I64 {
        #[allow(clippy::cast_precision_loss)]
        return (int as f64).total_cmp(&float);
    }

    let trunc = float.trunc();
    if trunc >= i64::MAX as f64 {
        return Ordering::Less;
    }
    if trunc <= i64::MIN as f64 {
        return Ordering::Greater;
    }

    #[allow(clippy::cast_possible_truncation)]
    let trunc_int = trunc as i64;
    let cmp = int.cmp(&trunc_int);
    if cmp != Ordering::Equal {
        return cmp;
    }

    // Equal integer parts: the fractional remainder decides.
    let fract = float - trunc;
    if fract > 0.0 {
        Ordering::Less
    } else if fract < 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}
