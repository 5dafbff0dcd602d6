//! Row-level expression and predicate evaluation.
//!
//! Comparisons follow three-valued logic collapsed to boolean: any
//! comparison touching null is unknown, and unknown filters like false.

use crate::{
    db::{
        executor::{
            load_source,
            row::{AliasTable, ExecRow},
        },
        query::{
            expr::{AggregateFunc, Expr, SubQuery},
            predicate::{CompareOp, InOperand, Predicate},
        },
    },
    db::session::Session,
    error::{Error, ErrorClass, ErrorOrigin},
    value::{Float64, Value, widened_cmp},
};
use std::cmp::Ordering;

///
/// EvalScope
///
/// Everything needed to evaluate an expression against one frame: the
/// alias bindings, the representative row, the group members when the
/// frame is grouped, and the enclosing scope for correlated
/// sub-queries.
///

#[derive(Clone, Copy)]
pub(crate) struct EvalScope<'a> {
    pub session: &'a Session,
    pub aliases: &'a AliasTable,
    pub rep: &'a ExecRow,
    pub members: Option<&'a [ExecRow]>,
    pub parent: Option<&'a EvalScope<'a>>,
}

impl EvalScope<'_> {
    /// Resolve a field reference, walking outward through enclosing
    /// scopes for correlated references. A vacant slot yields null.
    fn field(&self, alias: &'static str, name: &'static str) -> Result<Value, Error> {
        if let Some(index) = self.aliases.index_of(alias) {
            return Ok(match &self.rep.slots[index] {
                Some(data) => data.values.get(name).cloned().unwrap_or(Value::Null),
                None => Value::Null,
            });
        }

        match self.parent {
            Some(parent) => parent.field(alias, name),
            None => Err(Error::executor_internal(format!(
                "unresolved field {alias}.{name}"
            ))),
        }
    }

    /// Scope for one member of this frame's group.
    const fn member<'b>(&'b self, member: &'b ExecRow) -> EvalScope<'b> {
        EvalScope {
            session: self.session,
            aliases: self.aliases,
            rep: member,
            members: None,
            parent: self.parent,
        }
    }
}

pub(crate) fn eval_expr(scope: &EvalScope<'_>, expr: &Expr) -> Result<Value, Error> {
    match expr {
        Expr::Field { alias, name } => scope.field(alias, name),
        Expr::Value(value) => Ok(value.clone()),
        Expr::Aggregate { func, operand } => eval_aggregate(scope, *func, operand),
        Expr::Concat(parts) => eval_concat(scope, parts),
        Expr::ToText(inner) => match eval_expr(scope, inner)? {
            Value::Null => Ok(Value::Null),
            value => to_text(&value).map(Value::Text),
        },
        Expr::Case(case) => {
            for (predicate, result) in &case.branches {
                if eval_predicate(scope, predicate)? {
                    return eval_expr(scope, result);
                }
            }
            match &case.otherwise {
                Some(otherwise) => eval_expr(scope, otherwise),
                None => Ok(Value::Null),
            }
        }
        Expr::Subquery(sub) => {
            let mut values = eval_subquery(scope, sub)?;
            match values.len() {
                0 => Ok(Value::Null),
                1 => values.pop().ok_or_else(|| {
                    Error::executor_internal("scalar sub-query value vanished")
                }),
                n => Err(Error::new(
                    ErrorClass::NotUnique,
                    ErrorOrigin::Executor,
                    format!("scalar sub-query returned {n} rows"),
                )),
            }
        }
    }
}

pub(crate) fn eval_predicate(scope: &EvalScope<'_>, predicate: &Predicate) -> Result<bool, Error> {
    match predicate {
        Predicate::Compare { lhs, op, rhs } => {
            let left = eval_expr(scope, lhs)?;
            let right = eval_expr(scope, rhs)?;

            Ok(compare(&left, *op, &right))
        }
        Predicate::Between { expr, lower, upper } => {
            let value = eval_expr(scope, expr)?;
            let lower = eval_expr(scope, lower)?;
            let upper = eval_expr(scope, upper)?;

            Ok(compare(&value, CompareOp::Gte, &lower)
                && compare(&value, CompareOp::Lte, &upper))
        }
        Predicate::In { expr, within } => {
            let value = eval_expr(scope, expr)?;
            if value.is_null() {
                return Ok(false);
            }
            let candidates = match within {
                InOperand::List(values) => values.clone(),
                InOperand::Subquery(sub) => eval_subquery(scope, sub)?,
            };

            Ok(candidates
                .iter()
                .any(|candidate| widened_cmp(&value, candidate) == Some(Ordering::Equal)))
        }
        Predicate::IsNull(expr) => Ok(eval_expr(scope, expr)?.is_null()),
        Predicate::IsNotNull(expr) => Ok(!eval_expr(scope, expr)?.is_null()),
        Predicate::Not(inner) => Ok(!eval_predicate(scope, inner)?),
        Predicate::And(parts) => {
            for part in parts {
                if !eval_predicate(scope, part)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Predicate::Or(parts) => {
            for part in parts {
                if eval_predicate(scope, part)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
    let Some(ordering) = widened_cmp(left, right) else {
        return false;
    };

    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
    }
}

fn eval_aggregate(
    scope: &EvalScope<'_>,
    func: AggregateFunc,
    operand: &Expr,
) -> Result<Value, Error> {
    let Some(members) = scope.members else {
        return Err(Error::executor_internal("aggregate outside a group"));
    };

    // Null operand values are skipped, as in SQL aggregates.
    let mut values = Vec::with_capacity(members.len());
    for member in members {
        let value = eval_expr(&scope.member(member), operand)?;
        if !value.is_null() {
            values.push(value);
        }
    }

    match func {
        AggregateFunc::Count => Ok(Value::Int(i64::try_from(values.len()).unwrap_or(i64::MAX))),
        AggregateFunc::Sum => sum(&values),
        AggregateFunc::Avg => avg(&values),
        AggregateFunc::Max => Ok(extreme(values, Ordering::Greater)),
        AggregateFunc::Min => Ok(extreme(values, Ordering::Less)),
    }
}

fn sum(values: &[Value]) -> Result<Value, Error> {
    if values.is_empty() {
        return Ok(Value::Null);
    }

    if values.iter().any(|value| matches!(value, Value::Float(_))) {
        let mut total = 0.0;
        for value in values {
            total += value
                .as_f64()
                .ok_or_else(|| Error::executor_unsupported("sum over non-numeric value"))?;
        }
        return Ok(Value::Float(Float64::new(total)));
    }

    let mut total = 0_i64;
    for value in values {
        let int = value
            .as_int()
            .ok_or_else(|| Error::executor_unsupported("sum over non-numeric value"))?;
        total = total
            .checked_add(int)
            .ok_or_else(|| Error::executor_internal("sum overflow"))?;
    }

    Ok(Value::Int(total))
}

#[allow(clippy::cast_precision_loss)]
fn avg(values: &[Value]) -> Result<Value, Error> {
    if values.is_empty() {
        return Ok(Value::Null);
    }

    let mut total = 0.0;
    for value in values {
        total += value
            .as_f64()
            .ok_or_else(|| Error::executor_unsupported("avg over non-numeric value"))?;
    }

    Ok(Value::Float(Float64::new(total / values.len() as f64)))
}

fn extreme(values: Vec<Value>, keep: Ordering) -> Value {
    let mut result = Value::Null;
    for value in values {
        if result.is_null()
            || widened_cmp(&value, &result) == Some(keep)
        {
            result = value;
        }
    }

    result
}

fn eval_concat(scope: &EvalScope<'_>, parts: &[Expr]) -> Result<Value, Error> {
    let mut out = String::new();
    for part in parts {
        let value = eval_expr(scope, part)?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        out.push_str(&to_text(&value)?);
    }

    Ok(Value::Text(out))
}

fn to_text(value: &Value) -> Result<String, Error> {
    value
        .to_text()
        .ok_or_else(|| Error::executor_unsupported("value has no text form"))
}

/// Evaluate a sub-select in its own scope, chained to the caller's for
/// correlated references. Returns the projected value of every
/// qualifying row, or a single aggregated value when the projection
/// aggregates.
pub(crate) fn eval_subquery(outer: &EvalScope<'_>, sub: &SubQuery) -> Result<Vec<Value>, Error> {
    let mut aliases = AliasTable::default();
    aliases.push(sub.source.alias);

    let slots = load_source(outer.session, &sub.source)?;

    let mut rows = Vec::new();
    for data in slots {
        let row = ExecRow::single(1, 0, data);
        let scope = EvalScope {
            session: outer.session,
            aliases: &aliases,
            rep: &row,
            members: None,
            parent: Some(outer),
        };
        let keep = match &sub.predicate {
            Some(predicate) => eval_predicate(&scope, predicate)?,
            None => true,
        };
        if keep {
            rows.push(row);
        }
    }

    if sub.projection.contains_aggregate() {
        let rep = ExecRow { slots: vec![None] };
        let scope = EvalScope {
            session: outer.session,
            aliases: &aliases,
            rep: &rep,
            members: Some(&rows),
            parent: Some(outer),
        };

        return Ok(vec![eval_expr(&scope, &sub.projection)?]);
    }

    let mut values = Vec::with_capacity(rows.len());
    for row in &rows {
        let scope = EvalScope {
            session: outer.session,
            aliases: &aliases,
            rep: row,
            members: None,
            parent: Some(outer),
        };
        values.push(eval_expr(&scope, &sub.projection)?);
    }

    Ok(values)
}
