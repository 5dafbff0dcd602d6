use crate::{db::query::expr::{Expr, SubQuery}, value::Value};

///
/// Predicate
///
/// Boolean expression tree. Evaluation approximates SQL three-valued
/// logic: a comparison with a null operand is unknown, and unknown
/// filters like false.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },
    Between {
        expr: Expr,
        lower: Expr,
        upper: Expr,
    },
    In {
        expr: Expr,
        within: InOperand,
    },
    IsNull(Expr),
    IsNotNull(Expr),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjoin with another predicate.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            left => Self::And(vec![left, other]),
        }
    }

    /// Disjoin with another predicate.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            left => Self::Or(vec![left, other]),
        }
    }

    /// Negate this predicate.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Visit every field reference at this predicate's own level
    /// (sub-queries have their own scope and are skipped).
    pub fn for_each_field(&self, visit: &mut dyn FnMut(&'static str, &'static str)) {
        match self {
            Self::Compare { lhs, rhs, .. } => {
                lhs.for_each_field(visit);
                rhs.for_each_field(visit);
            }
            Self::Between { expr, lower, upper } => {
                expr.for_each_field(visit);
                lower.for_each_field(visit);
                upper.for_each_field(visit);
            }
            Self::In { expr, .. } => expr.for_each_field(visit),
            Self::IsNull(expr) | Self::IsNotNull(expr) => expr.for_each_field(visit),
            Self::Not(inner) => inner.for_each_field(visit),
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.for_each_field(visit);
                }
            }
        }
    }

    /// Visit every embedded sub-query at any depth.
    pub fn for_each_subquery(&self, visit: &mut dyn FnMut(&SubQuery)) {
        match self {
            Self::Compare { lhs, rhs, .. } => {
                for expr in [lhs, rhs] {
                    if let Expr::Subquery(sub) = expr {
                        visit(sub);
                    }
                }
            }
            Self::In { within, .. } => {
                if let InOperand::Subquery(sub) = within {
                    visit(sub);
                }
            }
            Self::Not(inner) => inner.for_each_subquery(visit),
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.for_each_subquery(visit);
                }
            }
            Self::Between { .. } | Self::IsNull(_) | Self::IsNotNull(_) => {}
        }
    }
}

///
/// InOperand
///

#[derive(Clone, Debug, PartialEq)]
pub enum InOperand {
    List(Vec<Value>),
    Subquery(Box<SubQuery>),
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Normalize a predicate tree: flatten directly nested And/Or chains and
/// collapse single-child combinators. Semantics are preserved exactly.
#[must_use]
pub fn normalize(predicate: &Predicate) -> Predicate {
    match predicate {
        Predicate::And(parts) => rebuild(parts, true),
        Predicate::Or(parts) => rebuild(parts, false),
        Predicate::Not(inner) => Predicate::Not(Box::new(normalize(inner))),
        leaf => leaf.clone(),
    }
}

fn rebuild(parts: &[Predicate], conjunction: bool) -> Predicate {
    let mut flat = Vec::with_capacity(parts.len());
    for part in parts {
        match normalize(part) {
            Predicate::And(children) if conjunction => flat.extend(children),
            Predicate::Or(children) if !conjunction => flat.extend(children),
            other => flat.push(other),
        }
    }

    if flat.len() == 1 {
        if let Some(single) = flat.pop() {
            return single;
        }
    }

    if conjunction {
        Predicate::And(flat)
    } else {
        Predicate::Or(flat)
    }
}
