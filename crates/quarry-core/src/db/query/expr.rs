use crate::{
    db::query::{
        predicate::{CompareOp, Predicate},
        source::{QuerySource, SourceSpec},
    },
    traits::FieldValue,
    value::Value,
};

///
/// Expr
///
/// Typed expression tree for projections and predicate operands.
/// Built from metamodel field handles; never from raw strings.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Field of a bound alias.
    Field {
        alias: &'static str,
        name: &'static str,
    },
    /// Constant scalar.
    Value(Value),
    /// Aggregate over the current group.
    Aggregate {
        func: AggregateFunc,
        operand: Box<Expr>,
    },
    /// Null-propagating text concatenation.
    Concat(Vec<Expr>),
    /// Scalar rendered as text.
    ToText(Box<Expr>),
    /// Case/when/otherwise conditional, evaluated per row.
    Case(Box<CaseExpr>),
    /// Scalar sub-select evaluated against the same session.
    Subquery(Box<SubQuery>),
}

impl Expr {
    /// Constant scalar expression.
    #[must_use]
    pub fn constant(value: impl FieldValue) -> Self {
        Self::Value(value.to_value())
    }

    /// Append a part to a concatenation chain, flattening nesting.
    #[must_use]
    pub fn concat(self, part: impl Into<Self>) -> Self {
        match self {
            Self::Concat(mut parts) => {
                parts.push(part.into());
                Self::Concat(parts)
            }
            other => Self::Concat(vec![other, part.into()]),
        }
    }

    /// Does this expression aggregate at its own level?
    ///
    /// Sub-selects aggregate in their own scope and do not count.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate { .. } => true,
            Self::Field { .. } | Self::Value(_) | Self::Subquery(_) => false,
            Self::Concat(parts) => parts.iter().any(Self::contains_aggregate),
            Self::ToText(inner) => inner.contains_aggregate(),
            Self::Case(case) => {
                case.branches.iter().any(|(_, expr)| expr.contains_aggregate())
                    || case
                        .otherwise
                        .as_ref()
                        .is_some_and(Self::contains_aggregate)
            }
        }
    }

    // ------------------------------------------------------------------
    // Comparison predicates
    //
    // Mostly used on aggregate expressions in `having` clauses; typed
    // field handles have their own comparison surface.
    // ------------------------------------------------------------------

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, value: impl FieldValue) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(self, value: impl FieldValue) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(self, value: impl FieldValue) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl FieldValue) -> Predicate {
        self.compare(CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(self, value: impl FieldValue) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl FieldValue) -> Predicate {
        self.compare(CompareOp::Gte, value)
    }

    fn compare(self, op: CompareOp, value: impl FieldValue) -> Predicate {
        Predicate::Compare {
            lhs: self,
            op,
            rhs: Self::Value(value.to_value()),
        }
    }

    /// Visit every field reference at this expression's own level.
    pub fn for_each_field(&self, visit: &mut dyn FnMut(&'static str, &'static str)) {
        match self {
            Self::Field { alias, name } => visit(alias, name),
            Self::Value(_) | Self::Subquery(_) => {}
            Self::Aggregate { operand, .. } => operand.for_each_field(visit),
            Self::ToText(inner) => inner.for_each_field(visit),
            Self::Concat(parts) => {
                for part in parts {
                    part.for_each_field(visit);
                }
            }
            Self::Case(case) => {
                for (predicate, expr) in &case.branches {
                    predicate.for_each_field(visit);
                    expr.for_each_field(visit);
                }
                if let Some(otherwise) = &case.otherwise {
                    otherwise.for_each_field(visit);
                }
            }
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Value(Value::Text(value.to_string()))
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Value(Value::Text(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Value(Value::Int(value))
    }
}

impl From<SubQuery> for Expr {
    fn from(sub: SubQuery) -> Self {
        Self::Subquery(Box::new(sub))
    }
}

///
/// AggregateFunc
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateFunc {
    /// Count of non-null operand values.
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

///
/// CaseExpr
///
/// Ordered when-branches plus an optional otherwise. The first branch
/// whose predicate holds wins; with no match and no otherwise the
/// result is null.
///

#[derive(Clone, Debug, PartialEq)]
pub struct CaseExpr {
    pub branches: Vec<(Predicate, Expr)>,
    pub otherwise: Option<Expr>,
}

///
/// SearchedCase
///
/// Builder for predicate-driven case expressions:
/// `SearchedCase::new().when(p).then(x).otherwise(y)`.
///

#[derive(Clone, Debug, Default)]
pub struct SearchedCase {
    branches: Vec<(Predicate, Expr)>,
}

impl SearchedCase {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            branches: Vec::new(),
        }
    }

    #[must_use]
    pub fn when(self, predicate: Predicate) -> SearchedCaseThen {
        SearchedCaseThen {
            case: self,
            predicate,
        }
    }

    /// Close the case with a fallback result.
    #[must_use]
    pub fn otherwise(self, value: impl FieldValue) -> Expr {
        Expr::Case(Box::new(CaseExpr {
            branches: self.branches,
            otherwise: Some(Expr::Value(value.to_value())),
        }))
    }

    /// Close the case without a fallback; unmatched rows produce null.
    #[must_use]
    pub fn end(self) -> Expr {
        Expr::Case(Box::new(CaseExpr {
            branches: self.branches,
            otherwise: None,
        }))
    }
}

///
/// SearchedCaseThen
///

#[derive(Clone, Debug)]
pub struct SearchedCaseThen {
    case: SearchedCase,
    predicate: Predicate,
}

impl SearchedCaseThen {
    #[must_use]
    pub fn then(mut self, value: impl FieldValue) -> SearchedCase {
        self.case
            .branches
            .push((self.predicate, Expr::Value(value.to_value())));
        self.case
    }
}

///
/// SubQuery
///
/// Fully composed declarative sub-select: one projected expression over
/// one source with an optional predicate. Usable as a comparison
/// operand, an `in` operand, or a scalar projection; executed against
/// the enclosing session, with outer aliases visible for correlation.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SubQuery {
    pub projection: Expr,
    pub source: SourceSpec,
    pub predicate: Option<Predicate>,
}

impl SubQuery {
    /// Start a sub-select from its projected expression.
    #[must_use]
    pub fn select(projection: impl Into<Expr>) -> SubQueryBuilder {
        SubQueryBuilder {
            projection: projection.into(),
        }
    }

    /// Add a predicate, implicitly AND-ing with any existing predicate.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = match self.predicate.take() {
            Some(existing) => Some(existing.and(predicate)),
            None => Some(predicate),
        };
        self
    }
}

///
/// SubQueryBuilder
///

#[derive(Clone, Debug)]
pub struct SubQueryBuilder {
    projection: Expr,
}

impl SubQueryBuilder {
    #[must_use]
    pub fn from(self, source: impl QuerySource) -> SubQuery {
        SubQuery {
            projection: self.projection,
            source: source.source(),
            predicate: None,
        }
    }
}
