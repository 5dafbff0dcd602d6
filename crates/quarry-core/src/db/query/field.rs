use crate::{
    db::query::{
        expr::{AggregateFunc, CaseExpr, Expr, SubQuery},
        predicate::{CompareOp, InOperand, Predicate},
        sort::{NullOrder, OrderDirection, SortKey},
    },
    traits::{EntityKind, FieldValue},
    types::Id,
    value::Value,
};
use std::marker::PhantomData;

///
/// Field
///
/// Typed handle to one entity field under one alias. Zero-cost: carries
/// two static strings; all predicate and projection construction goes
/// through these handles, so queries cannot reference a column that the
/// metamodel does not declare.
///

pub struct Field<T> {
    alias: &'static str,
    name: &'static str,
    _marker: PhantomData<T>,
}

pub type IntField = Field<i64>;
pub type TextField = Field<String>;

impl<T> Field<T> {
    #[must_use]
    pub const fn new(alias: &'static str, name: &'static str) -> Self {
        Self {
            alias,
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn alias(self) -> &'static str {
        self.alias
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Projection expression for this field.
    #[must_use]
    pub const fn expr(self) -> Expr {
        Expr::Field {
            alias: self.alias,
            name: self.name,
        }
    }

    // ------------------------------------------------------------------
    // Sort keys
    // ------------------------------------------------------------------

    /// Ascending sort key (default null policy: nulls last).
    #[must_use]
    pub const fn asc(self) -> SortKey {
        SortKey {
            expr: self.expr(),
            direction: OrderDirection::Asc,
            nulls: NullOrder::Default,
        }
    }

    /// Descending sort key (default null policy: nulls first).
    #[must_use]
    pub const fn desc(self) -> SortKey {
        SortKey {
            expr: self.expr(),
            direction: OrderDirection::Desc,
            nulls: NullOrder::Default,
        }
    }

    // ------------------------------------------------------------------
    // Structural predicates
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn is_null(self) -> Predicate {
        Predicate::IsNull(self.expr())
    }

    #[must_use]
    pub const fn is_not_null(self) -> Predicate {
        Predicate::IsNotNull(self.expr())
    }
}

impl<T: FieldValue> Field<T> {
    // ------------------------------------------------------------------
    // Comparison predicates
    // ------------------------------------------------------------------

    #[must_use]
    pub fn eq(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Gte, value)
    }

    /// Field-to-field equality, the building block of joins over
    /// unrelated entities (theta joins).
    #[must_use]
    pub const fn eq_field(self, other: Self) -> Predicate {
        Predicate::Compare {
            lhs: self.expr(),
            op: CompareOp::Eq,
            rhs: other.expr(),
        }
    }

    /// Inclusive range test.
    #[must_use]
    pub fn between(self, lower: impl Into<T>, upper: impl Into<T>) -> Predicate {
        Predicate::Between {
            expr: self.expr(),
            lower: Expr::Value(lower.into().to_value()),
            upper: Expr::Value(upper.into().to_value()),
        }
    }

    /// Membership test against a fixed list.
    #[must_use]
    pub fn in_list<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<T>,
    {
        Predicate::In {
            expr: self.expr(),
            within: InOperand::List(
                values
                    .into_iter()
                    .map(|value| value.into().to_value())
                    .collect(),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Sub-query predicates
    // ------------------------------------------------------------------

    /// Equality against a scalar sub-select.
    #[must_use]
    pub fn eq_query(self, sub: SubQuery) -> Predicate {
        self.compare_query(CompareOp::Eq, sub)
    }

    /// Greater-or-equal against a scalar sub-select.
    #[must_use]
    pub fn gte_query(self, sub: SubQuery) -> Predicate {
        self.compare_query(CompareOp::Gte, sub)
    }

    /// Less-or-equal against a scalar sub-select.
    #[must_use]
    pub fn lte_query(self, sub: SubQuery) -> Predicate {
        self.compare_query(CompareOp::Lte, sub)
    }

    /// Membership against a multi-row sub-select.
    #[must_use]
    pub fn in_query(self, sub: SubQuery) -> Predicate {
        Predicate::In {
            expr: self.expr(),
            within: InOperand::Subquery(Box::new(sub)),
        }
    }

    // ------------------------------------------------------------------
    // Conditional projection
    // ------------------------------------------------------------------

    /// Simple case over this field: `age.case().when(10).then("ten")…`.
    #[must_use]
    pub const fn case(self) -> FieldCase<T> {
        FieldCase {
            field: self,
            branches: Vec::new(),
        }
    }

    fn compare(self, op: CompareOp, value: impl Into<T>) -> Predicate {
        Predicate::Compare {
            lhs: self.expr(),
            op,
            rhs: Expr::Value(value.into().to_value()),
        }
    }

    fn compare_query(self, op: CompareOp, sub: SubQuery) -> Predicate {
        Predicate::Compare {
            lhs: self.expr(),
            op,
            rhs: Expr::Subquery(Box::new(sub)),
        }
    }
}

impl Field<i64> {
    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    #[must_use]
    pub fn count(self) -> Expr {
        self.aggregate(AggregateFunc::Count)
    }

    #[must_use]
    pub fn sum(self) -> Expr {
        self.aggregate(AggregateFunc::Sum)
    }

    #[must_use]
    pub fn avg(self) -> Expr {
        self.aggregate(AggregateFunc::Avg)
    }

    #[must_use]
    pub fn max(self) -> Expr {
        self.aggregate(AggregateFunc::Max)
    }

    #[must_use]
    pub fn min(self) -> Expr {
        self.aggregate(AggregateFunc::Min)
    }

    /// Numeric value rendered as text (for concatenation).
    #[must_use]
    pub fn to_text(self) -> Expr {
        Expr::ToText(Box::new(self.expr()))
    }

    fn aggregate(self, func: AggregateFunc) -> Expr {
        Expr::Aggregate {
            func,
            operand: Box::new(self.expr()),
        }
    }
}

impl Field<String> {
    /// Start a concatenation chain from this field.
    #[must_use]
    pub fn concat(self, part: impl Into<Expr>) -> Expr {
        self.expr().concat(part)
    }
}

// Manual impls; derives would bound `T`.
impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.alias, self.name)
    }
}

impl<T> From<Field<T>> for Expr {
    fn from(field: Field<T>) -> Self {
        field.expr()
    }
}

///
/// FieldCase
///
/// Simple-case builder anchored on one field; each `when` compares the
/// field for equality against a typed value.
///

pub struct FieldCase<T> {
    field: Field<T>,
    branches: Vec<(Predicate, Expr)>,
}

impl<T: FieldValue> FieldCase<T> {
    #[must_use]
    pub fn when(self, value: impl Into<T>) -> FieldCaseThen<T> {
        let predicate = self.field.eq(value);
        FieldCaseThen {
            case: self,
            predicate,
        }
    }

    #[must_use]
    pub fn otherwise(self, value: impl FieldValue) -> Expr {
        Expr::Case(Box::new(CaseExpr {
            branches: self.branches,
            otherwise: Some(Expr::Value(value.to_value())),
        }))
    }
}

///
/// FieldCaseThen
///

pub struct FieldCaseThen<T> {
    case: FieldCase<T>,
    predicate: Predicate,
}

impl<T: FieldValue> FieldCaseThen<T> {
    #[must_use]
    pub fn then(mut self, value: impl FieldValue) -> FieldCase<T> {
        self.case
            .branches
            .push((self.predicate, Expr::Value(value.to_value())));
        self.case
    }
}

///
/// KeyField
///
/// Typed handle to a key-valued field: the primary key itself or a
/// to-one ref slot. Doubles as the association handle passed to join
/// clauses.
///

pub struct KeyField<E: EntityKind> {
    alias: &'static str,
    name: &'static str,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> KeyField<E> {
    #[must_use]
    pub const fn new(alias: &'static str, name: &'static str) -> Self {
        Self {
            alias,
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn alias(self) -> &'static str {
        self.alias
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn expr(self) -> Expr {
        Expr::Field {
            alias: self.alias,
            name: self.name,
        }
    }

    #[must_use]
    pub fn eq(self, id: Id<E>) -> Predicate {
        Predicate::Compare {
            lhs: self.expr(),
            op: CompareOp::Eq,
            rhs: Expr::Value(Value::Key(id.key())),
        }
    }

    #[must_use]
    pub const fn is_null(self) -> Predicate {
        Predicate::IsNull(self.expr())
    }

    #[must_use]
    pub const fn is_not_null(self) -> Predicate {
        Predicate::IsNotNull(self.expr())
    }

    /// Row-count aggregate (keys are never null).
    #[must_use]
    pub fn count(self) -> Expr {
        Expr::Aggregate {
            func: AggregateFunc::Count,
            operand: Box::new(self.expr()),
        }
    }

    #[must_use]
    pub const fn asc(self) -> SortKey {
        SortKey {
            expr: self.expr(),
            direction: OrderDirection::Asc,
            nulls: NullOrder::Default,
        }
    }

    #[must_use]
    pub const fn desc(self) -> SortKey {
        SortKey {
            expr: self.expr(),
            direction: OrderDirection::Desc,
            nulls: NullOrder::Default,
        }
    }
}

impl<E: EntityKind> Clone for KeyField<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: EntityKind> Copy for KeyField<E> {}

impl<E: EntityKind> std::fmt::Debug for KeyField<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.alias, self.name)
    }
}

impl<E: EntityKind> From<KeyField<E>> for Expr {
    fn from(field: KeyField<E>) -> Self {
        field.expr()
    }
}
