//! Typed fluent query surface.
//!
//! Builders are declarative: they accumulate a `SelectSpec` and never
//! touch the store. Validation happens once, before execution, and the
//! executor owns all row-level semantics.

pub mod expr;
pub mod field;
pub mod predicate;
pub mod select;
pub mod sort;
pub mod source;
pub mod validate;

#[cfg(test)]
mod tests;

pub use expr::{AggregateFunc, CaseExpr, Expr, SearchedCase, SubQuery, SubQueryBuilder};
pub use field::{Field, FieldCase, IntField, KeyField, TextField};
pub use predicate::{CompareOp, InOperand, Predicate, normalize};
pub use select::{
    IntoExprs, IntoSortKeys, JoinKind, JoinLink, JoinSpec, Projection, SelectQuery, SelectSpec,
    TupleQuery,
};
pub use sort::{NullOrder, OrderDirection, PageSpec, SortKey};
pub use source::{QuerySource, SourceSpec};
