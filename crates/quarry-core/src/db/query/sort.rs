use crate::db::query::expr::Expr;

///
/// SortKey
///
/// One ordering criterion: an expression, a direction, and a null
/// placement. Ties under earlier keys fall through to later keys.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SortKey {
    pub expr: Expr,
    pub direction: OrderDirection,
    pub nulls: NullOrder,
}

impl SortKey {
    /// Place null values before all non-null values.
    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls = NullOrder::First;
        self
    }

    /// Place null values after all non-null values.
    #[must_use]
    pub const fn nulls_last(mut self) -> Self {
        self.nulls = NullOrder::Last;
        self
    }
}

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

///
/// NullOrder
///
/// `Default` treats null as the greatest value: last ascending, first
/// descending.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NullOrder {
    Default,
    First,
    Last,
}

///
/// PageSpec
///
/// Offset/limit window applied after ordering. Offset skips rows;
/// a missing limit means all remaining rows.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PageSpec {
    pub offset: u32,
    pub limit: Option<u32>,
}

impl PageSpec {
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }
}
