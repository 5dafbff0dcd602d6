use crate::value::Value;

impl Value {
    /// Canonical variant rank used by `canonical_cmp`.
    ///
    /// Null ranks lowest so canonical ordering groups nulls together;
    /// query-level null placement is decided by sort-key null policy,
    /// never by this rank.
    pub(crate) const fn canonical_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Key(_) => 5,
            Self::List(_) => 6,
        }
    }
}
