mod data;
mod row;

pub use data::{DataStore, EntityOps, FieldMap, StoreRegistry, entity_ops};
pub use row::{MAX_ROW_BYTES, RawRow, RawRowError};
