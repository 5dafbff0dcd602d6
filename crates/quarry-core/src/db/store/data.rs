use crate::{
    db::store::RawRow,
    error::Error,
    model::EntityModel,
    traits::EntityKind,
    types::Key,
    value::Value,
};
use derive_more::{Deref, DerefMut};
use std::collections::BTreeMap;

///
/// FieldMap
///
/// Row fields decoded into dynamic values, keyed by the static field
/// names of the owning entity model.
///

pub type FieldMap = BTreeMap<&'static str, Value>;

///
/// EntityOps
///
/// Per-entity vtable captured when a store is created, so the executor
/// can decode rows of any registered entity without knowing its type.
///

#[derive(Clone, Copy)]
pub struct EntityOps {
    pub model: &'static EntityModel,
    pub values: fn(&RawRow) -> Result<FieldMap, Error>,
}

/// Capture the ops vtable for an entity type.
#[must_use]
pub fn entity_ops<E: EntityKind>() -> EntityOps {
    EntityOps {
        model: E::MODEL,
        values: decode_values::<E>,
    }
}

fn decode_values<E: EntityKind>(row: &RawRow) -> Result<FieldMap, Error> {
    let entity = row.try_decode::<E>()?;

    Ok(E::MODEL
        .fields
        .iter()
        .map(|field| {
            let value = entity.get_value(field.name).unwrap_or(Value::Null);
            (field.name, value)
        })
        .collect())
}

///
/// DataStore
///
/// Ordered row storage for one entity type plus its key sequence.
/// Iteration order is storage-key ascending, which makes unordered
/// scans deterministic.
///

#[derive(Deref, DerefMut)]
pub struct DataStore {
    #[deref]
    #[deref_mut]
    rows: BTreeMap<Key, RawRow>,
    next_key: u64,
    ops: EntityOps,
}

impl DataStore {
    #[must_use]
    pub fn new(ops: EntityOps) -> Self {
        Self {
            rows: BTreeMap::new(),
            next_key: 0,
            ops,
        }
    }

    #[must_use]
    pub const fn ops(&self) -> &EntityOps {
        &self.ops
    }

    /// Allocate the next key in the sequence. Keys start at 1; 0 is
    /// never a valid key.
    pub const fn allocate_key(&mut self) -> Key {
        self.next_key += 1;
        Key(self.next_key)
    }
}

///
/// StoreRegistry
///
/// Per-entity stores for one session, keyed by entity path. Stores are
/// created lazily on first write.
///

pub struct StoreRegistry {
    stores: BTreeMap<&'static str, DataStore>,
}

impl StoreRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stores: BTreeMap::new(),
        }
    }

    /// Store for an entity type, created on first access.
    pub fn store_mut<E: EntityKind>(&mut self) -> &mut DataStore {
        self.stores
            .entry(E::PATH)
            .or_insert_with(|| DataStore::new(entity_ops::<E>()))
    }

    /// Store for an entity path, if any row was ever written.
    #[must_use]
    pub fn store_by_path(&self, path: &str) -> Option<&DataStore> {
        self.stores.get(path)
    }

    /// Drop all rows and sequences.
    pub fn clear(&mut self) {
        self.stores.clear();
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}
