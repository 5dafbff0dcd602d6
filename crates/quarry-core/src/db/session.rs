use crate::{
    db::{
        executor::trace::QueryTraceSink,
        query::{select::SelectQuery, source::QuerySource},
        store::{DataStore, RawRow, StoreRegistry},
    },
    error::Error,
    serialize,
    traits::{EntityKind, RowResolver},
    types::{Id, Key},
};

///
/// Session
///
/// Unit of work: owns the per-entity stores, hands out queries bound to
/// itself, and carries the optional trace sink. Mutation goes through
/// `&mut self`; queries only ever borrow.
///

pub struct Session {
    registry: StoreRegistry,
    trace: Option<&'static dyn QueryTraceSink>,
}

impl Session {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registry: StoreRegistry::new(),
            trace: None,
        }
    }

    /// Session that reports execution phases to the given sink.
    #[must_use]
    pub const fn with_trace(sink: &'static dyn QueryTraceSink) -> Self {
        Self {
            registry: StoreRegistry::new(),
            trace: Some(sink),
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write an entity. A fresh entity is assigned the next key of its
    /// store, which is installed on the entity before encoding; an
    /// already keyed entity overwrites its row.
    pub fn persist<E: EntityKind>(&mut self, entity: &mut E) -> Result<Id<E>, Error> {
        let store = self.registry.store_mut::<E>();
        let key = match entity.key() {
            Some(existing) => existing,
            None => {
                let key = store.allocate_key();
                entity.set_key(key);
                key
            }
        };

        let bytes = serialize::serialize(entity)?;
        store.insert(key, RawRow::try_new(bytes)?);

        Ok(Id::from_key(key))
    }

    /// Load one entity by id.
    pub fn get<E: EntityKind>(&self, id: Id<E>) -> Result<E, Error> {
        let row = self
            .registry
            .store_by_path(E::PATH)
            .and_then(|store| store.get(&id.key()))
            .ok_or_else(|| Error::store_not_found(E::PATH, id.key()))?;

        row.try_decode::<E>()
    }

    /// Remove one entity by id; missing rows error.
    pub fn remove<E: EntityKind>(&mut self, id: Id<E>) -> Result<(), Error> {
        let store = self.registry.store_mut::<E>();
        match store.remove(&id.key()) {
            Some(_) => Ok(()),
            None => Err(Error::store_not_found(E::PATH, id.key())),
        }
    }

    /// Number of rows stored for an entity type.
    #[must_use]
    pub fn store_count<E: EntityKind>(&self) -> usize {
        self.registry
            .store_by_path(E::PATH)
            .map_or(0, |store| store.len())
    }

    /// Drop every row and key sequence.
    pub fn clear(&mut self) {
        self.registry.clear();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Start a query rooted at the given source binding.
    pub fn query<S: QuerySource>(&self, source: &S) -> SelectQuery<'_, S::Entity> {
        SelectQuery::new(self, source.source())
    }

    pub(crate) fn store_by_path(&self, path: &str) -> Option<&DataStore> {
        self.registry.store_by_path(path)
    }

    pub(crate) const fn trace_sink(&self) -> Option<&'static dyn QueryTraceSink> {
        self.trace
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl RowResolver for Session {
    fn fetch_row(&self, entity: &'static str, key: Key) -> Result<Vec<u8>, Error> {
        self.store_by_path(entity)
            .and_then(|store| store.get(&key))
            .map(|row| row.as_bytes().to_vec())
            .ok_or_else(|| Error::store_not_found(entity, key))
    }
}
