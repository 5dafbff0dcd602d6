use crate::{error::Error, serialize, traits::{EntityKind, RowResolver}};
use serde::{Deserialize, Serialize};
use std::{fmt, hash::Hash, marker::PhantomData};

///
/// Key
///
/// Raw storage key. Assigned from a per-store monotonically increasing
/// sequence; never reused within a session.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Key(pub u64);

impl Key {
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// Id
///
/// Typed view of a storage key, parameterized by the entity it refers to.
///

pub struct Id<E: EntityKind> {
    key: Key,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> Id<E> {
    #[must_use]
    pub const fn from_key(key: Key) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(self) -> Key {
        self.key
    }
}

// Manual impls; derives would put bounds on `E`.
impl<E: EntityKind> Clone for Id<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: EntityKind> Copy for Id<E> {}

impl<E: EntityKind> PartialEq for Id<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<E: EntityKind> Eq for Id<E> {}

impl<E: EntityKind> Hash for Id<E> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<E: EntityKind> fmt::Debug for Id<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id<{}>({})", E::PATH, self.key)
    }
}

impl<E: EntityKind> fmt::Display for Id<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

///
/// Ref
///
/// To-one association: the target's key plus an optional in-memory
/// loaded target. Serialization stores the key only, so a freshly
/// decoded row always starts unloaded; fetch-join hydration fills the
/// target in the same logical round trip.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Ref<E: EntityKind> {
    key: Key,

    #[serde(skip)]
    loaded: Option<Box<E>>,
}

impl<E: EntityKind> Ref<E> {
    #[must_use]
    pub const fn new(key: Key) -> Self {
        Self { key, loaded: None }
    }

    #[must_use]
    pub const fn to(id: Id<E>) -> Self {
        Self::new(id.key())
    }

    #[must_use]
    pub const fn key(&self) -> Key {
        self.key
    }

    #[must_use]
    pub const fn id(&self) -> Id<E> {
        Id::from_key(self.key)
    }

    /// Has the association target been materialized into memory?
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    #[must_use]
    pub fn target(&self) -> Option<&E> {
        self.loaded.as_deref()
    }

    /// Load the target row through the resolver. Idempotent; a dangling
    /// key surfaces as a store NotFound.
    pub fn hydrate(&mut self, resolver: &dyn RowResolver) -> Result<(), Error> {
        if self.loaded.is_some() {
            return Ok(());
        }

        let bytes = resolver.fetch_row(E::PATH, self.key)?;
        self.loaded = Some(Box::new(serialize::deserialize::<E>(&bytes)?));

        Ok(())
    }
}

impl<E: EntityKind> PartialEq for Ref<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<E: EntityKind> Eq for Ref<E> {}

impl<E: EntityKind> From<Id<E>> for Ref<E> {
    fn from(id: Id<E>) -> Self {
        Self::to(id)
    }
}
