use crate::{
    error::Error,
    model::EntityModel,
    types::{Id, Key, Ref},
    value::{Float64, Value},
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

///
/// Path
///
/// Stable string identity for a schema item.
///

pub trait Path {
    const PATH: &'static str;
}

///
/// EntityKind
///
/// A persistent record type with identity: serde codec bounds for row
/// storage, a static metamodel for query validation, key accessors, and
/// an optional hydration hook for eager to-one association loading.
///

pub trait EntityKind:
    Clone + Debug + Path + FieldValues + Serialize + DeserializeOwned + Sized + 'static
{
    const MODEL: &'static EntityModel;

    /// Storage key, `None` until the entity has been persisted.
    fn key(&self) -> Option<Key>;

    /// Install the storage key at persist time.
    fn set_key(&mut self, key: Key);

    /// Eagerly load the named to-one association through the resolver.
    ///
    /// Entities without associations keep the default no-op.
    fn hydrate(&mut self, association: &str, resolver: &dyn RowResolver) -> Result<(), Error> {
        let _ = (association, resolver);
        Ok(())
    }

    /// Typed identity view; errors are a caller bug, so this is only
    /// meaningful on persisted entities.
    fn id(&self) -> Option<Id<Self>> {
        self.key().map(Id::from_key)
    }
}

///
/// FieldValues
///
/// Dynamic field access used by the executor to evaluate predicates and
/// projections against a row. `None` means the field does not exist;
/// `Some(Value::Null)` means it exists and is null.
///

pub trait FieldValues {
    fn get_value(&self, field: &str) -> Option<Value>;
}

///
/// RowResolver
///
/// Session-boundary capability to fetch a raw row by entity path and key,
/// used by `Ref` hydration.
///

pub trait RowResolver {
    fn fetch_row(&self, entity: &'static str, key: Key) -> Result<Vec<u8>, Error>;
}

///
/// FieldValue
///
/// Conversion between rust values and the dynamic `Value` scalar, used by
/// typed field handles and tuple projections.
///

pub trait FieldValue {
    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FieldValue for i32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|v| Self::try_from(v).ok())
    }
}

impl FieldValue for u64 {
    fn to_value(&self) -> Value {
        // Storage counts and offsets stay well inside i64 range.
        Value::Int(i64::try_from(*self).unwrap_or(i64::MAX))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|v| Self::try_from(v).ok())
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(Float64::new(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v.get()),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(v) => Some(*v as Self),
            _ => None,
        }
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().map(ToOwned::to_owned)
    }
}

impl FieldValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

impl FieldValue for Key {
    fn to_value(&self) -> Value {
        Value::Key(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Key(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<E: EntityKind> FieldValue for Id<E> {
    fn to_value(&self) -> Value {
        Value::Key(self.key())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Key(key) => Some(Self::from_key(*key)),
            _ => None,
        }
    }
}

impl<E: EntityKind> FieldValue for Ref<E> {
    fn to_value(&self) -> Value {
        Value::Key(self.key())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Key(key) => Some(Self::new(*key)),
            _ => None,
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
