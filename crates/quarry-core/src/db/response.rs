use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    traits::{EntityKind, FieldValue},
    types::Key,
    value::Value,
};
use thiserror::Error as ThisError;

///
/// ResponseError
///
/// Cardinality failures raised by single-result accessors.
///

#[derive(Debug, ThisError)]
pub enum ResponseError {
    #[error("no rows returned")]
    NotFound,

    #[error("{0} rows returned, expected one")]
    NotUnique(usize),
}

impl From<ResponseError> for Error {
    fn from(err: ResponseError) -> Self {
        let class = match err {
            ResponseError::NotFound => ErrorClass::NotFound,
            ResponseError::NotUnique(_) => ErrorClass::NotUnique,
        };

        Self::new(class, ErrorOrigin::Query, err.to_string())
    }
}

///
/// Response
///
/// Keyed entity results of one query execution, in result order.
///

#[derive(Debug)]
pub struct Response<E: EntityKind>(pub Vec<(Key, E)>);

impl<E: EntityKind> Response<E> {
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys only.
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.0.iter().map(|(key, _)| *key).collect()
    }

    /// Entities only, consuming the response.
    #[must_use]
    pub fn entities(self) -> Vec<E> {
        self.0.into_iter().map(|(_, entity)| entity).collect()
    }

    /// Exactly one result or a cardinality error.
    pub fn one(self) -> Result<(Key, E), ResponseError> {
        let mut rows = self.0;
        match rows.len() {
            1 => rows.pop().ok_or(ResponseError::NotFound),
            0 => Err(ResponseError::NotFound),
            n => Err(ResponseError::NotUnique(n)),
        }
    }

    /// Zero or one result; more than one is a cardinality error.
    pub fn one_opt(self) -> Result<Option<(Key, E)>, ResponseError> {
        let mut rows = self.0;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            n => Err(ResponseError::NotUnique(n)),
        }
    }
}

impl<E: EntityKind> IntoIterator for Response<E> {
    type Item = (Key, E);
    type IntoIter = std::vec::IntoIter<(Key, E)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

///
/// Page
///
/// One window of results plus the unpaged total, from the two-pass
/// paged fetch.
///

#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

///
/// Tuple
///
/// One projected result row; positions match the select expressions.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Tuple(pub Vec<Value>);

impl Tuple {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Typed access to one position; `None` when out of range, null,
    /// or the wrong kind.
    #[must_use]
    pub fn get_as<T: FieldValue>(&self, index: usize) -> Option<T> {
        self.0.get(index).and_then(|value| T::from_value(value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
