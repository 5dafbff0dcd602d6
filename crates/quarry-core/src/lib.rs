//! Core runtime: typed metamodel queries over session-owned entity
//! stores.
//!
//! Entities implement [`traits::EntityKind`] and carry a static
//! [`model::EntityModel`]; queries are composed from typed field
//! handles, validated against the metamodel, then executed by the
//! pipeline in [`db::executor`].

pub mod db;
pub mod error;
pub mod model;
pub mod serialize;
pub mod test_support;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{Error, ErrorClass, ErrorOrigin};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        db::{
            Page, QueryTraceEvent, QueryTraceSink, Response, ResponseError, Session, TracePhase,
            Tuple,
            query::{
                Expr, Field, IntField, KeyField, Predicate, SearchedCase, SubQuery, TextField,
            },
        },
        error::{Error, ErrorClass, ErrorOrigin},
        traits::{EntityKind, FieldValue, FieldValues, Path, RowResolver},
        types::{Id, Key, Ref},
        value::Value,
    };
}
