//! ## Crate layout
//! - `core`: runtime data model, metamodel, query builders, executor,
//!   sessions, and observability.
//!
//! The `prelude` module mirrors the surface application code touches:
//! sessions, typed field handles, predicates, and result types.

pub use quarry_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use core::{Error, db};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        db::{
            Page, QueryTraceEvent, QueryTraceSink, Response, ResponseError, Session, TracePhase,
            Tuple,
            query::{
                Expr, Field, IntField, KeyField, Predicate, SearchedCase, SubQuery, TextField,
            },
        },
        error::{Error, ErrorClass, ErrorOrigin},
        traits::{EntityKind as _, FieldValue as _, FieldValues as _, Path as _, RowResolver},
        types::{Id, Key, Ref},
        value::Value,
    };
    pub use serde::{Deserialize, Serialize};
}
