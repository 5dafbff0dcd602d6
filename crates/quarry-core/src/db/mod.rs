//! Storage and query engine.

pub mod executor;
pub mod query;
pub mod response;
pub mod session;
pub mod store;

pub use executor::{QueryTraceEvent, QueryTraceSink, TracePhase};
pub use response::{Page, Response, ResponseError, Tuple};
pub use session::Session;
