//! Row codec boundary.
//!
//! Rows are stored as CBOR bytes; codec failures surface as
//! serialize-origin corruption errors and are never recovered locally.

use crate::error::Error;
use serde::{Serialize, de::DeserializeOwned};

pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    serde_cbor::to_vec(value).map_err(|err| Error::serialize_corruption(err.to_string()))
}

pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_cbor::from_slice(bytes).map_err(|err| Error::serialize_corruption(err.to_string()))
}
