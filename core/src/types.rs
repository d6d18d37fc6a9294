//! Resource DTOs populated from `OperationResult::data`.
//!
//! # Design
//! Only `id` is typed. Everything else the API returns is kept verbatim in
//! `fields` so that new server-side attributes survive without a release.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PhaxioError;
use crate::response::OperationResult;

/// One page of a list endpoint: the decoded items plus the server's paging
/// block (`total`, `per_page`, `page`), when it sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub paging: Option<Value>,
}

impl<T: DeserializeOwned> Page<T> {
    pub fn from_result(result: OperationResult) -> Result<Self, PhaxioError> {
        let items = result.data_as()?;
        Ok(Self {
            items,
            paging: result.paging,
        })
    }
}

impl<T> Page<T> {
    /// `paging.total`, if present.
    pub fn total(&self) -> Option<u64> {
        self.paging.as_ref()?.get("total")?.as_u64()
    }
}

/// A fax as returned by `faxes/{id}`, or just its id after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fax {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Fax {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// An analog telephone adapter registered on the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ata {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Ata {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
