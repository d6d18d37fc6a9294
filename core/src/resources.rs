//! Thin per-resource wrappers over `PhaxioClient::execute`.
//!
//! They only pick the path and verb and lift `data` into a DTO. Errors from
//! the pipeline are returned unchanged.

use crate::client::PhaxioClient;
use crate::error::PhaxioError;
use crate::http::{HttpMethod, HttpResponse};
use crate::multipart::Params;
use crate::response::OperationResult;
use crate::types::{Ata, Fax, Page};

/// Fax operations, obtained from `PhaxioClient::faxes`.
#[derive(Debug, Clone, Copy)]
pub struct Faxes<'a> {
    client: &'a PhaxioClient,
}

impl<'a> Faxes<'a> {
    pub(crate) fn new(client: &'a PhaxioClient) -> Self {
        Self { client }
    }

    /// Queue a fax for sending. Only the new id is known afterwards.
    pub fn create(&self, params: &Params) -> Result<Fax, PhaxioError> {
        self.client
            .execute(HttpMethod::Post, "faxes", params)?
            .data_as()
    }

    pub fn get(&self, id: u64) -> Result<Fax, PhaxioError> {
        self.client
            .execute(HttpMethod::Get, &format!("faxes/{id}"), &Params::new())?
            .data_as()
    }

    /// List faxes. Filters such as `created_before`, `status`, `per_page`
    /// and `page` go in `params`.
    pub fn list(&self, params: &Params) -> Result<Page<Fax>, PhaxioError> {
        Page::from_result(self.client.execute(HttpMethod::Get, "faxes", params)?)
    }

    pub fn cancel(&self, id: u64) -> Result<OperationResult, PhaxioError> {
        self.client
            .execute(HttpMethod::Post, &format!("faxes/{id}/cancel"), &Params::new())
    }

    /// Resend a fax. The server assigns a new id, which the returned `Fax`
    /// carries.
    pub fn resend(&self, id: u64, params: &Params) -> Result<Fax, PhaxioError> {
        self.client
            .execute(HttpMethod::Post, &format!("faxes/{id}/resend"), params)?
            .data_as()
    }

    /// Download the fax document (or a thumbnail, via `params`).
    pub fn file(&self, id: u64, params: &Params) -> Result<HttpResponse, PhaxioError> {
        self.client
            .execute_raw(HttpMethod::Get, &format!("faxes/{id}/file"), params)
    }
}

/// ATA operations, obtained from `PhaxioClient::atas`.
#[derive(Debug, Clone, Copy)]
pub struct Atas<'a> {
    client: &'a PhaxioClient,
}

impl<'a> Atas<'a> {
    pub(crate) fn new(client: &'a PhaxioClient) -> Self {
        Self { client }
    }

    pub fn get(&self, id: u64) -> Result<Ata, PhaxioError> {
        self.client
            .execute(HttpMethod::Get, &format!("atas/{id}"), &Params::new())?
            .data_as()
    }

    pub fn list(&self) -> Result<Page<Ata>, PhaxioError> {
        Page::from_result(self.client.execute(HttpMethod::Get, "atas", &Params::new())?)
    }
}
