//! Blocking client core for the Phaxio fax API.
//!
//! # Overview
//! Every call follows the same pipeline: parameters are encoded as
//! multipart/form-data, sent with HTTP Basic credentials through a
//! `Transport`, and the response is classified into an `OperationResult` or
//! a `PhaxioError`.
//!
//! # Design
//! - `PhaxioClient` holds only immutable configuration and a shared transport,
//!   so it can be used from several threads at once.
//! - Request building (`build_request`) and response parsing
//!   (`parse_response`) are exposed separately, so callers can run the I/O
//!   themselves.
//! - The encoder renders bodies by hand to support `key[]` and
//!   `key[subkey]` fields.
//! - Retries are left to the caller; `PhaxioError::is_retryable` flags the
//!   kinds worth retrying.
//!
//! ```no_run
//! use phaxio_core::{Params, PhaxioClient, Upload};
//!
//! let client = PhaxioClient::new("api_key", "api_secret");
//! let params = Params::new()
//!     .field("to", "+15555550100")
//!     .file("file", Upload::from_string("Hello from Rust", "txt"))
//!     .map("tag", [("order_id", "1234")]);
//! let fax = client.send_fax(&params)?;
//! println!("queued fax {}", fax.id);
//! # Ok::<(), phaxio_core::PhaxioError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod resources;
pub mod response;
pub mod transport;
pub mod types;

pub use client::{Outcome, PhaxioClient};
pub use config::{ClientConfig, Credentials, DEFAULT_HOST};
pub use error::{ErrorKind, PhaxioError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use multipart::{EncodedBody, FieldValue, ParamValue, Params, Upload};
pub use resources::{Atas, Faxes};
pub use response::{OperationResult, classify, parse_envelope};
pub use transport::UreqTransport;
pub use types::{Ata, Fax, Page};
