//! multipart/form-data encoding for request parameters.
//!
//! # Design
//! Phaxio expects repeated keys for array parameters (`tags[]`) and bracketed
//! subkeys for maps (`tag[order_id]`). The encoder therefore renders the body
//! itself instead of going through a generic form builder: parameters are
//! flattened in insertion order, each flattened field becomes one chunk, and
//! chunks are delimited by a random boundary that is fresh for every call.

use std::io::{self, Read};
use std::path::Path;

use uuid::Uuid;

const CRLF: &str = "\r\n";

/// Every boundary starts with this run of dashes followed by a random token.
pub const BOUNDARY_PREFIX: &str = "----------------------------";

/// An in-memory file payload.
///
/// The server only sees the extension: every upload is sent with the
/// filename `string.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    bytes: Vec<u8>,
    extension: String,
}

impl Upload {
    /// Text content sent as a file, e.g. `Upload::from_string("<p>hi</p>", "html")`.
    pub fn from_string(contents: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            bytes: contents.into().into_bytes(),
            extension: extension.into(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, extension: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            extension: extension.into(),
        }
    }

    /// Drain `reader` into memory. `name` takes the place of the extension,
    /// so a stream named `invoice.pdf` is uploaded as `string.invoice.pdf`.
    pub fn from_reader<R: Read>(mut reader: R, name: impl Into<String>) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self {
            bytes,
            extension: name.into(),
        })
    }

    /// Read a file from disk, named after its final path component.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, name)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn filename(&self) -> String {
        format!("string.{}", self.extension)
    }
}

/// A single value as it appears in one multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    /// Rendered as the literal `true` / `false`.
    Boolean(bool),
    Binary(Upload),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Scalar(value.clone())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Upload> for FieldValue {
    fn from(value: Upload) -> Self {
        FieldValue::Binary(value)
    }
}

macro_rules! scalar_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(value: $t) -> Self {
                    FieldValue::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from_number!(i32, i64, u32, u64, usize, f64);

/// A top-level parameter: one value, a list flattened to `key[]`, or a map
/// flattened to `key[subkey]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(FieldValue),
    List(Vec<FieldValue>),
    Map(Vec<(String, FieldValue)>),
}

impl From<FieldValue> for ParamValue {
    fn from(value: FieldValue) -> Self {
        ParamValue::Single(value)
    }
}

/// Ordered request parameters.
///
/// Setting a key that already exists replaces its value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, ParamValue::Single(value.into()));
        self
    }

    pub fn file(self, key: impl Into<String>, upload: Upload) -> Self {
        self.field(key, upload)
    }

    pub fn list<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.set(
            key,
            ParamValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn map<I, K, V>(mut self, key: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.set(
            key,
            ParamValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Expand lists and maps into the field names sent on the wire.
    pub fn flatten(&self) -> Vec<(String, &FieldValue)> {
        let mut fields = Vec::new();
        for (key, value) in &self.entries {
            match value {
                ParamValue::Single(v) => fields.push((key.clone(), v)),
                ParamValue::List(items) => {
                    fields.extend(items.iter().map(|v| (format!("{key}[]"), v)));
                }
                ParamValue::Map(entries) => {
                    fields.extend(
                        entries
                            .iter()
                            .map(|(sub, v)| (format!("{key}[{sub}]"), v)),
                    );
                }
            }
        }
        fields
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.set(k, ParamValue::Single(v.into()));
        }
        params
    }
}

/// A rendered multipart body together with the headers that describe it.
#[derive(Debug, Clone)]
pub struct EncodedBody {
    boundary: String,
    chunks: Vec<Vec<u8>>,
    content_type: String,
    body: Vec<u8>,
}

impl EncodedBody {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// One rendered chunk per flattened field, delimiter line included.
    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// `Content-Length`, `Expect` and `Content-Type`, in that order.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Length".to_string(), self.body.len().to_string()),
            ("Expect".to_string(), "100-continue".to_string()),
            ("Content-Type".to_string(), self.content_type.clone()),
        ]
    }
}

/// A fresh boundary. The random part is a v4 UUID in hex, so concurrent
/// callers do not share state and collisions are negligible.
pub fn generate_boundary() -> String {
    format!("{BOUNDARY_PREFIX}{}", Uuid::new_v4().simple())
}

pub fn encode(params: &Params) -> EncodedBody {
    encode_with_boundary(params, generate_boundary())
}

/// Encode with a caller-chosen boundary. The boundary must not occur in any
/// field content.
pub fn encode_with_boundary(params: &Params, boundary: impl Into<String>) -> EncodedBody {
    let boundary = boundary.into();
    let chunks: Vec<Vec<u8>> = params
        .flatten()
        .into_iter()
        .map(|(name, value)| render_chunk(&boundary, &name, value))
        .collect();

    let mut body = Vec::with_capacity(chunks.iter().map(|c| c.len() + 2).sum::<usize>() + 64);
    for chunk in &chunks {
        body.extend_from_slice(chunk);
        body.extend_from_slice(CRLF.as_bytes());
    }
    body.extend_from_slice(format!("--{boundary}--{CRLF}").as_bytes());

    EncodedBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        boundary,
        chunks,
        body,
    }
}

fn render_chunk(boundary: &str, name: &str, value: &FieldValue) -> Vec<u8> {
    let mut chunk = format!("--{boundary}{CRLF}").into_bytes();
    match value {
        FieldValue::Binary(upload) => {
            chunk.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"{CRLF}\
                     Content-Type: application/octet-stream{CRLF}{CRLF}",
                    upload.filename()
                )
                .as_bytes(),
            );
            chunk.extend_from_slice(upload.bytes());
        }
        FieldValue::Scalar(text) => {
            chunk.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"{CRLF}{CRLF}").as_bytes(),
            );
            chunk.extend_from_slice(text.as_bytes());
        }
        FieldValue::Boolean(flag) => {
            chunk.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"{CRLF}{CRLF}{flag}")
                    .as_bytes(),
            );
        }
    }
    chunk
}
