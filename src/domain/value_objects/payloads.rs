use bytes::Bytes;
use serde_json::{Map, Value};

/// Everything extracted from an inbound HTTP request before any
/// merging happens. Query pairs and body are kept separate because
/// they carry different precedence during resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequestParts {
    pub query: Vec<(String, String)>,
    pub body: RawBody,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<UploadedFile>,
    },
}

/// A binary part received in a multipart body. The bytes are kept
/// as-is and re-streamed to the automation backend untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

/// The single flat payload produced by merging query and body values,
/// with transport-control keys already stripped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPayload {
    pub fields: Map<String, Value>,
    pub files: Vec<UploadedFile>,
}

impl ResolvedPayload {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|value| value.as_str())
    }
}
