use axum::http::Method;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::domain::value_objects::payloads::{ResolvedPayload, UploadedFile};

/// A fully prepared call to the automation backend.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub path: String,
    pub payload: Map<String, Value>,
    pub files: Vec<UploadedFile>,
}

impl ForwardRequest {
    pub fn new(method: Method, path: String, payload: ResolvedPayload) -> Self {
        Self {
            method,
            path,
            payload: payload.fields,
            files: payload.files,
        }
    }

    pub fn encoding(&self) -> BodyEncoding {
        BodyEncoding::for_request(&self.method, &self.files)
    }
}

/// How the payload travels to the backend. GET requests never carry a
/// body, uploads go multipart, everything else is JSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyEncoding {
    QueryOnly,
    Json,
    Multipart,
}

impl BodyEncoding {
    pub fn for_request(method: &Method, files: &[UploadedFile]) -> Self {
        if *method == Method::GET {
            return BodyEncoding::QueryOnly;
        }

        if !files.is_empty() {
            return BodyEncoding::Multipart;
        }

        BodyEncoding::Json
    }
}

#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(Value),
    Raw(Bytes),
}

impl ForwardResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }
}
