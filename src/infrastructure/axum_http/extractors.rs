use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use url::form_urlencoded;

use crate::domain::value_objects::payloads::{RawBody, RawRequestParts, UploadedFile};

/// Captures query string and body in whatever shape the caller chose
/// (JSON, urlencoded form or multipart) without judging the content.
/// Merging and precedence are the payload resolver's job.
pub struct RawOperationRequest(pub RawRequestParts);

#[async_trait]
impl<S> FromRequest<S> for RawOperationRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let query = req
            .uri()
            .query()
            .map(|raw| {
                form_urlencoded::parse(raw.as_bytes())
                    .into_owned()
                    .collect::<Vec<(String, String)>>()
            })
            .unwrap_or_default();

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(bad_request)?;

            let mut fields = Vec::new();
            let mut files = Vec::new();

            while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
                // Field metadata must be taken before the data read
                // consumes the field.
                let name = field.name().unwrap_or_default().to_string();
                let file_name = field.file_name().map(|value| value.to_string());
                let field_content_type = field.content_type().map(|value| value.to_string());
                let data = field.bytes().await.map_err(bad_request)?;

                match file_name {
                    Some(file_name) => files.push(UploadedFile {
                        field: name,
                        file_name,
                        content_type: field_content_type,
                        content: data,
                    }),
                    None => fields.push((name, String::from_utf8_lossy(&data).to_string())),
                }
            }

            RawBody::Multipart { fields, files }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let bytes = Bytes::from_request(req, state).await.map_err(bad_request)?;
            let pairs = form_urlencoded::parse(&bytes)
                .into_owned()
                .collect::<Vec<(String, String)>>();

            RawBody::Form(pairs)
        } else {
            let bytes = Bytes::from_request(req, state).await.map_err(bad_request)?;

            // Bodies that are not JSON objects are treated as absent.
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value @ Value::Object(_)) => RawBody::Json(value),
                _ => RawBody::Empty,
            }
        };

        Ok(Self(RawRequestParts { query, body }))
    }
}

fn bad_request<E: std::fmt::Display>(err: E) -> Response {
    (StatusCode::BAD_REQUEST, err.to_string()).into_response()
}
