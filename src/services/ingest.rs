use crate::models::IngestedFile;
use axum::{
    body::Body,
    extract::{Multipart, multipart::MultipartError},
    http::{HeaderMap, StatusCode, header},
};
use bytes::BytesMut;
use http_body_util::BodyExt;
use thiserror::Error;

/// Multipart field whose bytes are measured.
pub const FILE_FIELD: &str = "file";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IngestError {
    #[error("maxFileSize exceeded, received more than {limit} bytes")]
    TooLarge { limit: usize },

    #[error("{0}")]
    Malformed(String),
}

impl IngestError {
    fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            IngestError::TooLarge { limit }
        } else {
            IngestError::Malformed(err.body_text())
        }
    }
}

/// Stream a multipart body and measure the first `file` field.
///
/// File bytes are counted and dropped as they arrive; nothing is retained.
/// Reading stops at the first chunk that pushes the field past `limit`.
/// Other fields are skipped. A form without a `file` field yields an empty
/// [`IngestedFile`].
pub async fn measure_multipart(
    mut multipart: Multipart,
    limit: usize,
) -> Result<IngestedFile, IngestError> {
    let mut ingested: Option<IngestedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::from_multipart(e, limit))?
    {
        if ingested.is_some() || field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let mut size_bytes: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| IngestError::from_multipart(e, limit))?
        {
            size_bytes += chunk.len() as u64;
            if size_bytes > limit as u64 {
                return Err(IngestError::TooLarge { limit });
            }
        }

        ingested = Some(IngestedFile {
            filename,
            size_bytes,
        });
    }

    Ok(ingested.unwrap_or_default())
}

/// Reject up front when the client already announced an oversized body.
pub fn check_declared_length(headers: &HeaderMap, limit: usize) -> Result<(), IngestError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        Some(len) if len > limit as u64 => Err(IngestError::TooLarge { limit }),
        _ => Ok(()),
    }
}

/// Read a JSON document of at most `limit` bytes.
///
/// An empty body is accepted as `null`.
pub async fn read_json_document(
    mut body: Body,
    limit: usize,
) -> Result<serde_json::Value, IngestError> {
    let mut buf = BytesMut::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| IngestError::Malformed(e.to_string()))?;
        if let Ok(data) = frame.into_data() {
            if buf.len() + data.len() > limit {
                return Err(IngestError::TooLarge { limit });
            }
            buf.extend_from_slice(&data);
        }
    }

    if buf.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }

    serde_json::from_slice(&buf)
        .map_err(|e| IngestError::Malformed(format!("Invalid JSON body: {}", e)))
}
