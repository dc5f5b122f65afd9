use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

/// Milliseconds since the Unix epoch, wall clock.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Receive/complete timestamps for one request.
///
/// `processed_at` is never earlier than `received_at`, so a backwards step of
/// the wall clock between the two captures yields zero instead of a negative
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub received_at: i64,
    pub processed_at: i64,
}

impl Timing {
    pub fn new(received_at: i64, processed_at: i64) -> Self {
        Self {
            received_at,
            processed_at: processed_at.max(received_at),
        }
    }

    pub fn processing_ms(&self) -> i64 {
        self.processed_at - self.received_at
    }
}

/// Started at the moment a request is accepted, before the body is touched.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    received_at: i64,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            received_at: now_epoch_ms(),
        }
    }

    pub fn stop(self) -> Timing {
        Timing::new(self.received_at, now_epoch_ms())
    }
}

/// What ingestion learned about the uploaded `file` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestedFile {
    pub filename: Option<String>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub filename: Option<String>,
    pub size_bytes: u64,
    pub timing: Timing,
}

impl UploadMetadata {
    pub fn new(file: IngestedFile, timing: Timing) -> Self {
        Self {
            filename: file.filename,
            size_bytes: file.size_bytes,
            timing,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadTimingResponse {
    pub ok: bool,
    /// Original client-side file name, `null` when no `file` field was sent
    pub filename: Option<String>,
    /// Bytes actually read from the `file` field
    pub size: u64,
    pub server_received_at: i64,
    pub server_processed_at: i64,
    pub server_processing_ms: i64,
}

impl From<UploadMetadata> for UploadTimingResponse {
    fn from(meta: UploadMetadata) -> Self {
        Self {
            ok: true,
            filename: meta.filename,
            size: meta.size_bytes,
            server_received_at: meta.timing.received_at,
            server_processed_at: meta.timing.processed_at,
            server_processing_ms: meta.timing.processing_ms(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TelemetryAck {
    pub ok: bool,
    pub received: bool,
}

impl TelemetryAck {
    pub fn received() -> Self {
        Self {
            ok: true,
            received: true,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// Multipart form accepted by `POST /upload`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Arbitrary JSON document accepted by `POST /api/log`.
#[derive(ToSchema)]
#[schema(value_type = Object)]
#[allow(dead_code)]
pub struct TelemetryDocument(serde_json::Value);
