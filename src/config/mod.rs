use std::env;

/// Largest accepted `file` field (and JSON telemetry document), 100 MiB.
pub const DEFAULT_MAX_FILE_BYTES: usize = 100 * 1024 * 1024;

/// Slack granted on top of `max_file_bytes` for multipart boundaries and part headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration, read once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Static API key accepted verbatim (default: unset)
    pub api_key: Option<String>,

    /// HMAC secret used to verify signed bearer tokens (default: unset)
    pub jwt_secret: Option<String>,

    /// Maximum size of an uploaded file or telemetry document in bytes (default: 100 MiB)
    pub max_file_bytes: usize,

    /// Listen port (default: 3000)
    pub port: u16,

    /// Reject callers that cannot present a valid credential (default: true).
    /// When false the authentication gate is disabled entirely.
    pub auth_required: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            jwt_secret: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            port: 3000,
            auth_required: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            api_key: non_empty_var("API_KEY"),

            jwt_secret: non_empty_var("JWT_SECRET"),

            max_file_bytes: env::var("MAX_FILE_BYTES")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default.max_file_bytes),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default.port),

            auth_required: env::var("AUTH_REQUIRED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.auth_required),
        }
    }

    /// Create config for local development (authentication gate disabled)
    pub fn development() -> Self {
        Self {
            auth_required: false,
            ..Self::default()
        }
    }

    /// Whole-request cap for multipart uploads.
    pub fn multipart_body_limit(&self) -> usize {
        self.max_file_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)
    }

    /// True when the gate is on but nothing could ever pass it.
    pub fn rejects_everyone(&self) -> bool {
        self.auth_required && self.api_key.is_none() && self.jwt_secret.is_none()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
