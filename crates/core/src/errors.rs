use thiserror::Error;

/// Unified error type for the entire chain-portfolio-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── API / Network ───────────────────────────────────────────────
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    // ── Serialization ───────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── File I/O (durable logo store) ───────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Configuration / input ───────────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No wallet address provided")]
    MissingWalletAddress,

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Shorthand used by providers when an upstream payload is unusable.
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return CoreError::Http {
                status: status.as_u16(),
            };
        }
        // reqwest errors carry the full URL; drop the query string so wallet
        // addresses and API keys never end up in logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
