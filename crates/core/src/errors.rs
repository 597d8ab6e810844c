use thiserror::Error;

/// Unified error type for the entire finance-dashboard-core library.
/// Every public function returns `Result<T, CoreError>`.
///
/// Errors are terminal for the operation that raised them only: the
/// dashboard and the live market store stay usable afterwards.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Backend reads ───────────────────────────────────────────────
    #[error("Failed to fetch {query}: {message}")]
    Fetch { query: String, message: String },

    #[error("No rows returned for {0}")]
    NotFound(String),

    // ── Computation ─────────────────────────────────────────────────
    #[error("Unparseable date: {0}")]
    InvalidDate(String),

    // ── Remote procedures / push channel ────────────────────────────
    #[error("Remote procedure {procedure} failed: {message}")]
    RemoteProcedure { procedure: String, message: String },

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Live market store has been disposed")]
    StoreDisposed,

    // ── Transport / encoding ────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// Shorthand for a failed read query.
    pub fn fetch(query: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Fetch {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a failed remote procedure call.
    pub fn remote(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::RemoteProcedure {
            procedure: procedure.into(),
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
        // reqwest errors carry the full URL; drop the query string so
        // filters and keys never end up in user-visible messages.
        CoreError::Network(sanitize_url_message(&e.to_string()))
    }
}

/// Strip everything after the first `?` of a message that embeds a URL.
pub(crate) fn sanitize_url_message(msg: &str) -> String {
    match msg.find('?') {
        Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
        None => msg.to_string(),
    }
}
