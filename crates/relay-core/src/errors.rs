/// Core error type for the relay.
///
/// Adapter crates map their transport failures into this type so the binary
/// can tell fatal configuration problems apart from runtime failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
