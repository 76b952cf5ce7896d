use thiserror::Error;

/// Failures while reading or writing the persisted registry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures reported by the chat platform port.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Discord API error: {0}")]
    Http(String),
    #[error("Attachment download failed: {0}")]
    Download(String),
}

/// Everything that can abort a quote or set-channel command.
///
/// Temp-file cleanup problems are not represented here: they are logged by the
/// staging guard and never change the outcome of a command.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("There is no quote channel set for this guild! Please set one with /setchannel.")]
    NotConfigured,

    #[error("{0}")]
    Resolution(String),

    #[error("Empty quote")]
    EmptyQuote,

    #[error("Failed to reference quoted message: {0}")]
    Render(String),

    #[error("Failed to send quote: {0}")]
    Delivery(String),

    #[error("Failed to save quote channel: {0}")]
    Store(#[from] StoreError),
}
