pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("API token missing or placeholder: set {0}")]
    MissingCredential(String),

    #[error("failed to list zones: {0}")]
    ZoneListing(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited after {0} retries")]
    RateLimited(u32),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Whether this error aborts the whole run rather than a single
    /// record.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential(_) | Self::ZoneListing(_) | Self::InvalidConfig(_)
        )
    }
}
