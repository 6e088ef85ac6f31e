use thiserror::Error;

/// Errors raised while talking to a report source.
///
/// Every variant falls into one of three classes, see [`SourceError::kind`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication against {url} failed: {reason}")]
    Authentication { url: String, reason: String },

    #[error("could not reach {url}: {source}")]
    Connectivity {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pagination limit reached for {identity}: exceeded {max_pages} pages")]
    PaginationLimit { identity: String, max_pages: usize },

    #[error("duplicate item key \"{key}\" returned by {identity}")]
    DuplicateKey { identity: String, key: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(#[source] reqwest::Error),
}

/// Coarse classification used by the pipeline and the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The credential was rejected. Retrying will not help.
    Authentication,
    /// Timeout or unreachable host. Worth retrying on the next scheduled run.
    Connectivity,
    /// The source broke its response contract or the page ceiling was hit.
    UnexpectedResponse,
}

impl SourceError {
    #[must_use]
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            SourceError::Authentication { .. } => SourceErrorKind::Authentication,
            SourceError::Connectivity { .. } | SourceError::ClientSetup(_) => {
                SourceErrorKind::Connectivity
            }
            SourceError::UnexpectedStatus { .. }
            | SourceError::Deserialize { .. }
            | SourceError::PaginationLimit { .. }
            | SourceError::DuplicateKey { .. }
            | SourceError::InvalidBaseUrl { .. } => SourceErrorKind::UnexpectedResponse,
        }
    }
}

impl std::fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceErrorKind::Authentication => write!(f, "authentication"),
            SourceErrorKind::Connectivity => write!(f, "connectivity"),
            SourceErrorKind::UnexpectedResponse => write!(f, "unexpected-response"),
        }
    }
}
