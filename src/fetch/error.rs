use thiserror::Error;

/// Everything that can go wrong while fetching one feed. Each variant carries
/// a stable machine code so batch summaries stay scriptable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch feed {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("feed responded with status {status}")]
    Http { status: u16 },

    #[error("failed to parse feed content: {message}")]
    Parse { message: String },

    #[error("feed fetch exceeded {timeout_secs}s timeout")]
    Timeout { timeout_secs: u64 },

    #[error("unexpected error while fetching feed: {message}")]
    Unknown { message: String },
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "NETWORK",
            FetchError::Http { .. } => "HTTP_ERROR",
            FetchError::Parse { .. } => "PARSE_ERROR",
            FetchError::Timeout { .. } => "TIMEOUT",
            FetchError::Unknown { .. } => "UNKNOWN",
        }
    }
}

// Store failures inside one feed's pipeline are the catch-all tier: they are
// not the feed's fault and carry no dedicated code.
impl From<sqlx::Error> for FetchError {
    fn from(err: sqlx::Error) -> Self {
        FetchError::Unknown { message: format!("store error: {err}") }
    }
}

#[cfg(test)]
mod tests {
    use super::FetchError;

    #[test]
    fn codes_are_stable() {
        assert_eq!(FetchError::Http { status: 503 }.code(), "HTTP_ERROR");
        assert_eq!(FetchError::Parse { message: "bad".into() }.code(), "PARSE_ERROR");
        assert_eq!(FetchError::Timeout { timeout_secs: 30 }.code(), "TIMEOUT");
        assert_eq!(FetchError::Unknown { message: "x".into() }.code(), "UNKNOWN");
    }

    #[test]
    fn messages_name_the_condition() {
        let err = FetchError::Http { status: 404 };
        assert_eq!(err.to_string(), "feed responded with status 404");

        let err = FetchError::Timeout { timeout_secs: 30 };
        assert!(err.to_string().contains("30s"));
    }
}
