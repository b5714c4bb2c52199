use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-2xx response; displays as the response status text.
    #[error("{status_text}")]
    Http { status: u16, status_text: String },

    #[error("network error: {0}")]
    Network(String),

    /// The response body was not the JSON shape we read from.
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn from_status(status: u16, reason: Option<&str>) -> Self {
        let status_text = reason
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self::Http {
            status,
            status_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_display_the_status_text() {
        let err = FetchError::from_status(503, Some("Service Unavailable"));
        assert_eq!(err.to_string(), "Service Unavailable");
        let err = FetchError::from_status(599, None);
        assert_eq!(err.to_string(), "HTTP 599");
    }
}
