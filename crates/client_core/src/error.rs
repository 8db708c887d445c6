use thiserror::Error;

/// A collection API call that failed in transport or came back as an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct ApiFailure {
    pub status: Option<u16>,
    /// Human-readable message from the error body, when the API sent one.
    pub message: Option<String>,
    pub detail: String,
}

impl ApiFailure {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            message: None,
            detail: detail.into(),
        }
    }

    pub fn status(status: u16, message: Option<String>) -> Self {
        Self {
            status: Some(status),
            message,
            detail: format!("request failed with status code {status}"),
        }
    }

    pub fn user_message(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.detail)
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(value: reqwest::Error) -> Self {
        Self {
            status: value.status().map(|status| status.as_u16()),
            message: None,
            detail: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page size must be at least 1")]
    InvalidPageSize,
    #[error("page {requested} is outside 1..={total_pages}")]
    OutOfRange { requested: u32, total_pages: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Api(#[from] ApiFailure),
}

#[derive(Debug, Error)]
pub enum ClientSetupError {
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("api base url must be http(s) and able to carry a path, got '{0}'")]
    UnsupportedBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}
