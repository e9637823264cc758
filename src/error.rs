use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    ClientInput(String),
    #[error("Payment {0} already exists")]
    AlreadyExists(String),
    #[error("Payment {0} not found")]
    NotFound(String),
    #[error("Payment {0} is in a terminal state")]
    TerminalRecord(String),
    #[error("Form too large: {size} bytes exceeds {limit}")]
    FormTooLarge { size: usize, limit: usize },
    #[error("Service is shutting down")]
    ShuttingDown,
    #[error("Too Many Requests")]
    RateLimited,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// HTTP status reported when this error crosses the request boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ClientInput(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyExists(_) | Self::TerminalRecord(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FormTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Config(_) | Self::Io(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
