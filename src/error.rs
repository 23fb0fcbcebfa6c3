use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{service} returned HTTP {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl AppError {
    /// Builds an upstream error from a non-success response, keeping at most
    /// 500 characters of its body.
    pub async fn upstream(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AppError::Upstream {
            service,
            status,
            body: body.chars().take(500).collect(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.to_string(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Malformed(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingCredentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timestamp(_) => StatusCode::BAD_GATEWAY,
            AppError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
