use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use core::fmt;
use serde_json::json;
use std::error::Error;

#[derive(Debug)]
pub enum HttpError {
    BadRequest {
        message: String,
        error: Option<String>,
    },
    NotFound(&'static str),
    Internal {
        message: &'static str,
        error: String,
    },
}

// Every variant renders as a JSON object with a `message` and, when known, the underlying `error`
impl HttpError {
    pub fn bad_request(message: &str, err: impl fmt::Display) -> Self {
        Self::BadRequest {
            message: message.to_owned(),
            error: Some(err.to_string()),
        }
    }

    pub fn internal(message: &'static str, err: impl fmt::Display) -> Self {
        Self::Internal {
            message,
            error: err.to_string(),
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } => message.as_str(),
            Self::NotFound(message) | Self::Internal { message, .. } => *message,
        }
    }

    fn error(&self) -> Option<&str> {
        match self {
            Self::BadRequest { error, .. } => error.as_deref(),
            Self::NotFound(_) => None,
            Self::Internal { error, .. } => Some(error.as_str()),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.error() {
            Some(error) => write!(f, "{}: {} ({error})", self.status_code().as_str(), self.message()),
            None => write!(f, "{}: {}", self.status_code().as_str(), self.message()),
        }
    }
}

impl Error for HttpError {}

impl ResponseError for HttpError {
    fn error_response(&self) -> HttpResponse {
        let body = match self.error() {
            Some(error) => json!({ "message": self.message(), "error": error }),
            None => json!({ "message": self.message() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
