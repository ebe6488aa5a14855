use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::models::package::PriceParseError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    PriceParse(#[from] PriceParseError),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            fields,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PriceParse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Database(err) = self {
            eprintln!("Database error: {:?}", err);
        }

        let body = match self {
            ApiError::Validation { message, fields } => json!({
                "error": message,
                "fields": fields,
            }),
            // Driver details stay in the server log, not the response.
            ApiError::Database(_) => json!({ "error": "Internal server error" }),
            other => json!({ "error": other.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
