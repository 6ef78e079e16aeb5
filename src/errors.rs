use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong between a device POST and a stored reading.
///
/// Authentication and method errors terminate before the body is touched,
/// validation errors terminate before classification and persistence, and a
/// persistence failure discards the classification result. Telemetry update
/// failures are not represented here: they are logged and swallowed after
/// the reading has already been stored.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Invalid JSON body")]
    InvalidBody,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Device not found or inactive")]
    DeviceNotFound,
    #[error("Patient ID mismatch")]
    PatientMismatch,
    #[error("Failed to save ECG data")]
    Persistence(#[from] sqlx::Error),
    #[error("Internal server error")]
    Internal,
}

impl ResponseError for IngestError {
    fn status_code(&self) -> StatusCode {
        match self {
            IngestError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            IngestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IngestError::InvalidBody | IngestError::MissingField(_) => StatusCode::BAD_REQUEST,
            IngestError::DeviceNotFound => StatusCode::NOT_FOUND,
            IngestError::PatientMismatch => StatusCode::FORBIDDEN,
            IngestError::Persistence(_) | IngestError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_taxonomy() {
        assert_eq!(IngestError::InvalidApiKey.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            IngestError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            IngestError::MissingField("heart_rate").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(IngestError::DeviceNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(IngestError::PatientMismatch.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            IngestError::Persistence(sqlx::Error::PoolClosed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_field_names_the_field() {
        assert_eq!(
            IngestError::MissingField("ecg_data").to_string(),
            "Missing required field: ecg_data"
        );
    }
}
