use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ApiResponse;

use super::HandlerError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Internal Server Error: {0}")]
    InternalError(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::InternalError(msg) => {
                HttpResponse::InternalServerError().json(ApiResponse::<()>::error(msg))
            }
            ApiError::NotFound(msg) => HttpResponse::NotFound().json(ApiResponse::<()>::error(msg)),
            ApiError::BadRequest(msg) => {
                HttpResponse::BadRequest().json(ApiResponse::<()>::error(msg))
            }
            ApiError::ServiceUnavailable(msg) => {
                HttpResponse::ServiceUnavailable().json(ApiResponse::<()>::error(msg))
            }
        }
    }
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Validation(msg) => ApiError::BadRequest(msg),
            HandlerError::NotFound(msg) => ApiError::NotFound(msg),
            HandlerError::Store(e) => ApiError::ServiceUnavailable(e.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_response_status_codes() {
        let err = ApiError::NotFound("op".to_string());
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);

        let err = ApiError::BadRequest("bad".to_string());
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);

        let err = ApiError::ServiceUnavailable("down".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_from_handler_error() {
        let err: ApiError = HandlerError::Validation("missing address".to_string()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = HandlerError::NotFound("op-1".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
