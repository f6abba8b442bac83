//! API error type and [`axum::response::IntoResponse`] implementation.

use std::time::Duration;

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use potd_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("too many requests from this address, please try again later")]
  RateLimited { retry_after: Duration },

  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("{}", .0.body_text())]
  Json(#[from] JsonRejection),

  #[error("{}", .0.body_text())]
  Path(#[from] PathRejection),

  #[error("{}", .0.body_text())]
  Query(#[from] QueryRejection),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
      ApiError::Core(e) => match e {
        CoreError::NoContentAvailable(_) | CoreError::NotFound(_) => {
          StatusCode::NOT_FOUND
        }
        CoreError::Validation(_)
        | CoreError::UnknownDifficulty(_)
        | CoreError::InvalidTimeZone(_) => StatusCode::BAD_REQUEST,
        CoreError::SelectionConflict(_) => StatusCode::CONFLICT,
        CoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      // A well-formed body with the wrong shape is still a bad request.
      ApiError::Json(JsonRejection::JsonDataError(_)) => StatusCode::BAD_REQUEST,
      ApiError::Json(e) => e.status(),
      ApiError::Path(e) => e.status(),
      ApiError::Query(e) => e.status(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }

    // Backend details stay in the log.
    let message = match &self {
      ApiError::Core(CoreError::Store(_)) => "internal server error".to_owned(),
      other => other.to_string(),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    match self {
      ApiError::Unauthorized => {
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"potd\""),
        );
      }
      ApiError::RateLimited { retry_after } => {
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        res.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
      }
      _ => {}
    }
    res
  }
}
