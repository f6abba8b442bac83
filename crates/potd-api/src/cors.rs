//! Cross-origin access for browser clients.

use axum::http::{HeaderValue, Method, header, header::InvalidHeaderValue};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// A CORS layer admitting exactly `origins`, with credentials.
pub fn layer(origins: &[String]) -> Result<CorsLayer, InvalidHeaderValue> {
  let origins = origins
    .iter()
    .map(|o| HeaderValue::from_str(o.trim_end_matches('/')))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(
    CorsLayer::new()
      .allow_origin(AllowOrigin::list(origins))
      .allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
      ])
      .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
      .allow_credentials(true),
  )
}
