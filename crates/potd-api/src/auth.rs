//! HTTP Basic-auth extractor for the admin routes.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use potd_core::{clock::Clock, store::PhraseStore};
use tracing::debug;

use crate::{AppState, error::ApiError};

/// The one admin account accepted by this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Present in a handler's arguments means the request was authenticated.
pub struct Authenticated;

/// Check the `Authorization` header against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = value.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;
  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != config.username {
    debug!("admin auth rejected: unknown user");
    return Err(ApiError::Unauthorized);
  }

  let parsed = PasswordHash::new(&config.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| {
      debug!("admin auth rejected: bad password");
      ApiError::Unauthorized
    })
}

impl<S, C> FromRequestParts<AppState<S, C>> for Authenticated
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, C>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)?;
    Ok(Authenticated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::HeaderValue;
  use rand_core::OsRng;

  fn config(password: &str) -> AuthConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "admin".to_string(), password_hash: hash }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn correct_credentials() {
    let cfg = config("secret");
    assert!(verify_auth(&headers(&basic("admin", "secret")), &cfg).is_ok());
  }

  #[test]
  fn wrong_password() {
    let cfg = config("secret");
    let res = verify_auth(&headers(&basic("admin", "nope")), &cfg);
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn wrong_user() {
    let cfg = config("secret");
    let res = verify_auth(&headers(&basic("root", "secret")), &cfg);
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn missing_or_malformed_header() {
    let cfg = config("secret");
    assert!(verify_auth(&HeaderMap::new(), &cfg).is_err());
    assert!(verify_auth(&headers("Bearer abc"), &cfg).is_err());
    assert!(verify_auth(&headers("Basic !!!not-base64!!!"), &cfg).is_err());
  }

  #[test]
  fn unparseable_hash_rejects() {
    let cfg = AuthConfig {
      username:      "admin".to_string(),
      password_hash: "not-a-phc-string".to_string(),
    };
    assert!(verify_auth(&headers(&basic("admin", "secret")), &cfg).is_err());
  }
}
