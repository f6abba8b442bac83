//! Server configuration: a TOML file layered with `POTD_*` environment
//! variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, bail};
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  /// Mount point of the public routes.
  pub api_base:               String,
  /// Mount point of the admin routes.
  pub admin_base:             String,
  /// Time zone of the calendar day: `"local"`, an offset such as
  /// `"+02:00"`, or an IANA name such as `"Europe/Madrid"`.
  pub time_zone:              String,
  pub request_timeout_ms:     u64,
  /// Browser origins allowed to call the API. Empty disables CORS.
  pub cors_origins:           Vec<String>,
  /// Requests per client address per window on the public routes. Zero
  /// disables rate limiting.
  pub rate_limit_max:         u32,
  pub rate_limit_window_secs: u64,
  pub admin_username:         String,
  /// Argon2 PHC string. Without one every admin request is rejected.
  pub admin_password_hash:    Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                   "127.0.0.1".to_string(),
      port:                   3000,
      store_path:             PathBuf::from("~/.local/share/potd/phrases.db"),
      api_base:               "/api/v1".to_string(),
      admin_base:             "/admin".to_string(),
      time_zone:              "local".to_string(),
      request_timeout_ms:     5000,
      cors_origins:           vec![
        "https://spanishphraseoftheday.com".to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
      ],
      rate_limit_max:         100,
      rate_limit_window_secs: 15 * 60,
      admin_username:         "admin".to_string(),
      admin_password_hash:    None,
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> { Self::load_with_env(path, None) }

  /// As [`load`](Self::load), reading variables from `env` instead of the
  /// process environment when given.
  fn load_with_env(
    path: &Path,
    env: Option<config::Map<String, String>>,
  ) -> anyhow::Result<Self> {
    // POTD_CORS_ORIGINS is a comma-separated list.
    let environment = config::Environment::with_prefix("POTD")
      .try_parsing(true)
      .list_separator(",")
      .with_list_parse_key("cors_origins")
      .source(env);

    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(environment)
      .build()
      .context("failed to read config file")?;

    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.validate()?;
    Ok(cfg)
  }

  fn validate(&self) -> anyhow::Result<()> {
    for (name, base) in [("api_base", &self.api_base), ("admin_base", &self.admin_base)] {
      if !base.is_empty() && !base.starts_with('/') {
        bail!("{name} must start with '/': {base:?}");
      }
    }
    if self.api_base.trim_end_matches('/') == self.admin_base.trim_end_matches('/') {
      bail!("api_base and admin_base must differ");
    }
    if self.request_timeout_ms == 0 {
      bail!("request_timeout_ms must be positive");
    }
    Ok(())
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }

  pub fn rate_limit_window(&self) -> Duration {
    Duration::from_secs(self.rate_limit_window_secs)
  }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn write_config(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
  }

  #[test]
  fn missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServerConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.api_base, "/api/v1");
    assert_eq!(cfg.admin_base, "/admin");
    assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.time_zone, "local");
    assert_eq!(cfg.rate_limit_max, 100);
    assert_eq!(cfg.rate_limit_window(), Duration::from_secs(900));
    assert_eq!(cfg.cors_origins.len(), 3);
    assert!(cfg.admin_password_hash.is_none());
  }

  #[test]
  fn file_overrides_defaults() {
    let file = write_config(
      r#"
        port = 8080
        time_zone = "America/New_York"
        cors_origins = ["https://example.org"]
        admin_password_hash = "$argon2id$v=19$stub"
      "#,
    );
    let cfg = ServerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.time_zone, "America/New_York");
    assert_eq!(cfg.cors_origins, ["https://example.org"]);
    assert_eq!(cfg.host, "127.0.0.1");
    assert!(cfg.admin_password_hash.is_some());
  }

  fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
    vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn environment_overrides_file() {
    let file = write_config(
      r#"
        port = 8080
        host = "0.0.0.0"
        time_zone = "+02:00"
      "#,
    );
    let vars = env(&[
      ("POTD_PORT", "9090"),
      ("POTD_TIME_ZONE", "Europe/Madrid"),
      ("POTD_ADMIN_BASE", "/manage"),
      ("POTD_RATE_LIMIT_MAX", "0"),
      ("POTD_CORS_ORIGINS", "https://a.example,https://b.example"),
      ("OTHER_PORT", "1"),
    ]);

    let cfg = ServerConfig::load_with_env(file.path(), Some(vars)).unwrap();
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.time_zone, "Europe/Madrid");
    assert_eq!(cfg.admin_base, "/manage");
    assert_eq!(cfg.rate_limit_max, 0);
    assert_eq!(cfg.cors_origins, ["https://a.example", "https://b.example"]);
  }

  #[test]
  fn environment_values_are_validated() {
    let dir = tempfile::tempdir().unwrap();
    let vars = env(&[("POTD_API_BASE", "/admin")]);
    assert!(ServerConfig::load_with_env(&dir.path().join("absent.toml"), Some(vars)).is_err());
  }

  #[test]
  fn rejects_relative_base() {
    let file = write_config(r#"api_base = "api""#);
    assert!(ServerConfig::load(file.path()).is_err());
  }

  #[test]
  fn rejects_colliding_bases() {
    let file = write_config(
      r#"
        api_base = "/v1"
        admin_base = "/v1/"
      "#,
    );
    assert!(ServerConfig::load(file.path()).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    let expanded = expand_tilde(Path::new("~/potd.db"));
    assert_eq!(expanded, PathBuf::from(home).join("potd.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/potd.db")), PathBuf::from("/tmp/potd.db"));
  }
}
