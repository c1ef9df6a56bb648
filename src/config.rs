//! Process configuration.
//!
//! Everything has a default, so `Config::default()` is a working local
//! setup. [`Config::from_env`] overlays environment variables; a variable
//! that fails to parse leaves the default in place.

use std::env;

/// Default request-body ceiling in bytes.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1_000_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Deployment environment name, e.g. `production` or `development`.
    pub environment: String,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    /// Public origin used for absolute `$schema` URLs. When unset, the origin
    /// is derived from each request's `Host` and `X-Forwarded-Proto`.
    pub public_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "production".to_owned(),
            debug: false,
            host: "0.0.0.0".to_owned(),
            port: 8000,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            public_base_url: None,
        }
    }
}

impl Config {
    /// Reads `ENVIRONMENT`, `DEBUG`, `HOST`, `PORT`,
    /// `MAX_REQUEST_SIZE_BYTES` and `PUBLIC_BASE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading from any source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let environment = lookup("ENVIRONMENT")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.environment);

        let debug = lookup("DEBUG").map(|s| parse_bool(&s)).unwrap_or(defaults.debug);

        let host = lookup("HOST").filter(|s| !s.trim().is_empty()).unwrap_or(defaults.host);

        let port = lookup("PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let max_request_size = lookup("MAX_REQUEST_SIZE_BYTES")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_request_size);

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_owned())
            .filter(|s| !s.is_empty());

        Self { environment, debug, host, port, max_request_size, public_base_url }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// `host:port`, ready for [`Server::bind`](crate::Server::bind).
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_production() {
        let config = from(&[]);
        assert_eq!(config, Config::default());
        assert!(config.is_production());
        assert_eq!(config.max_request_size, 1_000_000);
    }

    #[test]
    fn overrides() {
        let config = from(&[
            ("ENVIRONMENT", "Development"),
            ("DEBUG", "true"),
            ("PORT", "9000"),
            ("MAX_REQUEST_SIZE_BYTES", "2048"),
            ("PUBLIC_BASE_URL", "https://api.example.com/"),
        ]);
        assert!(!config.is_production());
        assert!(config.debug);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.max_request_size, 2048);
        assert_eq!(config.public_base_url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn garbage_keeps_defaults() {
        let config = from(&[("PORT", "eighty"), ("MAX_REQUEST_SIZE_BYTES", "-1")]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_request_size, DEFAULT_MAX_REQUEST_SIZE);
    }
}
