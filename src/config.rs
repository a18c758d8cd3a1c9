//! Client configuration.
//!
//! The only required setting is the base URL of the auth server. It can be
//! provided explicitly or picked up from the `AUTH_BASE_URL` environment
//! variable (a `.env` file is honored if present).

/// Environment variable naming the auth server base URL
const BASE_URL_ENV: &str = "AUTH_BASE_URL";

/// Default base URL when none is configured.
/// Matches the auth server's default development port.
const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
}

impl Config {
    /// Create a config for the given base URL. A trailing slash is stripped
    /// so endpoint paths can be appended verbatim.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Load configuration from the environment, falling back to the default
    /// base URL. Loads `.env` first if one exists.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_stripped() {
        let config = Config::new("http://example.com/");
        assert_eq!(config.base_url, "http://example.com");

        let config = Config::new("http://example.com//");
        assert_eq!(config.base_url, "http://example.com");
    }

    #[test]
    fn test_default_base_url() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:5000");
    }
}
