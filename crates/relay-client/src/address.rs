//! Ingest service address configuration and URL normalization.
//!
//! - [`IngestAddress`]: validated base URL with source tracking
//! - [`AddressSource`]: where the address came from
//! - [`AddressError`]: user-friendly validation errors
//!
//! # Address Resolution Precedence
//!
//! 1. `--url` on the command line
//! 2. `client.base_url` from configuration (file or `SENSOR_RELAY_CLIENT__BASE_URL`)
//! 3. Default: `http://127.0.0.1:8000`
//!
//! # URL Normalization
//!
//! - Bare host:port (e.g., `192.168.1.20:8000` → `http://192.168.1.20:8000/`)
//! - Missing port (e.g., `http://localhost` → `http://localhost:8000/`)
//! - IPv6 addresses (e.g., `[::1]:8000` → `http://[::1]:8000/`)
//!
//! # Example
//!
//! ```
//! use relay_client::address::{IngestAddress, AddressSource};
//!
//! let addr = IngestAddress::parse("localhost:8000", AddressSource::UserInput)?;
//! assert_eq!(addr.as_str(), "http://localhost:8000/");
//! assert_eq!(addr.snapshot_url()?.as_str(), "http://localhost:8000/data-snapshot");
//! # Ok::<(), relay_client::address::AddressError>(())
//! ```

use std::fmt;
use url::Url;

use relay_core::config::DEFAULT_PORT;

/// Default ingest service address when no configuration is provided.
pub const DEFAULT_INGEST_URL: &str = "http://127.0.0.1:8000";

/// Path of the snapshot endpoint.
pub const SNAPSHOT_PATH: &str = "data-snapshot";

/// Source of the address configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressSource {
    /// Hardcoded default (`http://127.0.0.1:8000`)
    #[default]
    Default,
    /// Loaded from configuration file or environment
    Config,
    /// Given on the command line
    UserInput,
}

impl AddressSource {
    /// Returns a short label for log output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Config => "config",
            Self::UserInput => "cli",
        }
    }
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Config => write!(f, "Configuration"),
            Self::UserInput => write!(f, "Command line"),
        }
    }
}

/// Validated ingest service address.
#[derive(Debug, Clone)]
pub struct IngestAddress {
    /// The normalized URL (always has scheme and port)
    url: Url,
    /// Where this address came from
    source: AddressSource,
}

impl IngestAddress {
    /// Parse and normalize a base URL.
    pub fn parse(input: &str, source: AddressSource) -> Result<Self, AddressError> {
        Ok(Self {
            url: normalize_url(input)?,
            source,
        })
    }

    /// Returns the normalized URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns where this address came from.
    #[must_use]
    pub fn source(&self) -> AddressSource {
        self.source
    }

    /// URL of the snapshot endpoint.
    pub fn snapshot_url(&self) -> Result<Url, AddressError> {
        self.endpoint(SNAPSHOT_PATH)
    }

    /// URL of an endpoint relative to the base.
    pub fn endpoint(&self, path: &str) -> Result<Url, AddressError> {
        self.url
            .join(path)
            .map_err(|e| AddressError::InvalidUrl(e.to_string()))
    }
}

impl fmt::Display for IngestAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// URL validation error with user-friendly messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Input was empty or whitespace-only
    EmptyInput,
    /// URL parsing failed
    InvalidUrl(String),
    /// No host was found in the URL
    MissingHost,
    /// Port could not be set
    InvalidPort(String),
    /// Unsupported URL scheme (only http/https allowed)
    UnsupportedScheme(String),
}

impl std::error::Error for AddressError {}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Address cannot be empty"),
            Self::InvalidUrl(e) => write!(f, "Invalid URL: {e}"),
            Self::MissingHost => write!(f, "URL must include a host"),
            Self::InvalidPort(e) => write!(f, "Invalid port: {e}"),
            Self::UnsupportedScheme(s) => write!(f, "Unsupported scheme '{s}' (use http or https)"),
        }
    }
}

/// Normalize a base URL string.
///
/// Adds `http://` when no scheme is given and port 8000 when no port is
/// given. A trailing slash is kept so endpoint paths join under the base.
pub fn normalize_url(input: &str) -> Result<Url, AddressError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(AddressError::EmptyInput);
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("http://{input}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| AddressError::InvalidUrl(e.to_string()))?;

    let scheme = url.scheme().to_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(AddressError::UnsupportedScheme(scheme));
    }

    if url.host().is_none() {
        return Err(AddressError::MissingHost);
    }

    if url.port().is_none() {
        url.set_port(Some(DEFAULT_PORT))
            .map_err(|()| AddressError::InvalidPort("Cannot set port on this URL".to_string()))?;
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Resolve the ingest address with precedence.
///
/// The first source that is present wins. A present but invalid address is
/// an error; it never falls through to a lower-precedence source.
pub fn resolve_address(
    user_input: Option<&str>,
    configured: Option<&str>,
) -> Result<IngestAddress, AddressError> {
    if let Some(input) = user_input {
        return IngestAddress::parse(input, AddressSource::UserInput);
    }

    if let Some(configured) = configured {
        return IngestAddress::parse(configured, AddressSource::Config);
    }

    Ok(IngestAddress::default())
}

impl Default for IngestAddress {
    fn default() -> Self {
        Self {
            url: normalize_url(DEFAULT_INGEST_URL).expect("Default URL should always parse"),
            source: AddressSource::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_host_port() {
        let url = normalize_url("127.0.0.1:8000").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_normalize_adds_default_port() {
        let url = normalize_url("http://localhost").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_normalize_ipv6() {
        let url = normalize_url("[::1]:9000").unwrap();
        assert_eq!(url.as_str(), "http://[::1]:9000/");
    }

    #[test]
    fn test_normalize_keeps_path_prefix() {
        let addr = IngestAddress::parse("http://relay.local:8080/sensors", AddressSource::Config)
            .unwrap();
        assert_eq!(
            addr.snapshot_url().unwrap().as_str(),
            "http://relay.local:8080/sensors/data-snapshot"
        );
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let url = normalize_url("  localhost:5000  ").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize_url("   ").unwrap_err(), AddressError::EmptyInput);
    }

    #[test]
    fn test_normalize_unsupported_scheme() {
        let err = normalize_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, AddressError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_default_matches_constant() {
        let addr = IngestAddress::default();
        assert_eq!(addr.as_str(), normalize_url(DEFAULT_INGEST_URL).unwrap().as_str());
        assert_eq!(addr.source(), AddressSource::Default);
    }

    #[test]
    fn test_resolve_user_input_wins() {
        let addr = resolve_address(Some("phone-relay:9000"), Some("http://127.0.0.1:8000")).unwrap();
        assert_eq!(addr.as_str(), "http://phone-relay:9000/");
        assert_eq!(addr.source(), AddressSource::UserInput);
    }

    #[test]
    fn test_resolve_invalid_user_input_is_an_error() {
        let err = resolve_address(Some("ftp://nope"), Some("127.0.0.1:8100")).unwrap_err();
        assert_eq!(err, AddressError::UnsupportedScheme("ftp".to_string()));
    }

    #[test]
    fn test_resolve_invalid_config_is_an_error() {
        let err = resolve_address(None, Some("ftp://192.0.2.1:9")).unwrap_err();
        assert!(matches!(err, AddressError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_resolve_config_then_default() {
        let addr = resolve_address(None, Some("127.0.0.1:8100")).unwrap();
        assert_eq!(addr.as_str(), "http://127.0.0.1:8100/");
        assert_eq!(addr.source(), AddressSource::Config);

        let addr = resolve_address(None, None).unwrap();
        assert_eq!(addr.source(), AddressSource::Default);
    }

    #[test]
    fn test_address_source_labels() {
        assert_eq!(AddressSource::UserInput.label(), "cli");
        assert_eq!(AddressSource::Config.to_string(), "Configuration");
    }
}
