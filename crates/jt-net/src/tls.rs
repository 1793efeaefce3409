//! TLS policy for HTTPS fetches.

use crate::url::FetchUrl;
use jt_core::RunnerError;
use jt_core::RunnerResult;

/// Supported TLS protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    V1_2,
    V1_3,
}

/// Which trust anchors verify server certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustStoreMode {
    /// Embedded Mozilla/WebPKI roots only.
    WebPkiOnly,
    /// WebPKI roots merged with operating-system roots (enterprise/local CAs).
    WebPkiAndOs,
}

/// Per-connection handshake parameters derived from [`TlsPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsHandshakeConfig {
    pub server_name: String,
    pub minimum_version: TlsVersion,
    pub maximum_version: TlsVersion,
    pub alpn_protocols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPolicy {
    pub minimum_version: TlsVersion,
    pub maximum_version: TlsVersion,
    pub trust_store_mode: TrustStoreMode,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self {
            minimum_version: TlsVersion::V1_2,
            maximum_version: TlsVersion::V1_3,
            trust_store_mode: TrustStoreMode::WebPkiOnly,
        }
    }
}

impl TlsPolicy {
    pub fn with_trust_store_mode(mut self, mode: TrustStoreMode) -> Self {
        self.trust_store_mode = mode;
        self
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.minimum_version > self.maximum_version {
            return Err(RunnerError::new(
                "net.tls.invalid_version_range",
                "minimum TLS version cannot be greater than maximum version",
            ));
        }
        Ok(())
    }

    /// `None` for plain HTTP.
    pub fn handshake_config_for(&self, url: &FetchUrl) -> RunnerResult<Option<TlsHandshakeConfig>> {
        self.validate()?;
        if !url.is_secure() {
            return Ok(None);
        }
        Ok(Some(TlsHandshakeConfig {
            server_name: url
                .host()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_owned(),
            minimum_version: self.minimum_version,
            maximum_version: self.maximum_version,
            alpn_protocols: vec!["http/1.1".to_owned()],
        }))
    }
}
