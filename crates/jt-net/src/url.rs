//! URL validation for script-issued requests.

use jt_core::RunnerError;
use jt_core::RunnerResult;
use url::Url;

/// Schemes `fetch` may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Self::Https)
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// A URL that passed validation and can be put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUrl {
    parsed: Url,
    scheme: Scheme,
    host: String,
    port: u16,
}

impl FetchUrl {
    pub fn parse(input: &str) -> RunnerResult<Self> {
        let parsed = Url::parse(input.trim()).map_err(|error| {
            RunnerError::new(
                "net.url.invalid",
                format!("`{input}` is not a valid URL: {error}"),
            )
        })?;
        Self::from_parsed(parsed, input)
    }

    /// Resolves a `Location` header value against this URL.
    pub fn join(&self, location: &str) -> RunnerResult<Self> {
        let joined = self.parsed.join(location.trim()).map_err(|error| {
            RunnerError::new(
                "net.url.redirect_invalid",
                format!("redirect target `{location}` is not a valid URL: {error}"),
            )
        })?;
        Self::from_parsed(joined, location)
    }

    fn from_parsed(mut parsed: Url, input: &str) -> RunnerResult<Self> {
        let scheme = match parsed.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(RunnerError::new(
                    "net.url.scheme_unsupported",
                    format!("`{input}` is not a valid URL for fetch: unsupported scheme `{other}`"),
                ));
            }
        };

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(RunnerError::new(
                "net.url.credentials_disallowed",
                format!("`{input}` embeds credentials, which fetch does not send"),
            ));
        }

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                RunnerError::new(
                    "net.url.host_missing",
                    format!("`{input}` is not a valid URL: missing host"),
                )
            })?
            .to_ascii_lowercase();
        let port = parsed.port().unwrap_or(scheme.default_port());

        parsed.set_fragment(None);

        Ok(Self {
            parsed,
            scheme,
            host,
            port,
        })
    }

    pub fn as_str(&self) -> &str {
        self.parsed.as_str()
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.scheme.is_secure()
    }

    /// Value for the `Host` header: the port is omitted when it is the scheme default.
    pub fn authority(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn path_and_query(&self) -> String {
        let path = match self.parsed.path() {
            "" => "/",
            path => path,
        };
        match self.parsed.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_owned(),
        }
    }
}
