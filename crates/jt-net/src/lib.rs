//! Networking for the `fetch` bridge: URL validation, an HTTP/1.1 GET client
//! over TCP or rustls, redirect following and text body decoding.

pub mod body;
pub mod client;
pub mod dns;
pub mod http;
pub mod tls;
pub mod tls_backend;
pub mod transport;
pub mod url;
mod wire;

use client::HttpClient;
use dns::DnsResolver;
use http::HttpMethod;
use http::HttpRequest;
use jt_core::RunnerError;
use jt_core::RunnerResult;
use std::time::Duration;
use tls_backend::TlsConnector;
use tracing::debug;
use transport::Transport;

pub use http::Header;
pub use http::HttpResponse;
pub use http::HttpStatusCode;
pub use tls::TlsPolicy;
pub use tls::TrustStoreMode;
pub use crate::url::FetchUrl;

const DEFAULT_USER_AGENT: &str = concat!("JittyRunner/", env!("CARGO_PKG_VERSION"));
const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// Transport settings for script-issued requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub tls: TlsPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            tls: TlsPolicy::default(),
        }
    }
}

/// Final response after redirects, with the URL it was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub url: FetchUrl,
    pub status: HttpStatusCode,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn content_type(&self) -> Option<&str> {
        http::find_header(&self.headers, "content-type")
    }

    /// Body as text; empty or undecodable bodies are errors naming the URL.
    pub fn text(&self) -> RunnerResult<String> {
        if self.body.is_empty() {
            return Err(RunnerError::new(
                "net.body.empty",
                format!("response from `{}` has an empty body", self.url.as_str()),
            ));
        }
        body::decode_text(&self.body, self.content_type()).ok_or_else(|| {
            RunnerError::new(
                "net.body.undecodable",
                format!("response from `{}` could not be decoded as text", self.url.as_str()),
            )
        })
    }
}

/// Seam between the script bridge and the network.
///
/// Implementations run on transport threads, never on the script thread.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &FetchUrl) -> RunnerResult<FetchedResponse>;
}

/// GET fetcher that follows redirects.
pub struct HttpFetcher<R = dns::SystemDnsResolver, T = transport::TcpTransport, C = tls_backend::RustlsConnector>
where
    R: DnsResolver,
    T: Transport,
    C: TlsConnector,
{
    client: HttpClient<R, T, C>,
    max_redirects: usize,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> RunnerResult<Self> {
        let mut client = HttpClient::new(config.tls.clone())?;
        client.set_timeout(config.timeout);
        Ok(Self::with_client(client, &config))
    }
}

impl<R, T, C> HttpFetcher<R, T, C>
where
    R: DnsResolver,
    T: Transport,
    C: TlsConnector,
{
    pub fn with_client(client: HttpClient<R, T, C>, config: &FetchConfig) -> Self {
        Self {
            client,
            max_redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
        }
    }

    fn request_for(&self, url: &FetchUrl) -> RunnerResult<HttpRequest> {
        HttpRequest::builder(HttpMethod::Get, url.clone())
            .header("User-Agent", &self.user_agent)?
            .header("Accept", "*/*")?
            .header("Accept-Encoding", DEFAULT_ACCEPT_ENCODING)?
            .header("Connection", "close")?
            .build()
    }
}

impl<R, T, C> Fetcher for HttpFetcher<R, T, C>
where
    R: DnsResolver + Send + Sync,
    T: Transport + Send + Sync,
    C: TlsConnector + Send + Sync,
{
    fn fetch(&self, url: &FetchUrl) -> RunnerResult<FetchedResponse> {
        let mut current = url.clone();
        let mut redirects = 0_usize;

        loop {
            let response = self.client.execute(&self.request_for(&current)?)?;
            debug!(url = current.as_str(), status = response.status.as_u16(), "fetch response");

            let location = response
                .header("location")
                .filter(|_| response.status.is_redirect());
            let Some(location) = location else {
                return Ok(FetchedResponse {
                    url: current,
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                });
            };

            if redirects >= self.max_redirects {
                return Err(RunnerError::new(
                    "net.redirect.limit_exceeded",
                    format!(
                        "too many redirects fetching `{}` (limit {})",
                        url.as_str(),
                        self.max_redirects
                    ),
                ));
            }
            current = current.join(location)?;
            redirects += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FetchConfig;
    use super::FetchedResponse;
    use super::Fetcher;
    use super::HttpFetcher;
    use crate::client::HttpClient;
    use crate::dns::DnsResolver;
    use crate::http::Header;
    use crate::http::HttpStatusCode;
    use crate::tls::TlsPolicy;
    use crate::tls_backend::RustlsConnector;
    use crate::transport::TcpTransport;
    use crate::url::FetchUrl;
    use jt_core::RunnerResult;
    use std::io::Read;
    use std::io::Write;
    use std::net::SocketAddr;
    use std::net::TcpListener;
    use std::thread;

    struct FixedResolver(SocketAddr);

    impl DnsResolver for FixedResolver {
        fn resolve(&self, _host: &str, _port: u16) -> RunnerResult<Vec<SocketAddr>> {
            Ok(vec![self.0])
        }
    }

    fn url(raw: &str) -> FetchUrl {
        match FetchUrl::parse(raw) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    fn response(body: &[u8], content_type: Option<&str>) -> FetchedResponse {
        let headers = content_type
            .map(|value| match Header::new("Content-Type", value) {
                Ok(header) => vec![header],
                Err(error) => panic!("{error}"),
            })
            .unwrap_or_default();
        FetchedResponse {
            url: url("https://example.com/data"),
            status: match HttpStatusCode::new(200) {
                Ok(value) => value,
                Err(error) => panic!("{error}"),
            },
            headers,
            body: body.to_vec(),
        }
    }

    #[test]
    fn text_decodes_declared_charset() {
        let fetched = response(b"caf\xE9", Some("text/plain; charset=iso-8859-1"));
        match fetched.text() {
            Ok(text) => assert_eq!(text, "café"),
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn empty_and_undecodable_bodies_name_the_url() {
        for (body, code) in [(&b""[..], "net.body.empty"), (&b"\xFF\xFE\xFD"[..], "net.body.undecodable")] {
            match response(body, Some("text/plain; charset=utf-8")).text() {
                Ok(text) => panic!("expected `{code}`, got `{text}`"),
                Err(error) => {
                    assert_eq!(error.code, code);
                    assert!(error.message.contains("https://example.com/data"));
                }
            }
        }
    }

    fn serve(replies: Vec<&'static [u8]>) -> (SocketAddr, thread::JoinHandle<Vec<String>>) {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let address = match listener.local_addr() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let handle = thread::spawn(move || {
            let mut request_lines = Vec::new();
            for reply in replies {
                let (mut socket, _) = match listener.accept() {
                    Ok(value) => value,
                    Err(error) => panic!("{error}"),
                };
                let mut head = Vec::new();
                let mut byte = [0_u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    match socket.read(&mut byte) {
                        Ok(0) => break,
                        Ok(_) => head.push(byte[0]),
                        Err(error) => panic!("{error}"),
                    }
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                request_lines.push(head.lines().next().unwrap_or_default().to_owned());
                if let Err(error) = socket.write_all(reply) {
                    panic!("{error}");
                }
            }
            request_lines
        });
        (address, handle)
    }

    fn fetcher_for(address: SocketAddr, config: &FetchConfig) -> HttpFetcher<FixedResolver> {
        let client = match HttpClient::with_parts(
            FixedResolver(address),
            TcpTransport,
            RustlsConnector,
            TlsPolicy::default(),
        ) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        HttpFetcher::with_client(client, config)
    }

    #[test]
    fn follows_relative_redirects() {
        let (address, server) = serve(vec![
            b"HTTP/1.1 302 Found\r\nLocation: /final\r\nContent-Length: 0\r\n\r\n",
            b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ndone",
        ]);
        let fetcher = fetcher_for(address, &FetchConfig::default());

        let fetched = match fetcher.fetch(&url("http://jitty.test/start")) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(fetched.url.as_str(), "http://jitty.test/final");
        assert_eq!(fetched.body, b"done");

        let lines = match server.join() {
            Ok(value) => value,
            Err(_) => panic!("server thread panicked"),
        };
        assert_eq!(lines, vec!["GET /start HTTP/1.1", "GET /final HTTP/1.1"]);
    }

    #[test]
    fn stops_after_redirect_limit() {
        let (address, server) = serve(vec![
            b"HTTP/1.1 301 Moved\r\nLocation: /a\r\nContent-Length: 0\r\n\r\n",
            b"HTTP/1.1 301 Moved\r\nLocation: /b\r\nContent-Length: 0\r\n\r\n",
        ]);
        let config = FetchConfig {
            max_redirects: 1,
            ..FetchConfig::default()
        };
        let fetcher = fetcher_for(address, &config);

        match fetcher.fetch(&url("http://jitty.test/")) {
            Ok(_) => panic!("redirect loop should stop"),
            Err(error) => assert_eq!(error.code, "net.redirect.limit_exceeded"),
        }
        if server.join().is_err() {
            panic!("server thread panicked");
        }
    }
}
