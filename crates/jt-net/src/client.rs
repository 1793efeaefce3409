//! HTTP/1.1 client built on the DNS, transport and TLS seams.

use crate::dns::DnsResolver;
use crate::dns::SystemDnsResolver;
use crate::http::HttpRequest;
use crate::http::HttpResponse;
use crate::tls::TlsPolicy;
use crate::tls_backend::RustlsConnector;
use crate::tls_backend::TlsConnector;
use crate::transport::BoxedIoStream;
use crate::transport::TcpTransport;
use crate::transport::Transport;
use crate::wire::read_response;
use jt_core::RunnerError;
use jt_core::RunnerResult;
use std::io::BufReader;
use std::io::Write;
use std::time::Duration;

/// One connection per request; the request always asks the server to close.
pub struct HttpClient<R = SystemDnsResolver, T = TcpTransport, C = RustlsConnector>
where
    R: DnsResolver,
    T: Transport,
    C: TlsConnector,
{
    dns: R,
    transport: T,
    tls_connector: C,
    tls_policy: TlsPolicy,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(tls_policy: TlsPolicy) -> RunnerResult<Self> {
        Self::with_parts(SystemDnsResolver, TcpTransport, RustlsConnector, tls_policy)
    }
}

impl<R, T, C> HttpClient<R, T, C>
where
    R: DnsResolver,
    T: Transport,
    C: TlsConnector,
{
    pub fn with_parts(dns: R, transport: T, tls_connector: C, tls_policy: TlsPolicy) -> RunnerResult<Self> {
        tls_policy.validate()?;
        Ok(Self {
            dns,
            transport,
            tls_connector,
            tls_policy,
            timeout: Duration::from_secs(10),
        })
    }

    /// Connect, read and write timeout applied to every socket.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn execute(&self, request: &HttpRequest) -> RunnerResult<HttpResponse> {
        let mut stream = self.open_stream(request)?;

        stream
            .write_all(&request.encode())
            .and_then(|()| stream.flush())
            .map_err(|error| {
                RunnerError::new(
                    "net.http.write_failed",
                    format!("failed to send request to `{}`: {error}", request.url.authority()),
                )
            })?;

        let mut reader = BufReader::new(stream);
        read_response(&mut reader, request.method)
    }

    fn open_stream(&self, request: &HttpRequest) -> RunnerResult<BoxedIoStream> {
        let url = &request.url;
        let addresses = self.dns.resolve(url.host(), url.port())?;
        let stream = self.transport.connect_any(&addresses, self.timeout)?;

        match self.tls_policy.handshake_config_for(url)? {
            Some(handshake) => self
                .tls_connector
                .connect_tls(stream, &handshake, &self.tls_policy),
            None => Ok(Box::new(stream)),
        }
    }
}
