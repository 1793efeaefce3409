//! Host name resolution for outgoing requests.

use jt_core::RunnerError;
use jt_core::RunnerResult;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use tracing::debug;

/// Turns a URL host into socket addresses.
pub trait DnsResolver {
    fn resolve(&self, host: &str, port: u16) -> RunnerResult<Vec<SocketAddr>>;
}

/// Operating-system resolver. IP literals (including bracketed IPv6 hosts
/// as they appear in URLs) never reach it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDnsResolver;

impl DnsResolver for SystemDnsResolver {
    fn resolve(&self, host: &str, port: u16) -> RunnerResult<Vec<SocketAddr>> {
        if let Some(address) = literal_address(host) {
            return Ok(vec![SocketAddr::new(address, port)]);
        }

        let addresses: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|error| {
                RunnerError::new(
                    "net.dns.resolve_failed",
                    format!("failed to resolve `{host}`: {error}"),
                )
            })?
            .collect();
        debug!(host, count = addresses.len(), "resolved host");

        if addresses.is_empty() {
            return Err(RunnerError::new(
                "net.dns.no_results",
                format!("no addresses found for `{host}`"),
            ));
        }
        Ok(addresses)
    }
}

fn literal_address(host: &str) -> Option<IpAddr> {
    let unbracketed = host
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(host);
    unbracketed.parse().ok()
}
