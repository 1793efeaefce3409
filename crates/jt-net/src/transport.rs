//! TCP transport.

use jt_core::RunnerError;
use jt_core::RunnerResult;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::time::Duration;

/// Object-safe byte stream, plain TCP or TLS.
pub trait IoStream: Read + Write + Send {}
impl<T> IoStream for T where T: Read + Write + Send {}

pub type BoxedIoStream = Box<dyn IoStream>;

/// Opens TCP connections.
pub trait Transport {
    fn connect(&self, address: SocketAddr, timeout: Duration) -> RunnerResult<TcpStream>;

    /// Tries each address in order and returns the first connection that succeeds.
    fn connect_any(&self, addresses: &[SocketAddr], timeout: Duration) -> RunnerResult<TcpStream> {
        let mut last_error = None;
        for address in addresses {
            match self.connect(*address, timeout) {
                Ok(stream) => return Ok(stream),
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            RunnerError::new(
                "net.transport.no_addresses",
                "no addresses available to open a connection",
            )
        }))
    }
}

/// Standard library TCP transport with symmetric read/write timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn connect(&self, address: SocketAddr, timeout: Duration) -> RunnerResult<TcpStream> {
        let stream = TcpStream::connect_timeout(&address, timeout).map_err(|error| {
            RunnerError::new(
                "net.transport.connect_failed",
                format!("failed to connect to `{address}`: {error}"),
            )
        })?;

        let configured = stream
            .set_nodelay(true)
            .and_then(|()| stream.set_read_timeout(Some(timeout)))
            .and_then(|()| stream.set_write_timeout(Some(timeout)));
        configured.map_err(|error| {
            RunnerError::new(
                "net.transport.configure_failed",
                format!("failed to configure socket for `{address}`: {error}"),
            )
        })?;

        Ok(stream)
    }
}
