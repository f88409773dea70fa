use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tracing::{debug, warn};

use super::{BoxedStream, Connect};
use crate::error::ClientError;

/// Plain TCP, optionally bound to a local address.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    host: String,
    port: u16,
    local_address: Option<IpAddr>,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16) -> Self {
        TcpConnector {
            host: host.to_string(),
            port,
            local_address: None,
        }
    }

    pub fn with_local_address(mut self, local_address: Option<IpAddr>) -> Self {
        self.local_address = local_address;
        self
    }

    /// Open the raw stream, without boxing.
    pub async fn connect_stream(&self) -> io::Result<TcpStream> {
        let stream = match self.local_address {
            None => TcpStream::connect((self.host.as_str(), self.port)).await?,
            Some(local) => {
                let remote = lookup_host((self.host.as_str(), self.port))
                    .await?
                    .find(|addr| addr.is_ipv4() == local.is_ipv4())
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::AddrNotAvailable,
                            format!("{} has no address matching {}", self.host, local),
                        )
                    })?;
                let socket = if remote.is_ipv4() {
                    TcpSocket::new_v4()?
                } else {
                    TcpSocket::new_v6()?
                };
                socket.bind(SocketAddr::new(local, 0))?;
                socket.connect(remote).await?
            }
        };
        debug!(host = %self.host, port = self.port, "tcp connected");
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        Ok(stream)
    }
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

#[async_trait]
impl Connect for TcpConnector {
    async fn connect(&self) -> Result<BoxedStream, ClientError> {
        Ok(Box::new(self.connect_stream().await?))
    }
}
