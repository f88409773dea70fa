//! Byte-stream transports.
//!
//! A [`Connect`] implementation opens a stream to the server; [`Transport`]
//! frames it into lines with [`LineCodec`]. Plain TCP, SOCKS5 and TLS are
//! provided, and TLS can wrap either of the other two.

mod socks;
mod tcp;
mod tls;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::{ClientError, ProtocolError};
use crate::line::LineCodec;

pub use self::socks::{socks5_handshake, SocksConnector};
pub use self::tcp::TcpConnector;
pub use self::tls::TlsConnector;

/// Any duplex byte stream the client can speak IRC over.
pub trait IoStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IoStream for T {}

pub type BoxedStream = Box<dyn IoStream>;

/// Opens a fresh stream to the server.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> Result<BoxedStream, ClientError>;
}

/// The connector described by `config`: TCP or SOCKS5, optionally wrapped
/// in TLS.
pub fn connector_for(config: &ClientConfig) -> Result<Arc<dyn Connect>, ClientError> {
    let base: Arc<dyn Connect> = match &config.socks {
        Some(socks) => Arc::new(SocksConnector::new(
            socks.clone(),
            &config.host,
            config.port,
            config.local_address,
        )),
        None => Arc::new(
            TcpConnector::new(&config.host, config.port).with_local_address(config.local_address),
        ),
    };
    if config.tls {
        Ok(Arc::new(TlsConnector::new(
            base,
            &config.host,
            config.reject_unauthorized,
        )?))
    } else {
        Ok(base)
    }
}

/// A line-framed connection.
///
/// Writes after [`close`](Transport::close) are silently dropped.
pub struct Transport {
    framed: Option<Framed<BoxedStream, LineCodec>>,
}

impl Transport {
    /// Wrap an already open stream.
    pub fn new(stream: BoxedStream, config: &ClientConfig) -> Self {
        let mut codec = LineCodec::new(config.max_buffer_size);
        codec.set_encoding(&config.encoding);
        Transport {
            framed: Some(Framed::new(stream, codec)),
        }
    }

    pub async fn connect(connector: &dyn Connect, config: &ClientConfig) -> Result<Self, ClientError> {
        let stream = connector.connect().await?;
        Ok(Self::new(stream, config))
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Switch the text encoding of both directions.
    pub fn set_encoding(&mut self, label: &str) -> bool {
        match self.framed.as_mut() {
            Some(framed) => framed.codec_mut().set_encoding(label),
            None => false,
        }
    }

    pub async fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let Some(framed) = self.framed.as_mut() else {
            debug!(line, "dropping write on closed transport");
            return Ok(());
        };
        trace!(line, "<<");
        framed.send(line.to_string()).await
    }

    /// Next inbound line, `None` once the peer closed or after
    /// [`close`](Transport::close).
    pub async fn read_line(&mut self) -> Option<Result<String, ProtocolError>> {
        match self.framed.as_mut() {
            Some(framed) => framed.next().await,
            None => None,
        }
    }

    /// Close the connection. A graceful close flushes pending output and
    /// shuts down the write half first. Closing twice is a no-op.
    pub async fn close(&mut self, force: bool) {
        let Some(mut framed) = self.framed.take() else {
            return;
        };
        if !force {
            if let Err(e) = framed.close().await {
                debug!(error = %e, "error while closing");
            }
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn transport(stream: tokio::io::DuplexStream) -> Transport {
        Transport::new(Box::new(stream), &ClientConfig::default())
    }

    #[tokio::test]
    async fn test_read_and_write_lines() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut t = transport(client);

        server.write_all(b"PING :a\r\nPING :b\n").await.unwrap();
        assert_eq!(t.read_line().await.unwrap().unwrap(), "PING :a");
        assert_eq!(t.read_line().await.unwrap().unwrap(), "PING :b");

        t.write_line("PONG :a").await.unwrap();
        let mut buf = [0u8; 9];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"PONG :a\r\n");
    }

    #[tokio::test]
    async fn test_refuses_line_breaks_and_stays_usable() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut t = transport(client);

        assert!(matches!(
            t.write_line("PRIVMSG #c :hi\rQUIT :bye").await,
            Err(ProtocolError::IllegalControlChar { ch: '\r', .. })
        ));
        assert!(t.is_connected());
        t.write_line("PING :ok").await.unwrap();
        t.close(false).await;

        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"PING :ok\r\n");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut t = transport(client);
        t.close(false).await;
        t.close(true).await;
        assert!(!t.is_connected());
        assert!(t.read_line().await.is_none());
        t.write_line("PRIVMSG #c :lost").await.unwrap();

        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_overflow_surfaces_as_error() {
        let (client, mut server) = tokio::io::duplex(4096);
        let mut t = Transport::new(
            Box::new(client),
            &ClientConfig {
                max_buffer_size: 16,
                ..ClientConfig::default()
            },
        );
        server.write_all(&[b'a'; 17]).await.unwrap();
        assert!(matches!(
            t.read_line().await,
            Some(Err(ProtocolError::BufferOverflow { limit: 16 }))
        ));
    }

    #[tokio::test]
    async fn test_set_encoding() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut t = transport(client);
        assert!(t.set_encoding("latin1"));
        assert!(!t.set_encoding("utf-16le"));

        server.write_all(b"PRIVMSG #c :caf\xe9\r\n").await.unwrap();
        assert_eq!(t.read_line().await.unwrap().unwrap(), "PRIVMSG #c :café");
    }
}
