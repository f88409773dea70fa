//! SOCKS5 (RFC 1928) CONNECT with optional username/password auth (RFC 1929).

use std::net::IpAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::{BoxedStream, Connect, TcpConnector};
use crate::config::SocksConfig;
use crate::error::ClientError;

const VERSION: u8 = 0x05;
const AUTH_NONE: u8 = 0x00;
const AUTH_PASSWORD: u8 = 0x02;
const AUTH_UNACCEPTABLE: u8 = 0xff;
const CMD_CONNECT: u8 = 0x01;
const ATYP_V4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_V6: u8 = 0x04;

/// Tunnels through a SOCKS5 proxy to the IRC server.
#[derive(Clone, Debug)]
pub struct SocksConnector {
    proxy: SocksConfig,
    proxy_tcp: TcpConnector,
    host: String,
    port: u16,
}

impl SocksConnector {
    pub fn new(proxy: SocksConfig, host: &str, port: u16, local_address: Option<IpAddr>) -> Self {
        SocksConnector {
            proxy_tcp: TcpConnector::new(&proxy.host, proxy.port).with_local_address(local_address),
            proxy,
            host: host.to_string(),
            port,
        }
    }
}

#[async_trait]
impl Connect for SocksConnector {
    async fn connect(&self) -> Result<BoxedStream, ClientError> {
        let mut stream = self.proxy_tcp.connect_stream().await?;
        let auth = match (&self.proxy.user, &self.proxy.pass) {
            (Some(user), pass) => Some((user.as_str(), pass.as_deref().unwrap_or_default())),
            (None, _) => None,
        };
        socks5_handshake(&mut stream, &self.host, self.port, auth).await?;
        debug!(proxy = %self.proxy.host, host = %self.host, "socks tunnel established");
        Ok(Box::new(stream))
    }
}

fn socks_err(msg: impl Into<String>) -> ClientError {
    ClientError::Socks(msg.into())
}

fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown failure",
    }
}

/// Run the client side of a SOCKS5 CONNECT on an open proxy stream.
pub async fn socks5_handshake<S>(
    stream: &mut S,
    host: &str,
    port: u16,
    auth: Option<(&str, &str)>,
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let greeting: &[u8] = match auth {
        Some(_) => &[VERSION, 2, AUTH_NONE, AUTH_PASSWORD],
        None => &[VERSION, 1, AUTH_NONE],
    };
    stream.write_all(greeting).await?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice).await?;
    if choice[0] != VERSION {
        return Err(socks_err(format!("unexpected version {}", choice[0])));
    }
    match (choice[1], auth) {
        (AUTH_NONE, _) => {}
        (AUTH_PASSWORD, Some((user, pass))) => {
            if user.len() > 255 || pass.len() > 255 {
                return Err(socks_err("credentials longer than 255 bytes"));
            }
            let mut req = Vec::with_capacity(3 + user.len() + pass.len());
            req.push(0x01);
            req.push(user.len() as u8);
            req.extend_from_slice(user.as_bytes());
            req.push(pass.len() as u8);
            req.extend_from_slice(pass.as_bytes());
            stream.write_all(&req).await?;

            let mut status = [0u8; 2];
            stream.read_exact(&mut status).await?;
            if status[1] != 0x00 {
                return Err(socks_err("authentication rejected"));
            }
        }
        (AUTH_UNACCEPTABLE, _) => return Err(socks_err("no acceptable auth method")),
        (method, _) => return Err(socks_err(format!("unsupported auth method {}", method))),
    }

    let mut req = vec![VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            req.push(ATYP_V4);
            req.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            req.push(ATYP_V6);
            req.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            if host.len() > 255 {
                return Err(socks_err("hostname longer than 255 bytes"));
            }
            req.push(ATYP_DOMAIN);
            req.push(host.len() as u8);
            req.extend_from_slice(host.as_bytes());
        }
    }
    req.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&req).await?;

    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await?;
    if head[1] != 0x00 {
        return Err(socks_err(reply_message(head[1])));
    }
    // Bound address and port; the client has no use for them.
    let addr_len = match head[3] {
        ATYP_V4 => 4,
        ATYP_V6 => 16,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
        other => return Err(socks_err(format!("unknown address type {}", other))),
    };
    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).await?;
    Ok(())
}
