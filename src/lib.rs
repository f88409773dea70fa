//! # slirc-client
//!
//! A client-side engine for the IRC wire protocol.
//!
//! The core is sans-IO: a [`LineFramer`](line::LineFramer) turns bytes into
//! lines, [`Message`] parses them, and a [`Dispatcher`](dispatch::Dispatcher)
//! turns messages into typed [`Event`]s and protocol replies while tracking
//! CAP/SASL negotiation, ISUPPORT and multi-line replies in a
//! [`Session`](connection::Session). Outgoing text is split into
//! protocol-legal chunks by [`chunker`] and paced by
//! [`WriteScheduler`](scheduler::WriteScheduler).
//!
//! With the default `tokio` feature, [`Client`] drives all of it over TCP,
//! TLS or SOCKS5 with keepalive and automatic reconnection.
//!
//! ## Parsing
//!
//! ```rust
//! use slirc_client::Message;
//!
//! let msg: Message = "@time=2023-01-01T12:00:00Z :nick!user@host PRIVMSG #rust :Hello!"
//!     .parse()
//!     .expect("valid line");
//! assert_eq!(msg.nick, "nick");
//! assert_eq!(msg.params, vec!["#rust", "Hello!"]);
//! assert!(msg.server_time().is_some());
//! ```
//!
//! ## Running a client
//!
//! ```no_run
//! # #[cfg(feature = "tokio")]
//! # async fn demo() -> Result<(), slirc_client::ClientError> {
//! use slirc_client::{Client, ClientConfig, Event, EventKind};
//!
//! let config = ClientConfig {
//!     tls: true,
//!     ..ClientConfig::new("irc.libera.chat", 6697, "slirc-bot")
//! };
//! let mut client = Client::new(config)?;
//! let handle = client.handle();
//! client.on(EventKind::Registered, move |_| {
//!     let _ = handle.join("#slirc", None);
//! });
//! let mut events = client.subscribe();
//! tokio::spawn(client.run());
//! while let Some(event) = events.recv().await {
//!     if let Event::Privmsg(msg) = event {
//!         println!("<{}> {}", msg.nick, msg.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod caps;
pub mod casemap;
pub mod chunker;
pub mod config;
pub mod connection;
pub mod ctcp;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod isupport;
pub mod keepalive;
pub mod line;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod reconnect;
pub mod response;
pub mod sasl;
pub mod scheduler;
pub mod validation;

#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::caps::{CapNegotiator, CapState};
pub use self::casemap::{irc_to_lower, CaseMapping};
pub use self::chunker::{split_message, Chunk, ChunkerConfig};
pub use self::config::{ClientConfig, SocksConfig, WebircConfig};
pub use self::connection::{ConnectionId, ConnectionState, Session};
pub use self::ctcp::Ctcp;
pub use self::dispatch::{Dispatcher, Outbox};
pub use self::error::{ChunkError, ClientError, MessageParseError, ProtocolError};
pub use self::event::{Event, EventBus, EventKind};
pub use self::isupport::{NetworkInfo, OptionValue};
pub use self::line::{Frames, LineCodec, LineFramer};
pub use self::message::{Message, RawMessage, TagValue, Tags};
pub use self::mode::{parse_mode_changes, ModeChange};
pub use self::prefix::PrefixParts;
pub use self::reconnect::{ConnectionHistory, ReconnectPolicy};
pub use self::response::Response;
pub use self::sasl::SaslCredentials;
pub use self::scheduler::WriteScheduler;

#[cfg(feature = "tokio")]
pub use self::client::{Client, ClientHandle};
#[cfg(feature = "tokio")]
pub use self::transport::{connector_for, Connect, Transport};
