//! Sending and receiving over UDP and TCP.
//!
//! This module provides asynchronous sockets that present datagram and
//! stream transports behind the one [`AsyncSocket`][socket::AsyncSocket]
//! interface. Higher layers pick a protocol when creating a socket and from
//! then on only deal with that interface:
//!
//! ```no_run
//! # use dnssock::net::config::Config;
//! # use dnssock::net::endpoint::{Endpoint, Protocol};
//! # use dnssock::net::socket::{new_socket, AsyncSocket};
//! # async fn _test() -> Result<(), dnssock::net::error::Error> {
//! let server: Endpoint = "tcp://192.0.2.53:53".parse().unwrap();
//! let mut sock = new_socket(Protocol::Tcp, Config::new());
//! sock.open(&server).await?;
//! sock.async_send(
//!     bytes::Bytes::from_static(b"\x12\x34\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00"),
//!     &server,
//!     Box::new(|res, _buf| println!("sent: {res:?}")),
//! )?;
//! sock.async_receive(
//!     bytes::BytesMut::with_capacity(4096),
//!     4096,
//!     Box::new(|res, buf| println!("received {res:?}: {buf:?}")),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! The bytes sent and received are not interpreted in any way. Over TCP,
//! the sockets add and remove the length prefix that frames DNS messages
//! on a stream; over UDP, each message is one datagram.
//!
//! The [`udp`] and [`tcp`] sockets are generic over an
//! [`AsyncOpen`][protocol::AsyncOpen] that creates the actual transport
//! when the socket is opened. The defaults create operating system sockets
//! via tokio.

pub mod cancel;
pub mod config;
pub mod counters;
pub mod endpoint;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod sock;
pub mod socket;
pub mod tcp;
pub mod udp;
