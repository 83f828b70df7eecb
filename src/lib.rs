//! Asynchronous sockets for DNS transports.
//!
//! This crate provides the socket layer underneath a DNS server or
//! resolver: non-blocking sending and receiving of messages over UDP and
//! TCP through one protocol independent interface, with a small set of
//! distinct error conditions instead of raw platform error codes.
//!
//! All functionality lives in the [net] module:
//!
//! * [net::socket] defines the [`AsyncSocket`][net::socket::AsyncSocket]
//!   interface and creates sockets for a protocol,
//! * [net::udp] and [net::tcp] implement it for datagrams and streams,
//! * [net::framing] contains the length-prefix state machines used over
//!   streams,
//! * [net::error] describes everything that can go wrong.
//!
//! The sockets run their operations on the [Tokio](https://tokio.rs/)
//! runtime and log through [tracing](https://docs.rs/tracing).

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod net;
