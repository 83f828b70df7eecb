//! The protocol independent socket interface.
//!
//! A socket goes through a simple life cycle. It is created unopened, is
//! opened against an endpoint through [`AsyncSocket::open`], carries any
//! number of send and receive operations, and is finally closed through
//! [`AsyncSocket::close`] or by dropping it. Sending and receiving are only
//! possible while the socket is open.
//!
//! # Operations and completions
//!
//! [`async_send`][AsyncSocket::async_send] and
//! [`async_receive`][AsyncSocket::async_receive] return immediately. The
//! actual I/O runs as a task on the current tokio runtime, which must
//! therefore exist when they are called. When the operation finishes, its
//! completion closure is called exactly once with the result and the
//! buffer that was handed to the operation. The completion is never called
//! from within the issuing call.
//!
//! Requests that can be refused up front, because the socket isn't open or
//! the buffer is larger than [`Config::max_buffer_size`], are refused by
//! returning an error. The operation then isn't issued at all and its
//! completion is dropped without being called.
//!
//! Operations are not ordered with respect to each other except that the
//! bytes of a single message sent over a stream are never interleaved with
//! those of another message.
//!
//! [`Config::max_buffer_size`]: crate::net::config::Config::max_buffer_size

use core::future::Future;
use core::pin::Pin;
use std::boxed::Box;

use bytes::{Bytes, BytesMut};

use crate::net::config::Config;
use crate::net::endpoint::{Endpoint, Protocol};
use crate::net::error::Error;
use crate::net::tcp::TcpSocket;
use crate::net::udp::UdpSocket;

//------------ Received ------------------------------------------------------

/// The outcome of a successful receive operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Received {
    /// The number of bytes placed into the buffer.
    ///
    /// For a stream socket this is the length of the message without the
    /// length prefix.
    pub length: usize,

    /// Where the data came from.
    pub source: Endpoint,
}

//------------ Completions ---------------------------------------------------

/// The completion of a receive operation.
///
/// On success, the buffer contains exactly the received message. On error,
/// the buffer is returned empty.
pub type RecvCompletion =
    Box<dyn FnOnce(Result<Received, Error>, BytesMut) + Send + 'static>;

/// The completion of a send operation.
///
/// On success, the value is the number of message bytes sent. The buffer
/// is the one handed to the operation.
pub type SendCompletion =
    Box<dyn FnOnce(Result<usize, Error>, Bytes) + Send + 'static>;

/// The future returned by [`AsyncSocket::open`].
pub type OpenFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

//------------ AsyncSocket ---------------------------------------------------

/// A socket with asynchronous sending and receiving.
pub trait AsyncSocket: Send {
    /// Returns the transport protocol of the socket.
    fn protocol(&self) -> Protocol;

    /// Returns whether the socket is open.
    fn is_open(&self) -> bool;

    /// Returns whether opening completes without waiting for the network.
    ///
    /// This is true for datagram sockets which only need to be bound, and
    /// false for stream sockets which need to connect.
    fn is_open_synchronous(&self) -> bool;

    /// Opens the socket.
    ///
    /// For a datagram socket, the endpoint is the local address to bind
    /// to. For a stream socket, it is the peer to connect to.
    ///
    /// Opening an already open socket succeeds without doing anything. If
    /// opening fails, the socket stays closed. Failing to configure the
    /// socket results in [`Error::SocketSetError`] without any attempt to
    /// reach the network.
    fn open<'a>(&'a mut self, endpoint: &Endpoint) -> OpenFuture<'a>;

    /// Starts sending a message.
    ///
    /// The `destination` is only used by datagram sockets. A stream socket
    /// always sends to the peer it is connected to.
    fn async_send(
        &self,
        data: Bytes,
        destination: &Endpoint,
        completion: SendCompletion,
    ) -> Result<(), Error>;

    /// Starts receiving a message of at most `capacity` bytes into `buf`.
    fn async_receive(
        &self,
        buf: BytesMut,
        capacity: usize,
        completion: RecvCompletion,
    ) -> Result<(), Error>;

    /// Cancels all outstanding operations.
    ///
    /// Cancellation is best effort. The completion of each cancelled
    /// operation is still called, with [`Error::Cancelled`] unless the
    /// operation finished first. The socket stays open. On a stream socket,
    /// cancelling a partially transferred message leaves the framing out of
    /// sync and the socket should be closed.
    fn cancel(&self);

    /// Closes the socket.
    ///
    /// Outstanding operations are cancelled. Closing a closed socket does
    /// nothing.
    fn close(&mut self);
}

impl<S: AsyncSocket + ?Sized> AsyncSocket for Box<S> {
    fn protocol(&self) -> Protocol {
        (**self).protocol()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn is_open_synchronous(&self) -> bool {
        (**self).is_open_synchronous()
    }

    fn open<'a>(&'a mut self, endpoint: &Endpoint) -> OpenFuture<'a> {
        (**self).open(endpoint)
    }

    fn async_send(
        &self,
        data: Bytes,
        destination: &Endpoint,
        completion: SendCompletion,
    ) -> Result<(), Error> {
        (**self).async_send(data, destination, completion)
    }

    fn async_receive(
        &self,
        buf: BytesMut,
        capacity: usize,
        completion: RecvCompletion,
    ) -> Result<(), Error> {
        (**self).async_receive(buf, capacity, completion)
    }

    fn cancel(&self) {
        (**self).cancel()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

//------------ new_socket ----------------------------------------------------

/// Creates an unopened socket for the given protocol.
pub fn new_socket(protocol: Protocol, config: Config) -> Box<dyn AsyncSocket> {
    match protocol {
        Protocol::Udp => Box::new(UdpSocket::with_config(config)),
        Protocol::Tcp => Box::new(TcpSocket::with_config(config)),
    }
}

/// Checks a request size against the configured maximum.
pub(crate) fn check_size(size: usize, config: &Config) -> Result<(), Error> {
    if size > config.max_buffer_size() {
        Err(Error::BufferTooLarge {
            requested: size,
            max: config.max_buffer_size(),
        })
    } else {
        Ok(())
    }
}
