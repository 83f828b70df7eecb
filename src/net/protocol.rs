//! Creating the underlying transport of a socket.
//!
//! Sockets don't create operating system sockets themselves. Instead they
//! are generic over an [`AsyncOpen`] implementation that produces the
//! handle when the socket is opened. [`UdpOpen`] and [`TcpOpen`] create real
//! sockets through tokio; tests and embedders can provide their own.

use core::future::Future;
use core::pin::Pin;
use std::boxed::Box;
use std::net::SocketAddr;

use socket2::{Domain, Socket, Type};
use tokio::net::{TcpSocket, TcpStream, UdpSocket};
use tracing::trace;

use crate::net::config::Config;
use crate::net::endpoint::Endpoint;
use crate::net::error::Error;

//------------ AsyncOpen -----------------------------------------------------

/// Create the handle behind a socket asynchronously.
pub trait AsyncOpen {
    /// The type of an open handle.
    type Handle;

    /// The future creating the handle.
    type Fut: Future<Output = Result<Self::Handle, Error>> + Send;

    /// Returns a future that creates a handle for the given endpoint.
    ///
    /// Failures to apply the options in `config` must resolve to
    /// [`Error::SocketSetError`].
    fn open(&self, endpoint: &Endpoint, config: &Config) -> Self::Fut;
}

//------------ UdpOpen -------------------------------------------------------

/// Create UDP sockets bound to a local endpoint.
///
/// Use an unspecified address and port zero to get an ephemeral client
/// socket.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpOpen;

impl UdpOpen {
    /// Creates and binds a UDP socket.
    ///
    /// All of this happens without waiting on the network.
    fn bind(addr: SocketAddr, config: &Config) -> Result<UdpSocket, Error> {
        let sock = Socket::new(
            Domain::for_address(addr),
            Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )
        .map_err(Error::transport)?;
        if config.reuse_address() {
            sock.set_reuse_address(true)
                .map_err(|err| Error::socket_set("SO_REUSEADDR", err))?;
        }
        let current = sock
            .recv_buffer_size()
            .map_err(|err| Error::socket_set("SO_RCVBUF", err))?;
        if current < config.recv_buffer_size() {
            sock.set_recv_buffer_size(config.recv_buffer_size())
                .map_err(|err| Error::socket_set("SO_RCVBUF", err))?;
        }
        sock.set_nonblocking(true)
            .map_err(|err| Error::socket_set("O_NONBLOCK", err))?;
        sock.bind(&addr.into()).map_err(Error::transport)?;
        UdpSocket::from_std(sock.into()).map_err(Error::transport)
    }
}

impl AsyncOpen for UdpOpen {
    type Handle = UdpSocket;
    type Fut = Pin<
        Box<dyn Future<Output = Result<Self::Handle, Error>> + Send>,
    >;

    fn open(&self, endpoint: &Endpoint, config: &Config) -> Self::Fut {
        let addr = endpoint.socket_addr();
        let config = config.clone();
        Box::pin(async move {
            let sock = Self::bind(addr, &config)?;
            trace!("bound UDP socket to {:?}", sock.local_addr());
            Ok(sock)
        })
    }
}

//------------ TcpOpen -------------------------------------------------------

/// Create new TCP connections.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpOpen;

impl TcpOpen {
    /// Creates a TCP socket with all options applied but not connected.
    fn prepare(addr: SocketAddr, config: &Config) -> Result<TcpSocket, Error> {
        let sock = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(Error::transport)?;
        if config.reuse_address() {
            sock.set_reuseaddr(true)
                .map_err(|err| Error::socket_set("SO_REUSEADDR", err))?;
        }
        let current = sock
            .recv_buffer_size()
            .map_err(|err| Error::socket_set("SO_RCVBUF", err))?;
        if (current as usize) < config.recv_buffer_size() {
            let size = u32::try_from(config.recv_buffer_size())
                .unwrap_or(u32::MAX);
            sock.set_recv_buffer_size(size)
                .map_err(|err| Error::socket_set("SO_RCVBUF", err))?;
        }
        Ok(sock)
    }
}

impl AsyncOpen for TcpOpen {
    type Handle = TcpStream;
    type Fut = Pin<
        Box<dyn Future<Output = Result<Self::Handle, Error>> + Send>,
    >;

    fn open(&self, endpoint: &Endpoint, config: &Config) -> Self::Fut {
        let addr = endpoint.socket_addr();
        let config = config.clone();
        Box::pin(async move {
            let sock = Self::prepare(addr, &config)?;
            let stream = sock.connect(addr).await.map_err(Error::transport)?;
            stream
                .set_nodelay(config.nodelay())
                .map_err(|err| Error::socket_set("TCP_NODELAY", err))?;
            trace!("connected TCP socket to {addr}");
            Ok(stream)
        })
    }
}
