//! The handle behind a UDP socket.
//!
//! [`UdpSocket`][crate::net::udp::UdpSocket] only talks to its handle
//! through [`AsyncDgramSock`], so anything that can send and receive
//! datagrams can stand in for a real operating system socket.

use std::boxed::Box;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::ReadBuf;
use tokio::net::UdpSocket;

//------------ AsyncDgramSock ------------------------------------------------

/// A datagram handle.
///
/// A receive operation waits for [`readable`][Self::readable] and then
/// calls [`try_recv_buf_from`][Self::try_recv_buf_from] with a buffer one
/// byte larger than the capacity it was given. A datagram that fills that
/// buffer completely is reported as an overflow. The handle is shared
/// between all operations of a socket, so receives must not need exclusive
/// access.
pub trait AsyncDgramSock {
    /// Polls sending `data` as one datagram to `dest`.
    fn poll_send_to(
        &self,
        cx: &mut Context,
        data: &[u8],
        dest: &SocketAddr,
    ) -> Poll<io::Result<usize>>;

    /// Waits until a datagram may be available.
    ///
    /// Spurious wakeups are allowed. The following receive then fails with
    /// [`io::ErrorKind::WouldBlock`] and the socket waits again.
    fn readable(
        &self,
    ) -> Pin<Box<dyn Future<Output = io::Result<()>> + '_ + Send>>;

    /// Takes one datagram into `buf` without waiting.
    ///
    /// Returns the datagram length and its source. Whatever doesn't fit
    /// into `buf` is discarded.
    fn try_recv_buf_from(
        &self,
        buf: &mut ReadBuf<'_>,
    ) -> io::Result<(usize, SocketAddr)>;

    /// Returns the address the handle is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl AsyncDgramSock for UdpSocket {
    fn poll_send_to(
        &self,
        cx: &mut Context,
        data: &[u8],
        dest: &SocketAddr,
    ) -> Poll<io::Result<usize>> {
        UdpSocket::poll_send_to(self, cx, data, *dest)
    }

    fn readable(
        &self,
    ) -> Pin<Box<dyn Future<Output = io::Result<()>> + '_ + Send>> {
        Box::pin(UdpSocket::readable(self))
    }

    fn try_recv_buf_from(
        &self,
        buf: &mut ReadBuf<'_>,
    ) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::try_recv_buf_from(self, buf)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}
