//! A datagram socket over UDP.
//!
//! Every send and every receive is one complete datagram. There is no
//! reassembly across operations and no connection state beyond the local
//! binding.
//!
//! A datagram that doesn't fit into the capacity given to
//! [`async_receive`][AsyncSocket::async_receive] is never delivered
//! truncated. It is received into a scratch buffer one byte larger than the
//! capacity, discarded, and reported as
//! [`BufferOverflow`][Error::BufferOverflow]. The caller's buffer is left
//! empty in that case.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use core::future::poll_fn;
use std::boxed::Box;
use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::ReadBuf;
use tracing::{debug, trace};

use crate::net::cancel::Canceller;
use crate::net::config::Config;
use crate::net::counters::SocketCounters;
use crate::net::endpoint::{Endpoint, Protocol};
use crate::net::error::Error;
use crate::net::protocol::{AsyncOpen, UdpOpen};
use crate::net::sock::AsyncDgramSock;
use crate::net::socket::{
    check_size, AsyncSocket, OpenFuture, Received, RecvCompletion,
    SendCompletion,
};

//------------ UdpSocket -----------------------------------------------------

/// A UDP socket.
#[derive(Debug)]
pub struct UdpSocket<O: AsyncOpen = UdpOpen> {
    /// Creates the handle on open.
    opener: O,

    /// User configuration variables.
    config: Config,

    /// The handle while the socket is open.
    sock: Option<Arc<O::Handle>>,

    /// The address the socket is bound to.
    local: Option<Endpoint>,

    /// Cancels outstanding operations.
    canceller: Canceller,

    /// Event counters.
    counters: Arc<SocketCounters>,
}

impl UdpSocket<UdpOpen> {
    /// Creates a new unopened UDP socket with default configuration.
    pub fn new() -> Self {
        Self::with_config(Default::default())
    }

    /// Creates a new unopened UDP socket with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self::with_opener(UdpOpen, config)
    }
}

impl Default for UdpSocket<UdpOpen> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: AsyncOpen> UdpSocket<O> {
    /// Creates a new unopened socket that gets its handle from `opener`.
    pub fn with_opener(opener: O, config: Config) -> Self {
        UdpSocket {
            opener,
            config,
            sock: None,
            local: None,
            canceller: Canceller::new(),
            counters: Default::default(),
        }
    }

    /// Makes the socket record its events in `counters`.
    pub fn with_counters(mut self, counters: Arc<SocketCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the event counters.
    pub fn counters(&self) -> &Arc<SocketCounters> {
        &self.counters
    }

    /// Returns the local endpoint while the socket is open.
    ///
    /// If the socket was bound to port zero, this contains the port the
    /// system picked.
    pub fn local_endpoint(&self) -> Option<Endpoint> {
        self.local
    }

    /// Returns the handle or fails if the socket isn't open.
    fn handle(&self) -> Result<&Arc<O::Handle>, Error> {
        self.sock.as_ref().ok_or(Error::SocketNotOpen)
    }
}

impl<O> UdpSocket<O>
where
    O: AsyncOpen + Send + 'static,
    O::Handle: AsyncDgramSock + Send + Sync + 'static,
{
    /// Sends one datagram.
    async fn send_to(
        sock: &O::Handle,
        data: &[u8],
        dest: &Endpoint,
    ) -> Result<usize, Error> {
        let addr = dest.socket_addr();
        poll_fn(|cx| sock.poll_send_to(cx, data, &addr))
            .await
            .map_err(Error::transport)
    }

    /// Receives one datagram of at most `capacity` bytes into `buf`.
    async fn recv_from(
        sock: &O::Handle,
        buf: &mut BytesMut,
        capacity: usize,
        local: Endpoint,
    ) -> Result<Received, Error> {
        // One extra byte tells us whether the datagram was too long.
        let mut scratch = vec![0u8; capacity + 1];
        let (len, addr) = loop {
            sock.readable().await.map_err(Error::transport)?;
            let mut read_buf = ReadBuf::new(&mut scratch);
            match sock.try_recv_buf_from(&mut read_buf) {
                Ok(res) => break res,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    continue
                }
                Err(err) => return Err(Error::transport(err)),
            }
        };
        if len > capacity {
            debug!(
                "discarding datagram from {addr}: longer than {capacity} \
                 bytes"
            );
            return Err(Error::BufferOverflow {
                required: len,
                capacity,
            });
        }
        buf.extend_from_slice(&scratch[..len]);
        Ok(Received {
            length: len,
            source: local.with_addr(addr),
        })
    }
}

impl<O> AsyncSocket for UdpSocket<O>
where
    O: AsyncOpen + Send + 'static,
    O::Handle: AsyncDgramSock + Send + Sync + 'static,
{
    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }

    fn is_open(&self) -> bool {
        self.sock.is_some()
    }

    fn is_open_synchronous(&self) -> bool {
        true
    }

    fn open<'a>(&'a mut self, endpoint: &Endpoint) -> OpenFuture<'a> {
        let endpoint = *endpoint;
        Box::pin(async move {
            if self.sock.is_some() {
                return Ok(());
            }
            let res = self.opener.open(&endpoint, &self.config).await;
            self.counters.record_open(&res);
            let sock = match res {
                Ok(sock) => sock,
                Err(err) => {
                    debug!("opening UDP socket on {endpoint} failed: {err}");
                    return Err(err);
                }
            };
            let local = match sock.local_addr() {
                Ok(addr) => endpoint.with_addr(addr),
                Err(_) => endpoint,
            };
            trace!("opened UDP socket on {local}");
            self.local = Some(local);
            self.sock = Some(Arc::new(sock));
            Ok(())
        })
    }

    fn async_send(
        &self,
        data: Bytes,
        destination: &Endpoint,
        completion: SendCompletion,
    ) -> Result<(), Error> {
        let sock = self.handle()?.clone();
        check_size(data.len(), &self.config)?;
        let dest = *destination;
        let mut token = self.canceller.token();
        let counters = self.counters.clone();
        tokio::spawn(async move {
            let res = tokio::select! {
                res = Self::send_to(&sock, &data, &dest) => res,
                _ = token.cancelled() => Err(Error::Cancelled),
            };
            counters.record_send(&res);
            completion(res, data);
        });
        Ok(())
    }

    fn async_receive(
        &self,
        mut buf: BytesMut,
        capacity: usize,
        completion: RecvCompletion,
    ) -> Result<(), Error> {
        let sock = self.handle()?.clone();
        check_size(capacity, &self.config)?;
        let local = self.local.ok_or(Error::SocketNotOpen)?;
        let mut token = self.canceller.token();
        let counters = self.counters.clone();
        tokio::spawn(async move {
            buf.clear();
            let res = tokio::select! {
                res = Self::recv_from(&sock, &mut buf, capacity, local) => res,
                _ = token.cancelled() => Err(Error::Cancelled),
            };
            if res.is_err() {
                buf.clear();
            }
            counters.record_read(&res);
            completion(res, buf);
        });
        Ok(())
    }

    fn cancel(&self) {
        trace!("cancelling UDP operations");
        self.canceller.cancel();
    }

    fn close(&mut self) {
        if self.sock.take().is_some() {
            self.canceller.cancel();
            if let Some(local) = self.local.take() {
                trace!("closed UDP socket on {local}");
            }
        }
    }
}

//============ Testing =======================================================
