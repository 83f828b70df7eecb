//! A stream socket over TCP.
//!
//! Messages are sent and received with the two octet length prefix DNS uses
//! over streams. A send operation writes prefix and payload, re-issuing
//! writes until the stream has accepted all of it. A receive operation
//! reads until the prefix and then the announced number of payload bytes
//! have arrived. Either way the completion is called once for the whole
//! message. The partial progress in between is tracked by the state
//! machines in [`framing`][crate::net::framing].
//!
//! Each direction of the stream is guarded by a lock that an operation
//! holds for the entire message, so the bytes of concurrently issued
//! messages are never interleaved.
//!
//! Cancellation is checked whenever an operation waits for the stream. If
//! it arrives after part of a message has already been transferred, the
//! rest of that message is abandoned and the message boundaries on the
//! stream are lost. The same happens when a received message overflows the
//! buffer. All later operations in that direction then fail with a
//! [`Transport`][Error::Transport] error instead of sending or reading
//! garbage. The socket has to be closed and opened again.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::boxed::Box;
use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{
    split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf,
    WriteHalf,
};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::net::cancel::{CancelToken, Canceller};
use crate::net::config::Config;
use crate::net::counters::SocketCounters;
use crate::net::endpoint::{Endpoint, Protocol};
use crate::net::error::Error;
use crate::net::framing::{FrameReader, FrameWriter, RecvState, SendState};
use crate::net::protocol::{AsyncOpen, TcpOpen};
use crate::net::socket::{
    check_size, AsyncSocket, OpenFuture, Received, RecvCompletion,
    SendCompletion,
};

//------------ TcpSocket -----------------------------------------------------

/// A TCP socket.
#[derive(Debug)]
pub struct TcpSocket<O: AsyncOpen = TcpOpen> {
    /// Creates the connection on open.
    opener: O,

    /// User configuration variables.
    config: Config,

    /// The connection while the socket is open.
    conn: Option<Halves<O::Handle>>,

    /// The peer we are connected to.
    peer: Option<Endpoint>,

    /// Cancels outstanding operations.
    canceller: Canceller,

    /// Event counters.
    counters: Arc<SocketCounters>,
}

/// The two directions of a connection.
#[derive(Debug)]
struct Halves<S> {
    /// The receiving side.
    read: Arc<Mutex<Direction<ReadHalf<S>>>>,

    /// The sending side.
    write: Arc<Mutex<Direction<WriteHalf<S>>>>,
}

/// One direction of a connection.
#[derive(Debug)]
struct Direction<T> {
    /// The half of the stream.
    io: T,

    /// A message was abandoned part way through.
    desynced: bool,
}

impl<T> Direction<T> {
    /// Wraps a fresh half of a stream.
    fn new(io: T) -> Self {
        Direction {
            io,
            desynced: false,
        }
    }

    /// Fails if the message boundaries in this direction have been lost.
    fn check_sync(&self) -> Result<(), Error> {
        if self.desynced {
            Err(Error::transport(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream framing lost after an abandoned message",
            )))
        } else {
            Ok(())
        }
    }
}

impl TcpSocket<TcpOpen> {
    /// Creates a new unopened TCP socket with default configuration.
    pub fn new() -> Self {
        Self::with_config(Default::default())
    }

    /// Creates a new unopened TCP socket with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self::with_opener(TcpOpen, config)
    }
}

impl Default for TcpSocket<TcpOpen> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: AsyncOpen> TcpSocket<O> {
    /// Creates a new unopened socket that gets its connection from `opener`.
    pub fn with_opener(opener: O, config: Config) -> Self {
        TcpSocket {
            opener,
            config,
            conn: None,
            peer: None,
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

    /// Returns the peer endpoint while the socket is open.
    pub fn peer_endpoint(&self) -> Option<Endpoint> {
        self.peer
    }
}

impl<O> TcpSocket<O>
where
    O: AsyncOpen + Send + 'static,
    O::Handle: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Writes one framed message.
    ///
    /// Returns the payload length once the stream accepted everything.
    async fn write_frame(
        write: &Mutex<Direction<WriteHalf<O::Handle>>>,
        mut writer: FrameWriter,
        token: &mut CancelToken,
    ) -> Result<usize, Error> {
        let mut stream = tokio::select! {
            stream = write.lock() => stream,
            _ = token.cancelled() => return Err(Error::Cancelled),
        };
        stream.check_sync()?;
        while writer.state() == SendState::Sending {
            let res = tokio::select! {
                res = stream.io.write(writer.remaining()) => Some(res),
                _ = token.cancelled() => None,
            };
            let n = match res {
                Some(Ok(0)) => {
                    stream.desynced |= writer.is_started();
                    return Err(Error::transport(
                        io::ErrorKind::WriteZero.into(),
                    ));
                }
                Some(Ok(n)) => n,
                Some(Err(err)) => {
                    stream.desynced |= writer.is_started();
                    return Err(Error::transport(err));
                }
                None => {
                    if writer.is_started() {
                        debug!(
                            "send cancelled with {} bytes unwritten",
                            writer.remaining().len()
                        );
                        stream.desynced = true;
                    }
                    return Err(Error::Cancelled);
                }
            };
            if writer.advance(n) == SendState::Sending {
                trace!(
                    "partial write of {n} bytes, {} left",
                    writer.remaining().len()
                );
            }
        }
        tokio::select! {
            res = stream.io.flush() => res.map_err(Error::transport)?,
            _ = token.cancelled() => return Err(Error::Cancelled),
        }
        Ok(writer.payload_len())
    }

    /// Reads one framed message of at most `capacity` bytes into `buf`.
    async fn read_frame(
        read: &Mutex<Direction<ReadHalf<O::Handle>>>,
        buf: &mut BytesMut,
        capacity: usize,
        token: &mut CancelToken,
    ) -> Result<usize, Error> {
        let mut stream = tokio::select! {
            stream = read.lock() => stream,
            _ = token.cancelled() => return Err(Error::Cancelled),
        };
        stream.check_sync()?;
        let mut reader = FrameReader::new(capacity);
        loop {
            let res = tokio::select! {
                res = stream.io.read(reader.read_target(buf)) => Some(res),
                _ = token.cancelled() => None,
            };
            let n = match res {
                Some(Ok(0)) => return Err(Error::UnexpectedEndOfData),
                Some(Ok(n)) => n,
                Some(Err(err)) => {
                    stream.desynced |= reader.is_started();
                    return Err(Error::transport(err));
                }
                None => {
                    if reader.is_started() {
                        debug!("receive cancelled part way through a message");
                        stream.desynced = true;
                    }
                    return Err(Error::Cancelled);
                }
            };
            match reader.advance(n, buf) {
                Ok(RecvState::Complete) => return Ok(buf.len()),
                Ok(_) => {}
                Err(err) => {
                    warn!("{err}, stream framing is out of sync");
                    stream.desynced = true;
                    return Err(err);
                }
            }
        }
    }
}

impl<O> AsyncSocket for TcpSocket<O>
where
    O: AsyncOpen + Send + 'static,
    O::Handle: AsyncRead + AsyncWrite + Send + 'static,
{
    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn is_open_synchronous(&self) -> bool {
        false
    }

    fn open<'a>(&'a mut self, endpoint: &Endpoint) -> OpenFuture<'a> {
        let endpoint = *endpoint;
        Box::pin(async move {
            if self.conn.is_some() {
                return Ok(());
            }
            let res = self.opener.open(&endpoint, &self.config).await;
            self.counters.record_open(&res);
            let stream = match res {
                Ok(stream) => stream,
                Err(err) => {
                    debug!("connecting to {endpoint} failed: {err}");
                    return Err(err);
                }
            };
            let (read, write) = split(stream);
            self.conn = Some(Halves {
                read: Arc::new(Mutex::new(Direction::new(read))),
                write: Arc::new(Mutex::new(Direction::new(write))),
            });
            self.peer = Some(endpoint);
            trace!("opened TCP socket to {endpoint}");
            Ok(())
        })
    }

    fn async_send(
        &self,
        data: Bytes,
        _destination: &Endpoint,
        completion: SendCompletion,
    ) -> Result<(), Error> {
        let conn = self.conn.as_ref().ok_or(Error::SocketNotOpen)?;
        check_size(data.len(), &self.config)?;
        let writer = FrameWriter::new(&data)?;
        let write = conn.write.clone();
        let mut token = self.canceller.token();
        let counters = self.counters.clone();
        tokio::spawn(async move {
            let res = Self::write_frame(&write, writer, &mut token).await;
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
        let conn = self.conn.as_ref().ok_or(Error::SocketNotOpen)?;
        check_size(capacity, &self.config)?;
        let source = self.peer.ok_or(Error::SocketNotOpen)?;
        let read = conn.read.clone();
        let mut token = self.canceller.token();
        let counters = self.counters.clone();
        tokio::spawn(async move {
            buf.clear();
            let res =
                Self::read_frame(&read, &mut buf, capacity, &mut token).await;
            let res = match res {
                Ok(length) => Ok(Received { length, source }),
                Err(err) => {
                    buf.clear();
                    Err(err)
                }
            };
            counters.record_read(&res);
            completion(res, buf);
        });
        Ok(())
    }

    fn cancel(&self) {
        trace!("cancelling TCP operations");
        self.canceller.cancel();
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            self.canceller.cancel();
            if let Some(peer) = self.peer.take() {
                trace!("closed TCP socket to {peer}");
            }
        }
    }
}

//============ Testing =======================================================
