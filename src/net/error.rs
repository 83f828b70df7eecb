//! Error type for socket operations.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::Arc;

//------------ Error ---------------------------------------------------------

/// Error type for socket operations.
///
/// The first four variants are the conditions specific to this crate. They
/// signal a contract violation by the caller or a configuration failure and
/// are never produced by the network itself. Everything the operating system
/// or the peer reports is passed through as [`Error::Transport`].
#[derive(Clone, Debug)]
pub enum Error {
    /// The socket was never opened or has been closed.
    SocketNotOpen,

    /// A socket option could not be applied while opening the socket.
    ///
    /// The socket is unusable afterwards.
    SocketSetError {
        /// The option that failed, e.g. `"SO_RCVBUF"`.
        option: &'static str,

        /// The error reported by the operating system.
        source: Arc<io::Error>,
    },

    /// Inbound data did not fit into the receive buffer.
    ///
    /// Nothing was written to the buffer. On a stream socket the framing is
    /// out of sync after this error and the socket should be closed.
    BufferOverflow {
        /// The number of bytes the message would have needed.
        ///
        /// For a datagram, this is only a lower bound since the excess is
        /// discarded by the system.
        required: usize,

        /// The capacity the caller asked for.
        capacity: usize,
    },

    /// A request exceeded the configured maximum buffer size.
    ///
    /// This is reported before any I/O happens.
    BufferTooLarge {
        /// The size of the request.
        requested: usize,

        /// The configured maximum.
        max: usize,
    },

    /// The operation was cancelled or the socket was closed while it was
    /// in flight.
    Cancelled,

    /// The peer closed the stream in the middle of a message.
    UnexpectedEndOfData,

    /// Some other error reported by the underlying transport.
    Transport(Arc<io::Error>),
}

impl Error {
    /// Creates a socket set error for the given option.
    pub(crate) fn socket_set(option: &'static str, err: io::Error) -> Self {
        Error::SocketSetError {
            option,
            source: Arc::new(err),
        }
    }

    /// Creates a transport error.
    pub(crate) fn transport(err: io::Error) -> Self {
        Error::Transport(Arc::new(err))
    }

    /// Returns whether this is a pass-through transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns whether the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::transport(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Error::SocketNotOpen => write!(f, "socket is not open"),
            Error::SocketSetError { option, source } => {
                write!(f, "error setting socket option {option}: {source}")
            }
            Error::BufferOverflow { required, capacity } => write!(
                f,
                "message of {required} bytes overflows receive buffer \
                 of {capacity} bytes"
            ),
            Error::BufferTooLarge { requested, max } => write!(
                f,
                "buffer of {requested} bytes exceeds maximum of {max} bytes"
            ),
            Error::Cancelled => write!(f, "operation cancelled"),
            Error::UnexpectedEndOfData => write!(f, "unexpected end of data"),
            Error::Transport(err) => write!(f, "transport error: {err}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::SocketNotOpen => None,
            Error::SocketSetError { source, .. } => Some(source),
            Error::BufferOverflow { .. } => None,
            Error::BufferTooLarge { .. } => None,
            Error::Cancelled => None,
            Error::UnexpectedEndOfData => None,
            Error::Transport(err) => Some(err),
        }
    }
}

//============ Testing =======================================================
