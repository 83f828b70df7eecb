//! Socket configuration.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use core::cmp;

//------------ Configuration Constants ----------------------------------------

/// Limits for the largest single read or write request.
///
/// The maximum is the largest message a two octet length prefix can
/// describe.
const MAX_BUFFER_SIZE: DefMinMax<usize> = DefMinMax::new(65535, 512, 65535);

/// Limits for the minimum size of the kernel receive buffer.
const RECV_BUFFER_SIZE: DefMinMax<usize> =
    DefMinMax::new(32 * 1024, 4096, 16 * 1024 * 1024);

//------------ Config ---------------------------------------------------------

/// Configuration applied to a socket.
#[derive(Clone, Debug)]
pub struct Config {
    /// Largest accepted receive capacity or send length.
    max_buffer_size: usize,

    /// Minimum kernel receive buffer size.
    recv_buffer_size: usize,

    /// Whether to set SO_REUSEADDR.
    reuse_address: bool,

    /// Whether to set TCP_NODELAY on stream sockets.
    nodelay: bool,
}

impl Config {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the maximum buffer size.
    ///
    /// Receive requests with a larger capacity and send requests with a
    /// longer message are rejected with
    /// [`BufferTooLarge`][crate::net::error::Error::BufferTooLarge].
    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    /// Sets the maximum buffer size.
    ///
    /// If this value is too small or too large, it will be caped.
    pub fn set_max_buffer_size(&mut self, value: usize) {
        self.max_buffer_size = MAX_BUFFER_SIZE.limit(value)
    }

    /// Returns the minimum kernel receive buffer size.
    pub fn recv_buffer_size(&self) -> usize {
        self.recv_buffer_size
    }

    /// Sets the minimum kernel receive buffer size.
    ///
    /// When a socket is opened and the system default is smaller than this
    /// value, the receive buffer is enlarged. If this value is too small or
    /// too large, it will be caped.
    pub fn set_recv_buffer_size(&mut self, value: usize) {
        self.recv_buffer_size = RECV_BUFFER_SIZE.limit(value)
    }

    /// Returns whether SO_REUSEADDR is set on open.
    pub fn reuse_address(&self) -> bool {
        self.reuse_address
    }

    /// Sets whether SO_REUSEADDR is set on open.
    pub fn set_reuse_address(&mut self, value: bool) {
        self.reuse_address = value
    }

    /// Returns whether TCP_NODELAY is set on stream sockets.
    pub fn nodelay(&self) -> bool {
        self.nodelay
    }

    /// Sets whether TCP_NODELAY is set on stream sockets.
    pub fn set_nodelay(&mut self, value: bool) {
        self.nodelay = value
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_buffer_size: MAX_BUFFER_SIZE.default(),
            recv_buffer_size: RECV_BUFFER_SIZE.default(),
            reuse_address: false,
            nodelay: true,
        }
    }
}

//------------ DefMinMax -----------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy)]
struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    fn default(self) -> T {
        self.def
    }

    /// Trims the given value to fit into the minimum/maximum range.
    fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//============ Testing =======================================================
