//! Socket event counters.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::net::error::Error;

//------------ SocketCounters ------------------------------------------------

/// Counts socket events.
///
/// A single instance can be shared by any number of sockets through an
/// [`Arc`][std::sync::Arc], see for example
/// [`UdpSocket::with_counters`][crate::net::udp::UdpSocket::with_counters].
#[derive(Debug, Default)]
pub struct SocketCounters {
    /// Successful opens.
    num_opens: AtomicUsize,

    /// Failed opens.
    num_open_errors: AtomicUsize,

    /// Failed receives, cancellations excluded.
    num_read_errors: AtomicUsize,

    /// Failed sends, cancellations excluded.
    num_send_errors: AtomicUsize,

    /// Operations completed as cancelled.
    num_cancelled: AtomicUsize,
}

impl SocketCounters {
    /// Creates a new set of counters, all zero.
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of successful opens.
    pub fn num_opens(&self) -> usize {
        self.num_opens.load(Ordering::Relaxed)
    }

    /// The number of failed opens.
    pub fn num_open_errors(&self) -> usize {
        self.num_open_errors.load(Ordering::Relaxed)
    }

    /// The number of receive operations that failed.
    ///
    /// Cancelled operations are not included.
    pub fn num_read_errors(&self) -> usize {
        self.num_read_errors.load(Ordering::Relaxed)
    }

    /// The number of send operations that failed.
    ///
    /// Cancelled operations are not included.
    pub fn num_send_errors(&self) -> usize {
        self.num_send_errors.load(Ordering::Relaxed)
    }

    /// The number of operations completed as cancelled.
    pub fn num_cancelled(&self) -> usize {
        self.num_cancelled.load(Ordering::Relaxed)
    }

    /// Records the outcome of an open.
    pub(crate) fn record_open<T>(&self, res: &Result<T, Error>) {
        match res {
            Ok(_) => self.num_opens.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.num_open_errors.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Records the outcome of a receive operation.
    pub(crate) fn record_read<T>(&self, res: &Result<T, Error>) {
        match res {
            Ok(_) => {}
            Err(Error::Cancelled) => {
                self.num_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.num_read_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Records the outcome of a send operation.
    pub(crate) fn record_send<T>(&self, res: &Result<T, Error>) {
        match res {
            Ok(_) => {}
            Err(Error::Cancelled) => {
                self.num_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.num_send_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
