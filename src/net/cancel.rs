//! Cancellation of in-flight operations.
//!
//! Each socket owns a [`Canceller`]. Every operation takes a
//! [`CancelToken`] when it is issued and races its I/O against
//! [`CancelToken::cancelled`]. Cancelling bumps a generation counter in a
//! watch channel, so only operations issued before the call observe it.
//! Dropping the canceller, which happens when the socket is dropped, has
//! the same effect.

use tokio::sync::watch;

//------------ Canceller -----------------------------------------------------

/// The socket side of the cancellation flag.
#[derive(Debug)]
pub struct Canceller {
    /// Sends the current generation.
    tx: watch::Sender<u64>,
}

impl Canceller {
    /// Creates a new canceller.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Canceller { tx }
    }

    /// Returns a token for an operation issued now.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancels all operations issued before this call.
    pub fn cancel(&self) {
        self.tx.send_modify(|gen| *gen = gen.wrapping_add(1));
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

//------------ CancelToken ---------------------------------------------------

/// The operation side of the cancellation flag.
#[derive(Debug)]
pub struct CancelToken {
    /// Observes the generation.
    rx: watch::Receiver<u64>,
}

impl CancelToken {
    /// Resolves once the operation has been cancelled.
    ///
    /// This is cancel safe.
    pub async fn cancelled(&mut self) {
        // An error means the canceller is gone, which cancels as well.
        let _ = self.rx.changed().await;
    }
}

//============ Testing =======================================================
