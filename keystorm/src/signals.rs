//! Module to signal shutdown in keystorm.
//!
//! The mechanism here has two components, a `Broadcaster` and a `Watcher`. The
//! `Broadcaster` is responsible for signaling every `Watcher` that shutdown
//! has been requested. This is a one-time event. There is only one
//! `Broadcaster` and potentially many `Watcher` instances.

use tokio::sync::broadcast::{self, error::RecvError};

/// Construct a `Watcher` and `Broadcaster` pair.
#[must_use]
pub fn signal() -> (Watcher, Broadcaster) {
    // Nothing is ever sent on this channel. The signal is the sender being
    // dropped, which every receiver observes as `Closed`.
    let (sender, receiver) = broadcast::channel(1);

    let w = Watcher {
        receiver,
        signal_received: false,
    };
    let b = Broadcaster { sender };

    (w, b)
}

#[derive(Debug)]
/// Mechanism to notify one or more `Watcher` instances of shutdown.
///
/// Dropping the `Broadcaster` is equivalent to calling `signal`.
pub struct Broadcaster {
    sender: broadcast::Sender<()>,
}

impl Broadcaster {
    /// Send the signal through to any `Watcher` instances.
    pub fn signal(self) {
        drop(self.sender);
    }
}

#[derive(Debug)]
/// Mechanism to watch for shutdown.
pub struct Watcher {
    receiver: broadcast::Receiver<()>,
    signal_received: bool,
}

impl Watcher {
    /// Wait for the signal. Returns immediately if the signal has already
    /// been received.
    pub async fn recv(&mut self) {
        if self.signal_received {
            return;
        }
        loop {
            match self.receiver.recv().await {
                Err(RecvError::Closed) => break,
                Ok(()) | Err(RecvError::Lagged(_)) => {}
            }
        }
        self.signal_received = true;
    }

    /// Check for the signal without waiting.
    pub fn try_recv(&mut self) -> bool {
        if !self.signal_received {
            self.signal_received = matches!(
                self.receiver.try_recv(),
                Err(broadcast::error::TryRecvError::Closed)
            );
        }
        self.signal_received
    }
}

impl Clone for Watcher {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
            signal_received: self.signal_received,
        }
    }
}
