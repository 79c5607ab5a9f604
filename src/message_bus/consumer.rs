//! Channel-backed consumer for awaiting events from async code

use super::error_handling::{AsyncRecvError, AsyncTryRecvError};
use tokio::sync::mpsc as async_mpsc;
use tokio::time::{timeout, Duration};

/// Receives every event published under the name it was created for.
///
/// Dropping the consumer unsubscribes it on the next emit.
pub struct Consumer<T> {
    receiver: async_mpsc::UnboundedReceiver<T>,
}

impl<T> Consumer<T> {
    pub(crate) fn new(receiver: async_mpsc::UnboundedReceiver<T>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Wait for the next event, giving up after `duration`
    pub async fn recv_timeout(&mut self, duration: Duration) -> Result<T, AsyncRecvError> {
        match timeout(duration, self.receiver.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(AsyncRecvError::Disconnected),
            Err(_) => Err(AsyncRecvError::Timeout),
        }
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<T, AsyncTryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(event),
            Err(async_mpsc::error::TryRecvError::Empty) => Err(AsyncTryRecvError::Empty),
            Err(async_mpsc::error::TryRecvError::Disconnected) => {
                Err(AsyncTryRecvError::Disconnected)
            }
        }
    }
}
