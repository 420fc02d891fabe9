//! Broadcast queue for one-to-many event distribution.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{ChatflowError, Result};

/// Broadcast queue for one-to-many message distribution.
///
/// Every subscriber receives every message sent after it subscribed.
/// Backed by tokio's broadcast channel; slow subscribers lag and lose the
/// oldest messages rather than blocking the sender.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// send a message to every current subscriber
    ///
    /// Fails when nobody is subscribed.
    pub fn send(
        &self,
        msg: T,
    ) -> Result<usize> {
        self.sender.send(msg).map_err(|e| ChatflowError::Queue(e.to_string()))
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}
