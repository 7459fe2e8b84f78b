//! Bounded work queue between a controller's select and run loops

use tokio::sync::{mpsc, Mutex};

use crate::error::{AgentError, AgentResult};

/// FIFO of selected actors. Pushing into a full queue suspends until a pop
/// makes room; nothing is ever dropped.
#[derive(Debug)]
pub struct WorkQueue<T> {
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
    capacity: usize,
}

impl<T> WorkQueue<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    pub async fn push(&self, item: T) -> AgentResult<()> {
        self.tx.send(item).await.map_err(|_| AgentError::QueueClosed)
    }

    /// Wait for the next item
    pub async fn pop(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }

    /// Next item if one is ready
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
