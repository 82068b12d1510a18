use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Broadcast channel that remembers its most recent events.
///
/// Late subscribers may ask for the retained history first. At most `limit`
/// events are kept, oldest evicted first. Subscribers whose receiver was
/// dropped are forgotten on the next publish.
pub struct BufferedPubSub<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    buffer: VecDeque<T>,
    limit: usize,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone> BufferedPubSub<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: VecDeque::with_capacity(limit),
                limit,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn publish(&self, event: T) {
        let mut inner = self.lock();
        inner.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if inner.limit == 0 {
            return;
        }
        if inner.buffer.len() == inner.limit {
            inner.buffer.pop_front();
        }
        inner.buffer.push_back(event);
    }

    pub fn subscribe(&self, include_buffered: bool) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if include_buffered {
            for event in &inner.buffer {
                // rx is alive, this cannot fail
                let _ = tx.send(event.clone());
            }
        }
        inner.subscribers.push(tx);
        rx
    }

    pub fn history(&self) -> Vec<T> {
        self.lock().buffer.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
