use std::collections::VecDeque;

/// FIFO holding area for entity-mutating messages that arrive before the local
/// replica is ready. They represent authoritative edits and must not be
/// dropped; they are replayed strictly in arrival order once readiness flips.
///
/// Position updates never go through here: they ride the unreliable channel
/// and a fresh one will arrive soon.
#[derive(Debug)]
pub struct MessageBuffer<T> {
    ready: bool,
    queue: VecDeque<T>,
}

impl<T> MessageBuffer<T> {
    pub fn new() -> Self {
        MessageBuffer {
            ready: false,
            queue: VecDeque::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Appends to the queue while not ready. Returns whether the item was
    /// deferred; `false` means the replica is ready and the caller should
    /// process the item directly.
    pub fn defer(&mut self, item: T) -> bool {
        if self.ready {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    /// Flips readiness and hands back every queued entry in arrival order,
    /// leaving the queue empty. Invoked exactly once, when the initialization
    /// handshake completes.
    pub fn drain(&mut self) -> Vec<T> {
        self.ready = true;
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for MessageBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
