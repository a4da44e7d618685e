use std::time::{Duration, Instant};

/// Poll-driven scheduler for delayed deliveries (authority-transfer notices,
/// barrier resume sequencing, barrier timeouts). Nothing blocks: the owning
/// dispatch context calls `pop_due` on every service pass and stays free to
/// process other messages in between.
#[derive(Debug)]
pub struct TimeQueue<T> {
    next_seq: u64,
    entries: Vec<Entry<T>>,
}

#[derive(Debug)]
struct Entry<T> {
    due: Instant,
    seq: u64,
    item: T,
}

impl<T> TimeQueue<T> {
    pub fn new() -> Self {
        TimeQueue {
            next_seq: 0,
            entries: Vec::new(),
        }
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, item: T) {
        let entry = Entry {
            due: now + delay,
            seq: self.next_seq,
            item,
        };
        self.next_seq += 1;
        self.entries.push(entry);
    }

    /// Removes and returns the earliest due entry, FIFO among entries due at
    /// the same instant. `None` when nothing is due yet.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by(|(_, a), (_, b)| a.due.cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        Some(self.entries.remove(index).item)
    }

    /// Removes every entry matching the predicate regardless of due time, in
    /// schedule order. Used when a disconnect must expedite or cancel pending
    /// deliveries referencing the lost client.
    pub fn take_matching(&mut self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut taken = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            if pred(&self.entries[index].item) {
                taken.push(self.entries.remove(index).item);
            } else {
                index += 1;
            }
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TimeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
