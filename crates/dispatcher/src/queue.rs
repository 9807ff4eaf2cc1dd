//! Pending queue - accepted but unsent events, oldest first

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::TrackingEvent;

/// Position assigned at enqueue time; identity for later removal
pub type SeqNo = u64;

/// One queued event
#[derive(Debug, Clone)]
pub struct Pending {
    pub seq: SeqNo,
    pub event: Arc<TrackingEvent>,
}

/// Event refused because the queue is at its cap
#[derive(Debug)]
pub struct QueueFull(pub TrackingEvent);

/// Ordered buffer of events awaiting transmission
///
/// Removal is by sequence number, never by value, so two equal events are
/// never confused and nothing is ever duplicated.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<Pending>,
    next_seq: SeqNo,
    max_len: Option<usize>,
}

impl PendingQueue {
    pub fn new(max_len: Option<usize>) -> Self {
        Self {
            items: VecDeque::new(),
            next_seq: 0,
            max_len,
        }
    }

    /// Append an event
    ///
    /// Hands the event back when the queue is at `max_len`.
    pub fn push(&mut self, event: TrackingEvent) -> Result<SeqNo, QueueFull> {
        if self.max_len.is_some_and(|max| self.items.len() >= max) {
            return Err(QueueFull(event));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(Pending {
            seq,
            event: Arc::new(event),
        });
        Ok(seq)
    }

    /// Ordered copy of the current contents
    pub fn snapshot(&self) -> VecDeque<Pending> {
        self.items.clone()
    }

    /// Remove one event; false if it was not queued
    pub fn remove(&mut self, seq: SeqNo) -> bool {
        match self.items.iter().position(|p| p.seq == seq) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove every listed event, returning how many were queued
    ///
    /// `seqs` must be ascending, which packing order guarantees.
    pub fn remove_all(&mut self, seqs: &[SeqNo]) -> usize {
        debug_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        let before = self.items.len();
        self.items.retain(|p| seqs.binary_search(&p.seq).is_err());
        before - self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pending> {
        self.items.iter()
    }
}

/// PendingQueue behind a mutex
///
/// Every call locks for the duration of one operation only; the lock is
/// never held across an await.
#[derive(Debug, Default)]
pub struct SharedQueue {
    inner: Mutex<PendingQueue>,
}

impl SharedQueue {
    pub fn new(max_len: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(PendingQueue::new(max_len)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingQueue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event and return the new depth
    pub fn push(&self, event: TrackingEvent) -> Result<usize, QueueFull> {
        let mut queue = self.lock();
        queue.push(event)?;
        Ok(queue.len())
    }

    pub fn snapshot(&self) -> VecDeque<Pending> {
        self.lock().snapshot()
    }

    /// Remove one event and return the remaining depth
    pub fn remove(&self, seq: SeqNo) -> usize {
        let mut queue = self.lock();
        queue.remove(seq);
        queue.len()
    }

    /// Remove the listed events and return the remaining depth
    pub fn remove_all(&self, seqs: &[SeqNo]) -> usize {
        let mut queue = self.lock();
        queue.remove_all(seqs);
        queue.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
