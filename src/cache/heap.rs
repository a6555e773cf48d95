//! Expiration Heap Module
//!
//! Min-heap of expiration records ordered by deadline, with stable handles so an
//! entry can reschedule or cancel its record without searching the heap.

use tokio::time::Instant;

/// Stable handle to a record in an [`ExpirationHeap`].
///
/// A handle stays valid until its record is popped or the heap is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpirationId(usize);

// == Expiration Record ==
/// One scheduled expiration.
#[derive(Debug, Clone)]
pub struct ExpirationRecord<K> {
    /// Key of the entry this record expires
    pub key: K,
    /// Deadline at which the entry becomes due
    pub expires_at: Instant,
    /// Position in the heap array, kept current on every swap
    heap_index: usize,
    /// Canceled records are skipped when they surface at the root
    canceled: bool,
}

impl<K> ExpirationRecord<K> {
    /// Returns true once the record has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }
}

// == Expiration Heap ==
/// Binary min-heap over [`ExpirationRecord`]s with lazy cancellation.
///
/// Records live in an arena indexed by [`ExpirationId`]; the heap itself is an
/// array of arena indices. Canceling flips a flag in O(1) and the record is
/// discarded when it later reaches the root.
#[derive(Debug)]
pub struct ExpirationHeap<K> {
    records: Vec<Option<ExpirationRecord<K>>>,
    free: Vec<usize>,
    heap: Vec<usize>,
}

impl<K> Default for ExpirationHeap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ExpirationHeap<K> {
    // == Constructor ==
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            free: Vec::new(),
            heap: Vec::new(),
        }
    }

    // == Push ==
    /// Schedules `key` to expire at `expires_at`. O(log n).
    pub fn push(&mut self, key: K, expires_at: Instant) -> ExpirationId {
        let heap_index = self.heap.len();
        let record = ExpirationRecord {
            key,
            expires_at,
            heap_index,
            canceled: false,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.records[slot] = Some(record);
                slot
            }
            None => {
                self.records.push(Some(record));
                self.records.len() - 1
            }
        };

        self.heap.push(slot);
        self.sift_up(heap_index);
        ExpirationId(slot)
    }

    // == Peek ==
    /// Returns the record with the earliest deadline. It may be canceled.
    pub fn peek(&self) -> Option<(ExpirationId, &ExpirationRecord<K>)> {
        let slot = *self.heap.first()?;
        self.records[slot]
            .as_ref()
            .map(|record| (ExpirationId(slot), record))
    }

    // == Pop ==
    /// Removes and returns the root record, releasing its handle. O(log n).
    pub fn pop(&mut self) -> Option<(ExpirationId, ExpirationRecord<K>)> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let slot = self.heap.pop()?;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }

        let record = self.records[slot].take()?;
        self.free.push(slot);
        Some((ExpirationId(slot), record))
    }

    // == Reschedule ==
    /// Moves an existing record to a new deadline in place and restores heap order.
    pub fn reschedule(&mut self, id: ExpirationId, expires_at: Instant) {
        let Some(record) = self.record_mut(id) else {
            return;
        };
        record.expires_at = expires_at;
        let position = record.heap_index;
        self.fix(position);
    }

    // == Cancel ==
    /// Marks a record canceled. It stays in the heap until it reaches the root.
    pub fn cancel(&mut self, id: ExpirationId) {
        if let Some(record) = self.record_mut(id) {
            record.canceled = true;
        }
    }

    /// Looks up a record by handle.
    pub fn get(&self, id: ExpirationId) -> Option<&ExpirationRecord<K>> {
        self.records.get(id.0).and_then(Option::as_ref)
    }

    /// Number of records in the heap, canceled ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every record. All outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.records.clear();
        self.free.clear();
        self.heap.clear();
    }

    // == Internal Heap Maintenance ==
    fn record_mut(&mut self, id: ExpirationId) -> Option<&mut ExpirationRecord<K>> {
        self.records.get_mut(id.0).and_then(Option::as_mut)
    }

    fn deadline(&self, position: usize) -> Option<Instant> {
        let slot = *self.heap.get(position)?;
        self.records[slot].as_ref().map(|record| record.expires_at)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        match (self.deadline(a), self.deadline(b)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        for position in [a, b] {
            let slot = self.heap[position];
            if let Some(record) = self.records[slot].as_mut() {
                record.heap_index = position;
            }
        }
    }

    fn fix(&mut self, position: usize) {
        if !self.sift_up(position) {
            self.sift_down(position);
        }
    }

    /// Returns true if the element moved.
    fn sift_up(&mut self, mut position: usize) -> bool {
        let start = position;
        while position > 0 {
            let parent = (position - 1) / 2;
            if !self.less(position, parent) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
        position != start
    }

    fn sift_down(&mut self, mut position: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * position + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(smallest, position) {
                break;
            }
            self.swap(position, smallest);
            position = smallest;
        }
    }
}
