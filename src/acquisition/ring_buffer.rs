// src/acquisition/ring_buffer.rs
//! Fixed-capacity ring that overwrites its oldest entry when full

/// Bounded FIFO for one value object
///
/// Not synchronised on its own; [`crate::acquisition::ChannelBufferSet`] guards
/// every ring of a set with one lock.
#[derive(Debug, Clone)]
pub struct OverwritingRing<T> {
    buffer: Vec<Option<T>>,
    capacity: usize,
    head: usize,
    len: usize,
}

impl<T: Copy> OverwritingRing<T> {
    /// Create a ring; `capacity` must be non-zero
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            buffer: vec![None; capacity],
            capacity,
            head: 0,
            len: 0,
        })
    }

    /// Append an item; returns `true` if the oldest item was overwritten
    pub fn push(&mut self, item: T) -> bool {
        let tail = (self.head + self.len) % self.capacity;
        self.buffer[tail] = Some(item);
        if self.len == self.capacity {
            self.head = (self.head + 1) % self.capacity;
            true
        } else {
            self.len += 1;
            false
        }
    }

    /// Remove and return the oldest item
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.buffer[self.head].take();
        self.head = (self.head + 1) % self.capacity;
        self.len -= 1;
        item
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill level from 0.0 to 1.0
    pub fn utilization(&self) -> f32 {
        self.len as f32 / self.capacity as f32
    }

    /// Drop all items, keeping the capacity
    pub fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}
