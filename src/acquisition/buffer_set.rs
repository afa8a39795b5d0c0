// src/acquisition/buffer_set.rs
//! Per-object measuring-value buffers shared between the reception thread and readers

use crate::acquisition::ring_buffer::OverwritingRing;
use crate::config::constants::buffers::MAX_BUFFER_CAPACITY;
use crate::config::constants::protocol::VALOBJ_NUM_MAX;
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use crate::hal::types::{Sample, ValueErrorFlags};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of storing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Stored,
    /// Stored, but at least one buffer dropped its oldest value
    Overrun,
}

/// Which buffers a read or clear applies to (object indices are 0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSelector {
    All,
    Object(usize),
}

/// Which fill level to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillSelector {
    Object(usize),
    /// Smallest fill level of all buffers
    Min,
    /// Largest fill level of all buffers
    Max,
}

/// Values returned by a multi-value read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadBatch {
    /// Oldest first; interleaved frame by frame for [`ObjectSelector::All`]
    pub values: Vec<f64>,
    pub read_count: usize,
    /// Union of the error flags of every value read
    pub error_flags: ValueErrorFlags,
}

type Entry = (f64, ValueErrorFlags);

#[derive(Debug)]
struct Rings {
    rings: Vec<OverwritingRing<Entry>>,
    capacity: usize,
}

impl Rings {
    fn build(object_count: usize, capacity: usize) -> GsvResult<Self> {
        if object_count == 0 || object_count > VALOBJ_NUM_MAX {
            return Err(wrong_parameter(
                "build",
                format!("{} value objects, allowed 1..={}", object_count, VALOBJ_NUM_MAX),
            ));
        }
        if capacity > MAX_BUFFER_CAPACITY {
            return Err(wrong_parameter(
                "build",
                format!("capacity {} above maximum {}", capacity, MAX_BUFFER_CAPACITY),
            ));
        }
        let rings = (0..object_count)
            .map(|_| OverwritingRing::new(capacity))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| wrong_parameter("build", "buffer capacity must be non-zero".to_string()))?;
        Ok(Self { rings, capacity })
    }

    fn ring(&mut self, object: usize) -> GsvResult<&mut OverwritingRing<Entry>> {
        let count = self.rings.len();
        self.rings
            .get_mut(object)
            .ok_or_else(|| wrong_parameter("select", format!("object index {} of {}", object, count)))
    }

    fn min_len(&self) -> usize {
        self.rings.iter().map(OverwritingRing::len).min().unwrap_or(0)
    }

    fn max_len(&self) -> usize {
        self.rings.iter().map(OverwritingRing::len).max().unwrap_or(0)
    }

    fn check_read(&self, selector: ObjectSelector, max_count: usize) -> GsvResult<()> {
        if max_count == 0 {
            return Err(wrong_parameter("read_many", "count must be greater than zero".to_string()));
        }
        match selector {
            ObjectSelector::All if max_count % self.rings.len() != 0 => Err(wrong_parameter(
                "read_many",
                format!("count {} is not a multiple of {} objects", max_count, self.rings.len()),
            )),
            ObjectSelector::Object(object) if object >= self.rings.len() => Err(wrong_parameter(
                "read_many",
                format!("object index {} of {}", object, self.rings.len()),
            )),
            _ => Ok(()),
        }
    }

    fn has_data(&self, selector: ObjectSelector) -> bool {
        match selector {
            ObjectSelector::All => self.min_len() > 0,
            ObjectSelector::Object(object) => self.rings.get(object).map_or(false, |r| !r.is_empty()),
        }
    }

    /// Pop up to `max_count` values; bounds already checked
    fn drain(&mut self, selector: ObjectSelector, max_count: usize) -> ReadBatch {
        let mut batch = ReadBatch::default();
        match selector {
            ObjectSelector::All => {
                let frames = (max_count / self.rings.len()).min(self.min_len());
                batch.values.reserve(frames * self.rings.len());
                for _ in 0..frames {
                    for ring in &mut self.rings {
                        if let Some((value, flags)) = ring.pop() {
                            batch.values.push(value);
                            batch.error_flags |= flags;
                        }
                    }
                }
            }
            ObjectSelector::Object(object) => {
                let ring = &mut self.rings[object];
                let count = max_count.min(ring.len());
                batch.values.reserve(count);
                for _ in 0..count {
                    if let Some((value, flags)) = ring.pop() {
                        batch.values.push(value);
                        batch.error_flags |= flags;
                    }
                }
            }
        }
        batch.read_count = batch.values.len();
        batch
    }
}

fn wrong_parameter(operation: &str, message: String) -> GsvError {
    GsvError::new(ErrorKind::WrongParameter, error_context!("buffer_set", operation), message)
}

/// One bounded FIFO per value object, all of equal capacity
///
/// A single lock covers every buffer, so a reader never observes a frame that is
/// only partly stored.
#[derive(Debug)]
pub struct ChannelBufferSet {
    inner: Mutex<Rings>,
    available: Condvar,
    overruns: AtomicU64,
    frames_pushed: AtomicU64,
}

impl ChannelBufferSet {
    pub fn new(object_count: usize, capacity: usize) -> GsvResult<Self> {
        let rings = Rings::build(object_count, capacity)?;
        debug!(object_count, capacity, "Created channel buffers");
        Ok(Self {
            inner: Mutex::new(rings),
            available: Condvar::new(),
            overruns: AtomicU64::new(0),
            frames_pushed: AtomicU64::new(0),
        })
    }

    /// Store one decoded frame, sample `i` into buffer `i`
    pub fn push(&self, frame: &[Sample]) -> GsvResult<PushOutcome> {
        let mut inner = self.inner.lock();
        if frame.len() != inner.rings.len() {
            return Err(GsvError::new(
                ErrorKind::FrameSizeMismatch,
                error_context!("buffer_set", "push"),
                format!("frame with {} samples for {} objects", frame.len(), inner.rings.len()),
            ));
        }

        let mut overwritten = false;
        for (ring, sample) in inner.rings.iter_mut().zip(frame) {
            overwritten |= ring.push((sample.value, sample.error_flags));
        }
        self.frames_pushed.fetch_add(1, Ordering::Relaxed);

        let outcome = if overwritten {
            let total = self.overruns.fetch_add(1, Ordering::Relaxed) + 1;
            if total == 1 || total % 1000 == 0 {
                warn!(overruns = total, capacity = inner.capacity, "Buffer overrun, oldest values dropped");
            }
            PushOutcome::Overrun
        } else {
            PushOutcome::Stored
        };

        drop(inner);
        self.available.notify_all();
        Ok(outcome)
    }

    /// Pop the oldest value of one object
    pub fn read_one(&self, object: usize) -> GsvResult<Option<f64>> {
        let mut inner = self.inner.lock();
        Ok(inner.ring(object)?.pop().map(|(value, _)| value))
    }

    /// Pop up to `max_count` values without waiting
    ///
    /// A read that returns fewer values than requested is not an error; it means the
    /// selected buffer (the smallest one for `All`) ran empty.
    pub fn read_many(&self, selector: ObjectSelector, max_count: usize) -> GsvResult<ReadBatch> {
        let mut inner = self.inner.lock();
        inner.check_read(selector, max_count)?;
        Ok(inner.drain(selector, max_count))
    }

    /// Like [`read_many`](Self::read_many), but waits up to `timeout` for data
    pub fn read_many_blocking(
        &self,
        selector: ObjectSelector,
        max_count: usize,
        timeout: Duration,
    ) -> GsvResult<ReadBatch> {
        let deadline = Instant::now() + timeout;
        let mut inner: MutexGuard<'_, Rings> = self.inner.lock();
        inner.check_read(selector, max_count)?;

        while !inner.has_data(selector) {
            if self.available.wait_until(&mut inner, deadline).timed_out() {
                break;
            }
            // a rebuild may have shrunk the set while we waited
            inner.check_read(selector, max_count)?;
        }
        Ok(inner.drain(selector, max_count))
    }

    pub fn fill_level(&self, selector: FillSelector) -> GsvResult<usize> {
        let mut inner = self.inner.lock();
        match selector {
            FillSelector::Object(object) => Ok(inner.ring(object)?.len()),
            FillSelector::Min => Ok(inner.min_len()),
            FillSelector::Max => Ok(inner.max_len()),
        }
    }

    /// Empty the selected buffers, keeping their capacity
    pub fn clear(&self, selector: ObjectSelector) -> GsvResult<()> {
        let mut inner = self.inner.lock();
        match selector {
            ObjectSelector::All => inner.rings.iter_mut().for_each(OverwritingRing::clear),
            ObjectSelector::Object(object) => inner.ring(object)?.clear(),
        }
        Ok(())
    }

    /// Replace all buffers for a new object count; stored values are discarded
    pub fn rebuild(&self, object_count: usize) -> GsvResult<()> {
        let mut inner = self.inner.lock();
        let capacity = inner.capacity;
        *inner = Rings::build(object_count, capacity)?;
        debug!(object_count, capacity, "Rebuilt channel buffers");
        drop(inner);
        self.available.notify_all();
        Ok(())
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().rings.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of pushes that overwrote unread values
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(object_index, &value)| Sample {
                object_index,
                value,
                error_flags: ValueErrorFlags::NONE,
            })
            .collect()
    }

    #[test]
    fn test_invalid_construction() {
        assert_eq!(ChannelBufferSet::new(2, 0).unwrap_err().kind(), ErrorKind::WrongParameter);
        assert_eq!(ChannelBufferSet::new(0, 10).unwrap_err().kind(), ErrorKind::WrongParameter);
        assert_eq!(ChannelBufferSet::new(17, 10).unwrap_err().kind(), ErrorKind::WrongParameter);
    }

    #[test]
    fn test_push_wrong_length() {
        let set = ChannelBufferSet::new(2, 4).unwrap();
        let err = set.push(&frame(&[1.0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FrameSizeMismatch);
    }

    #[test]
    fn test_overrun_counted_once_per_push() {
        let set = ChannelBufferSet::new(3, 2).unwrap();
        assert_eq!(set.push(&frame(&[1.0, 2.0, 3.0])).unwrap(), PushOutcome::Stored);
        assert_eq!(set.push(&frame(&[4.0, 5.0, 6.0])).unwrap(), PushOutcome::Stored);
        assert_eq!(set.push(&frame(&[7.0, 8.0, 9.0])).unwrap(), PushOutcome::Overrun);
        assert_eq!(set.overruns(), 1);
        assert_eq!(set.fill_level(FillSelector::Max).unwrap(), 2);
        assert_eq!(set.read_one(0).unwrap(), Some(4.0));
    }

    #[test]
    fn test_read_one_empty() {
        let set = ChannelBufferSet::new(1, 4).unwrap();
        assert_eq!(set.read_one(0).unwrap(), None);
        assert_eq!(set.read_one(1).unwrap_err().kind(), ErrorKind::WrongParameter);
    }

    #[test]
    fn test_read_all_requires_multiple() {
        let set = ChannelBufferSet::new(3, 4).unwrap();
        assert!(set.read_many(ObjectSelector::All, 4).is_err());
        assert!(set.read_many(ObjectSelector::All, 0).is_err());
        assert!(set.read_many(ObjectSelector::Object(0), 0).is_err());
        assert_eq!(set.read_many(ObjectSelector::All, 6).unwrap().read_count, 0);
    }

    #[test]
    fn test_error_flags_are_merged() {
        let set = ChannelBufferSet::new(1, 4).unwrap();
        let mut sample = frame(&[1.0]);
        sample[0].error_flags = ValueErrorFlags::SENSOR_BROKEN;
        set.push(&sample).unwrap();
        set.push(&frame(&[2.0])).unwrap();
        let batch = set.read_many(ObjectSelector::Object(0), 10).unwrap();
        assert_eq!(batch.values, vec![1.0, 2.0]);
        assert_eq!(batch.error_flags, ValueErrorFlags::SENSOR_BROKEN);
    }

    #[test]
    fn test_clear_single_object() {
        let set = ChannelBufferSet::new(2, 4).unwrap();
        set.push(&frame(&[1.0, 2.0])).unwrap();
        set.clear(ObjectSelector::Object(1)).unwrap();
        assert_eq!(set.fill_level(FillSelector::Object(0)).unwrap(), 1);
        assert_eq!(set.fill_level(FillSelector::Object(1)).unwrap(), 0);
        assert_eq!(set.fill_level(FillSelector::Min).unwrap(), 0);
        assert_eq!(set.capacity(), 4);
    }

    #[test]
    fn test_rebuild_changes_object_count() {
        let set = ChannelBufferSet::new(2, 8).unwrap();
        set.push(&frame(&[1.0, 2.0])).unwrap();
        set.rebuild(4).unwrap();
        assert_eq!(set.object_count(), 4);
        assert_eq!(set.capacity(), 8);
        assert_eq!(set.fill_level(FillSelector::Max).unwrap(), 0);
    }

    #[test]
    fn test_blocking_read_times_out() {
        let set = ChannelBufferSet::new(1, 4).unwrap();
        let start = Instant::now();
        let batch = set
            .read_many_blocking(ObjectSelector::Object(0), 1, Duration::from_millis(20))
            .unwrap();
        assert_eq!(batch.read_count, 0);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
