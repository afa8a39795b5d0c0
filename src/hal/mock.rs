// src/hal/mock.rs
//! In-memory device and transport for tests and demos

use crate::config::constants::protocol::{DATATYP_INT24, IN_CHAN_NO};
use crate::hal::frame_decoder::encode_frame;
use crate::hal::object_map::ObjectMap;
use crate::hal::traits::{CommitTarget, DeviceCommands, FilterCommitter, TransportError, TransportReader};
use crate::hal::types::{MeasurementFrame, ModeFlags};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use rand::Rng;
use std::time::Duration;

/// Filter commit as seen by the device
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub target: CommitTarget,
    pub type_code: u8,
    pub cut_ratios: [f64; 2],
    pub feed_forward: Vec<f64>,
    pub feedback: Vec<f64>,
}

/// Scriptable stand-in for a GSV-8
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub mapping_words: Option<Vec<u32>>,
    pub mode: ModeFlags,
    pub channels: u8,
    pub data_type_code: u32,
    pub scale_factors: Vec<f64>,
    /// When set, every commit is rejected with this device code
    pub reject_commits: Option<u8>,
    commits: Vec<CommitRecord>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::with_channels(IN_CHAN_NO)
    }
}

impl MockDevice {
    /// Device without mapping words, all channels normal values, Int24 frames
    pub fn with_channels(channels: u8) -> Self {
        Self {
            mapping_words: None,
            mode: ModeFlags::default(),
            channels,
            data_type_code: DATATYP_INT24,
            scale_factors: vec![1.0; channels as usize],
            reject_commits: None,
            commits: Vec::new(),
        }
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    /// Frame whose values are drawn uniformly from `-amplitude..=amplitude`
    pub fn random_frame<R: Rng>(map: &ObjectMap, amplitude: f64, rng: &mut R) -> MeasurementFrame {
        let values: Vec<f64> = (0..map.len()).map(|_| rng.gen_range(-amplitude..=amplitude)).collect();
        // value count always matches the map
        let payload = encode_frame(&values, map).unwrap_or_default();
        MeasurementFrame::new(payload)
    }
}

impl DeviceCommands for MockDevice {
    fn value_object_info(&self) -> Result<Option<Vec<u32>>, TransportError> {
        Ok(self.mapping_words.clone())
    }

    fn mode_flags(&self) -> Result<ModeFlags, TransportError> {
        Ok(self.mode)
    }

    fn channel_count(&self) -> Result<u8, TransportError> {
        Ok(self.channels)
    }

    fn data_type_code(&self) -> Result<u32, TransportError> {
        Ok(self.data_type_code)
    }

    fn scale_factors(&self) -> Result<Vec<f64>, TransportError> {
        Ok(self.scale_factors.clone())
    }
}

impl FilterCommitter for MockDevice {
    fn commit_filter(
        &mut self,
        target: CommitTarget,
        type_code: u8,
        cut_ratios: [f64; 2],
        feed_forward: &[f64],
        feedback: &[f64],
    ) -> Result<(), TransportError> {
        if let Some(code) = self.reject_commits {
            return Err(TransportError::Device(code));
        }
        self.commits.push(CommitRecord {
            target,
            type_code,
            cut_ratios,
            feed_forward: feed_forward.to_vec(),
            feedback: feedback.to_vec(),
        });
        Ok(())
    }
}

/// Transport fed through a crossbeam channel
pub struct ChannelTransport {
    rx: Receiver<MeasurementFrame>,
}

impl ChannelTransport {
    pub fn new(rx: Receiver<MeasurementFrame>) -> Self {
        Self { rx }
    }

    /// Bounded channel pair; dropping the sender closes the transport
    pub fn pair(capacity: usize) -> (Sender<MeasurementFrame>, Self) {
        let (tx, rx) = channel::bounded(capacity);
        (tx, Self::new(rx))
    }
}

impl TransportReader for ChannelTransport {
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<MeasurementFrame>, TransportError> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::object_map::resolve_object_map;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mock_resolves_map() {
        let device = MockDevice::with_channels(3);
        let map = resolve_object_map(&device).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.frame_len(), 9);
    }

    #[test]
    fn test_random_frame_length() {
        let device = MockDevice::with_channels(4);
        let map = resolve_object_map(&device).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let frame = MockDevice::random_frame(&map, 100.0, &mut rng);
        assert_eq!(frame.payload.len(), map.frame_len());
    }

    #[test]
    fn test_commit_recording_and_rejection() {
        let mut device = MockDevice::default();
        device
            .commit_filter(CommitTarget::Channel(2), 0x04, [0.1, 0.0], &[1.0; 5], &[0.0; 4])
            .unwrap();
        assert_eq!(device.commits().len(), 1);

        device.reject_commits = Some(0x70);
        let err = device
            .commit_filter(CommitTarget::AllChannels, 0x04, [0.1, 0.0], &[1.0; 5], &[0.0; 4])
            .unwrap_err();
        assert_eq!(err, TransportError::Device(0x70));
        assert_eq!(device.commits().len(), 1);
    }

    #[test]
    fn test_channel_transport_timeout_and_close() {
        let (tx, mut transport) = ChannelTransport::pair(4);
        assert_eq!(transport.next_frame(Duration::from_millis(1)).unwrap(), None);
        tx.send(MeasurementFrame::new(vec![1, 2])).unwrap();
        assert!(transport.next_frame(Duration::from_millis(10)).unwrap().is_some());
        drop(tx);
        assert_eq!(transport.next_frame(Duration::from_millis(1)), Err(TransportError::Closed));
    }
}
