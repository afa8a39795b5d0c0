// src/acquisition/session.rs
//! One open measuring session: object map, decoder, buffers and last error

use crate::acquisition::buffer_set::{ChannelBufferSet, FillSelector, ObjectSelector, PushOutcome, ReadBatch};
use crate::config::SessionConfig;
use crate::error::{GsvError, GsvResult, LastError, RecordLastError};
use crate::hal::frame_decoder::FrameDecoder;
use crate::hal::object_map::{resolve_object_map, ObjectMap};
use crate::hal::traits::DeviceCommands;
use crate::hal::types::MeasurementFrame;
use crate::processing::dfilter::FilterDesigner;
use parking_lot::RwLock;
use std::time::Duration;
use tracing::info;

/// Measuring session bound to one device
///
/// Shared between the reception thread, which calls [`ingest`](Self::ingest), and
/// any number of readers.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    decoder: RwLock<FrameDecoder>,
    buffers: ChannelBufferSet,
    last_error: LastError,
}

impl Session {
    /// Resolve the object map and create one buffer per value object
    pub fn open(config: SessionConfig, device: &dyn DeviceCommands) -> GsvResult<Self> {
        config.validate()?;
        let map = resolve_object_map(device)?;
        let buffers = ChannelBufferSet::new(map.len(), config.buffers.capacity)?;

        info!(
            objects = map.len(),
            data_type = ?map.data_type(),
            capacity = config.buffers.capacity,
            "Session opened"
        );

        Ok(Self {
            config,
            decoder: RwLock::new(FrameDecoder::new(map)),
            buffers,
            last_error: LastError::new(),
        })
    }

    /// Decode one frame and store it
    pub fn ingest(&self, frame: &MeasurementFrame) -> GsvResult<PushOutcome> {
        let result = self
            .decoder
            .read()
            .decode(&frame.payload, frame.status)
            .and_then(|samples| self.buffers.push(&samples));
        result.record_into(&self.last_error)
    }

    /// Re-read the object map after a mode or scale change
    ///
    /// Buffers are rebuilt only when the number of value objects changed.
    pub fn revalidate(&self, device: &dyn DeviceCommands) -> GsvResult<()> {
        let map = resolve_object_map(device).record_into(&self.last_error)?;
        let mut decoder = self.decoder.write();
        if map.len() != self.buffers.object_count() {
            self.buffers.rebuild(map.len()).record_into(&self.last_error)?;
            info!(objects = map.len(), "Object count changed, buffers rebuilt");
        }
        decoder.set_map(map);
        Ok(())
    }

    pub fn read_one(&self, object: usize) -> GsvResult<Option<f64>> {
        self.buffers.read_one(object).record_into(&self.last_error)
    }

    pub fn read_many(&self, selector: ObjectSelector, max_count: usize) -> GsvResult<ReadBatch> {
        self.buffers.read_many(selector, max_count).record_into(&self.last_error)
    }

    pub fn read_many_blocking(
        &self,
        selector: ObjectSelector,
        max_count: usize,
        timeout: Duration,
    ) -> GsvResult<ReadBatch> {
        self.buffers
            .read_many_blocking(selector, max_count, timeout)
            .record_into(&self.last_error)
    }

    pub fn fill_level(&self, selector: FillSelector) -> GsvResult<usize> {
        self.buffers.fill_level(selector).record_into(&self.last_error)
    }

    pub fn clear(&self, selector: ObjectSelector) -> GsvResult<()> {
        self.buffers.clear(selector).record_into(&self.last_error)
    }

    pub fn object_map(&self) -> ObjectMap {
        self.decoder.read().map().clone()
    }

    pub fn buffers(&self) -> &ChannelBufferSet {
        &self.buffers
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Filter designer using this session's safety thresholds and simulation defaults
    pub fn filter_designer(&self) -> FilterDesigner {
        FilterDesigner::from_config(&self.config)
    }

    pub fn record_error(&self, err: &GsvError) {
        self.last_error.record(err);
    }

    pub fn last_error(&self) -> Option<GsvError> {
        self.last_error.get()
    }

    pub fn last_error_code(&self) -> u32 {
        self.last_error.code()
    }

    pub fn last_error_text(&self) -> &'static str {
        self.last_error.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::error_codes::{ERR_FRAME_SIZE_HOST, ERR_OK};
    use crate::config::constants::protocol::DATATYP_INT16;
    use crate::hal::mock::MockDevice;

    fn device(channels: u8) -> MockDevice {
        let mut device = MockDevice::with_channels(channels);
        device.data_type_code = DATATYP_INT16;
        device
    }

    #[test]
    fn test_open_and_ingest() {
        let session = Session::open(SessionConfig::default(), &device(2)).unwrap();
        assert_eq!(session.buffers().object_count(), 2);

        let outcome = session.ingest(&MeasurementFrame::new(vec![0x80, 0x01, 0x7F, 0xFF])).unwrap();
        assert_eq!(outcome, PushOutcome::Stored);
        let batch = session.read_many(ObjectSelector::All, 2).unwrap();
        assert_eq!(batch.values, vec![1.0, -1.0]);
        assert_eq!(session.last_error_code(), ERR_OK);
    }

    #[test]
    fn test_ingest_failure_recorded() {
        let session = Session::open(SessionConfig::default(), &device(2)).unwrap();
        assert!(session.ingest(&MeasurementFrame::new(vec![0x80])).is_err());
        assert_eq!(session.last_error_code(), ERR_FRAME_SIZE_HOST);
    }

    #[test]
    fn test_revalidate_rebuilds_on_count_change() {
        let mut dev = device(2);
        let session = Session::open(SessionConfig::default(), &dev).unwrap();
        session.ingest(&MeasurementFrame::new(vec![0x80, 0, 0x80, 0])).unwrap();

        dev.scale_factors = vec![2.0, 2.0];
        session.revalidate(&dev).unwrap();
        assert_eq!(session.fill_level(FillSelector::Max).unwrap(), 1);

        dev.mode.transmit_max = true;
        dev.scale_factors = vec![1.0; 4];
        session.revalidate(&dev).unwrap();
        assert_eq!(session.buffers().object_count(), 4);
        assert_eq!(session.fill_level(FillSelector::Max).unwrap(), 0);
        assert_eq!(session.object_map().frame_len(), 8);
    }
}
