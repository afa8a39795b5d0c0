// src/acquisition/receiver.rs
//! Background reception thread feeding a session

use crate::acquisition::buffer_set::PushOutcome;
use crate::acquisition::session::Session;
use crate::config::constants::receiver::THREAD_NAME;
use crate::error::GsvResult;
use crate::hal::traits::{TransportError, TransportReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counters collected by the reception thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames stored, including those that caused an overrun
    pub frames: u64,
    pub overruns: u64,
    pub errors: u64,
}

/// Handle to the reception thread; dropping it stops and joins the thread
#[derive(Debug)]
pub struct Receiver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<ReceiverStats>>,
}

impl Receiver {
    /// Start pulling frames from `transport` into `session`
    pub fn spawn<T>(session: Arc<Session>, mut transport: T) -> GsvResult<Self>
    where
        T: TransportReader + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let poll = Duration::from_millis(session.config().receiver.poll_timeout_ms);
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new().name(THREAD_NAME.to_string()).spawn(move || {
            let mut stats = ReceiverStats::default();
            while !stop_flag.load(Ordering::Acquire) {
                match transport.next_frame(poll) {
                    Ok(Some(frame)) => match session.ingest(&frame) {
                        Ok(PushOutcome::Stored) => stats.frames += 1,
                        Ok(PushOutcome::Overrun) => {
                            stats.frames += 1;
                            stats.overruns += 1;
                        }
                        Err(err) => {
                            stats.errors += 1;
                            debug!(error = %err, "Frame rejected");
                        }
                    },
                    Ok(None) => {}
                    Err(TransportError::Closed) => {
                        info!("Transport closed, reception stopped");
                        break;
                    }
                    Err(err) => {
                        stats.errors += 1;
                        warn!(error = %err, "Transport error");
                        session.record_error(&err.into());
                    }
                }
            }
            stats
        })?;

        info!(poll_ms = poll.as_millis() as u64, "Reception thread started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stop the thread and return its counters
    pub fn stop(mut self) -> ReceiverStats {
        self.shutdown()
    }

    fn shutdown(&mut self) -> ReceiverStats {
        self.stop.store(true, Ordering::Release);
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                warn!("Reception thread panicked");
                ReceiverStats::default()
            }
            None => ReceiverStats::default(),
        }
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::buffer_set::ObjectSelector;
    use crate::config::constants::protocol::DATATYP_INT16;
    use crate::config::SessionConfig;
    use crate::hal::mock::{ChannelTransport, MockDevice};
    use crate::hal::types::MeasurementFrame;

    #[test]
    fn test_receiver_feeds_session_until_closed() {
        let mut device = MockDevice::with_channels(1);
        device.data_type_code = DATATYP_INT16;
        let session = Arc::new(Session::open(SessionConfig::default(), &device).unwrap());

        let (tx, transport) = ChannelTransport::pair(16);
        let receiver = Receiver::spawn(Arc::clone(&session), transport).unwrap();

        for raw in [0x8001u16, 0x8002, 0x8003] {
            tx.send(MeasurementFrame::new(raw.to_be_bytes().to_vec())).unwrap();
        }
        tx.send(MeasurementFrame::new(vec![0x80])).unwrap();
        drop(tx);

        let batch = session
            .read_many_blocking(ObjectSelector::Object(0), 3, Duration::from_secs(2))
            .unwrap();
        assert!(batch.read_count >= 1);

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while receiver.is_running() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!receiver.is_running());
        let stats = receiver.stop();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.errors, 1);
    }
}
