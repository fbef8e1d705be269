use crate::error::{IngestError, Result};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Facts read from the first header of a compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamHeader {
    pub channel_count: u8,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
    pub frame_size_bytes: u32,
    pub samples_per_frame: u32,
}

impl StreamHeader {
    pub fn new(channel_count: u8, sample_rate: u32, bitrate_kbps: u32, frame_size_bytes: u32) -> Self {
        Self {
            channel_count,
            sample_rate,
            bitrate_kbps,
            frame_size_bytes,
            samples_per_frame: 0,
        }
    }

    pub fn with_samples_per_frame(mut self, samples_per_frame: u32) -> Self {
        self.samples_per_frame = samples_per_frame;
        self
    }
}

/// Immutable copy of everything known about a compressed input.
///
/// All fields are zero until a header is recorded; raw PCM sessions keep the
/// default value for their whole lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetadataSnapshot {
    pub channel_count: u8,
    pub sample_rate: u32,
    pub total_frame_count: u64,
    pub bitrate_kbps: u32,
    pub frame_size_bytes: u32,
    pub samples_per_frame: u32,
}

impl MetadataSnapshot {
    pub fn is_empty(&self) -> bool {
        self.channel_count == 0
    }

    /// Decoded samples per channel covered by the frames counted so far.
    pub fn total_samples(&self) -> u64 {
        self.total_frame_count * self.samples_per_frame as u64
    }

    pub fn duration(&self) -> Option<Duration> {
        if self.sample_rate == 0 || self.samples_per_frame == 0 {
            return None;
        }
        let micros = self.total_samples() * 1_000_000 / self.sample_rate as u64;
        Some(Duration::from_micros(micros))
    }
}

#[derive(Debug, Default)]
struct MetadataState {
    header: Option<StreamHeader>,
    frames: u64,
    variable_bitrate: bool,
    frozen: bool,
}

impl MetadataState {
    fn snapshot(&self) -> MetadataSnapshot {
        let mut snapshot = MetadataSnapshot {
            total_frame_count: self.frames,
            ..MetadataSnapshot::default()
        };
        if let Some(header) = self.header {
            snapshot.channel_count = header.channel_count;
            snapshot.sample_rate = header.sample_rate;
            snapshot.bitrate_kbps = if self.variable_bitrate { 0 } else { header.bitrate_kbps };
            snapshot.frame_size_bytes = header.frame_size_bytes;
            snapshot.samples_per_frame = header.samples_per_frame;
        }
        snapshot
    }
}

/// Accumulates compressed-stream facts behind a single lock so readers
/// always copy out a consistent [`MetadataSnapshot`].
#[derive(Debug, Default)]
pub struct StreamMetadata {
    state: RwLock<MetadataState>,
}

impl StreamMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_header(&self, header: StreamHeader) -> Result<()> {
        if header.channel_count == 0 {
            return Err(IngestError::InvalidConfiguration(
                "stream header channel count must be greater than 0".to_string(),
            ));
        }
        if header.sample_rate == 0 {
            return Err(IngestError::InvalidConfiguration(
                "stream header sample rate must be greater than 0".to_string(),
            ));
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.frozen {
            return Err(IngestError::IllegalStateTransition(
                "stream metadata is frozen once normalization has begun".to_string(),
            ));
        }
        if state.header.is_some() {
            return Err(IngestError::IllegalStateTransition(
                "stream header already recorded for this session".to_string(),
            ));
        }

        debug!(
            channels = header.channel_count,
            sample_rate = header.sample_rate,
            bitrate_kbps = header.bitrate_kbps,
            frame_size = header.frame_size_bytes,
            "recorded compressed stream header"
        );
        state.header = Some(header);
        Ok(())
    }

    /// Stores the first header parsed out of the stream itself.
    ///
    /// Still applies after [`freeze`](Self::freeze); an existing header is
    /// never replaced. Returns whether `header` was stored.
    pub(crate) fn observe_header(&self, header: StreamHeader) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.header.is_some() {
            return false;
        }
        debug!(
            channels = header.channel_count,
            sample_rate = header.sample_rate,
            bitrate_kbps = header.bitrate_kbps,
            frozen = state.frozen,
            "parsed compressed stream header"
        );
        state.header = Some(header);
        true
    }

    /// Counts one parsed frame and returns the new total.
    pub fn increment_frame_count(&self) -> u64 {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.frames += 1;
        state.frames
    }

    /// Reports the bitrate as variable (0) from now on.
    pub fn mark_variable_bitrate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.variable_bitrate {
            debug!("stream bitrate is variable");
            state.variable_bitrate = true;
        }
    }

    pub fn freeze(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).frozen
    }

    pub fn has_header(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .header
            .is_some()
    }

    pub fn current(&self) -> MetadataSnapshot {
        self.state.read().unwrap_or_else(PoisonError::into_inner).snapshot()
    }
}
