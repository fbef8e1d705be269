use crate::audio_types::InputFormat;
use crate::error::{IngestError, Result};
use crate::format::FormatDescriptor;
use crate::metadata::{MetadataSnapshot, StreamHeader, StreamMetadata};
use crate::mp3::Mp3Scanner;
use crate::normalizer::Normalizer;
use crate::options::InputOptions;
use crate::probe::{self, ProbeReport};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::debug;

/// State owned by one input from probing until the last buffer.
///
/// The format descriptor is mutable only until [`begin_normalization`]
/// freezes it. Freezing happens under the same lock configuration takes, so
/// no reader ever sees a half-configured descriptor.
///
/// [`begin_normalization`]: InputSession::begin_normalization
#[derive(Debug, Default)]
pub struct InputSession {
    pending: Mutex<FormatDescriptor>,
    frozen: OnceLock<FormatDescriptor>,
    metadata: StreamMetadata,
    scanner: Mutex<Mp3Scanner>,
}

impl InputSession {
    pub fn new(options: &InputOptions) -> Result<Self> {
        Ok(Self::with_descriptor(options.to_descriptor()?))
    }

    pub fn with_descriptor(desc: FormatDescriptor) -> Self {
        Self {
            pending: Mutex::new(desc),
            ..Self::default()
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, FormatDescriptor> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutates the descriptor while the input is still being detected.
    ///
    /// The closure works on a copy that is only stored when it succeeds.
    pub fn configure<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut FormatDescriptor) -> Result<T>,
    {
        let mut pending = self.lock_pending();
        if self.frozen.get().is_some() {
            return Err(IngestError::IllegalStateTransition(
                "format descriptor is frozen once normalization has begun".to_string(),
            ));
        }
        let mut next = *pending;
        let out = f(&mut next)?;
        *pending = next;
        Ok(out)
    }

    pub fn set_detected_format(&self, kind: InputFormat) -> Result<()> {
        self.configure(|desc| desc.set_detected_format(kind))
    }

    pub fn set_bit_width(&self, bits: u8) -> Result<()> {
        self.configure(|desc| desc.set_bit_width(bits))
    }

    /// Sniffs the leading bytes of the input and fills the descriptor.
    pub fn probe(&self, header: &[u8]) -> Result<ProbeReport> {
        self.configure(|desc| probe::probe(header, desc))
    }

    /// The frozen descriptor, or a copy of the pending one during detection.
    pub fn descriptor(&self) -> FormatDescriptor {
        match self.frozen.get() {
            Some(desc) => *desc,
            None => *self.lock_pending(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Freezes the descriptor and stream header and returns a normalizer.
    ///
    /// Fails while the input format is still unknown. Later calls hand out
    /// normalizers for the same frozen descriptor.
    pub fn begin_normalization(&self) -> Result<Normalizer> {
        if let Some(desc) = self.frozen.get() {
            return Normalizer::new(*desc);
        }

        let pending = self.lock_pending();
        if let Some(desc) = self.frozen.get() {
            return Normalizer::new(*desc);
        }
        pending.ensure_ready()?;
        let desc = *self.frozen.get_or_init(|| *pending);
        self.metadata.freeze();
        drop(pending);

        debug!(
            format = ?desc.detected_format(),
            bits = desc.bit_width().bits(),
            channels = desc.channels(),
            signed = desc.is_signed(),
            endianness = ?desc.endianness(),
            byte_swap = desc.byte_swap(),
            "normalization started, format frozen"
        );
        Normalizer::new(desc)
    }

    fn ensure_compressed(&self) -> Result<()> {
        let format = self.descriptor().detected_format();
        if !format.is_compressed() {
            return Err(IngestError::IllegalStateTransition(format!(
                "stream metadata only applies to compressed input, format is {:?}",
                format
            )));
        }
        Ok(())
    }

    pub fn record_header(&self, header: StreamHeader) -> Result<()> {
        self.ensure_compressed()?;
        self.metadata.record_header(header)
    }

    pub fn increment_frame_count(&self) -> Result<u64> {
        self.ensure_compressed()?;
        Ok(self.metadata.increment_frame_count())
    }

    /// Scans MPEG frames, recording the first header and counting frames.
    ///
    /// Returns the number of bytes consumed; unconsumed trailing bytes hold
    /// a partial frame and should be passed again with the next buffer.
    pub fn inspect_mp3(&self, data: &[u8]) -> Result<usize> {
        let format = self.descriptor().detected_format();
        if format != InputFormat::CompressedMp3 {
            return Err(IngestError::IllegalStateTransition(format!(
                "cannot inspect MPEG frames of {:?} input",
                format
            )));
        }
        let mut scanner = self.scanner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(scanner.feed(data, &self.metadata))
    }

    pub fn current_metadata(&self) -> MetadataSnapshot {
        self.metadata.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{encode_samples, mpeg_frame, wav_bytes, MPEG1_L3_128K_44100};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wav_session_end_to_end() {
        let session = InputSession::new(&InputOptions::default()).unwrap();
        let pcm = [0x00, 0x80, 0xFF, 0x7F];
        let buf = wav_bytes(1, 2, 44_100, 16, &pcm);

        let report = session.probe(&buf).unwrap();
        let normalizer = session.begin_normalization().unwrap();

        let samples = normalizer.normalize(&buf[report.data_offset..]).unwrap();
        assert_eq!(samples, vec![-32768, 32767]);
        assert!(session.current_metadata().is_empty());
    }

    #[test]
    fn test_unknown_format_cannot_start() {
        let session = InputSession::new(&InputOptions::default()).unwrap();
        assert!(matches!(
            session.begin_normalization(),
            Err(IngestError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_frozen_descriptor_rejects_changes() {
        let session = InputSession::new(&InputOptions::raw_pcm()).unwrap();
        session.set_bit_width(24).unwrap();
        session.begin_normalization().unwrap();

        assert!(session.is_frozen());
        assert!(matches!(
            session.set_detected_format(InputFormat::CompressedMp3),
            Err(IngestError::IllegalStateTransition(_))
        ));
        assert!(matches!(
            session.set_bit_width(16),
            Err(IngestError::IllegalStateTransition(_))
        ));
        assert_eq!(session.descriptor().bit_width().bits(), 24);

        // a second start reuses the frozen descriptor
        let again = session.begin_normalization().unwrap();
        assert_eq!(again.format().bit_width().bits(), 24);
    }

    #[test]
    fn test_failed_configure_leaves_descriptor_untouched() {
        let session = InputSession::new(&InputOptions::raw_pcm()).unwrap();
        let result = session.configure(|desc| {
            desc.set_bit_width(8)?;
            desc.set_channels(0)
        });
        assert!(result.is_err());
        assert_eq!(session.descriptor().bit_width().bits(), 16);
    }

    #[test]
    fn test_metadata_rejected_for_raw_pcm() {
        let session = InputSession::new(&InputOptions::raw_pcm()).unwrap();
        let header = StreamHeader::new(2, 44_100, 128, 417);
        assert!(matches!(
            session.record_header(header),
            Err(IngestError::IllegalStateTransition(_))
        ));
        assert!(session.increment_frame_count().is_err());
        assert!(session.inspect_mp3(&[]).is_err());
        assert!(session.current_metadata().is_empty());
    }

    #[test]
    fn test_mp3_session_metadata() {
        let session = InputSession::default();
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend(mpeg_frame(MPEG1_L3_128K_44100));
        }

        session.probe(&data).unwrap();
        assert_eq!(session.inspect_mp3(&data).unwrap(), data.len());

        let header = StreamHeader::new(2, 44_100, 128, 417);
        assert!(matches!(
            session.record_header(header),
            Err(IngestError::IllegalStateTransition(_))
        ));

        let normalizer = session.begin_normalization().unwrap();
        // frames keep counting after the header froze
        assert_eq!(session.increment_frame_count().unwrap(), 5);

        let snapshot = session.current_metadata();
        assert_eq!(snapshot.total_frame_count, 5);
        assert_eq!(snapshot.bitrate_kbps, 128);
        assert_eq!(snapshot.channel_count, 2);

        // decoded PCM for the stream is 16-bit signed stereo
        let pcm = encode_samples(&[100, -100], normalizer.format());
        assert_eq!(normalizer.normalize(&pcm).unwrap(), vec![100, -100]);
    }

    #[test]
    fn test_mp3_frames_inspected_after_normalization_starts() {
        let session = InputSession::default();
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend(mpeg_frame(MPEG1_L3_128K_44100));
        }

        session.probe(&data).unwrap();
        session.begin_normalization().unwrap();

        assert_eq!(session.inspect_mp3(&data).unwrap(), data.len());
        assert_eq!(session.inspect_mp3(&data).unwrap(), data.len());

        let snapshot = session.current_metadata();
        assert_eq!(snapshot.total_frame_count, 8);
        assert_eq!(snapshot.channel_count, 2);
        assert_eq!(snapshot.sample_rate, 44_100);
        assert_eq!(snapshot.bitrate_kbps, 128);

        // callers still cannot replace the header once frozen
        assert!(matches!(
            session.record_header(StreamHeader::new(1, 22_050, 64, 208)),
            Err(IngestError::IllegalStateTransition(_))
        ));
    }

    #[test]
    fn test_concurrent_readers_see_frozen_descriptor() {
        let session = Arc::new(InputSession::new(&InputOptions::raw_pcm()).unwrap());
        session
            .configure(|desc| {
                desc.set_bit_width(24)?;
                desc.set_channels(1)
            })
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    let normalizer = session.begin_normalization().unwrap();
                    normalizer.normalize(&[0xFF, 0xFF, 0xFF]).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![-1]);
        }
    }
}
