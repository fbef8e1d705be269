use crate::error::{IngestError, Result};
use crate::normalizer::Normalizer;
use bytes::{Buf, BytesMut};
use tracing::trace;

/// Normalizes a byte stream that arrives in arbitrarily split chunks.
///
/// Bytes of a frame cut off at the end of one chunk are held back and
/// completed by the next one.
#[derive(Debug)]
pub struct SampleStream {
    normalizer: Normalizer,
    pending: BytesMut,
    samples_out: u64,
}

impl SampleStream {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            pending: BytesMut::new(),
            samples_out: 0,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Bytes held back waiting for the rest of their frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn samples_out(&self) -> u64 {
        self.samples_out
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<i32> {
        let mut samples = Vec::new();

        if self.pending.is_empty() {
            let remainder = self.normalizer.normalize_into(chunk, &mut samples);
            self.pending.extend_from_slice(&chunk[chunk.len() - remainder..]);
        } else {
            self.pending.extend_from_slice(chunk);
            let remainder = self.normalizer.normalize_into(&self.pending, &mut samples);
            let consumed = self.pending.len() - remainder;
            self.pending.advance(consumed);
        }

        trace!(
            samples = samples.len(),
            pending = self.pending.len(),
            "sample stream chunk"
        );
        self.samples_out += samples.len() as u64;
        samples
    }

    /// Ends the stream. Bytes still pending form an incomplete frame.
    pub fn finish(self) -> Result<u64> {
        if !self.pending.is_empty() {
            return Err(IngestError::TruncatedSample {
                salvaged: Vec::new(),
                remainder: self.pending.len(),
            });
        }
        Ok(self.samples_out)
    }
}
