mod audio_bytes;
pub mod audio_types;
pub mod error;
pub mod format;
pub mod metadata;
pub mod mp3;
pub mod normalizer;
pub mod options;
pub mod probe;
pub mod session;
pub mod stream;
pub mod test_utils;
pub mod wav;

pub use audio_types::{BitWidth, Endianness, InputFormat};
pub use error::{IngestError, Result};
pub use format::FormatDescriptor;
pub use metadata::{MetadataSnapshot, StreamHeader, StreamMetadata};
pub use normalizer::Normalizer;
pub use options::InputOptions;
pub use session::InputSession;
pub use stream::SampleStream;
