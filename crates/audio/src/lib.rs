//! funkspruch-audio – Audio-Schicht des Sprachmoduls
//!
//! - Aufnahme und Wiedergabe via cpal in festen 20-ms-Frames
//! - Opus Encoding/Decoding in Puffer des Aufrufers
//! - Pegelmessung und ganzzahlige Misch-Arithmetik
//! - `AudioBackend`-Trait, damit die Sitzung ohne Hardware testbar ist

pub mod backend;
pub mod capture;
pub mod codec;
pub mod device;
pub mod error;
pub mod frame;
pub mod level;
pub mod mixer;
pub mod playback;

pub use backend::{ActiveStreams, AudioBackend, CpalBackend, FrameSink, FrameSource};
pub use codec::{OpusDecoder, OpusEncoder};
pub use device::{list_input_devices, list_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use frame::{
    MonoFrame, StereoFrame, FRAME_SAMPLES, SAMPLE_RATE, STEREO_FRAME_LAENGE, STILLE_MONO,
    STILLE_STEREO,
};
pub use level::spitzenpegel;
pub use mixer::{ausgabe_gain_q8, gain_to_q8, MixBuffer, MAKEUP_GAIN_Q8};
