//! Frame-Typen
//!
//! Ein Frame sind 20 ms Audio bei 48 kHz. Aufnahme ist mono, Wiedergabe
//! stereo (interleaved L/R). Beide sind feste Arrays, damit die
//! Echtzeit-Pfade nie allokieren.

pub use funkspruch_protocol::codec::{FRAME_SAMPLES, SAMPLE_RATE};

/// Kanaele der Wiedergabe
pub const STEREO_KANAELE: usize = 2;

/// Samples eines Stereo-Frames (interleaved)
pub const STEREO_FRAME_LAENGE: usize = FRAME_SAMPLES * STEREO_KANAELE;

/// 20 ms Mikrofon-Audio (mono, i16)
pub type MonoFrame = [i16; FRAME_SAMPLES];

/// 20 ms Wiedergabe-Audio (stereo interleaved, i16)
pub type StereoFrame = [i16; STEREO_FRAME_LAENGE];

/// Stiller Mono-Frame
pub const STILLE_MONO: MonoFrame = [0; FRAME_SAMPLES];

/// Stiller Stereo-Frame
pub const STILLE_STEREO: StereoFrame = [0; STEREO_FRAME_LAENGE];
