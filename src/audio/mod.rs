pub mod decode;
pub mod signal;

pub use decode::{decode_audio, AudioData};
pub use signal::AudioSignal;
