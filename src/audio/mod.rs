//! Primary-audio decoding and spectrum analysis.

/// Duration probing and PCM decoding through the transcoder.
pub mod loader;
/// Windowed FFT spectrum analysis with exponential smoothing.
pub mod spectrum;
