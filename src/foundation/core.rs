use crate::foundation::error::{AvError, AvResult};

/// Internal PCM sample rate used by the loader, the analyzer and the frame loop.
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples per output frame at the default 30 fps.
pub const DEFAULT_SAMPLE_WINDOW: usize = 1470;

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// First audio sample covered by this frame.
    pub fn sample_offset(self, window: usize) -> usize {
        (self.0 as usize).saturating_mul(window)
    }
}

/// Output raster dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Byte length of one tightly packed RGBA8 frame.
    pub fn frame_bytes(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Number of PCM samples rendered into one frame at `fps`.
pub fn sample_window_for_fps(fps: u32) -> AvResult<usize> {
    if fps == 0 || fps > SAMPLE_RATE {
        return Err(AvError::validation(format!(
            "frame rate {fps} is out of range (1..={SAMPLE_RATE})"
        )));
    }
    Ok((SAMPLE_RATE / fps) as usize)
}

/// Number of samples spanned by `duration_secs` of audio.
pub fn samples_for_duration(duration_secs: f64) -> usize {
    (duration_secs.max(0.0) * f64::from(SAMPLE_RATE)).round() as usize
}

/// Number of whole frames that fit in `audio_samples` (the trailing partial window is dropped).
pub fn frame_count(audio_samples: usize, window: usize) -> u64 {
    if window == 0 {
        return 0;
    }
    (audio_samples / window) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
