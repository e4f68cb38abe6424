use std::io::{self, Read};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use crate::encode::transcoder::Transcoder;
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::SAMPLE_RATE;
use crate::foundation::error::{AvError, AvResult};
use crate::render::progress::{Reporter, percent_of};

/// Silence appended after the decoded samples so trailing analysis windows are defined.
pub const PADDING_SAMPLES: usize = SAMPLE_RATE as usize;

/// Two seconds of mono s16le audio.
const CHUNK_BYTES: usize = SAMPLE_RATE as usize * 2 * 2;

/// Decoded mono 16-bit PCM at [`SAMPLE_RATE`].
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    /// Samples followed by [`PADDING_SAMPLES`] of silence.
    pub samples: Arc<Vec<i16>>,
    /// Duration of the source in seconds, millisecond precision.
    pub duration: f64,
}

impl DecodedAudio {
    /// Wrap already decoded samples, appending the trailing silence.
    pub fn from_samples(mut samples: Vec<i16>, duration: f64) -> Self {
        samples.resize(samples.len() + PADDING_SAMPLES, 0);
        Self {
            samples: Arc::new(samples),
            duration,
        }
    }

    /// Number of samples that came from the source (padding excluded).
    pub fn source_samples(&self) -> usize {
        self.samples.len().saturating_sub(PADDING_SAMPLES)
    }
}

/// Source of primary-audio duration and PCM.
pub trait AudioBackend: Send + Sync {
    /// Duration of `path` in seconds.
    fn duration(&self, path: &Path) -> AvResult<f64>;

    /// Decode `path` to mono s16 PCM at 44.1 kHz.
    ///
    /// Emits percentages through `reporter` and polls `cancel` between chunks.
    fn decode(
        &self,
        path: &Path,
        reporter: &Reporter,
        cancel: &CancelToken,
    ) -> AvResult<DecodedAudio>;
}

/// [`AudioBackend`] driving the external transcoder.
#[derive(Clone, Debug)]
pub struct TranscoderAudio {
    transcoder: Arc<Transcoder>,
}

impl TranscoderAudio {
    /// Decode through `transcoder`.
    pub fn new(transcoder: Arc<Transcoder>) -> Self {
        Self { transcoder }
    }
}

impl AudioBackend for TranscoderAudio {
    fn duration(&self, path: &Path) -> AvResult<f64> {
        // With no output given the transcoder prints the input banner and exits non-zero.
        let out = self
            .transcoder
            .command()
            .arg("-i")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                AvError::audio_decode(format!("failed to probe '{}': {e}", path.display()))
            })?;
        let banner = String::from_utf8_lossy(&out.stderr);
        parse_duration(&banner).ok_or_else(|| {
            AvError::audio_decode(format!("no duration found for '{}'", path.display()))
        })
    }

    fn decode(
        &self,
        path: &Path,
        reporter: &Reporter,
        cancel: &CancelToken,
    ) -> AvResult<DecodedAudio> {
        let duration = self.duration(path)?;
        cancel.check()?;

        let rate = SAMPLE_RATE.to_string();
        let mut child = self
            .transcoder
            .command()
            .arg("-i")
            .arg(path)
            .args(["-f", "s16le", "-acodec", "pcm_s16le"])
            .args(["-ar", rate.as_str(), "-ac", "1", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AvError::audio_decode(format!("failed to start decoder: {e}")))?;
        let Some(mut stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AvError::audio_decode("decoder stdout unavailable"));
        };

        let expected = (duration * f64::from(SAMPLE_RATE)).ceil() as usize;
        let mut samples: Vec<i16> = Vec::with_capacity(expected + PADDING_SAMPLES);
        let mut chunk = vec![0u8; CHUNK_BYTES];
        let mut carry: Option<u8> = None;
        loop {
            if cancel.is_cancelled() {
                tracing::debug!(path = %path.display(), "audio decode cancelled");
                let _ = child.kill();
                let _ = child.wait();
                return Err(AvError::Cancelled);
            }
            let n = match read_chunk(&mut stdout, &mut chunk) {
                Ok(n) => n,
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AvError::audio_decode(format!("failed to read PCM: {e}")));
                }
            };
            if n == 0 {
                break;
            }
            append_s16le(&mut samples, &chunk[..n], &mut carry);
            if duration > 0.0 {
                let millis = samples.len() as u64 * 1000 / u64::from(SAMPLE_RATE);
                reporter.progress(percent_of(millis, (duration * 1000.0) as u64));
            }
        }
        let status = child
            .wait()
            .map_err(|e| AvError::audio_decode(format!("failed to wait for decoder: {e}")))?;
        if samples.is_empty() {
            return Err(AvError::audio_decode(format!(
                "decoder produced no samples for '{}' ({status})",
                path.display()
            )));
        }
        if !status.success() {
            tracing::warn!(
                %status,
                path = %path.display(),
                "decoder exited with an error; using partial audio"
            );
        }
        tracing::debug!(samples = samples.len(), duration, "decoded audio");
        Ok(DecodedAudio::from_samples(samples, duration))
    }
}

/// Parse the first `Duration: HH:MM:SS.ss` token of a transcoder banner.
pub fn parse_duration(banner: &str) -> Option<f64> {
    let start = banner.find("Duration:")? + "Duration:".len();
    let token = banner[start..]
        .split(|c: char| c == ',' || c.is_whitespace())
        .find(|t| !t.is_empty())?;
    let mut parts = token.split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let secs = h * 3600.0 + m * 60.0 + s;
    Some((secs * 1000.0).round() / 1000.0)
}

fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn append_s16le(samples: &mut Vec<i16>, bytes: &[u8], carry: &mut Option<u8>) {
    let mut bytes = bytes;
    if let Some(lo) = carry.take() {
        let Some((&hi, rest)) = bytes.split_first() else {
            *carry = Some(lo);
            return;
        };
        samples.push(i16::from_le_bytes([lo, hi]));
        bytes = rest;
    }
    let mut pairs = bytes.chunks_exact(2);
    samples.extend(pairs.by_ref().map(|p| i16::from_le_bytes([p[0], p[1]])));
    *carry = pairs.remainder().first().copied();
}

#[cfg(test)]
#[path = "../../tests/unit/audio/loader.rs"]
mod tests;
