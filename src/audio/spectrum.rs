use std::collections::BTreeMap;
use std::f64::consts::PI;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{AvError, AvResult};
use crate::render::progress::{Reporter, percent_of};

/// Zero-padded transform length.
pub const FFT_SIZE: usize = 2048;

/// Magnitude bins kept per spectrum (`[0, 1023)`).
pub const SPECTRUM_BINS: usize = 1023;

/// Smoothing and scaling parameters of [`analyze`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumSettings {
    /// Weight of the new value when a bin falls.
    pub alpha_down: f64,
    /// Weight of the new value when a bin rises.
    pub alpha_up: f64,
    /// Multiplier applied to `log10(magnitude)`.
    pub scale: f64,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            alpha_down: 0.08,
            alpha_up: 0.8,
            scale: 20.0,
        }
    }
}

/// Smoothed log-magnitude spectra keyed by sample offset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectrumSeries {
    window: usize,
    spectra: BTreeMap<usize, Vec<f32>>,
}

impl SpectrumSeries {
    /// Samples per analysis step.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of stored spectra.
    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    /// `true` when nothing was analyzed.
    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    /// Spectrum starting at sample `offset`.
    pub fn at_offset(&self, offset: usize) -> Option<&[f32]> {
        self.spectra.get(&offset).map(Vec::as_slice)
    }

    /// Spectrum for output frame `frame`.
    pub fn for_frame(&self, frame: FrameIndex) -> Option<&[f32]> {
        self.at_offset(frame.sample_offset(self.window))
    }

    /// Iterate `(offset, spectrum)` in ascending offset order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32])> {
        self.spectra.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

/// Compute one smoothed spectrum per `window` samples.
///
/// For each offset `i = 0, window, 2 * window, ...` below `samples.len()`, the slice
/// `samples[i..i + w]` (with `w` clamped for the final, shorter slice) is Hann-windowed,
/// zero-padded to [`FFT_SIZE`] and transformed. Bins `[0, 1023)` become `scale * log10(|X|)` with
/// non-finite values replaced by zero, then are exponentially smoothed against the previous
/// spectrum using `alpha_down` for falling bins and `alpha_up` for rising ones.
///
/// The result is a pure function of its inputs. `cancel` is polled once per step.
pub fn analyze(
    samples: &[i16],
    window: usize,
    settings: SpectrumSettings,
    reporter: &Reporter,
    cancel: &CancelToken,
) -> AvResult<SpectrumSeries> {
    if window == 0 {
        return Err(AvError::validation("spectrum window must be non-zero"));
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let full_hann = hann(window.min(FFT_SIZE));
    let mut buf = vec![Complex { re: 0.0, im: 0.0 }; FFT_SIZE];
    let mut prev: Option<Vec<f64>> = None;
    let mut spectra = BTreeMap::new();

    let total = samples.len() as u64;
    let mut offset = 0usize;
    while offset < samples.len() {
        cancel.check()?;

        let w = window.min(samples.len() - offset).min(FFT_SIZE);
        let short_hann;
        let coeffs = if w == full_hann.len() {
            &full_hann
        } else {
            short_hann = hann(w);
            &short_hann
        };
        for (slot, (s, c)) in buf
            .iter_mut()
            .zip(samples[offset..offset + w].iter().zip(coeffs))
        {
            *slot = Complex {
                re: f64::from(*s) * c,
                im: 0.0,
            };
        }
        for slot in &mut buf[w..] {
            *slot = Complex { re: 0.0, im: 0.0 };
        }
        fft.process(&mut buf);

        let mut y: Vec<f64> = buf[..SPECTRUM_BINS]
            .iter()
            .map(|c| {
                let v = settings.scale * c.norm().log10();
                if v.is_finite() { v } else { 0.0 }
            })
            .collect();
        if let Some(p) = &prev {
            smooth(&mut y, p, settings);
        }
        spectra.insert(offset, y.iter().map(|v| *v as f32).collect());
        prev = Some(y);

        reporter.progress(percent_of(offset as u64, total));
        offset += window;
    }

    tracing::debug!(spectra = spectra.len(), window, "analyzed spectrum");
    Ok(SpectrumSeries { window, spectra })
}

/// Symmetric Hann window of length `m` (`0.5 - 0.5 * cos(2 pi n / (m - 1))`).
pub fn hann(m: usize) -> Vec<f64> {
    match m {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (m - 1) as f64;
            (0..m)
                .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / denom).cos())
                .collect()
        }
    }
}

fn smooth(y: &mut [f64], prev: &[f64], settings: SpectrumSettings) {
    for (v, p) in y.iter_mut().zip(prev) {
        let a = if *v < *p {
            settings.alpha_down
        } else {
            settings.alpha_up
        };
        *v = *v * a + *p * (1.0 - a);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/spectrum.rs"]
mod tests;
