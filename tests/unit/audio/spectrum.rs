use super::*;

fn sine(len: usize, freq: f64, amp: f64) -> Vec<i16> {
    (0..len)
        .map(|n| (amp * (2.0 * PI * freq * n as f64 / 44_100.0).sin()) as i16)
        .collect()
}

fn run(samples: &[i16], window: usize) -> SpectrumSeries {
    analyze(
        samples,
        window,
        SpectrumSettings::default(),
        &Reporter::null(),
        &CancelToken::new(),
    )
    .expect("analyze")
}

#[test]
fn hann_matches_symmetric_definition() {
    assert!(hann(0).is_empty());
    assert_eq!(hann(1), [1.0]);
    let h = hann(5);
    let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
    for (a, b) in h.iter().zip(expected) {
        assert!((a - b).abs() < 1e-12, "{h:?}");
    }
}

#[test]
fn one_spectrum_per_window_keyed_by_offset() {
    let samples = sine(1470 * 3 + 100, 440.0, 8000.0);
    let series = run(&samples, 1470);
    assert_eq!(series.len(), 4);
    let keys: Vec<usize> = series.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, [0, 1470, 2940, 4410]);
    assert!(series.iter().all(|(_, s)| s.len() == SPECTRUM_BINS));
    assert_eq!(series.for_frame(FrameIndex(2)), series.at_offset(2940));
    assert_eq!(series.window(), 1470);
}

#[test]
fn short_final_window_is_clamped() {
    let samples = sine(1470 + 1, 440.0, 8000.0);
    let series = run(&samples, 1470);
    assert_eq!(series.len(), 2);
    assert!(series.at_offset(1470).is_some());
}

#[test]
fn analysis_is_deterministic() {
    let samples = sine(20_000, 1000.0, 12000.0);
    let a = run(&samples, 1470);
    let b = run(&samples, 1470);
    assert_eq!(a, b);
}

#[test]
fn silence_yields_zero_spectrum() {
    let series = run(&[0; 3000], 1470);
    assert!(series.iter().all(|(_, s)| s.iter().all(|v| *v == 0.0)));
}

#[test]
fn tone_peaks_near_its_bin() {
    // Bin width is 44100 / 2048 ~ 21.5 Hz; 2153 Hz lands on bin 100.
    let samples = sine(1470, 2153.3, 12000.0);
    let series = run(&samples, 1470);
    let spectrum = series.at_offset(0).expect("first spectrum");
    let peak = spectrum
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .expect("bins");
    assert!((99..=101).contains(&peak), "peak at {peak}");
}

#[test]
fn smoothing_uses_direction_specific_weights() {
    let settings = SpectrumSettings {
        alpha_down: 0.25,
        alpha_up: 0.5,
        scale: 1.0,
    };
    let mut y = vec![0.0, 10.0];
    smooth(&mut y, &[4.0, 2.0], settings);
    assert_eq!(y, [3.0, 6.0]);
}

#[test]
fn cancelled_token_stops_analysis() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = analyze(
        &[0; 5000],
        1470,
        SpectrumSettings::default(),
        &Reporter::null(),
        &cancel,
    )
    .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn zero_window_is_rejected() {
    let err = analyze(
        &[0; 10],
        0,
        SpectrumSettings::default(),
        &Reporter::null(),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, AvError::Validation(_)));
}
