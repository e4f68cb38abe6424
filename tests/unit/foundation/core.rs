use super::*;

#[test]
fn default_window_matches_thirty_fps() {
    assert_eq!(sample_window_for_fps(30).unwrap(), DEFAULT_SAMPLE_WINDOW);
    assert_eq!(sample_window_for_fps(60).unwrap(), 735);
    assert!(sample_window_for_fps(0).is_err());
}

#[test]
fn frame_count_drops_partial_window() {
    let samples = samples_for_duration(3.95);
    assert_eq!(samples, 174_195);
    assert_eq!(frame_count(samples, DEFAULT_SAMPLE_WINDOW), 118);
    assert_eq!(frame_count(1469, DEFAULT_SAMPLE_WINDOW), 0);
    assert_eq!(frame_count(1470, DEFAULT_SAMPLE_WINDOW), 1);
}

#[test]
fn frame_index_sample_offset() {
    assert_eq!(FrameIndex(0).sample_offset(1470), 0);
    assert_eq!(FrameIndex(3).sample_offset(1470), 4410);
}

#[test]
fn canvas_frame_bytes() {
    let c = Canvas {
        width: 1920,
        height: 1080,
    };
    assert_eq!(c.frame_bytes(), 1920 * 1080 * 4);
}
