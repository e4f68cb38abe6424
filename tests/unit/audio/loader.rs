use super::*;

const BANNER: &str = "\
Input #0, ogg, from 'test.ogg':
  Duration: 00:00:03.95, start: 0.000000, bitrate: 112 kb/s
  Stream #0:0: Audio: vorbis, 44100 Hz, stereo, fltp, 112 kb/s
At least one output file must be specified
";

#[test]
fn parse_duration_reads_first_token() {
    assert_eq!(parse_duration(BANNER), Some(3.95));
    assert_eq!(
        parse_duration("  Duration: 01:02:03.456, start: 0"),
        Some(3723.456)
    );
}

#[test]
fn parse_duration_rounds_to_milliseconds() {
    assert_eq!(parse_duration("Duration: 00:00:01.23456,"), Some(1.235));
}

#[test]
fn parse_duration_rejects_missing_or_unknown() {
    assert_eq!(parse_duration("no banner here"), None);
    assert_eq!(parse_duration("  Duration: N/A, bitrate: N/A"), None);
}

#[test]
fn from_samples_appends_one_second_of_silence() {
    let audio = DecodedAudio::from_samples(vec![7; 10], 0.0);
    assert_eq!(audio.samples.len(), 10 + PADDING_SAMPLES);
    assert_eq!(audio.source_samples(), 10);
    assert!(audio.samples[10..].iter().all(|s| *s == 0));
}

#[test]
fn append_s16le_carries_odd_bytes_across_chunks() {
    let mut samples = Vec::new();
    let mut carry = None;
    append_s16le(&mut samples, &[0x01, 0x00, 0xff], &mut carry);
    assert_eq!(samples, [1]);
    assert_eq!(carry, Some(0xff));
    append_s16le(&mut samples, &[0x7f, 0x00, 0x80], &mut carry);
    assert_eq!(samples, [1, 0x7fff, i16::MIN]);
    assert_eq!(carry, None);
}

#[test]
fn read_chunk_fills_until_eof() {
    let mut src: &[u8] = &[1, 2, 3, 4, 5];
    let mut buf = [0u8; 4];
    assert_eq!(read_chunk(&mut src, &mut buf).expect("read"), 4);
    assert_eq!(read_chunk(&mut src, &mut buf).expect("read"), 1);
    assert_eq!(read_chunk(&mut src, &mut buf).expect("read"), 0);
}
