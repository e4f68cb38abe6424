use super::*;

#[test]
fn embedded_encoder_options_parse() {
    let opts: EncoderOptions = serde_json::from_str(DEFAULT_ENCODER_OPTIONS).unwrap();
    assert!(!opts.containers.is_empty());
    assert_eq!(opts, EncoderOptions::default());

    let mp4 = opts.container("mp4").unwrap();
    assert_eq!(mp4.format, "mp4");
    assert!(mp4.video_codecs.iter().any(|c| c == "H264"));
    assert_eq!(opts.video_candidates("h264").unwrap()[0], "libx264");
    assert_eq!(opts.audio_candidates("AAC").unwrap()[0], "aac");
}

#[test]
fn unknown_container_and_codec_are_rejected() {
    let opts = EncoderOptions::default();
    assert!(opts.container("AVI").is_err());
    assert!(opts.video_candidates("THEORA").is_err());
}

#[test]
fn config_uses_camel_case_option_names() {
    let cfg: RenderConfig = serde_json::from_str(
        r#"{
            "outputWidth": 1920,
            "outputHeight": 1080,
            "outputFrameRate": 30,
            "outputVideoBitrate": 4000,
            "outputPreset": "fast",
            "threading": { "parallel": true }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.output_width, 1920);
    assert_eq!(cfg.output_height, 1080);
    assert_eq!(cfg.output_video_bitrate, 4000);
    assert_eq!(cfg.output_preset, "fast");
    assert_eq!(cfg.output_container, "MP4");
    assert!(cfg.threading.parallel);
    assert_eq!(cfg.threading.workers, 3);
    assert_eq!(cfg.threading.queue_capacity, 20);
    cfg.validate().unwrap();
    assert_eq!(cfg.sample_window().unwrap(), 1470);
}

#[test]
fn validate_rejects_bad_values() {
    let mut cfg = RenderConfig {
        output_width: 0,
        ..RenderConfig::default()
    };
    assert!(cfg.validate().is_err());

    cfg.output_width = 1281;
    assert!(cfg.validate().is_err());

    cfg.output_width = 1280;
    cfg.output_frame_rate = 0;
    assert!(cfg.validate().is_err());

    cfg.output_frame_rate = 30;
    cfg.output_audio_bitrate = 0;
    assert!(cfg.validate().is_err());

    cfg.output_audio_bitrate = 192;
    cfg.validate().unwrap();
}
