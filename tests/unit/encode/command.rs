use super::*;

fn args_of(inv: &TranscoderInvocation) -> Vec<String> {
    inv.to_args()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn choice(audio: &str) -> EncoderChoice {
    EncoderChoice {
        container_format: "mp4".to_owned(),
        video_encoder: "libx264".to_owned(),
        audio_encoder: audio.to_owned(),
    }
}

#[test]
fn argv_without_auxiliary_audio_is_bit_exact() {
    let cfg = RenderConfig::default();
    let inv = TranscoderInvocation::new(
        &cfg,
        choice("aac"),
        3.95,
        Path::new("song.ogg"),
        Vec::new(),
        Path::new("out.mp4"),
    );
    let expected = "-thread_queue_size 512 -y -f rawvideo -vcodec rawvideo -s 1280x720 \
                    -pix_fmt rgba -r 30 -t 4.050 -i - -an -t 4.050 -i song.ogg \
                    -map 0:v -map 1:a -vcodec libx264 -acodec aac -b:v 2500k -b:a 192k \
                    -pix_fmt yuv420p -preset medium -f mp4 -strict -2 out.mp4";
    assert_eq!(args_of(&inv).join(" "), expected);
    assert_eq!(inv.display_args(), expected);
    assert_eq!(inv.frame_bytes(), 1280 * 720 * 4);
}

#[test]
fn auxiliary_audio_adds_inputs_and_graph() {
    let cfg = RenderConfig::default();
    let aux = vec![AudioContribution {
        source: PathBuf::from("extra.wav"),
        filters: vec![("volume".to_owned(), "=0.5:replaygain_noclip=0".to_owned())],
    }];
    let inv = TranscoderInvocation::new(
        &cfg,
        choice("libmp3lame"),
        10.0,
        Path::new("song.ogg"),
        aux,
        Path::new("out.mp4"),
    );
    let args = args_of(&inv);

    let inputs: Vec<&str> = args
        .windows(2)
        .filter(|w| w[0] == "-i")
        .map(|w| w[1].as_str())
        .collect();
    assert_eq!(inputs, ["-", "song.ogg", "extra.wav"]);

    let aux_at = args.iter().position(|a| a == "extra.wav").expect("aux input");
    assert_eq!(args[aux_at - 3..aux_at - 1], ["-t", "9.950"]);

    let graph_at = args
        .iter()
        .position(|a| a == "-filter_complex")
        .expect("graph");
    assert!(args[graph_at + 1].ends_with("amix=inputs=2:duration=first [a]"));
    assert_eq!(args[graph_at + 2..graph_at + 6], ["-map", "0:v", "-map", "[a]"]);
    assert!(!args.iter().any(|a| a == "-strict"));
}

#[test]
fn resolve_picks_first_available_encoder() {
    let cfg = RenderConfig::default();
    let opts = EncoderOptions::default();
    let catalog = EncoderCatalog::from_names(["h264_nvenc", "aac"]);
    let chosen = EncoderChoice::resolve(&cfg, &opts, &catalog).expect("resolve");
    assert_eq!(chosen.container_format, "mp4");
    assert_eq!(chosen.video_encoder, "h264_nvenc");
    assert_eq!(chosen.audio_encoder, "aac");
}

#[test]
fn resolve_fails_when_no_encoder_matches() {
    let cfg = RenderConfig::default();
    let opts = EncoderOptions::default();
    let catalog = EncoderCatalog::from_names(["aac"]);
    let err = EncoderChoice::resolve(&cfg, &opts, &catalog).unwrap_err();
    assert!(matches!(err, AvError::NoCompatibleEncoder(_)), "{err}");
}

#[test]
fn resolve_rejects_codec_outside_container() {
    let cfg = RenderConfig {
        output_container: "WEBM".to_owned(),
        ..RenderConfig::default()
    };
    let opts = EncoderOptions::default();
    let catalog = EncoderCatalog::from_names(["libx264", "aac"]);
    let err = EncoderChoice::resolve(&cfg, &opts, &catalog).unwrap_err();
    assert!(matches!(err, AvError::Validation(_)), "{err}");
}
