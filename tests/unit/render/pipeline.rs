use super::*;
use crate::audio::loader::DecodedAudio;
use crate::component::Properties;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Canvas;

struct Silence(f64);

impl AudioBackend for Silence {
    fn duration(&self, _path: &Path) -> AvResult<f64> {
        Ok(self.0)
    }

    fn decode(&self, _path: &Path, _r: &Reporter, _c: &CancelToken) -> AvResult<DecodedAudio> {
        let n = samples_for_duration(self.0);
        Ok(DecodedAudio::from_samples(vec![0; n], self.0))
    }
}

struct Stripe;

impl Component for Stripe {
    fn name(&self) -> &str {
        "Stripe"
    }

    fn properties(&self) -> anyhow::Result<Properties> {
        Ok(Properties::empty())
    }

    fn frame_render(&self, frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        Ok(FrameRGBA::solid(4, 2, [frame.0 as u8, 0, 0, 255]))
    }
}

fn config(parallel: bool) -> RenderConfig {
    let mut cfg = RenderConfig {
        output_width: 4,
        output_height: 2,
        ..RenderConfig::default()
    };
    cfg.threading.parallel = parallel;
    cfg.threading.workers = 2;
    cfg.threading.queue_capacity = 3;
    cfg
}

fn catalog() -> EncoderCatalog {
    EncoderCatalog::from_names(["libx264", "aac"])
}

fn job(components: Vec<Box<dyn Component>>) -> RenderJob {
    RenderJob {
        audio_path: "song.ogg".into(),
        output_path: std::env::temp_dir().join("avrender-unit-never-written.mp4"),
        components,
    }
}

#[test]
fn state_labels_are_lowercase() {
    assert_eq!(RenderState::DeterminingDuration.to_string(), "determining duration");
    assert_eq!(RenderState::Idle.to_string(), "idle");
}

#[test]
fn thread_pool_rejects_zero_workers() {
    assert!(build_thread_pool(0).is_err());
    assert_eq!(build_thread_pool(2).expect("pool").current_num_threads(), 2);
}

#[test]
fn writer_restores_frame_order() {
    let (tx, rx) = mpsc::sync_channel(8);
    for i in [2u64, 0, 3, 1] {
        tx.send(FrameMsg {
            idx: FrameIndex(i),
            frame: FrameRGBA::solid(1, 1, [i as u8, 0, 0, 255]),
        })
        .expect("send");
    }
    drop(tx);

    let mut sink = InMemorySink::new();
    let written = write_in_order(rx, &mut sink, &Reporter::null(), 4).expect("write");
    assert_eq!(written, 4);
    let order: Vec<u8> = sink.frames().iter().map(|(_, f)| f.pixel(0, 0)[0]).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
}

#[test]
fn writer_fails_when_stream_ends_early() {
    let (tx, rx) = mpsc::sync_channel(2);
    tx.send(FrameMsg {
        idx: FrameIndex(1),
        frame: FrameRGBA::solid(1, 1, [0; 4]),
    })
    .expect("send");
    drop(tx);

    let mut sink = InMemorySink::new();
    assert!(write_in_order(rx, &mut sink, &Reporter::null(), 2).is_err());
    assert!(sink.frames().is_empty());
}

#[test]
fn run_streams_every_frame_and_returns_idle() {
    let pipeline = RenderPipeline::new(config(false), Arc::new(Silence(1.0))).expect("pipeline");
    let mut sink = InMemorySink::new();
    let stats = pipeline
        .run(job(vec![Box::new(Stripe)]), &catalog(), &mut sink)
        .expect("run");

    assert_eq!(stats.frames, 30);
    assert_eq!(sink.frames().len(), 30);
    assert!(sink.ended());
    assert_eq!(pipeline.state(), RenderState::Idle);
    let canvas = Canvas {
        width: 4,
        height: 2,
    };
    assert_eq!(sink.invocation().expect("begin").frame_bytes(), canvas.frame_bytes());
}

#[test]
fn parallel_run_matches_sequential() {
    let mut seq = InMemorySink::new();
    RenderPipeline::new(config(false), Arc::new(Silence(0.5)))
        .expect("pipeline")
        .run(job(vec![Box::new(Stripe)]), &catalog(), &mut seq)
        .expect("sequential");

    let mut par = InMemorySink::new();
    RenderPipeline::new(config(true), Arc::new(Silence(0.5)))
        .expect("pipeline")
        .run(job(vec![Box::new(Stripe)]), &catalog(), &mut par)
        .expect("parallel");

    assert_eq!(seq.frames(), par.frames());
    for (i, (idx, _)) in par.frames().iter().enumerate() {
        assert_eq!(idx.0, i as u64);
    }
}

#[test]
fn missing_encoder_fails_before_streaming() {
    let pipeline = RenderPipeline::new(config(false), Arc::new(Silence(1.0))).expect("pipeline");
    let mut sink = InMemorySink::new();
    let err = pipeline
        .run(
            job(vec![Box::new(Stripe)]),
            &EncoderCatalog::from_names(["aac"]),
            &mut sink,
        )
        .unwrap_err();
    assert!(matches!(err, AvError::NoCompatibleEncoder(_)), "{err}");
    assert!(sink.invocation().is_none());
}
