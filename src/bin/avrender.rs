use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "avrender", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a component stack over an audio file into a video (requires `ffmpeg`).
    Render(RenderArgs),
    /// List the encoders `ffmpeg` offers and the ones a config would pick.
    Encoders(EncodersArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Primary audio file.
    #[arg(long)]
    audio: PathBuf,

    /// Component stack JSON.
    #[arg(long)]
    stack: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Render config JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Encoder options JSON replacing the built-in table.
    #[arg(long)]
    encoder_options: Option<PathBuf>,

    /// Explicit transcoder binary.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Composite frames on a worker pool.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Worker threads (parallel mode only).
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Parser, Debug)]
struct EncodersArgs {
    /// Render config JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Explicit transcoder binary.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Encoders(args) => cmd_encoders(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<avrender::RenderConfig> {
    match path {
        Some(p) => Ok(avrender::RenderConfig::from_path(p)?),
        None => Ok(avrender::RenderConfig::default()),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_ref())?;
    if args.parallel {
        cfg.threading.parallel = true;
    }
    if let Some(workers) = args.workers {
        cfg.threading.workers = workers;
    }
    if args.ffmpeg.is_some() {
        cfg.transcoder_path = args.ffmpeg.clone();
    }

    let stack = avrender::StackFile::from_path(&args.stack)?;
    let transcoder = Arc::new(avrender::Transcoder::locate_with(
        cfg.transcoder_path.as_deref(),
    )?);
    tracing::info!(ffmpeg = %transcoder.binary().display(), "using transcoder");

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let mut pipeline = avrender::RenderPipeline::new(
        cfg,
        Arc::new(avrender::TranscoderAudio::new(transcoder.clone())),
    )?
    .with_observer(Arc::new(avrender::LogObserver));
    if let Some(p) = &args.encoder_options {
        pipeline = pipeline.with_encoder_options(avrender::EncoderOptions::from_path(p)?);
    }

    let job = avrender::RenderJob {
        audio_path: args.audio.clone(),
        output_path: args.out.clone(),
        components: stack.build(),
    };
    let stats = pipeline.spawn(job, transcoder)?.join()?;

    eprintln!(
        "wrote {} ({} frames, {} static layers)",
        args.out.display(),
        stats.frames,
        stats.static_layers
    );
    Ok(())
}

fn cmd_encoders(args: EncodersArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let path = args.ffmpeg.or(cfg.transcoder_path.clone());
    let transcoder = avrender::Transcoder::locate_with(path.as_deref())?;
    let catalog = transcoder.catalog()?;
    println!(
        "{} encoders available in {}",
        catalog.len(),
        transcoder.binary().display()
    );

    let options = avrender::EncoderOptions::default();
    match avrender::EncoderChoice::resolve(&cfg, &options, catalog) {
        Ok(choice) => println!(
            "{} / {} / {}: format={} video={} audio={}",
            cfg.output_container,
            cfg.output_video_codec,
            cfg.output_audio_codec,
            choice.container_format,
            choice.video_encoder,
            choice.audio_encoder
        ),
        Err(e) => println!("{}: {e}", cfg.output_container),
    }
    Ok(())
}
