use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use rayon::prelude::*;

use crate::audio::loader::AudioBackend;
use crate::component::host::ComponentHost;
use crate::component::{Component, Property, RenderContext};
use crate::config::{EncoderOptions, RenderConfig};
use crate::encode::command::{EncoderChoice, TranscoderInvocation};
use crate::encode::sink::{FrameSink, TranscoderSink};
use crate::encode::transcoder::{EncoderCatalog, Transcoder};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{FrameIndex, frame_count, samples_for_duration};
use crate::foundation::error::{AvError, AvResult};
use crate::render::compositor::Compositor;
use crate::render::frame::FrameRGBA;
use crate::render::progress::{RenderObserver, Reporter, percent_of};
use crate::render::statics::StaticCache;

/// Phase of the render state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderState {
    /// Not rendering.
    Idle,
    /// Probing or decoding the primary audio.
    DeterminingDuration,
    /// Running `pre_frame_render` and caching static layers.
    PreparingComponents,
    /// Folding adjacent static layers.
    FusingStatics,
    /// Collecting audio contributions and selecting encoders.
    BuildingCommand,
    /// Compositing frames into the sink.
    Streaming,
    /// Closing the sink and tearing components down.
    Finalizing,
    /// Cancellation observed; tearing down.
    Cancelling,
    /// A failure was observed; tearing down.
    Failed,
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::DeterminingDuration => "determining duration",
            Self::PreparingComponents => "preparing components",
            Self::FusingStatics => "fusing statics",
            Self::BuildingCommand => "building command",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
            Self::Cancelling => "cancelling",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Inputs of one render.
pub struct RenderJob {
    /// Primary audio file; its duration defines the video length.
    pub audio_path: PathBuf,
    /// Output file, removed on any outcome other than success.
    pub output_path: PathBuf,
    /// Component stack, bottom layer first.
    pub components: Vec<Box<dyn Component>>,
}

/// Summary of a successful render.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Primary audio duration in seconds.
    pub duration: f64,
    /// Frames delivered to the sink.
    pub frames: u64,
    /// Layers rendered once and cached.
    pub static_layers: usize,
    /// Static layers folded into a layer above them.
    pub fused_layers: usize,
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: FrameRGBA,
}

/// Parallel producer stop reason: `None` when the writer hung up first.
type Halt = Option<AvError>;

/// Drives one component stack from audio input to a finished video.
///
/// ```text
/// Idle -> DeterminingDuration -> PreparingComponents -> FusingStatics -> BuildingCommand
///      -> Streaming -> Finalizing -> Idle
/// ```
///
/// Any phase may divert to `Cancelling` or `Failed`; both still run `post_frame_render` for every
/// prepared component (top layer first) and remove the output file.
///
/// Each render observes its own [`CancelToken`]; a fresh one is armed whenever a render concludes,
/// so a cancelled pipeline can render again.
pub struct RenderPipeline {
    config: RenderConfig,
    encoder_options: EncoderOptions,
    audio: Arc<dyn AudioBackend>,
    reporter: Reporter,
    cancel: Mutex<CancelToken>,
    state: Arc<Mutex<RenderState>>,
}

impl RenderPipeline {
    /// Pipeline for `config`, decoding audio through `audio`.
    pub fn new(config: RenderConfig, audio: Arc<dyn AudioBackend>) -> AvResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            encoder_options: EncoderOptions::default(),
            audio,
            reporter: Reporter::null(),
            cancel: Mutex::new(CancelToken::new()),
            state: Arc::new(Mutex::new(RenderState::Idle)),
        })
    }

    /// Replace the built-in encoder options table.
    pub fn with_encoder_options(mut self, options: EncoderOptions) -> Self {
        self.encoder_options = options;
        self
    }

    /// Send progress, phase labels, errors and previews to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn RenderObserver>) -> Self {
        self.reporter = Reporter::new(observer);
        self
    }

    /// Render settings.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Token of the running render, or of the next one when idle.
    pub fn cancel_token(&self) -> CancelToken {
        match self.cancel.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Request cooperative cancellation of the running (or next) render.
    pub fn cancel(&self) {
        self.cancel_token().cancel();
    }

    /// Current state.
    pub fn state(&self) -> RenderState {
        read_state(&self.state)
    }

    /// Render into the external transcoder.
    ///
    /// The encoder listing is only queried once the stack is prepared, so a misconfigured stack
    /// fails without spawning the transcoder.
    pub fn export(&self, job: RenderJob, transcoder: Arc<Transcoder>) -> AvResult<RenderStats> {
        let cancel = self.cancel_token();
        let mut sink = TranscoderSink::new(transcoder.clone(), cancel.clone());
        let catalog = || transcoder.catalog().cloned();
        self.execute(job, &cancel, &catalog, &mut sink)
    }

    /// Render into `sink`, picking encoders from `catalog`.
    ///
    /// Returns `Err(AvError::Cancelled)` when cancelled. Outcomes are also reported through the
    /// observer: progress `100` plus "Export Complete" on success, otherwise progress `0` plus
    /// "Export Canceled" or "Export Failed" (after the error channel).
    pub fn run(
        &self,
        job: RenderJob,
        catalog: &EncoderCatalog,
        sink: &mut dyn FrameSink,
    ) -> AvResult<RenderStats> {
        let cancel = self.cancel_token();
        self.execute(job, &cancel, &|| Ok(catalog.clone()), sink)
    }

    fn execute(
        &self,
        job: RenderJob,
        cancel: &CancelToken,
        catalog: &dyn Fn() -> AvResult<EncoderCatalog>,
        sink: &mut dyn FrameSink,
    ) -> AvResult<RenderStats> {
        let RenderJob {
            audio_path,
            output_path,
            components,
        } = job;
        let mut hosts = ComponentHost::wrap_stack(components);
        tracing::info!(
            audio = %audio_path.display(),
            output = %output_path.display(),
            layers = hosts.len(),
            "starting render"
        );
        let result = self.render(&audio_path, &output_path, &mut hosts, cancel, catalog, sink);
        self.conclude(result, cancel, &output_path, hosts)
    }

    /// Run [`RenderPipeline::export`] on a dedicated `render` thread.
    pub fn spawn(self, job: RenderJob, transcoder: Arc<Transcoder>) -> AvResult<RenderHandle> {
        let cancel = self.cancel_token();
        let state = self.state.clone();
        let thread = std::thread::Builder::new()
            .name("render".to_owned())
            .spawn(move || self.export(job, transcoder))
            .map_err(|e| AvError::Other(anyhow::anyhow!("failed to spawn render thread: {e}")))?;
        Ok(RenderHandle {
            cancel,
            state,
            thread,
        })
    }

    /// Run [`RenderPipeline::run`] on a dedicated `render` thread.
    pub fn spawn_with_sink(
        self,
        job: RenderJob,
        catalog: EncoderCatalog,
        mut sink: Box<dyn FrameSink>,
    ) -> AvResult<RenderHandle> {
        let cancel = self.cancel_token();
        let state = self.state.clone();
        let thread = std::thread::Builder::new()
            .name("render".to_owned())
            .spawn(move || self.run(job, &catalog, sink.as_mut()))
            .map_err(|e| AvError::Other(anyhow::anyhow!("failed to spawn render thread: {e}")))?;
        Ok(RenderHandle {
            cancel,
            state,
            thread,
        })
    }

    fn render(
        &self,
        audio_path: &Path,
        output_path: &Path,
        hosts: &mut [ComponentHost],
        cancel: &CancelToken,
        catalog: &dyn Fn() -> AvResult<EncoderCatalog>,
        sink: &mut dyn FrameSink,
    ) -> AvResult<RenderStats> {
        let canvas = self.config.canvas();
        let window = self.config.sample_window()?;
        for host in hosts.iter() {
            check_configured(host)?;
        }
        for host in hosts.iter() {
            if let Some(flag) = host.cancel_flag() {
                cancel.link(flag);
            }
        }

        self.set_state(RenderState::DeterminingDuration);
        let mut needs_pcm = false;
        for host in hosts.iter() {
            needs_pcm |= host.has(Property::Pcm)?;
        }
        let (pcm, duration) = if needs_pcm {
            self.reporter.text("Loading audio file...");
            let decoded = self.audio.decode(audio_path, &self.reporter, cancel)?;
            (Some(decoded.samples), decoded.duration)
        } else {
            (None, self.audio.duration(audio_path)?)
        };
        cancel.check()?;
        let total = frame_count(samples_for_duration(duration), window);
        tracing::info!(duration, frames = total, window, "audio ready");

        self.set_state(RenderState::PreparingComponents);
        let ctx = RenderContext {
            audio_path: audio_path.to_path_buf(),
            pcm,
            sample_window: window,
            canvas,
            frame_rate: self.config.output_frame_rate,
            reporter: self.reporter.clone(),
            cancel: cancel.clone(),
        };
        let layers = hosts.len();
        let mut statics = StaticCache::new(layers);
        let mut composite = vec![false; layers];
        for (i, host) in hosts.iter_mut().enumerate() {
            cancel.check()?;
            self.reporter
                .text(&format!("Preparing {} ({}/{layers})", host.name(), i + 1));
            host.pre_frame_render(&ctx)?;
            check_configured(host)?;
            let props = host.properties()?;
            composite[i] = props.contains(Property::Composite);
            if props.contains(Property::Static) && !composite[i] {
                statics.insert(i, host.frame_render(FrameIndex(0), canvas)?)?;
            }
        }
        drop(ctx);

        self.set_state(RenderState::FusingStatics);
        let static_layers = statics.image_count();
        let fused_layers = statics.fuse()?;
        tracing::debug!(static_layers, fused_layers, "static layers cached");
        let compositor = Compositor::new(canvas, statics, composite);

        self.set_state(RenderState::BuildingCommand);
        let mut auxiliary = Vec::new();
        for host in hosts.iter().rev() {
            if host.has(Property::Audio)?
                && let Some(contribution) = host.audio()?
            {
                auxiliary.push(contribution);
            }
        }
        let catalog = catalog()?;
        let encoders = EncoderChoice::resolve(&self.config, &self.encoder_options, &catalog)?;
        let invocation = TranscoderInvocation::new(
            &self.config,
            encoders,
            duration,
            audio_path,
            auxiliary,
            output_path,
        );

        cancel.check()?;
        self.set_state(RenderState::Streaming);
        self.reporter.text("Exporting video...");
        sink.begin(&invocation)?;
        let streamed = if self.config.threading.parallel {
            self.stream_parallel(&compositor, hosts, cancel, total, sink)
        } else {
            self.stream_sequential(&compositor, hosts, cancel, total, sink)
        };

        self.set_state(RenderState::Finalizing);
        let frames = match streamed {
            Ok(frames) => {
                sink.end()?;
                frames
            }
            Err(e) => {
                sink.abort();
                return Err(e);
            }
        };
        Ok(RenderStats {
            duration,
            frames,
            static_layers,
            fused_layers,
        })
    }

    fn stream_sequential(
        &self,
        compositor: &Compositor,
        hosts: &[ComponentHost],
        cancel: &CancelToken,
        total: u64,
        sink: &mut dyn FrameSink,
    ) -> AvResult<u64> {
        for f in 0..total {
            cancel.check()?;
            let frame = compositor.composite(FrameIndex(f), hosts)?;
            deliver(sink, &self.reporter, FrameIndex(f), &frame, total)?;
        }
        Ok(total)
    }

    fn stream_parallel(
        &self,
        compositor: &Compositor,
        hosts: &[ComponentHost],
        cancel: &CancelToken,
        total: u64,
        sink: &mut dyn FrameSink,
    ) -> AvResult<u64> {
        let threading = &self.config.threading;
        let pool = build_thread_pool(threading.workers)?;
        let cap = threading.queue_capacity.max(1);
        tracing::debug!(workers = threading.workers, queue = cap, "parallel compositing");

        // The writer reassembles frames by index so the sink sees them strictly in order.
        std::thread::scope(|scope| -> AvResult<u64> {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let reporter = self.reporter.clone();
            let writer = std::thread::Builder::new()
                .name("frame-writer".to_owned())
                .spawn_scoped(scope, move || write_in_order(rx, sink, &reporter, total))
                .map_err(|e| {
                    AvError::Other(anyhow::anyhow!("failed to spawn frame writer: {e}"))
                })?;

            let mut produced: Result<(), Halt> = Ok(());
            let mut start = 0u64;
            while start < total && produced.is_ok() {
                let end = (start + cap as u64).min(total);
                produced = pool.install(|| {
                    (start..end).into_par_iter().try_for_each(|f| -> Result<(), Halt> {
                        cancel.check().map_err(Some)?;
                        let frame = compositor.composite(FrameIndex(f), hosts).map_err(Some)?;
                        tx.send(FrameMsg {
                            idx: FrameIndex(f),
                            frame,
                        })
                        .map_err(|_| None)
                    })
                });
                start = end;
            }
            drop(tx);

            let written = writer
                .join()
                .map_err(|_| AvError::Other(anyhow::anyhow!("frame writer thread panicked")))?;
            match (produced, written) {
                (Err(Some(e)), _) => Err(e),
                (_, Err(e)) => Err(e),
                (Err(None), Ok(n)) => Err(AvError::Other(anyhow::anyhow!(
                    "frame writer stopped after {n} of {total} frames"
                ))),
                (Ok(()), Ok(n)) => Ok(n),
            }
        })
    }

    fn conclude(
        &self,
        result: AvResult<RenderStats>,
        cancel: &CancelToken,
        output_path: &Path,
        mut hosts: Vec<ComponentHost>,
    ) -> AvResult<RenderStats> {
        let mut result = match result {
            Err(e) if !e.is_cancelled() && cancel.is_cancelled() => {
                tracing::debug!(error = %e, "failure observed after cancellation");
                Err(AvError::Cancelled)
            }
            other => other,
        };
        match &result {
            Ok(_) => self.set_state(RenderState::Finalizing),
            Err(e) if e.is_cancelled() => self.set_state(RenderState::Cancelling),
            Err(_) => self.set_state(RenderState::Failed),
        }
        for host in hosts.iter_mut().rev() {
            if let Err(failure) = host.post_frame_render()
                && result.is_ok()
            {
                result = Err(failure.into());
            }
        }

        match &result {
            Ok(stats) => {
                tracing::info!(frames = stats.frames, "export complete");
                self.reporter.finish(100, "Export Complete");
            }
            Err(e) if e.is_cancelled() => {
                remove_output(output_path);
                tracing::info!("export cancelled");
                self.reporter.finish(0, "Export Canceled");
            }
            Err(e) => {
                remove_output(output_path);
                let (summary, detail) = e.report();
                tracing::error!(%detail, "{summary}");
                self.reporter.error(&summary, &detail);
                self.reporter.finish(0, "Export Failed");
            }
        }
        self.rearm();
        self.set_state(RenderState::Idle);
        result
    }

    fn rearm(&self) {
        match self.cancel.lock() {
            Ok(mut token) => *token = CancelToken::new(),
            Err(poisoned) => *poisoned.into_inner() = CancelToken::new(),
        }
    }

    fn set_state(&self, next: RenderState) {
        if let Ok(mut state) = self.state.lock() {
            let prev = *state;
            if prev != next {
                tracing::debug!(from = %prev, to = %next, "render state");
            }
            *state = next;
        }
    }
}

/// Handle to a render running on its own thread.
pub struct RenderHandle {
    cancel: CancelToken,
    state: Arc<Mutex<RenderState>>,
    thread: JoinHandle<AvResult<RenderStats>>,
}

impl RenderHandle {
    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current pipeline state.
    pub fn state(&self) -> RenderState {
        read_state(&self.state)
    }

    /// `true` once the render thread has returned.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the render to finish.
    pub fn join(self) -> AvResult<RenderStats> {
        self.thread
            .join()
            .map_err(|_| AvError::Other(anyhow::anyhow!("render thread panicked")))?
    }
}

fn check_configured(host: &ComponentHost) -> AvResult<()> {
    if !host.has(Property::Error)? {
        return Ok(());
    }
    let msg = host.error_message()?;
    Err(AvError::configuration(
        format!("{}: {}", host.name(), msg.summary),
        msg.detail,
    ))
}

fn deliver(
    sink: &mut dyn FrameSink,
    reporter: &Reporter,
    idx: FrameIndex,
    frame: &FrameRGBA,
    total: u64,
) -> AvResult<()> {
    reporter.preview(idx, frame);
    sink.push_frame(idx, frame)?;
    reporter.progress(percent_of(idx.0 + 1, total));
    Ok(())
}

fn write_in_order(
    rx: Receiver<FrameMsg>,
    sink: &mut dyn FrameSink,
    reporter: &Reporter,
    total: u64,
) -> AvResult<u64> {
    let mut next = 0u64;
    let mut pending = HashMap::<u64, FrameRGBA>::new();
    while next < total {
        if let Some(frame) = pending.remove(&next) {
            deliver(sink, reporter, FrameIndex(next), &frame, total)?;
            next += 1;
            continue;
        }
        let msg = rx.recv().map_err(|_| {
            AvError::Other(anyhow::anyhow!(
                "frame stream closed before frame {next} of {total}"
            ))
        })?;
        pending.insert(msg.idx.0, msg.frame);
    }
    Ok(next)
}

fn build_thread_pool(workers: usize) -> AvResult<rayon::ThreadPool> {
    if workers == 0 {
        return Err(AvError::validation("threading workers must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("composite-{i}"))
        .build()
        .map_err(|e| AvError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

fn remove_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove output"),
    }
}

fn read_state(state: &Mutex<RenderState>) -> RenderState {
    state.lock().map_or(RenderState::Idle, |s| *s)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
