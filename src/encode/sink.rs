use std::io;
use std::sync::Arc;

use crate::encode::command::TranscoderInvocation;
use crate::encode::transcoder::{Transcoder, TranscoderProcess};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{AvError, AvResult};
use crate::render::frame::FrameRGBA;

/// Sink contract for consuming rendered frames in output order.
///
/// Ordering contract: `push_frame` is called with frame indices `0, 1, 2, ...` without gaps.
/// Exactly one of `end` or `abort` follows a successful `begin`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, invocation: &TranscoderInvocation) -> AvResult<()>;
    /// Push the next frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> AvResult<()>;
    /// Called once after the last frame on success. Flushes and waits for the output.
    fn end(&mut self) -> AvResult<()>;
    /// Called instead of `end` on cancellation or failure. Must not block indefinitely.
    fn abort(&mut self);
}

/// Sink streaming raw RGBA frames into a transcoder process.
pub struct TranscoderSink {
    transcoder: Arc<Transcoder>,
    cancel: CancelToken,
    process: Option<TranscoderProcess>,
    frame_bytes: usize,
    next: u64,
}

impl TranscoderSink {
    /// Create a sink spawning `transcoder` on `begin`.
    ///
    /// A broken stdin pipe observed after `cancel` fired is treated as a normal end of stream.
    pub fn new(transcoder: Arc<Transcoder>, cancel: CancelToken) -> Self {
        Self {
            transcoder,
            cancel,
            process: None,
            frame_bytes: 0,
            next: 0,
        }
    }

    fn crashed(&mut self, message: String) -> AvError {
        let stderr = match self.process.take() {
            Some(mut p) => match p.wait() {
                Ok(exit) => exit.stderr,
                Err(e) => e.to_string(),
            },
            None => String::new(),
        };
        AvError::transcoder_crashed(message, stderr)
    }
}

impl FrameSink for TranscoderSink {
    fn begin(&mut self, invocation: &TranscoderInvocation) -> AvResult<()> {
        if self.process.is_some() {
            return Err(AvError::validation("transcoder sink already started"));
        }
        tracing::info!(
            bin = %self.transcoder.binary().display(),
            args = %invocation.display_args(),
            "spawning transcoder"
        );
        self.process = Some(self.transcoder.spawn(invocation.to_args())?);
        self.frame_bytes = invocation.frame_bytes();
        self.next = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> AvResult<()> {
        if idx.0 != self.next {
            return Err(AvError::validation(format!(
                "frame {} pushed out of order (expected {})",
                idx.0, self.next
            )));
        }
        if frame.data.len() != self.frame_bytes {
            return Err(AvError::validation(format!(
                "frame {} has {} bytes, expected {}",
                idx.0,
                frame.data.len(),
                self.frame_bytes
            )));
        }
        let Some(process) = self.process.as_mut() else {
            return Err(AvError::validation("transcoder sink not started"));
        };
        match process.write(&frame.data) {
            Ok(()) => {
                self.next += 1;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe && self.cancel.is_cancelled() => {
                tracing::debug!(frame = idx.0, "transcoder pipe closed during cancellation");
                Err(AvError::Cancelled)
            }
            Err(e) => Err(self.crashed(format!("failed to write frame {}: {e}", idx.0))),
        }
    }

    fn end(&mut self) -> AvResult<()> {
        let Some(mut process) = self.process.take() else {
            return Err(AvError::validation("transcoder sink not started"));
        };
        let exit = process.wait()?;
        if !exit.status.success() {
            return Err(AvError::transcoder_crashed(
                format!("transcoder exited with {}", exit.status),
                exit.stderr,
            ));
        }
        tracing::debug!(frames = self.next, "transcoder finished");
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.terminate();
            if let Err(e) = process.wait() {
                tracing::warn!(error = %e, "failed to reap transcoder after abort");
            }
        }
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    invocation: Option<TranscoderInvocation>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    ended: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invocation captured in `begin`, if any.
    pub fn invocation(&self) -> Option<&TranscoderInvocation> {
        self.invocation.as_ref()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// `true` once `end` was called.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// `true` once `abort` was called.
    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, invocation: &TranscoderInvocation) -> AvResult<()> {
        self.invocation = Some(invocation.clone());
        self.frames.clear();
        self.ended = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> AvResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> AvResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}
