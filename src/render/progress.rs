use std::sync::{Arc, Mutex};

use crate::foundation::core::FrameIndex;
use crate::render::frame::FrameRGBA;

/// Sink for pipeline progress, phase labels, errors and preview frames.
///
/// All methods may be called from any thread (workers, the pipe writer, component hooks). Every
/// method has a no-op default.
pub trait RenderObserver: Send + Sync {
    /// Overall percentage `0..=100`; `-1` means indeterminate.
    fn progress(&self, _percent: i32) {}

    /// Human-readable phase label.
    fn progress_text(&self, _text: &str) {}

    /// `(summary, detail)` error channel. The summary is one line.
    fn error(&self, _summary: &str, _detail: &str) {}

    /// Best-effort preview of a finished frame. Must not block.
    fn preview(&self, _frame: FrameIndex, _image: &FrameRGBA) {}

    /// Return `true` to receive [`RenderObserver::preview`] calls.
    fn wants_preview(&self) -> bool {
        false
    }
}

/// Observer that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl RenderObserver for NullObserver {}

/// Observer that forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl RenderObserver for LogObserver {
    fn progress(&self, percent: i32) {
        if percent >= 0 && percent % 10 == 0 {
            tracing::info!(percent, "progress");
        }
    }

    fn progress_text(&self, text: &str) {
        tracing::info!("{text}");
    }

    fn error(&self, summary: &str, detail: &str) {
        tracing::error!(%detail, "{summary}");
    }
}

#[derive(Debug, Default)]
struct Gate {
    last: Option<i32>,
}

/// Clonable progress handle shared by the pipeline and components.
///
/// Within one phase (between two [`Reporter::text`] calls) each percentage is emitted at most once
/// and emitted values never decrease.
#[derive(Clone)]
pub struct Reporter {
    observer: Arc<dyn RenderObserver>,
    gate: Arc<Mutex<Gate>>,
}

impl Reporter {
    /// Wrap an observer.
    pub fn new(observer: Arc<dyn RenderObserver>) -> Self {
        Self {
            observer,
            gate: Arc::new(Mutex::new(Gate::default())),
        }
    }

    /// Reporter that discards everything.
    pub fn null() -> Self {
        Self::new(Arc::new(NullObserver))
    }

    /// Report a percentage; duplicates and regressions within the current phase are dropped.
    pub fn progress(&self, percent: i32) {
        let percent = if percent < 0 { -1 } else { percent.min(100) };
        let Ok(mut gate) = self.gate.lock() else {
            return;
        };
        match gate.last {
            Some(last) if percent == -1 && last == -1 => return,
            Some(last) if percent >= 0 && last >= 0 && percent <= last => return,
            _ => {}
        }
        gate.last = Some(percent);
        drop(gate);
        self.observer.progress(percent);
    }

    /// Start a new phase with a human-readable label.
    pub fn text(&self, text: &str) {
        if let Ok(mut gate) = self.gate.lock() {
            gate.last = None;
        }
        self.observer.progress_text(text);
    }

    /// Emit on the `(summary, detail)` error channel.
    pub fn error(&self, summary: &str, detail: &str) {
        self.observer.error(summary, detail);
    }

    /// Forward a finished frame to the preview sink if the observer wants one.
    pub fn preview(&self, frame: FrameIndex, image: &FrameRGBA) {
        if self.observer.wants_preview() {
            self.observer.preview(frame, image);
        }
    }

    /// Terminal state: emit `percent` and `text` unconditionally.
    pub fn finish(&self, percent: i32, text: &str) {
        if let Ok(mut gate) = self.gate.lock() {
            gate.last = Some(percent);
        }
        self.observer.progress(percent);
        self.observer.progress_text(text);
    }
}

/// `min(100, floor(100 * done / total))`; `0` when `total` is zero.
pub fn percent_of(done: u64, total: u64) -> i32 {
    if total == 0 {
        return 0;
    }
    ((u128::from(done) * 100 / u128::from(total)).min(100)) as i32
}

#[cfg(test)]
#[path = "../../tests/unit/render/progress.rs"]
mod tests;
