//! Visualizer component contract.
//!
//! A component is one layer of the render stack. The pipeline only ever talks to components
//! through [`ComponentHost`](host::ComponentHost), which turns errors and panics raised by the
//! hooks below into [`ComponentFailure`](crate::ComponentFailure) values.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Canvas, FrameIndex};
use crate::render::frame::FrameRGBA;
use crate::render::progress::Reporter;

/// Built-in components.
pub mod builtin;
/// Error-isolating wrapper used by the pipeline.
pub mod host;
/// Serde-tagged registry of built-in components.
pub mod registry;

/// Capability flags a component declares through [`Component::properties`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    /// `frame_render` output does not depend on the frame index.
    Static,
    /// The component wants the decoded PCM buffer in its render context.
    Pcm,
    /// The component contributes an extra audio stream to the final mix.
    Audio,
    /// The component consumes the image composited underneath it.
    Composite,
    /// The component is misconfigured; see [`Component::error`].
    Error,
}

impl Property {
    const ALL: [Property; 5] = [
        Property::Static,
        Property::Pcm,
        Property::Audio,
        Property::Composite,
        Property::Error,
    ];

    const fn bit(self) -> u8 {
        match self {
            Property::Static => 1,
            Property::Pcm => 1 << 1,
            Property::Audio => 1 << 2,
            Property::Composite => 1 << 3,
            Property::Error => 1 << 4,
        }
    }
}

/// A set of [`Property`] flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Properties(u8);

impl Properties {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Return a copy with `p` added.
    pub const fn with(self, p: Property) -> Self {
        Self(self.0 | p.bit())
    }

    /// Return a copy with `p` removed.
    pub const fn without(self, p: Property) -> Self {
        Self(self.0 & !p.bit())
    }

    /// Add `p` when `cond` holds.
    pub const fn with_if(self, p: Property, cond: bool) -> Self {
        if cond { self.with(p) } else { self }
    }

    /// Membership test.
    pub const fn contains(self, p: Property) -> bool {
        self.0 & p.bit() != 0
    }

    /// Iterate members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Property> {
        Property::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Human-readable misconfiguration message returned by [`Component::error`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentError {
    /// One-line summary.
    pub summary: String,
    /// Optional longer explanation.
    pub detail: Option<String>,
}

impl ComponentError {
    /// Summary-only message.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: None,
        }
    }

    /// Summary plus detail.
    pub fn with_detail(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: Some(detail.into()),
        }
    }
}

/// An extra audio stream mixed into the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioContribution {
    /// Audio file passed to the transcoder as an extra input.
    pub source: PathBuf,
    /// Ordered `(filter name, argument suffix)` pairs, applied in sequence.
    pub filters: Vec<(String, String)>,
}

/// Everything a component may use while preparing to render.
///
/// Components may keep clones of any field until their matching `post_frame_render`.
#[derive(Clone)]
pub struct RenderContext {
    /// Primary audio input.
    pub audio_path: PathBuf,
    /// Decoded mono 16-bit PCM at 44.1 kHz, padded with one second of silence. Present only when
    /// some component declared [`Property::Pcm`].
    pub pcm: Option<Arc<Vec<i16>>>,
    /// PCM samples per output frame.
    pub sample_window: usize,
    /// Output frame dimensions.
    pub canvas: Canvas,
    /// Output frames per second.
    pub frame_rate: u32,
    /// Progress and phase-label reporter, safe to call from any thread.
    pub reporter: Reporter,
    /// Cooperative cancellation flag shared with the pipeline.
    pub cancel: CancelToken,
}

impl RenderContext {
    /// Output frame width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    /// Output frame height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height
    }
}

/// One layer of the render stack.
///
/// Hooks return [`anyhow::Result`]; the host converts failures (and panics) into
/// [`ComponentFailure`](crate::ComponentFailure) tagged with the phase that raised them.
///
/// `frame_render` takes `&self` and may be called from worker threads, so per-frame state must be
/// computed in `pre_frame_render`.
pub trait Component: Send + Sync {
    /// Display name used in error messages.
    fn name(&self) -> &str;

    /// Current capability flags. Called repeatedly; must be cheap and side-effect free.
    fn properties(&self) -> anyhow::Result<Properties>;

    /// Misconfiguration message, meaningful only when `properties()` contains
    /// [`Property::Error`].
    fn error(&self) -> anyhow::Result<ComponentError> {
        Ok(ComponentError::new(format!("{} is misconfigured", self.name())))
    }

    /// Called once per render, bottom-to-top, before any frame is requested.
    fn pre_frame_render(&mut self, _ctx: &RenderContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Produce this layer for frame `frame`. Must match the context canvas size.
    fn frame_render(&self, frame: FrameIndex) -> anyhow::Result<FrameRGBA>;

    /// Produce the composited image for frame `frame` from the image `below` it.
    ///
    /// Only called for components declaring [`Property::Composite`].
    fn composite_render(&self, _frame: FrameIndex, _below: FrameRGBA) -> anyhow::Result<FrameRGBA> {
        anyhow::bail!("{} does not composite over the layers below it", self.name())
    }

    /// Release everything acquired in `pre_frame_render`.
    fn post_frame_render(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Extra audio stream, meaningful only when `properties()` contains [`Property::Audio`].
    fn audio(&self) -> anyhow::Result<Option<AudioContribution>> {
        Ok(None)
    }

    /// Flag that long-running hooks poll to stop early.
    ///
    /// Queried once per render before any `pre_frame_render`. The returned token is cancelled as
    /// soon as the render is cancelled, from whichever thread requested it. A cancelled token stays
    /// cancelled, so components rendered more than once should hand out a fresh one per render.
    fn cancel_flag(&self) -> Option<CancelToken> {
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/component/properties.rs"]
mod tests;
