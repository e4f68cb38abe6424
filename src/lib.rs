//! avrender is an audio-driven video rendering engine.
//!
//! A render takes a primary audio file and an ordered stack of visualizer components, composites
//! one RGBA frame per `44100 / fps` PCM samples and streams the frames into an external transcoder
//! that muxes them with the audio.
//!
//! - Describe the stack as [`Component`]s (or load built-ins through a [`StackFile`])
//! - Create a [`RenderPipeline`] from a [`RenderConfig`]
//! - [`RenderPipeline::export`] to a file, or [`RenderPipeline::run`] into any [`FrameSink`]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Primary-audio decoding and spectrum analysis.
pub mod audio;
/// Component contract, host and built-in components.
pub mod component;
/// Render settings and the encoder options table.
pub mod config;
/// Transcoder discovery, command assembly and frame sinks.
pub mod encode;
/// Frames, compositing and the render pipeline.
pub mod render;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{
    Canvas, FrameIndex, SAMPLE_RATE, frame_count, sample_window_for_fps, samples_for_duration,
};
pub use crate::foundation::error::{AvError, AvResult, ComponentFailure, ComponentPhase};

pub use crate::audio::loader::{AudioBackend, DecodedAudio, TranscoderAudio};
pub use crate::audio::spectrum::{SpectrumSeries, SpectrumSettings};
pub use crate::component::host::ComponentHost;
pub use crate::component::registry::{ComponentSpec, StackFile};
pub use crate::component::{
    AudioContribution, Component, ComponentError, Properties, Property, RenderContext,
};
pub use crate::config::{EncoderOptions, RenderConfig, ThreadingConfig};
pub use crate::encode::command::{EncoderChoice, TranscoderInvocation};
pub use crate::encode::sink::{FrameSink, InMemorySink, TranscoderSink};
pub use crate::encode::transcoder::{EncoderCatalog, Transcoder};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::pipeline::{
    RenderHandle, RenderJob, RenderPipeline, RenderState, RenderStats,
};
pub use crate::render::progress::{LogObserver, NullObserver, RenderObserver, Reporter};
