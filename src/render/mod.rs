//! Frame model, compositing and the render pipeline.

/// Straight-alpha source-over blending.
pub mod blend;
/// Per-frame static/animated compositing over a prepared stack.
pub mod compositor;
/// RGBA8 frame buffer.
pub mod frame;
/// Render state machine and frame streaming.
pub mod pipeline;
/// Progress, phase label, error and preview reporting.
pub mod progress;
/// Static layer cache and fusion.
pub mod statics;
