use crate::component::host::ComponentHost;
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::AvResult;
use crate::render::blend::accumulate;
use crate::render::frame::FrameRGBA;
use crate::render::statics::{StaticCache, StaticSlot};

/// Builds output frames from a prepared component stack.
///
/// Holds everything fixed for the duration of a render so that workers only need a shared
/// reference.
#[derive(Clone, Debug)]
pub struct Compositor {
    canvas: Canvas,
    statics: StaticCache,
    composite: Vec<bool>,
}

impl Compositor {
    /// `composite[p]` marks layers that render over the image underneath them.
    pub fn new(canvas: Canvas, statics: StaticCache, composite: Vec<bool>) -> Self {
        Self {
            canvas,
            statics,
            composite,
        }
    }

    /// Output dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Static layer cache.
    pub fn statics(&self) -> &StaticCache {
        &self.statics
    }

    /// Composite `frame` bottom-up over `hosts`.
    ///
    /// Static layers reuse their cached image, merged layers are skipped, composite layers replace
    /// the running image and every other layer is alpha-composited over it. An empty result is a
    /// transparent frame.
    pub fn composite(&self, frame: FrameIndex, hosts: &[ComponentHost]) -> AvResult<FrameRGBA> {
        let mut current: Option<FrameRGBA> = None;
        for (pos, host) in hosts.iter().enumerate() {
            match self.statics.slot(pos) {
                StaticSlot::MergedBelow => {}
                StaticSlot::Image(img) => accumulate(&mut current, img)?,
                StaticSlot::Animated if self.composite.get(pos).copied().unwrap_or(false) => {
                    let below = current.take().unwrap_or_else(|| self.blank());
                    current = Some(host.composite_render(frame, below, self.canvas)?);
                }
                StaticSlot::Animated => {
                    let layer = host.frame_render(frame, self.canvas)?;
                    accumulate(&mut current, &layer)?;
                }
            }
        }
        Ok(current.unwrap_or_else(|| self.blank()))
    }

    fn blank(&self) -> FrameRGBA {
        FrameRGBA::transparent(self.canvas.width, self.canvas.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
