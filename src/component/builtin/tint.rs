use super::{Rgb, prepared_canvas};
use crate::component::{Component, Properties, Property, RenderContext};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::math::{lerp_u8, unit_to_u8_weight};
use crate::render::frame::FrameRGBA;

/// Settings of [`TintLayer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TintSettings {
    /// Tint colour.
    pub color: Rgb,
    /// Blend amount in `[0, 1]`.
    pub amount: f64,
}

impl Default for TintSettings {
    fn default() -> Self {
        Self {
            color: [255, 128, 0],
            amount: 0.5,
        }
    }
}

/// Composite layer pulling the colours underneath it towards a tint.
///
/// Alpha is left untouched, so transparent regions stay transparent.
pub struct TintLayer {
    settings: TintSettings,
    canvas: Option<Canvas>,
}

impl TintLayer {
    /// Build from settings.
    pub fn new(settings: TintSettings) -> Self {
        Self {
            settings,
            canvas: None,
        }
    }
}

impl Component for TintLayer {
    fn name(&self) -> &str {
        "Tint"
    }

    fn properties(&self) -> anyhow::Result<Properties> {
        Ok(Properties::empty().with(Property::Composite))
    }

    fn pre_frame_render(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        self.canvas = Some(ctx.canvas);
        Ok(())
    }

    fn frame_render(&self, _frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        let canvas = prepared_canvas(self.canvas, self.name())?;
        Ok(FrameRGBA::transparent(canvas.width, canvas.height))
    }

    fn composite_render(&self, _frame: FrameIndex, below: FrameRGBA) -> anyhow::Result<FrameRGBA> {
        let mut out = below;
        let t = unit_to_u8_weight(self.settings.amount);
        let c = self.settings.color;
        for px in out.data.chunks_exact_mut(4) {
            px[0] = lerp_u8(px[0], c[0], t);
            px[1] = lerp_u8(px[1], c[1], t);
            px[2] = lerp_u8(px[2], c[2], t);
        }
        Ok(out)
    }

    fn post_frame_render(&mut self) -> anyhow::Result<()> {
        self.canvas = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/component/builtin/tint.rs"]
mod tests;
