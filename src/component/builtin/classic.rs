use std::sync::Arc;

use kurbo::Rect;

use super::{Rgb, prepared_canvas, rgba};
use crate::audio::spectrum::{self, SpectrumSeries, SpectrumSettings};
use crate::component::{Component, ComponentError, Properties, Property, RenderContext};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::render::frame::FrameRGBA;

const BAR_COUNT: usize = 63;
const BIN_STRIDE: usize = 4;
const SHADOW_ALPHA: u8 = 125;

/// Placement of the mirrored bar pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarLayout {
    /// Bars at the top and mirrored at the bottom, pushed towards the edges.
    #[default]
    Classic,
    /// Both halves near the vertical centre.
    Split,
    /// Upward bars only, near the bottom edge.
    Bottom,
    /// Downward bars only, near the top edge.
    Top,
}

/// Settings of [`ClassicVisualizer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClassicSettings {
    /// Bar colour.
    pub color: Rgb,
    /// Bar placement.
    pub layout: BarLayout,
    /// Extra smoothing, `0` (snappy) to `5` (slow).
    pub smooth: f64,
}

impl Default for ClassicSettings {
    fn default() -> Self {
        Self {
            color: [255, 255, 255],
            layout: BarLayout::Classic,
            smooth: 0.0,
        }
    }
}

impl ClassicSettings {
    fn spectrum(&self) -> SpectrumSettings {
        let base = SpectrumSettings::default();
        let smooth = self.smooth.clamp(0.0, 5.0);
        SpectrumSettings {
            alpha_down: base.alpha_down + smooth / 15.0,
            alpha_up: base.alpha_up - smooth * 2.0 / 15.0,
            ..base
        }
    }
}

struct Prepared {
    canvas: Canvas,
    spectrum: Arc<SpectrumSeries>,
}

/// Mirrored spectrum bars driven by the primary audio.
pub struct ClassicVisualizer {
    settings: ClassicSettings,
    prepared: Option<Prepared>,
}

impl ClassicVisualizer {
    /// Build from settings.
    pub fn new(settings: ClassicSettings) -> Self {
        Self {
            settings,
            prepared: None,
        }
    }
}

impl Component for ClassicVisualizer {
    fn name(&self) -> &str {
        "Classic Visualizer"
    }

    fn properties(&self) -> anyhow::Result<Properties> {
        Ok(Properties::empty().with(Property::Pcm))
    }

    fn error(&self) -> anyhow::Result<ComponentError> {
        Ok(ComponentError::new("Classic Visualizer needs decoded audio"))
    }

    fn pre_frame_render(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        let Some(pcm) = ctx.pcm.as_ref() else {
            anyhow::bail!("no decoded audio was provided");
        };
        ctx.reporter.text("Analyzing audio...");
        let series = spectrum::analyze(
            pcm,
            ctx.sample_window,
            self.settings.spectrum(),
            &ctx.reporter,
            &ctx.cancel,
        )?;
        self.prepared = Some(Prepared {
            canvas: ctx.canvas,
            spectrum: Arc::new(series),
        });
        Ok(())
    }

    fn frame_render(&self, frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        let canvas = prepared_canvas(self.prepared.as_ref().map(|p| p.canvas), self.name())?;
        let spectrum = self
            .prepared
            .as_ref()
            .and_then(|p| p.spectrum.for_frame(frame))
            .unwrap_or(&[]);
        Ok(draw_bars(
            canvas,
            spectrum,
            self.settings.color,
            self.settings.layout,
        ))
    }

    fn post_frame_render(&mut self) -> anyhow::Result<()> {
        self.prepared = None;
        Ok(())
    }
}

/// Draw one frame of bars for `spectrum`.
fn draw_bars(canvas: Canvas, spectrum: &[f32], color: Rgb, layout: BarLayout) -> FrameRGBA {
    let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));
    let baseline = h - h / 8.0;
    let bar = w / 64.0;
    let half = bar / 2.0;
    let quarter = bar / 4.0;
    let per_unit = h / 1200.0;

    let mut top = FrameRGBA::transparent(canvas.width, canvas.height);
    for j in 0..BAR_COUNT {
        let v = spectrum
            .get(j * BIN_STRIDE)
            .copied()
            .map_or(0.0, f64::from);
        let x = half + j as f64 * bar;
        top.fill_rect(
            Rect::new(x, baseline + quarter, x + bar, baseline + quarter - v * per_unit - half),
            rgba(color, SHADOW_ALPHA),
        );
        top.fill_rect(
            Rect::new(x + quarter, baseline, x + quarter + half, baseline - v * per_unit),
            rgba(color, 255),
        );
    }

    let height = i64::from(canvas.height);
    let far = height * 43 / 100;
    let near = height * 10 / 100;
    let mut out = FrameRGBA::transparent(canvas.width, canvas.height);
    match layout {
        BarLayout::Classic => {
            out.draw_over(&top, 0, -far);
            out.draw_over(&top.flipped_vertical(), 0, far);
        }
        BarLayout::Split => {
            out.draw_over(&top, 0, near);
            out.draw_over(&top.flipped_vertical(), 0, -near);
        }
        BarLayout::Bottom => out.draw_over(&top, 0, near),
        BarLayout::Top => out.draw_over(&top.flipped_vertical(), 0, -near),
    }
    out
}

#[cfg(test)]
#[path = "../../../tests/unit/component/builtin/classic.rs"]
mod tests;
