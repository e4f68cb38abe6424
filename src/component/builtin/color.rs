use kurbo::{Point, Rect};

use super::{Rgb, prepared_canvas, rgba};
use crate::component::{Component, Properties, Property, RenderContext};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::math::{lerp_u8, unit_to_u8_weight};
use crate::render::frame::FrameRGBA;

/// How [`ColorLayer`] fills its rectangle.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColorFill {
    /// Flat `color1`.
    #[default]
    Solid,
    /// `color1` at `start` fading to `color2` at `end` (canvas pixels).
    Linear {
        /// Gradient start point.
        start: [f64; 2],
        /// Gradient end point.
        end: [f64; 2],
    },
    /// `color1` at `center` fading to `color2` at `radius` pixels away.
    Radial {
        /// Gradient centre.
        center: [f64; 2],
        /// Distance at which `color2` is reached.
        radius: f64,
    },
}

/// Settings of [`ColorLayer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    /// Primary colour.
    pub color1: Rgb,
    /// Gradient end colour.
    pub color2: Rgb,
    /// Fill style.
    pub fill: ColorFill,
    /// Filled rectangle as `[x, y, width, height]`; the whole canvas when absent.
    pub rect: Option<[f64; 4]>,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            color1: [0, 0, 0],
            color2: [133, 133, 133],
            fill: ColorFill::Solid,
            rect: None,
        }
    }
}

/// Static solid or gradient fill.
pub struct ColorLayer {
    settings: ColorSettings,
    canvas: Option<Canvas>,
}

impl ColorLayer {
    /// Build from settings.
    pub fn new(settings: ColorSettings) -> Self {
        Self {
            settings,
            canvas: None,
        }
    }

    fn color_at(&self, p: Point) -> [u8; 4] {
        let s = &self.settings;
        let t = match &s.fill {
            ColorFill::Solid => return rgba(s.color1, 255),
            ColorFill::Linear { start, end } => {
                let (dx, dy) = (end[0] - start[0], end[1] - start[1]);
                let len2 = dx * dx + dy * dy;
                if len2 <= f64::EPSILON {
                    0.0
                } else {
                    ((p.x - start[0]) * dx + (p.y - start[1]) * dy) / len2
                }
            }
            ColorFill::Radial { center, radius } => {
                if *radius <= f64::EPSILON {
                    1.0
                } else {
                    p.distance(Point::new(center[0], center[1])) / radius
                }
            }
        };
        let w = unit_to_u8_weight(t);
        [
            lerp_u8(s.color1[0], s.color2[0], w),
            lerp_u8(s.color1[1], s.color2[1], w),
            lerp_u8(s.color1[2], s.color2[2], w),
            255,
        ]
    }
}

impl Component for ColorLayer {
    fn name(&self) -> &str {
        "Color"
    }

    fn properties(&self) -> anyhow::Result<Properties> {
        Ok(Properties::empty().with(Property::Static))
    }

    fn pre_frame_render(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        self.canvas = Some(ctx.canvas);
        Ok(())
    }

    fn frame_render(&self, _frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        let canvas = prepared_canvas(self.canvas, self.name())?;
        let mut frame = FrameRGBA::transparent(canvas.width, canvas.height);
        let area = match self.settings.rect {
            Some([x, y, w, h]) => Rect::new(x, y, x + w, y + h),
            None => Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height)),
        };

        if matches!(self.settings.fill, ColorFill::Solid) {
            frame.fill_rect(area, rgba(self.settings.color1, 255));
            return Ok(frame);
        }
        let area = area.abs();
        for y in 0..canvas.height {
            for x in 0..canvas.width {
                let centre = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if area.contains(centre) {
                    frame.put_pixel(x, y, self.color_at(centre));
                }
            }
        }
        Ok(frame)
    }

    fn post_frame_render(&mut self) -> anyhow::Result<()> {
        self.canvas = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/component/builtin/color.rs"]
mod tests;
