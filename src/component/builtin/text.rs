use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Context as _;

use super::{Rgb, prepared_canvas, rgba};
use crate::component::{Component, ComponentError, Properties, Property, RenderContext};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::render::frame::FrameRGBA;

/// Settings of [`TextLayer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// Text to draw. `\n` starts a new line.
    pub text: String,
    /// TrueType or OpenType font file.
    pub font: PathBuf,
    /// Font size in pixels.
    pub size: f32,
    /// Fill colour.
    pub color: Rgb,
    /// Wrap width in pixels; unset keeps every line on one row.
    pub max_width: Option<f32>,
    /// Center the text block on the canvas, with `x`/`y` offsetting it from the centre.
    pub center: bool,
    /// Horizontal position (or offset when centered) in pixels.
    pub x: i64,
    /// Vertical position (or offset when centered) in pixels.
    pub y: i64,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            text: "Title Text".to_owned(),
            font: PathBuf::new(),
            size: 40.0,
            color: [255, 255, 255],
            max_width: None,
            center: true,
            x: 0,
            y: 0,
        }
    }
}

/// Parley brush carrying a straight RGBA colour.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct TextBrush([u8; 4]);

/// Static text title, shaped with parley and rasterized with vello_cpu once per render.
pub struct TextLayer {
    settings: TextSettings,
    canvas: Option<Canvas>,
    raster: Option<FrameRGBA>,
    load_error: Option<String>,
}

impl TextLayer {
    /// Build from settings.
    pub fn new(settings: TextSettings) -> Self {
        Self {
            settings,
            canvas: None,
            raster: None,
            load_error: None,
        }
    }

    fn layout(&self, font_bytes: &[u8]) -> anyhow::Result<parley::Layout<TextBrush>> {
        let s = &self.settings;
        anyhow::ensure!(
            s.size.is_finite() && s.size > 0.0,
            "text size must be finite and > 0, got {}",
            s.size
        );

        let mut font_ctx = parley::FontContext::default();
        let mut layout_ctx = parley::LayoutContext::<TextBrush>::new();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .context("font file contains no font families")?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .context("registered font family has no name")?
            .to_string();

        let mut builder = layout_ctx.ranged_builder(&mut font_ctx, &s.text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(s.size));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrush(rgba(
            s.color, 255,
        ))));

        let mut layout: parley::Layout<TextBrush> = builder.build(&s.text);
        layout.break_all_lines(s.max_width);
        if let Some(w) = s.max_width {
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        }
        Ok(layout)
    }

    fn rasterize(&self, canvas: Canvas) -> anyhow::Result<FrameRGBA> {
        let s = &self.settings;
        let font_bytes = std::fs::read(&s.font)
            .with_context(|| format!("failed to read font '{}'", s.font.display()))?;
        let mut frame = FrameRGBA::transparent(canvas.width, canvas.height);
        if s.text.trim().is_empty() || canvas.width == 0 || canvas.height == 0 {
            return Ok(frame);
        }
        let layout = self.layout(&font_bytes)?;

        let w = u16::try_from(canvas.width).context("canvas width exceeds the text rasterizer")?;
        let h = u16::try_from(canvas.height).context("canvas height exceeds the text rasterizer")?;
        let (mut dx, mut dy) = (s.x as f64, s.y as f64);
        if s.center {
            dx += (f64::from(canvas.width) - f64::from(layout.width())) / 2.0;
            dy += (f64::from(canvas.height) - f64::from(layout.height())) / 2.0;
        }

        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((dx, dy)));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let TextBrush([r, g, b, a]) = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        unpremultiply_into(pixmap.data_as_u8_slice(), &mut frame.data);
        Ok(frame)
    }
}

/// Convert premultiplied RGBA8 (the rasterizer's output) to the straight alpha frames use.
fn unpremultiply_into(premul: &[u8], straight: &mut [u8]) {
    for (src, dst) in premul.chunks_exact(4).zip(straight.chunks_exact_mut(4)) {
        let a = u16::from(src[3]);
        if a == 0 {
            dst.copy_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        for i in 0..3 {
            dst[i] = ((u16::from(src[i]) * 255 + a / 2) / a).min(255) as u8;
        }
        dst[3] = src[3];
    }
}

impl Component for TextLayer {
    fn name(&self) -> &str {
        "Title Text"
    }

    fn properties(&self) -> anyhow::Result<Properties> {
        let broken = !self.settings.font.is_file() || self.load_error.is_some();
        Ok(Properties::empty()
            .with(Property::Static)
            .with_if(Property::Error, broken))
    }

    fn error(&self) -> anyhow::Result<ComponentError> {
        if let Some(detail) = &self.load_error {
            return Ok(ComponentError::with_detail(
                format!("Text could not be drawn: {}", self.settings.font.display()),
                detail.clone(),
            ));
        }
        if self.settings.font.as_os_str().is_empty() {
            return Ok(ComponentError::new("Text needs a font file"));
        }
        Ok(ComponentError::new(format!(
            "Font file not found: {}",
            self.settings.font.display()
        )))
    }

    fn pre_frame_render(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        self.canvas = Some(ctx.canvas);
        self.load_error = None;
        if !self.settings.font.is_file() {
            return Ok(());
        }
        match self.rasterize(ctx.canvas) {
            Ok(frame) => self.raster = Some(frame),
            Err(e) => self.load_error = Some(format!("{e:#}")),
        }
        Ok(())
    }

    fn frame_render(&self, _frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        let canvas = prepared_canvas(self.canvas, self.name())?;
        Ok(self
            .raster
            .clone()
            .unwrap_or_else(|| FrameRGBA::transparent(canvas.width, canvas.height)))
    }

    fn post_frame_render(&mut self) -> anyhow::Result<()> {
        self.raster = None;
        self.canvas = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/component/builtin/text.rs"]
mod tests;
