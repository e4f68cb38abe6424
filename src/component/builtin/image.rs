use std::path::PathBuf;

use anyhow::Context as _;
use image::imageops::{self, FilterType};

use super::prepared_canvas;
use crate::component::{Component, ComponentError, Properties, Property, RenderContext};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::render::frame::FrameRGBA;

/// Settings of [`ImageLayer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Image file.
    pub path: PathBuf,
    /// Size in percent of the source image; ignored when `stretch` is set.
    pub scale: u32,
    /// Resize to exactly the canvas.
    pub stretch: bool,
    /// Horizontal offset of the top-left corner in pixels.
    pub x: i64,
    /// Vertical offset of the top-left corner in pixels.
    pub y: i64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            scale: 100,
            stretch: false,
            x: 0,
            y: 0,
        }
    }
}

/// Static still image placed on the canvas.
pub struct ImageLayer {
    settings: ImageSettings,
    canvas: Option<Canvas>,
    image: Option<image::RgbaImage>,
    load_error: Option<String>,
}

impl ImageLayer {
    /// Build from settings.
    pub fn new(settings: ImageSettings) -> Self {
        Self {
            settings,
            canvas: None,
            image: None,
            load_error: None,
        }
    }

    fn load(&self, canvas: Canvas) -> anyhow::Result<image::RgbaImage> {
        let path = &self.settings.path;
        let src = image::open(path)
            .with_context(|| format!("failed to decode image '{}'", path.display()))?
            .to_rgba8();
        if self.settings.stretch {
            return Ok(imageops::resize(
                &src,
                canvas.width,
                canvas.height,
                FilterType::Lanczos3,
            ));
        }
        if self.settings.scale == 100 {
            return Ok(src);
        }
        let scaled = |v: u32| (u64::from(v) * u64::from(self.settings.scale) / 100).max(1) as u32;
        let (w, h) = src.dimensions();
        Ok(imageops::resize(
            &src,
            scaled(w),
            scaled(h),
            FilterType::Lanczos3,
        ))
    }
}

impl Component for ImageLayer {
    fn name(&self) -> &str {
        "Image"
    }

    fn properties(&self) -> anyhow::Result<Properties> {
        let broken = !self.settings.path.is_file() || self.load_error.is_some();
        Ok(Properties::empty()
            .with(Property::Static)
            .with_if(Property::Error, broken))
    }

    fn error(&self) -> anyhow::Result<ComponentError> {
        if let Some(detail) = &self.load_error {
            return Ok(ComponentError::with_detail(
                format!("Image could not be read: {}", self.settings.path.display()),
                detail.clone(),
            ));
        }
        Ok(ComponentError::new(format!(
            "Image file not found: {}",
            self.settings.path.display()
        )))
    }

    fn pre_frame_render(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        self.canvas = Some(ctx.canvas);
        self.load_error = None;
        if !self.settings.path.is_file() {
            return Ok(());
        }
        match self.load(ctx.canvas) {
            Ok(img) => self.image = Some(img),
            Err(e) => self.load_error = Some(format!("{e:#}")),
        }
        Ok(())
    }

    fn frame_render(&self, _frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        let canvas = prepared_canvas(self.canvas, self.name())?;
        let mut frame = FrameRGBA::transparent(canvas.width, canvas.height);
        if let Some(img) = &self.image {
            let layer = FrameRGBA::from_image(img.clone());
            frame.draw_over(&layer, self.settings.x, self.settings.y);
        }
        Ok(frame)
    }

    fn post_frame_render(&mut self) -> anyhow::Result<()> {
        self.image = None;
        self.canvas = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/component/builtin/image.rs"]
mod tests;
