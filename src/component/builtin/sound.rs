use std::path::PathBuf;

use super::prepared_canvas;
use crate::component::{
    AudioContribution, Component, ComponentError, Properties, Property, RenderContext,
};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::render::frame::FrameRGBA;

const CHORUS_ARGS: &str = "=0.5:0.9:50|60|40:0.4|0.32|0.3:0.25|0.4|0.3:2|2.3|1.3";

/// Settings of [`SoundLayer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SoundSettings {
    /// Extra audio file mixed into the output.
    pub path: PathBuf,
    /// Start delay in seconds.
    pub delay: f64,
    /// Apply a chorus effect.
    pub chorus: bool,
    /// Linear gain.
    pub volume: f64,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            delay: 0.0,
            chorus: false,
            volume: 1.0,
        }
    }
}

/// Invisible layer contributing an extra audio stream to the mix.
pub struct SoundLayer {
    settings: SoundSettings,
    canvas: Option<Canvas>,
}

impl SoundLayer {
    /// Build from settings.
    pub fn new(settings: SoundSettings) -> Self {
        Self {
            settings,
            canvas: None,
        }
    }
}

impl Component for SoundLayer {
    fn name(&self) -> &str {
        "Sound"
    }

    fn properties(&self) -> anyhow::Result<Properties> {
        Ok(Properties::empty()
            .with(Property::Static)
            .with(Property::Audio)
            .with_if(Property::Error, !self.settings.path.is_file()))
    }

    fn error(&self) -> anyhow::Result<ComponentError> {
        Ok(ComponentError::new(format!(
            "Audio file not found: {}",
            self.settings.path.display()
        )))
    }

    fn pre_frame_render(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        self.canvas = Some(ctx.canvas);
        Ok(())
    }

    fn frame_render(&self, _frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        let canvas = prepared_canvas(self.canvas, self.name())?;
        Ok(FrameRGBA::transparent(canvas.width, canvas.height))
    }

    fn post_frame_render(&mut self) -> anyhow::Result<()> {
        self.canvas = None;
        Ok(())
    }

    fn audio(&self) -> anyhow::Result<Option<AudioContribution>> {
        let s = &self.settings;
        let mut filters = Vec::new();
        if s.delay > 0.0 {
            let millis = (s.delay * 1000.0).round() as u64;
            filters.push(("adelay".to_owned(), format!("={millis}")));
        }
        if s.chorus {
            filters.push(("chorus".to_owned(), CHORUS_ARGS.to_owned()));
        }
        if (s.volume - 1.0).abs() > f64::EPSILON {
            filters.push((
                "volume".to_owned(),
                format!("={}:replaygain_noclip=0", s.volume.max(0.0)),
            ));
        }
        Ok(Some(AudioContribution {
            source: s.path.clone(),
            filters,
        }))
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/component/builtin/sound.rs"]
mod tests;
