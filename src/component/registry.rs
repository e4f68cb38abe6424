use std::path::Path;

use anyhow::Context as _;

use crate::component::Component;
use crate::component::builtin::{
    ClassicSettings, ClassicVisualizer, ColorLayer, ColorSettings, ImageLayer, ImageSettings,
    SoundLayer, SoundSettings, TextLayer, TextSettings, TintLayer, TintSettings,
};
use crate::foundation::error::AvResult;

/// Serialized description of one built-in component.
///
/// ```json
/// { "type": "color", "color1": [111, 111, 111] }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentSpec {
    /// [`ClassicVisualizer`].
    Classic(ClassicSettings),
    /// [`ColorLayer`].
    Color(ColorSettings),
    /// [`ImageLayer`].
    Image(ImageSettings),
    /// [`SoundLayer`].
    Sound(SoundSettings),
    /// [`TextLayer`].
    Text(TextSettings),
    /// [`TintLayer`].
    Tint(TintSettings),
}

impl ComponentSpec {
    /// Instantiate the component.
    pub fn build(&self) -> Box<dyn Component> {
        match self {
            Self::Classic(s) => Box::new(ClassicVisualizer::new(s.clone())),
            Self::Color(s) => Box::new(ColorLayer::new(s.clone())),
            Self::Image(s) => Box::new(ImageLayer::new(s.clone())),
            Self::Sound(s) => Box::new(SoundLayer::new(s.clone())),
            Self::Text(s) => Box::new(TextLayer::new(s.clone())),
            Self::Tint(s) => Box::new(TintLayer::new(s.clone())),
        }
    }

    /// Serialized type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Classic(_) => "classic",
            Self::Color(_) => "color",
            Self::Image(_) => "image",
            Self::Sound(_) => "sound",
            Self::Text(_) => "text",
            Self::Tint(_) => "tint",
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        let path = match self {
            Self::Image(s) => &mut s.path,
            Self::Sound(s) => &mut s.path,
            Self::Text(s) => &mut s.font,
            _ => return,
        };
        if path.is_relative() && !path.as_os_str().is_empty() {
            *path = base.join(&*path);
        }
    }
}

/// A component stack, bottom layer first.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StackFile {
    /// Layers in stack order (index 0 is drawn first).
    pub components: Vec<ComponentSpec>,
}

impl StackFile {
    /// Parse a stack from JSON text.
    pub fn from_json(text: &str) -> AvResult<Self> {
        Ok(serde_json::from_str(text).context("failed to parse component stack")?)
    }

    /// Load a stack file. Relative media paths resolve against the file's directory.
    pub fn from_path(path: &Path) -> AvResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read component stack '{}'", path.display()))?;
        let mut stack: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse component stack '{}'", path.display()))?;
        if let Some(base) = path.parent() {
            for spec in &mut stack.components {
                spec.resolve_paths(base);
            }
        }
        Ok(stack)
    }

    /// Instantiate every component in stack order.
    pub fn build(&self) -> Vec<Box<dyn Component>> {
        self.components.iter().map(ComponentSpec::build).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/component/registry.rs"]
mod tests;
