//! Components shipped with the engine.

use crate::foundation::core::Canvas;

mod classic;
mod color;
mod image;
mod sound;
mod text;
mod tint;

pub use classic::{BarLayout, ClassicSettings, ClassicVisualizer};
pub use color::{ColorFill, ColorLayer, ColorSettings};
pub use image::{ImageLayer, ImageSettings};
pub use sound::{SoundLayer, SoundSettings};
pub use text::{TextLayer, TextSettings};
pub use tint::{TintLayer, TintSettings};

/// Opaque sRGB colour as `[r, g, b]`.
pub type Rgb = [u8; 3];

fn rgba(c: Rgb, a: u8) -> [u8; 4] {
    [c[0], c[1], c[2], a]
}

fn prepared_canvas(canvas: Option<Canvas>, name: &str) -> anyhow::Result<Canvas> {
    canvas.ok_or_else(|| anyhow::anyhow!("{name} was asked for a frame before it was prepared"))
}
