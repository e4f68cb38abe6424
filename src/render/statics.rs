use std::sync::Arc;

use crate::foundation::error::{AvError, AvResult};
use crate::render::blend::alpha_composite_in_place;
use crate::render::frame::FrameRGBA;

/// Per-layer entry of the [`StaticCache`].
#[derive(Clone, Debug, PartialEq)]
pub enum StaticSlot {
    /// Rendered every frame.
    Animated,
    /// Precomputed image reused for every frame.
    Image(Arc<FrameRGBA>),
    /// Already folded into the next static layer up; skipped while compositing.
    MergedBelow,
}

/// Precomputed images of static layers, indexed by stack position.
///
/// Written while preparing and fusing; read-only during streaming.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticCache {
    slots: Vec<StaticSlot>,
}

impl StaticCache {
    /// Cache for `layers` layers, all animated.
    pub fn new(layers: usize) -> Self {
        Self {
            slots: vec![StaticSlot::Animated; layers],
        }
    }

    /// Store the precomputed image of the layer at `position`.
    pub fn insert(&mut self, position: usize, image: FrameRGBA) -> AvResult<()> {
        let slot = self.slots.get_mut(position).ok_or_else(|| {
            AvError::validation(format!("static layer {position} is outside the stack"))
        })?;
        *slot = StaticSlot::Image(Arc::new(image));
        Ok(())
    }

    /// Entry for the layer at `position`.
    pub fn slot(&self, position: usize) -> &StaticSlot {
        self.slots.get(position).unwrap_or(&StaticSlot::Animated)
    }

    /// Number of layers tracked.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` for an empty stack.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of layers holding a precomputed image.
    pub fn image_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, StaticSlot::Image(_)))
            .count()
    }

    /// Fold every run of two or more adjacent static layers into the run's top layer.
    ///
    /// Lower members of a run become [`StaticSlot::MergedBelow`]. Returns the number of layers
    /// folded away.
    ///
    /// A run at the bottom of the stack composites exactly as it would frame by frame. A run above
    /// animated or composite layers is blended in a different order, so 8-bit rounding may move a
    /// translucent pixel by one alpha level and up to two colour levels per two-layer run.
    pub fn fuse(&mut self) -> AvResult<usize> {
        let mut merged = 0;
        let mut start = 0;
        while start < self.slots.len() {
            let end = self.slots[start..]
                .iter()
                .position(|s| !matches!(s, StaticSlot::Image(_)))
                .map_or(self.slots.len(), |n| start + n);
            if end - start >= 2 {
                let mut acc: Option<FrameRGBA> = None;
                for slot in &self.slots[start..end] {
                    if let StaticSlot::Image(img) = slot {
                        match acc.as_mut() {
                            Some(a) => alpha_composite_in_place(a, img)?,
                            None => acc = Some(FrameRGBA::clone(img)),
                        }
                    }
                }
                if let Some(fused) = acc {
                    for slot in &mut self.slots[start..end - 1] {
                        *slot = StaticSlot::MergedBelow;
                    }
                    self.slots[end - 1] = StaticSlot::Image(Arc::new(fused));
                    merged += end - start - 1;
                }
            }
            start = end.max(start + 1);
        }
        Ok(merged)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/statics.rs"]
mod tests;
