use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::component::{Component, Properties};

const CANVAS: Canvas = Canvas {
    width: 2,
    height: 2,
};

struct Solid {
    px: [u8; 4],
    calls: Arc<AtomicUsize>,
}

impl Component for Solid {
    fn name(&self) -> &str {
        "Solid"
    }
    fn properties(&self) -> anyhow::Result<Properties> {
        Ok(Properties::empty())
    }
    fn frame_render(&self, _frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FrameRGBA::solid(CANVAS.width, CANVAS.height, self.px))
    }
}

struct Invert;

impl Component for Invert {
    fn name(&self) -> &str {
        "Invert"
    }
    fn properties(&self) -> anyhow::Result<Properties> {
        Ok(Properties::empty())
    }
    fn frame_render(&self, _frame: FrameIndex) -> anyhow::Result<FrameRGBA> {
        anyhow::bail!("composite layers are never rendered standalone")
    }
    fn composite_render(&self, _frame: FrameIndex, below: FrameRGBA) -> anyhow::Result<FrameRGBA> {
        let mut out = below;
        for px in out.data.chunks_exact_mut(4) {
            px[0] = 255 - px[0];
            px[3] = 255;
        }
        Ok(out)
    }
}

fn solid(px: [u8; 4]) -> (Box<dyn Component>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (
        Box::new(Solid {
            px,
            calls: calls.clone(),
        }),
        calls,
    )
}

#[test]
fn empty_stack_yields_transparent_frame() {
    let c = Compositor::new(CANVAS, StaticCache::new(0), Vec::new());
    let out = c.composite(FrameIndex(0), &[]).expect("composite");
    assert_eq!(out, FrameRGBA::transparent(2, 2));
}

#[test]
fn animated_layers_blend_bottom_up() {
    let (a, _) = solid([0, 0, 255, 255]);
    let (b, _) = solid([255, 0, 0, 128]);
    let hosts = ComponentHost::wrap_stack(vec![a, b]);
    let c = Compositor::new(CANVAS, StaticCache::new(2), vec![false, false]);
    let out = c.composite(FrameIndex(3), &hosts).expect("composite");
    assert_eq!(out.pixel(0, 0), [128, 0, 127, 255]);
}

#[test]
fn static_and_merged_slots_skip_rendering() {
    let (a, a_calls) = solid([1, 1, 1, 255]);
    let (b, b_calls) = solid([2, 2, 2, 255]);
    let (top, top_calls) = solid([0, 0, 0, 0]);
    let hosts = ComponentHost::wrap_stack(vec![a, b, top]);

    let mut cache = StaticCache::new(3);
    cache
        .insert(0, FrameRGBA::solid(2, 2, [1, 1, 1, 255]))
        .expect("insert");
    cache
        .insert(1, FrameRGBA::solid(2, 2, [2, 2, 2, 255]))
        .expect("insert");
    cache.fuse().expect("fuse");

    let c = Compositor::new(CANVAS, cache, vec![false; 3]);
    for i in 0..4 {
        let out = c.composite(FrameIndex(i), &hosts).expect("composite");
        assert_eq!(out.pixel(1, 1), [2, 2, 2, 255]);
    }
    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    assert_eq!(top_calls.load(Ordering::SeqCst), 4);
}

#[test]
fn composite_layer_replaces_image_below() {
    let (a, _) = solid([10, 0, 0, 255]);
    let hosts = ComponentHost::wrap_stack(vec![a, Box::new(Invert)]);
    let c = Compositor::new(CANVAS, StaticCache::new(2), vec![false, true]);
    let out = c.composite(FrameIndex(0), &hosts).expect("composite");
    assert_eq!(out.pixel(0, 0), [245, 0, 0, 255]);
}

#[test]
fn composite_layer_at_bottom_receives_transparent_frame() {
    let hosts = ComponentHost::wrap_stack(vec![Box::new(Invert)]);
    let c = Compositor::new(CANVAS, StaticCache::new(1), vec![true]);
    let out = c.composite(FrameIndex(0), &hosts).expect("composite");
    assert_eq!(out.pixel(0, 0), [255, 0, 0, 255]);
}

#[test]
fn component_failure_propagates() {
    let hosts = ComponentHost::wrap_stack(vec![Box::new(Invert)]);
    let c = Compositor::new(CANVAS, StaticCache::new(1), vec![false]);
    let err = c.composite(FrameIndex(0), &hosts).unwrap_err();
    assert!(matches!(err, crate::AvError::Component(_)), "{err}");
}
