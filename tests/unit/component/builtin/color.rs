use std::path::PathBuf;

use super::*;
use crate::foundation::cancel::CancelToken;
use crate::render::progress::Reporter;

fn prepared(settings: ColorSettings, width: u32, height: u32) -> ColorLayer {
    let mut layer = ColorLayer::new(settings);
    let ctx = RenderContext {
        audio_path: PathBuf::from("song.ogg"),
        pcm: None,
        sample_window: 1470,
        canvas: Canvas { width, height },
        frame_rate: 30,
        reporter: Reporter::null(),
        cancel: CancelToken::new(),
    };
    layer.pre_frame_render(&ctx).expect("prepare");
    layer
}

#[test]
fn is_static() {
    let layer = ColorLayer::new(ColorSettings::default());
    assert!(layer.properties().expect("props").contains(Property::Static));
}

#[test]
fn solid_fill_covers_canvas() {
    let layer = prepared(
        ColorSettings {
            color1: [111, 111, 111],
            ..ColorSettings::default()
        },
        32,
        18,
    );
    let frame = layer.frame_render(FrameIndex(0)).expect("frame");
    assert_eq!(frame, FrameRGBA::solid(32, 18, [111, 111, 111, 255]));
}

#[test]
fn solid_fill_respects_rect() {
    let layer = prepared(
        ColorSettings {
            color1: [1, 2, 3],
            rect: Some([2.0, 2.0, 4.0, 4.0]),
            ..ColorSettings::default()
        },
        10,
        10,
    );
    let frame = layer.frame_render(FrameIndex(0)).expect("frame");
    assert_eq!(frame.pixel(3, 3), [1, 2, 3, 255]);
    assert_eq!(frame.pixel(1, 1), [0, 0, 0, 0]);
    assert_eq!(frame.pixel(6, 6), [0, 0, 0, 0]);
}

#[test]
fn linear_gradient_runs_between_endpoints() {
    let layer = prepared(
        ColorSettings {
            color1: [0, 0, 0],
            color2: [255, 255, 255],
            fill: ColorFill::Linear {
                start: [0.0, 0.0],
                end: [100.0, 0.0],
            },
            rect: None,
        },
        100,
        2,
    );
    let frame = layer.frame_render(FrameIndex(0)).expect("frame");
    assert!(frame.pixel(0, 0)[0] <= 2);
    assert!(frame.pixel(99, 0)[0] >= 253);
    let mid = frame.pixel(50, 1)[0];
    assert!((126..=130).contains(&mid), "{mid}");
    assert_eq!(frame.pixel(50, 1)[3], 255);
}

#[test]
fn radial_gradient_reaches_outer_colour_at_radius() {
    let layer = prepared(
        ColorSettings {
            color1: [255, 0, 0],
            color2: [0, 0, 255],
            fill: ColorFill::Radial {
                center: [10.0, 10.0],
                radius: 5.0,
            },
            rect: None,
        },
        20,
        20,
    );
    let frame = layer.frame_render(FrameIndex(0)).expect("frame");
    assert!(frame.pixel(10, 10)[0] > 200);
    assert_eq!(frame.pixel(0, 0), [0, 0, 255, 255]);
}

#[test]
fn frame_is_independent_of_index() {
    let layer = prepared(ColorSettings::default(), 8, 8);
    assert_eq!(
        layer.frame_render(FrameIndex(0)).expect("frame"),
        layer.frame_render(FrameIndex(99)).expect("frame")
    );
}
