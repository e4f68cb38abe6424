use crate::foundation::error::{AvError, AvResult};
use crate::render::frame::FrameRGBA;

pub type StraightRgba8 = [u8; 4];

/// Porter-Duff source-over for straight (non-premultiplied) alpha.
///
/// `out_a = sa + da * (1 - sa)`, `out_c = (sc * sa + dc * da * (1 - sa)) / out_a`, evaluated in
/// integer arithmetic with round-to-nearest.
pub fn over_straight(dst: StraightRgba8, src: StraightRgba8) -> StraightRgba8 {
    let sa = u32::from(src[3]);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = u32::from(dst[3]);
    // All weights are scaled by 255^2.
    let dw = da * (255 - sa);
    let sw = sa * 255;
    let oa = sw + dw;
    if oa == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = u32::from(src[i]) * sw + u32::from(dst[i]) * dw;
        out[i] = ((c + oa / 2) / oa).min(255) as u8;
    }
    out[3] = ((oa + 127) / 255).min(255) as u8;
    out
}

/// Composite `src` over `dst` in place. Both frames must have equal dimensions.
pub fn alpha_composite_in_place(dst: &mut FrameRGBA, src: &FrameRGBA) -> AvResult<()> {
    if dst.width != src.width || dst.height != src.height || dst.data.len() != src.data.len() {
        return Err(AvError::validation(format!(
            "alpha_composite expects equal-size frames, got {}x{} and {}x{}",
            dst.width, dst.height, src.width, src.height
        )));
    }
    for (d, s) in dst.data.chunks_exact_mut(4).zip(src.data.chunks_exact(4)) {
        match s[3] {
            0 => {}
            255 => d.copy_from_slice(s),
            _ => {
                let out = over_straight([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
                d.copy_from_slice(&out);
            }
        }
    }
    Ok(())
}

/// Composite `layer` onto an accumulator that may not hold a frame yet.
///
/// An empty accumulator simply takes a copy of `layer`.
pub fn accumulate(acc: &mut Option<FrameRGBA>, layer: &FrameRGBA) -> AvResult<()> {
    match acc {
        Some(current) => alpha_composite_in_place(current, layer),
        None => {
            *acc = Some(layer.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
