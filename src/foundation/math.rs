pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y).min(255) as u8
}

/// Linear interpolation between two channel values, `t` in `[0, 255]`.
pub(crate) fn lerp_u8(a: u8, b: u8, t: u16) -> u8 {
    let t = t.min(255);
    let av = mul_div255_u16(u16::from(a), 255 - t);
    let bv = mul_div255_u16(u16::from(b), t);
    (av + bv).min(255) as u8
}

/// Convert a unit-interval factor into a `[0, 255]` weight.
pub(crate) fn unit_to_u8_weight(t: f64) -> u16 {
    (t.clamp(0.0, 1.0) * 255.0).round() as u16
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
