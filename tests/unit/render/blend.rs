use super::*;

#[test]
fn over_opaque_source_replaces() {
    assert_eq!(over_straight([1, 2, 3, 255], [9, 8, 7, 255]), [9, 8, 7, 255]);
}

#[test]
fn over_transparent_source_keeps_destination() {
    assert_eq!(over_straight([1, 2, 3, 200], [9, 8, 7, 0]), [1, 2, 3, 200]);
}

#[test]
fn over_transparent_destination_keeps_straight_color() {
    assert_eq!(over_straight([0, 0, 0, 0], [200, 100, 50, 128]), [200, 100, 50, 128]);
}

#[test]
fn half_red_over_opaque_blue() {
    let out = over_straight([0, 0, 255, 255], [255, 0, 0, 128]);
    assert_eq!(out[3], 255);
    assert_eq!(out[0], 128);
    assert_eq!(out[1], 0);
    assert_eq!(out[2], 127);
}

#[test]
fn composite_in_place_rejects_mismatch() {
    let mut a = FrameRGBA::transparent(2, 2);
    let b = FrameRGBA::transparent(3, 2);
    assert!(alpha_composite_in_place(&mut a, &b).is_err());
}

#[test]
fn accumulate_starts_with_copy() {
    let layer = FrameRGBA::solid(2, 1, [5, 6, 7, 100]);
    let mut acc = None;
    accumulate(&mut acc, &layer).unwrap();
    assert_eq!(acc.as_ref(), Some(&layer));

    accumulate(&mut acc, &FrameRGBA::solid(2, 1, [1, 1, 1, 255])).unwrap();
    assert_eq!(acc.unwrap().pixel(1, 0), [1, 1, 1, 255]);
}
