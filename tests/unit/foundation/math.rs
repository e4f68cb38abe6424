use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(0, 200), 0);
    assert_eq!(mul_div255_u8(255, 128), 128);
}

#[test]
fn lerp_endpoints() {
    assert_eq!(lerp_u8(10, 200, 0), 10);
    assert_eq!(lerp_u8(10, 200, 255), 200);
    assert_eq!(unit_to_u8_weight(2.0), 255);
    assert_eq!(unit_to_u8_weight(-1.0), 0);
}
