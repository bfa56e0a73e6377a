//! Tests for the viewport helpers behind click boxes.

use test_utils::assert_approx_eq;
use wms_common::bbox::{rotated_viewport, BoundingBox};

// ============================================================================
// Viewport tests
// ============================================================================

#[test]
fn test_click_viewport_101_pixels() {
    // One pixel = 0.01 degrees, 101x101 viewport around the click
    let ring = rotated_viewport([-91.0, 37.0], 0.01, 0.0, [101.0, 101.0]);
    let bbox = BoundingBox::enclosing(&ring).unwrap();
    assert_approx_eq!(bbox.min_x, -91.505, 1e-9);
    assert_approx_eq!(bbox.max_x, -90.495, 1e-9);
    assert_approx_eq!(bbox.min_y, 36.495, 1e-9);
    assert_approx_eq!(bbox.max_y, 37.505, 1e-9);
}

#[test]
fn test_quarter_turn_swaps_extent() {
    let ring = rotated_viewport([0.0, 0.0], 1.0, std::f64::consts::FRAC_PI_2, [4.0, 2.0]);
    let bbox = BoundingBox::enclosing(&ring).unwrap();
    assert_approx_eq!(bbox.max_x - bbox.min_x, 2.0, 1e-9);
    assert_approx_eq!(bbox.max_y - bbox.min_y, 4.0, 1e-9);
}

#[test]
fn test_enclosing_empty() {
    assert!(BoundingBox::enclosing(&[]).is_none());
}
