//! Centered-fill texture fitting
//!
//! Every image draw stretches a UV sub-rectangle of the source over the
//! full target, so the fit is computed in UV space: scale the source
//! uniformly until it covers the target, crop the longer axis, center.
//! Never letterbox, never stretch non-uniformly.

/// Compute the UV sub-rectangle `[u, v, u_width, v_height]` of a
/// `src_w × src_h` source that yields a centered scale-and-crop fill of a
/// `dst_w × dst_h` target.
///
/// At least one of `u_width` / `v_height` is 1.0 (the axis that fills the
/// target exactly); the other is the cropped fraction, centered.
/// Degenerate dimensions fall back to the full texture.
pub fn fill_uv_rect(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> [f32; 4] {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return [0.0, 0.0, 1.0, 1.0];
    }

    let src_w = src_w as f32;
    let src_h = src_h as f32;
    let dst_w = dst_w as f32;
    let dst_h = dst_h as f32;

    // Uniform scale covering the whole target
    let scale = (dst_w / src_w).max(dst_h / src_h);

    // Source extent visible through the target at that scale
    let u_width = (dst_w / scale / src_w).min(1.0);
    let v_height = (dst_h / scale / src_h).min(1.0);

    [(1.0 - u_width) * 0.5, (1.0 - v_height) * 0.5, u_width, v_height]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
    }

    #[test]
    fn test_matching_aspect_uses_full_texture() {
        let rect = fill_uv_rect(800, 400, 800, 400);
        assert_eq!(rect, [0.0, 0.0, 1.0, 1.0]);

        let rect = fill_uv_rect(1600, 800, 800, 400);
        assert_eq!(rect, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_narrow_source_crops_vertically() {
        // Source is narrower than the target aspect: the horizontal extent
        // must fill completely and the vertical extent gets cropped.
        let rect = fill_uv_rect(400, 400, 800, 400);
        assert_close(rect[2], 1.0);
        assert_close(rect[3], 0.5);
        assert_close(rect[0], 0.0);
        assert_close(rect[1], 0.25);
    }

    #[test]
    fn test_wide_source_crops_horizontally() {
        let rect = fill_uv_rect(1600, 400, 800, 400);
        assert_close(rect[3], 1.0);
        assert_close(rect[2], 0.5);
        assert_close(rect[1], 0.0);
        assert_close(rect[0], 0.25);
    }

    #[test]
    fn test_always_covers_no_letterbox() {
        // One axis always spans the full UV range; both stay within [0, 1].
        for &(sw, sh, dw, dh) in &[
            (100u32, 900u32, 800u32, 400u32),
            (1920, 1080, 800, 400),
            (333, 777, 1024, 768),
            (50, 50, 800, 400),
        ] {
            let [u, v, uw, vh] = fill_uv_rect(sw, sh, dw, dh);
            assert!(uw > 0.0 && uw <= 1.0);
            assert!(vh > 0.0 && vh <= 1.0);
            assert!((uw - 1.0).abs() < 1e-5 || (vh - 1.0).abs() < 1e-5);
            assert!(u >= 0.0 && u + uw <= 1.0 + 1e-5);
            assert!(v >= 0.0 && v + vh <= 1.0 + 1e-5);
            // Centered crop
            assert_close(u * 2.0 + uw, 1.0);
            assert_close(v * 2.0 + vh, 1.0);
        }
    }

    #[test]
    fn test_degenerate_dimensions_fall_back() {
        assert_eq!(fill_uv_rect(0, 100, 800, 400), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(fill_uv_rect(100, 100, 0, 400), [0.0, 0.0, 1.0, 1.0]);
    }
}
