//! Per-tick frame parameters
//!
//! The UI writes a fresh snapshot of these values every tick; the
//! compositor only reads them. No shared mutable globals.

use super::blend::BlendMode;

/// Snapshot of the three UI-controlled values consumed by
/// [`Compositor::render_frame`](super::Compositor::render_frame).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Active blend mode for the overlay and layer draws
    pub blend_mode: BlendMode,
    /// Number of extra layers to draw, `0..=max_layers`
    pub layer_count: usize,
    /// Global alpha override applied as a tint to every non-background draw
    pub alpha: f32,
}

impl FrameParams {
    /// Build a snapshot, clamping `layer_count` into `0..=max_layers` and
    /// `alpha` into `[0, 1]`.
    pub fn new(blend_mode: BlendMode, layer_count: usize, alpha: f32, max_layers: usize) -> Self {
        Self {
            blend_mode,
            layer_count: layer_count.min(max_layers),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::default(),
            layer_count: 0,
            alpha: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_count_clamped_to_stack_size() {
        let params = FrameParams::new(BlendMode::Alpha, 10, 1.0, 4);
        assert_eq!(params.layer_count, 4);

        let params = FrameParams::new(BlendMode::Alpha, 2, 1.0, 4);
        assert_eq!(params.layer_count, 2);

        let params = FrameParams::new(BlendMode::Alpha, 0, 1.0, 4);
        assert_eq!(params.layer_count, 0);
    }

    #[test]
    fn test_alpha_clamped_to_unit_range() {
        let params = FrameParams::new(BlendMode::Screen, 0, 1.5, 4);
        assert_eq!(params.alpha, 1.0);

        let params = FrameParams::new(BlendMode::Screen, 0, -0.25, 4);
        assert_eq!(params.alpha, 0.0);

        let params = FrameParams::new(BlendMode::Screen, 0, 0.5, 4);
        assert_eq!(params.alpha, 0.5);
    }

    #[test]
    fn test_default_params() {
        let params = FrameParams::default();
        assert_eq!(params.blend_mode, BlendMode::Alpha);
        assert_eq!(params.layer_count, 0);
        assert_eq!(params.alpha, 1.0);
    }
}
