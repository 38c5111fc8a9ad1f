//! Blend mode definitions and utilities
//!
//! Defines the three selectable compositing modes and their wgpu blend
//! state configurations, including the multiplicative and inversion states
//! used by the Screen trick.

use serde::{Deserialize, Serialize};

/// Blend modes for compositing the overlay and layer stack over the
/// background.
///
/// Alpha and Additive map directly onto a per-draw blend function. Screen
/// has no native blend equation; it is emulated by drawing the photometric
/// complement of each source with [`SCREEN_ACCUMULATE`], bracketed by two
/// full-target [`INVERT`] passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Straight alpha blending (Porter-Duff source-over)
    /// Result = Source × SourceAlpha + Dest × (1 - SourceAlpha)
    #[default]
    Alpha,

    /// Additive blending
    /// Result = Source × SourceAlpha + Dest
    /// The destination is never attenuated
    Additive,

    /// Screen blending
    /// Result = 1 - (1 - Source) × (1 - Dest)
    /// Lightens the image; emulated via complement output + multiply
    Screen,
}

/// Multiplicative blend state for the Screen accumulation draws.
///
/// The fragment stage outputs `1 - src`, so `dst' = output × dst` computes
/// `(1 - src) × dst` per channel, for color and alpha independently.
pub const SCREEN_ACCUMULATE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Dst,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::DstAlpha,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Inversion blend state: a solid white full-target draw with this state
/// replaces the target with its complement, `dst' = 1 - dst`.
pub const INVERT: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::OneMinusDst,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::OneMinusDstAlpha,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    },
};

impl BlendMode {
    /// Blend state for the direct draw paths (Alpha, Additive).
    ///
    /// Screen draws do not use this state; they go through the
    /// complement-output pipeline with [`SCREEN_ACCUMULATE`].
    pub fn to_blend_state(self) -> wgpu::BlendState {
        match self {
            BlendMode::Alpha => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                    operation: wgpu::BlendOperation::Add,
                },
            },

            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },

            // Screen accumulation state; surfaces drawn with this state must
            // come from the complement fragment entry point and be bracketed
            // by two INVERT passes.
            BlendMode::Screen => SCREEN_ACCUMULATE,
        }
    }

    /// Get a human-readable name for the blend mode
    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Alpha => "Alpha",
            BlendMode::Additive => "Additive",
            BlendMode::Screen => "Screen",
        }
    }

    /// Get all available blend modes
    pub fn all() -> &'static [BlendMode] {
        &[BlendMode::Alpha, BlendMode::Additive, BlendMode::Screen]
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_mode_default() {
        assert_eq!(BlendMode::default(), BlendMode::Alpha);
    }

    #[test]
    fn test_blend_mode_names() {
        assert_eq!(BlendMode::Alpha.name(), "Alpha");
        assert_eq!(BlendMode::Additive.name(), "Additive");
        assert_eq!(BlendMode::Screen.name(), "Screen");
    }

    #[test]
    fn test_blend_mode_display() {
        assert_eq!(format!("{}", BlendMode::Alpha), "Alpha");
        assert_eq!(format!("{}", BlendMode::Screen), "Screen");
    }

    #[test]
    fn test_blend_mode_all() {
        let all = BlendMode::all();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&BlendMode::Alpha));
        assert!(all.contains(&BlendMode::Additive));
        assert!(all.contains(&BlendMode::Screen));
    }

    #[test]
    fn test_additive_never_attenuates_destination() {
        let state = BlendMode::Additive.to_blend_state();
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(state.alpha.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn test_screen_accumulate_is_multiplicative() {
        assert_eq!(SCREEN_ACCUMULATE.color.src_factor, wgpu::BlendFactor::Dst);
        assert_eq!(SCREEN_ACCUMULATE.color.dst_factor, wgpu::BlendFactor::Zero);
        assert_eq!(
            SCREEN_ACCUMULATE.alpha.src_factor,
            wgpu::BlendFactor::DstAlpha
        );
        assert_eq!(SCREEN_ACCUMULATE.alpha.dst_factor, wgpu::BlendFactor::Zero);
    }

    #[test]
    fn test_invert_state_complements_destination() {
        assert_eq!(INVERT.color.src_factor, wgpu::BlendFactor::OneMinusDst);
        assert_eq!(INVERT.color.dst_factor, wgpu::BlendFactor::Zero);
        assert_eq!(
            INVERT.alpha.src_factor,
            wgpu::BlendFactor::OneMinusDstAlpha
        );
        assert_eq!(INVERT.alpha.dst_factor, wgpu::BlendFactor::Zero);
    }
}
