//! Screen Blend - interactive blend-mode compositing demo
//!
//! Composites an overlay and a variable stack of image layers over a
//! background using Alpha, Additive, or Screen blending. Screen mode is
//! emulated with complement-output fragments, multiplicative blending,
//! and two full-target inversion passes per frame.

pub mod app;
pub mod compositor;
pub mod error;
pub mod settings;

pub use app::App;
