//! Frame compositing
//!
//! Renders one frame per tick: background first (opaque, centered fill),
//! then the overlay and the active layers under the selected blend mode,
//! all tinted by the global alpha override. Screen mode brackets its
//! multiplicative accumulation between two full-target inversion passes,
//! which is what turns a chain of `(1-src)*dst` updates into true
//! `1 - (1-src)(1-dst)` Screen blends.

pub mod blend;
pub mod fit;
pub mod layer;
pub mod params;

pub use blend::BlendMode;
pub use layer::LayerTexture;
pub use params::FrameParams;

/// Pixel format of the composite canvas.
///
/// Must carry an alpha channel: the Screen trick blends against
/// destination alpha.
pub const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// One draw operation in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStep {
    /// Opaque background, blending disabled
    Background,
    /// Full-target inversion (Screen bracketing)
    Invert,
    /// The fixed overlay image, blended per the active mode
    Overlay,
    /// The i-th extra layer, blended per the active mode
    Layer(usize),
}

/// Enumerate the ordered draw steps for one frame.
///
/// Screen mode issues its two inversion passes even when `layer_count`
/// is zero; the passes cancel out, matching the observed behavior of the
/// technique rather than special-casing it away.
pub fn frame_plan(mode: BlendMode, layer_count: usize) -> Vec<DrawStep> {
    let mut plan = Vec::with_capacity(layer_count + 4);
    plan.push(DrawStep::Background);

    if mode == BlendMode::Screen {
        plan.push(DrawStep::Invert);
    }

    plan.push(DrawStep::Overlay);
    for i in 0..layer_count {
        plan.push(DrawStep::Layer(i));
    }

    if mode == BlendMode::Screen {
        plan.push(DrawStep::Invert);
    }

    plan
}

/// Uniform data shared by every tinted draw in a frame.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    tint: [f32; 4],
}

/// Owns the compositing pipelines and issues the per-frame draw sequence.
pub struct Compositor {
    sampler: wgpu::Sampler,
    layer_bind_group_layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    opaque_pipeline: wgpu::RenderPipeline,
    alpha_pipeline: wgpu::RenderPipeline,
    additive_pipeline: wgpu::RenderPipeline,
    screen_pipeline: wgpu::RenderPipeline,
    invert_pipeline: wgpu::RenderPipeline,
}

impl Compositor {
    pub fn new(device: &wgpu::Device) -> Self {
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/composite.wgsl").into()),
        });

        let invert_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Invert Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/invert.wgsl").into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Layer Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let layer_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Layer Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &layer_bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, entry: &str, blend: Option<wgpu::BlendState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&composite_layout),
                vertex: wgpu::VertexState {
                    module: &composite_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &composite_shader,
                    entry_point: Some(entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: CANVAS_FORMAT,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let opaque_pipeline = make_pipeline("Opaque Pipeline", "fs_opaque", None);
        let alpha_pipeline = make_pipeline(
            "Alpha Pipeline",
            "fs_tinted",
            Some(BlendMode::Alpha.to_blend_state()),
        );
        let additive_pipeline = make_pipeline(
            "Additive Pipeline",
            "fs_tinted",
            Some(BlendMode::Additive.to_blend_state()),
        );
        let screen_pipeline = make_pipeline(
            "Screen Pipeline",
            "fs_complement",
            Some(blend::SCREEN_ACCUMULATE),
        );

        // Group 0 stays in the layout so the frame bind group remains
        // compatible across pipeline switches within a pass.
        let invert_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Invert Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout],
            push_constant_ranges: &[],
        });

        let invert_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Invert Pipeline"),
            layout: Some(&invert_layout),
            vertex: wgpu::VertexState {
                module: &invert_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &invert_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: CANVAS_FORMAT,
                    blend: Some(blend::INVERT),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            sampler,
            layer_bind_group_layout,
            frame_buffer,
            frame_bind_group,
            opaque_pipeline,
            alpha_pipeline,
            additive_pipeline,
            screen_pipeline,
            invert_pipeline,
        }
    }

    /// Layout for per-layer bind groups created by [`LayerTexture::load`].
    pub fn layer_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layer_bind_group_layout
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Render one composited frame into `target`.
    ///
    /// `params.layer_count` must not exceed `layers.len()`; violating that
    /// is a programming error upstream, not a recoverable condition.
    pub fn render_frame(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        params: &FrameParams,
        background: &LayerTexture,
        overlay: &LayerTexture,
        layers: &[LayerTexture],
    ) {
        assert!(
            params.layer_count <= layers.len(),
            "layer_count {} exceeds layer stack size {}",
            params.layer_count,
            layers.len()
        );

        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniform {
                tint: [1.0, 1.0, 1.0, params.alpha],
            }),
        );

        let surface_pipeline = match params.blend_mode {
            BlendMode::Alpha => &self.alpha_pipeline,
            BlendMode::Additive => &self.additive_pipeline,
            BlendMode::Screen => &self.screen_pipeline,
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for step in frame_plan(params.blend_mode, params.layer_count) {
            match step {
                DrawStep::Background => {
                    pass.set_pipeline(&self.opaque_pipeline);
                    pass.set_bind_group(1, background.bind_group(), &[]);
                    pass.draw(0..3, 0..1);
                }
                DrawStep::Invert => {
                    pass.set_pipeline(&self.invert_pipeline);
                    pass.draw(0..3, 0..1);
                }
                DrawStep::Overlay => {
                    pass.set_pipeline(surface_pipeline);
                    pass.set_bind_group(1, overlay.bind_group(), &[]);
                    pass.draw(0..3, 0..1);
                }
                DrawStep::Layer(i) => {
                    pass.set_pipeline(surface_pipeline);
                    pass.set_bind_group(1, layers[i].bind_group(), &[]);
                    pass.draw(0..3, 0..1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_count(plan: &[DrawStep]) -> (usize, usize, usize, usize) {
        let background = plan.iter().filter(|s| **s == DrawStep::Background).count();
        let invert = plan.iter().filter(|s| **s == DrawStep::Invert).count();
        let overlay = plan.iter().filter(|s| **s == DrawStep::Overlay).count();
        let layers = plan
            .iter()
            .filter(|s| matches!(s, DrawStep::Layer(_)))
            .count();
        (background, invert, overlay, layers)
    }

    #[test]
    fn test_plan_draws_exactly_k_layers() {
        for mode in BlendMode::all().iter().copied() {
            for k in 0..=4 {
                let plan = frame_plan(mode, k);
                let (background, _, overlay, layers) = surface_count(&plan);
                assert_eq!(background, 1, "{mode} k={k}");
                assert_eq!(overlay, 1, "{mode} k={k}");
                assert_eq!(layers, k, "{mode} k={k}");
            }
        }
    }

    #[test]
    fn test_plan_layer_order() {
        let plan = frame_plan(BlendMode::Alpha, 3);
        assert_eq!(
            plan,
            vec![
                DrawStep::Background,
                DrawStep::Overlay,
                DrawStep::Layer(0),
                DrawStep::Layer(1),
                DrawStep::Layer(2),
            ]
        );
    }

    #[test]
    fn test_screen_plan_brackets_with_inversions() {
        let plan = frame_plan(BlendMode::Screen, 2);
        assert_eq!(
            plan,
            vec![
                DrawStep::Background,
                DrawStep::Invert,
                DrawStep::Overlay,
                DrawStep::Layer(0),
                DrawStep::Layer(1),
                DrawStep::Invert,
            ]
        );
    }

    #[test]
    fn test_screen_plan_inverts_even_with_zero_layers() {
        // Observed behavior: the bracketing passes are issued regardless of
        // layer count and cancel out when nothing is drawn between them.
        let plan = frame_plan(BlendMode::Screen, 0);
        let (_, invert, _, _) = surface_count(&plan);
        assert_eq!(invert, 2);
        assert_eq!(plan.first(), Some(&DrawStep::Background));
        assert_eq!(plan.last(), Some(&DrawStep::Invert));
    }

    #[test]
    fn test_non_screen_plans_never_invert() {
        for k in 0..=4 {
            let (_, invert, _, _) = surface_count(&frame_plan(BlendMode::Alpha, k));
            assert_eq!(invert, 0);
            let (_, invert, _, _) = surface_count(&frame_plan(BlendMode::Additive, k));
            assert_eq!(invert, 0);
        }
    }

    // CPU reference model of the per-channel blend arithmetic, used to
    // verify the algebra behind the GPU configuration.
    mod reference {
        /// Direct Screen formula
        pub fn screen(src: f32, dst: f32) -> f32 {
            1.0 - (1.0 - src) * (1.0 - dst)
        }

        /// Straight alpha source-over for one channel
        pub fn alpha_over(src: f32, src_a: f32, dst: f32) -> f32 {
            src * src_a + dst * (1.0 - src_a)
        }

        /// Additive: source scaled by alpha, destination untouched
        pub fn additive(src: f32, src_a: f32, dst: f32) -> f32 {
            src * src_a + dst
        }

        /// The GPU emulation: invert, multiply complements in, invert back.
        pub fn screen_chain(dst: f32, sources: &[f32]) -> f32 {
            let mut value = 1.0 - dst;
            for &src in sources {
                // fs_complement output times destination
                value *= 1.0 - src;
            }
            1.0 - value
        }
    }

    #[test]
    fn test_screen_reference_value() {
        // spec'd sample: screen(0.5, 0.5) = 0.75
        assert!((reference::screen(0.5, 0.5) - 0.75).abs() < 1e-6);
        assert_eq!(reference::screen(0.0, 0.0), 0.0);
        assert_eq!(reference::screen(1.0, 0.25), 1.0);
    }

    #[test]
    fn test_inversion_bracket_equals_true_screen_chain() {
        let dst = 0.3;
        let sources = [0.5, 0.2, 0.8];

        let mut expected = dst;
        for &src in &sources {
            expected = reference::screen(src, expected);
        }

        let emulated = reference::screen_chain(dst, &sources);
        assert!((emulated - expected).abs() < 1e-6);
    }

    #[test]
    fn test_screen_chain_with_no_sources_is_identity() {
        for &dst in &[0.0, 0.25, 0.6, 1.0] {
            assert!((reference::screen_chain(dst, &[]) - dst).abs() < 1e-6);
        }
    }

    #[test]
    fn test_additive_black_leaves_destination_unchanged() {
        for &dst in &[0.0, 0.4, 1.0] {
            assert_eq!(reference::additive(0.0, 1.0, dst), dst);
        }
    }

    #[test]
    fn test_alpha_transparent_leaves_destination_unchanged() {
        for &dst in &[0.0, 0.4, 1.0] {
            assert_eq!(reference::alpha_over(0.7, 0.0, dst), dst);
        }
    }

    #[test]
    fn test_zero_alpha_override_contributes_nothing() {
        // Tint (1,1,1,0) zeroes source alpha. Alpha and additive draws
        // degenerate to no-ops through the SrcAlpha factor; screen draws
        // premultiply by alpha before complementing, so their effective
        // source is 0 and the multiplicative update is identity.
        assert_eq!(reference::alpha_over(0.7, 0.0, 0.4), 0.4);
        assert_eq!(reference::additive(0.7, 0.0, 0.4), 0.4);
        assert!((reference::screen_chain(0.4, &[0.7 * 0.0]) - 0.4).abs() < 1e-6);
    }
}
