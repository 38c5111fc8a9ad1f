//! Application state holding the wgpu graphics context
//!
//! Owns the device, surface, composite canvas, loaded images, and the
//! egui integration. Each tick samples the three UI controls into a
//! [`FrameParams`] snapshot and hands it to the compositor.

use std::sync::Arc;
use std::time::Instant;

use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::compositor::{BlendMode, Compositor, FrameParams, LayerTexture, CANVAS_FORMAT};
use crate::error::StartupError;
use crate::settings::AppSettings;

/// Main application state
pub struct App {
    /// Reference to the window
    window: Arc<Window>,
    /// The wgpu surface for presenting rendered frames
    surface: wgpu::Surface<'static>,
    /// The wgpu device for creating GPU resources
    device: wgpu::Device,
    /// The command queue for submitting GPU work
    queue: wgpu::Queue,
    /// Surface configuration
    config: wgpu::SurfaceConfiguration,
    /// Current window size in physical pixels
    size: PhysicalSize<u32>,

    // Compositing
    compositor: Compositor,
    background: LayerTexture,
    overlay: LayerTexture,
    layers: Vec<LayerTexture>,

    // Offscreen canvas the compositor renders into
    canvas_view: wgpu::TextureView,
    canvas_bind_group: wgpu::BindGroup,

    // Present pass (canvas -> window surface)
    present_pipeline: wgpu::RenderPipeline,
    present_bind_group_layout: wgpu::BindGroupLayout,

    // UI-controlled frame parameters
    blend_mode: BlendMode,
    layer_count: usize,
    alpha: f32,

    // egui integration
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,

    // Frame timing
    fps: f64,
    last_fps_update: Instant,
    frames_since_update: u64,
}

impl App {
    /// Create a new App instance with initialized wgpu context and all
    /// images loaded. Any failure here is fatal.
    pub async fn new(window: Arc<Window>, settings: &AppSettings) -> Result<Self, StartupError> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| StartupError::Gpu(format!("failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| StartupError::Gpu("no suitable GPU adapter".to_string()))?;

        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Screen Blend Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| StartupError::Gpu(format!("failed to create device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        log::info!("Surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };

        surface.configure(&device, &config);

        let compositor = Compositor::new(&device);

        // Load all images up front; they are immutable for the process
        // lifetime.
        let background = LayerTexture::load(
            &device,
            &queue,
            compositor.layer_bind_group_layout(),
            compositor.sampler(),
            &settings.background,
            config.width,
            config.height,
        )?;
        let overlay = LayerTexture::load(
            &device,
            &queue,
            compositor.layer_bind_group_layout(),
            compositor.sampler(),
            &settings.overlay,
            config.width,
            config.height,
        )?;
        let mut layers = Vec::with_capacity(settings.layers.len());
        for path in &settings.layers {
            layers.push(LayerTexture::load(
                &device,
                &queue,
                compositor.layer_bind_group_layout(),
                compositor.sampler(),
                path,
                config.width,
                config.height,
            )?);
        }
        log::info!("Loaded {} extra layers", layers.len());

        // Present pipeline (blit the canvas to the window surface)
        let present_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Passthrough Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/passthrough.wgsl").into()),
        });

        let present_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Present Bind Group Layout"),
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
                ],
            });

        let present_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Present Pipeline Layout"),
                bind_group_layouts: &[&present_bind_group_layout],
                push_constant_ranges: &[],
            });

        let present_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Present Pipeline"),
            layout: Some(&present_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &present_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &present_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
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

        let (canvas_view, canvas_bind_group) = Self::create_canvas(
            &device,
            &present_bind_group_layout,
            compositor.sampler(),
            config.width,
            config.height,
        );

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let mut style = (*egui_ctx.style()).clone();
        style.visuals.window_shadow = egui::epaint::Shadow::NONE;
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        let max_layers = layers.len();

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            compositor,
            background,
            overlay,
            layers,
            canvas_view,
            canvas_bind_group,
            present_pipeline,
            present_bind_group_layout,
            blend_mode: settings.blend_mode,
            layer_count: max_layers,
            alpha: 1.0,
            egui_ctx,
            egui_state,
            egui_renderer,
            fps: 60.0,
            last_fps_update: Instant::now(),
            frames_since_update: 0,
        })
    }

    /// Create the offscreen composite canvas and its present bind group.
    fn create_canvas(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> (wgpu::TextureView, wgpu::BindGroup) {
        let canvas = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CANVAS_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = canvas.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        (view, bind_group)
    }

    /// Handle a window event, returning true if egui consumed it
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(&self.window, event);
        response.consumed
    }

    /// Resize the surface and the composite canvas, and refresh every
    /// layer's centered-fill rectangle for the new target size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);

            let (canvas_view, canvas_bind_group) = Self::create_canvas(
                &self.device,
                &self.present_bind_group_layout,
                self.compositor.sampler(),
                new_size.width,
                new_size.height,
            );
            self.canvas_view = canvas_view;
            self.canvas_bind_group = canvas_bind_group;

            for texture in std::iter::once(&self.background)
                .chain(std::iter::once(&self.overlay))
                .chain(self.layers.iter())
            {
                texture.update_fit(&self.queue, new_size.width, new_size.height);
            }
        }
    }

    /// Get current size
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Select a blend mode (keyboard shortcut path)
    pub fn select_blend_mode(&mut self, mode: BlendMode) {
        if self.blend_mode != mode {
            self.blend_mode = mode;
            log::info!("Blend mode: {}", mode);
        }
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Snapshot the UI-controlled values for this tick.
    fn frame_params(&self) -> FrameParams {
        FrameParams::new(
            self.blend_mode,
            self.layer_count,
            self.alpha,
            self.layers.len(),
        )
    }

    /// Render a frame
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let params = self.frame_params();
        self.compositor.render_frame(
            &self.queue,
            &mut encoder,
            &self.canvas_view,
            &params,
            &self.background,
            &self.overlay,
            &self.layers,
        );

        // Present the canvas to the window
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
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

            render_pass.set_pipeline(&self.present_pipeline);
            render_pass.set_bind_group(0, &self.canvas_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        // Render egui UI
        self.render_ui(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.update_fps();

        Ok(())
    }

    fn render_ui(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let raw_input = self.egui_state.take_egui_input(&self.window);

        let mut blend_mode = self.blend_mode;
        let mut layer_count = self.layer_count;
        let mut alpha = self.alpha;
        let max_layers = self.layers.len();
        let fps = self.fps;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::SidePanel::left("controls").show(ctx, |ui| {
                ui.heading("Blend");
                ui.separator();

                egui::ComboBox::from_label("Mode")
                    .selected_text(blend_mode.name())
                    .show_ui(ui, |ui| {
                        for mode in BlendMode::all() {
                            ui.selectable_value(&mut blend_mode, *mode, mode.name());
                        }
                    });

                ui.add(egui::Slider::new(&mut layer_count, 0..=max_layers).text("Layers"));

                ui.add(egui::Slider::new(&mut alpha, 0.0..=1.0).text("Alpha"));

                ui.separator();
                ui.label(format!("FPS: {:.1}", fps));
            });
        });

        if blend_mode != self.blend_mode {
            log::info!("Blend mode: {}", blend_mode);
        }
        self.blend_mode = blend_mode;
        self.layer_count = layer_count.min(max_layers);
        self.alpha = alpha.clamp(0.0, 1.0);

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let render_pass_static: &mut wgpu::RenderPass<'static> =
                unsafe { std::mem::transmute(&mut render_pass) };

            self.egui_renderer
                .render(render_pass_static, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    fn update_fps(&mut self) {
        self.frames_since_update += 1;

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_fps_update).as_secs_f64();
        if elapsed >= 1.0 {
            self.fps = self.frames_since_update as f64 / elapsed;
            self.frames_since_update = 0;
            self.last_fps_update = now;
        }
    }
}
