//! Screen Blend - Main Entry Point
//!
//! Window and event-loop host for the blend-mode compositing demo.

use std::sync::Arc;
use std::time::{Duration, Instant};

use screen_blend::compositor::BlendMode;
use screen_blend::settings::AppSettings;
use screen_blend::App;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "Screen Blend";
const SETTINGS_PATH: &str = "settings.json";
const TARGET_FPS: u32 = 60;

/// Application state machine
enum AppState {
    /// Initial state before window is created
    Uninitialized,
    /// Window and graphics context are ready
    Running { window: Arc<Window>, app: App },
}

/// Main application handler implementing winit's ApplicationHandler trait
struct ScreenBlendApp {
    settings: AppSettings,
    state: AppState,
    next_redraw_at: Instant,
}

impl ScreenBlendApp {
    fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            state: AppState::Uninitialized,
            next_redraw_at: Instant::now(),
        }
    }
}

impl ApplicationHandler for ScreenBlendApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Only initialize if we haven't already
        if let AppState::Uninitialized = &self.state {
            log::info!("Creating window...");

            let window_attributes = WindowAttributes::default()
                .with_title(WINDOW_TITLE)
                .with_inner_size(LogicalSize::new(
                    self.settings.window_width,
                    self.settings.window_height,
                ));

            let window = Arc::new(
                event_loop
                    .create_window(window_attributes)
                    .expect("Failed to create window"),
            );

            log::info!(
                "Window created: {}x{}",
                window.inner_size().width,
                window.inner_size().height
            );

            // Initialize wgpu, egui, and all image resources. Any failure
            // here is fatal; there is no partial-rendering fallback.
            log::info!("Initializing wgpu and egui...");
            let app = match pollster::block_on(App::new(window.clone(), &self.settings)) {
                Ok(app) => app,
                Err(e) => {
                    log::error!("Startup failed: {}", e);
                    std::process::exit(1);
                }
            };

            log::info!("Screen Blend ready!");
            log::info!("Press ESC to exit, F11 for fullscreen, 1-3 to select blend mode");

            self.state = AppState::Running { window, app };
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Only handle events if we're running
        let AppState::Running { window, app } = &mut self.state else {
            return;
        };

        // Let egui handle the event first
        let egui_consumed = app.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                self.settings.blend_mode = app.blend_mode();
                if let Err(e) = self.settings.save(std::path::Path::new(SETTINGS_PATH)) {
                    log::warn!("Failed to save settings: {}", e);
                }
                event_loop.exit();
            }

            // Handle keyboard input (only if egui doesn't want it)
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } if !egui_consumed => {
                match key_code {
                    KeyCode::Escape => {
                        log::info!("Escape pressed, exiting...");
                        event_loop.exit();
                    }
                    KeyCode::F11 => {
                        let fullscreen = window.fullscreen();
                        if fullscreen.is_some() {
                            window.set_fullscreen(None);
                            log::info!("Exiting fullscreen");
                        } else {
                            window.set_fullscreen(Some(winit::window::Fullscreen::Borderless(
                                None,
                            )));
                            log::info!("Entering fullscreen");
                        }
                    }
                    // 1-3 to select blend modes
                    KeyCode::Digit1 => app.select_blend_mode(BlendMode::Alpha),
                    KeyCode::Digit2 => app.select_blend_mode(BlendMode::Additive),
                    KeyCode::Digit3 => app.select_blend_mode(BlendMode::Screen),
                    _ => {}
                }
            }

            WindowEvent::Resized(physical_size) => {
                app.resize(physical_size);
            }

            WindowEvent::RedrawRequested => {
                match app.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        log::warn!("Surface lost, reconfiguring...");
                        app.resize(app.size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {:?}", e);
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Running { window, .. } = &mut self.state else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        // Drive redraws at target FPS
        let frame_duration = Duration::from_nanos(1_000_000_000u64 / TARGET_FPS as u64);
        let now = Instant::now();

        if now >= self.next_redraw_at {
            window.request_redraw();
            self.next_redraw_at += frame_duration;

            // Reset if too far behind
            if now > self.next_redraw_at + frame_duration * 2 {
                self.next_redraw_at = now + frame_duration;
            }
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_redraw_at));
    }
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Screen Blend v0.1.0");

    let settings = match AppSettings::load(std::path::Path::new(SETTINGS_PATH)) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    // Create event loop
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    // Create and run application
    let mut app = ScreenBlendApp::new(settings);
    event_loop.run_app(&mut app).expect("Event loop error");
}
