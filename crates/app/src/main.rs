//! Demo application: two textured OBJ models lit by an orbiting point light,
//! with a WASD/arrow-key fly camera.

use std::path::Path;

use anyhow::Result;
use glam::{Mat4, Vec3};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowId;

use ember_core::Timer;
use ember_platform::{InputState, Window};
use ember_render::{Material, Renderer};
use ember_resources::Model;
use ember_scene::{Camera, ObjectId, ObjectRegistry};

mod controller;
use controller::KeyboardMovementController;

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;
const WINDOW_TITLE: &str = "Vulkan Tutorial";

struct App {
    window: Option<Window>,
    renderer: Option<Renderer>,
    registry: ObjectRegistry,
    camera: Camera,
    viewer: ObjectId,
    controller: KeyboardMovementController,
    input: InputState,
    timer: Timer,
}

impl App {
    fn new() -> Self {
        let mut registry = ObjectRegistry::new();
        // The viewer carries no mesh or light; it only drives the camera.
        let viewer = registry.create_object();
        viewer.transform.translation.z = -2.5;
        let viewer = viewer.id();

        Self {
            window: None,
            renderer: None,
            registry,
            camera: Camera::new(),
            viewer,
            controller: KeyboardMovementController::new(),
            input: InputState::new(),
            timer: Timer::new(),
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Window::new(event_loop, WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_TITLE)?;
        let mut renderer = Renderer::new(&window)?;
        self.load_scene(&mut renderer)?;

        self.renderer = Some(renderer);
        self.window = Some(window);
        // Device and asset setup took a while; don't count it as frame time.
        self.timer.reset();
        info!("Initialization complete, entering main loop");
        Ok(())
    }

    fn load_scene(&mut self, renderer: &mut Renderer) -> Result<()> {
        let material = Material {
            diffuse: Some(renderer.load_texture(Path::new("assets/textures/diffuse2.png"))?),
            normal: Some(renderer.load_texture(Path::new("assets/textures/normal2.png"))?),
            ambient_occlusion: Some(renderer.load_texture(Path::new("assets/textures/ao2.png"))?),
            roughness: Some(renderer.load_texture(Path::new("assets/textures/roughness2.png"))?),
            metallic: Some(renderer.load_texture(Path::new("assets/textures/metallic2.png"))?),
        };
        let material = renderer.add_material(material);

        let model = Model::load("assets/models/cube.obj")?;
        let mesh = renderer.load_mesh(&model)?;
        let cube = self.registry.create_object();
        cube.mesh = Some(mesh);
        cube.material = Some(material);
        cube.transform.translation = Vec3::new(-0.5, 0.5, 0.0);
        cube.transform.scale = Vec3::splat(0.5);

        let model = Model::load("assets/models/smooth_vase.obj")?;
        let mesh = renderer.load_mesh(&model)?;
        let vase = self.registry.create_object();
        vase.mesh = Some(mesh);
        vase.material = Some(material);
        vase.transform.translation = Vec3::new(0.5, 0.5, 0.0);
        vase.transform.scale = Vec3::new(3.0, 1.5, 3.0);

        let light = self.registry.create_point_light(10.0, 0.1, Vec3::ONE);
        light.transform.translation = Vec3::new(-1.0, -1.0, -1.0);

        info!("Scene loaded: {} objects", self.registry.len());
        Ok(())
    }

    fn draw_frame(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let frame_time = self.timer.delta_secs();
        if let Some(fps) = self.timer.frame_completed() {
            info!("FPS: {fps:.1}");
        }

        if let Some(viewer) = self.registry.get_mut(self.viewer) {
            self.controller
                .move_in_plane_xz(&self.input, frame_time, viewer);
            self.camera
                .set_view_yxz(viewer.transform.translation, viewer.transform.rotation);
        }
        self.camera.set_perspective_projection(
            f32::to_radians(50.0),
            renderer.aspect_ratio(),
            0.1,
            100.0,
        );

        // Scene mutation happens here, before the renderer reads the
        // registry: orbit the point lights around the world's vertical axis.
        let orbit = Mat4::from_axis_angle(Vec3::NEG_Y, frame_time);
        for object in self.registry.iter_mut() {
            if object.point_light.is_some() {
                object.transform.translation =
                    orbit.transform_point3(object.transform.translation);
            }
        }

        if let Err(e) = renderer.render_frame(&self.camera, &self.registry, frame_time) {
            error!("Render error: {e}");
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            error!("Initialization failed: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(window) = self.window.as_mut() {
                    window.resize(size.width, size.height);
                }
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state.is_pressed() {
                        self.input.on_key_pressed(key);
                    } else {
                        self.input.on_key_released(key);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.draw_frame(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref()
            && let Err(e) = renderer.wait_idle()
        {
            error!("Device wait failed during shutdown: {e}");
        }
    }
}

fn main() -> Result<()> {
    ember_core::init_logging();
    info!("Starting ember");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
