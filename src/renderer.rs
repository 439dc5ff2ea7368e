// Renderer module for Orrery 3D

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use wgpu::{Adapter, Buffer, RenderPipeline};
use winit::window::Window;

use crate::error::RendererError;
use crate::math::Transform;
use crate::scene::{Material, Scene, TextureHandle};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SPHERE_LATITUDES: u32 = 32;
const SPHERE_LONGITUDES: u32 = 32;
const RING_SEGMENTS: u32 = 128;
const RING_OPACITY: f32 = 0.75;
const GLOW_OPACITY: f32 = 0.8;
const STAR_OPACITY: f32 = 0.7;
const STAR_COLOR: u32 = 0xffffff;
// Two triangles per star quad
const STAR_QUAD_VERTICES: u32 = 6;

const BODY_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const POINT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

// Define Vertex struct for vertex data
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

// Position-only vertex for orbit rings and star instances
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct PointVertex {
    position: [f32; 3],
}

impl From<Vec3> for PointVertex {
    fn from(p: Vec3) -> Self {
        Self {
            position: p.to_array(),
        }
    }
}

// Per-draw uniform block, mirrored by `DrawUniforms` in shader.wgsl
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
    // x: emissive, y: spotlight on, z: opacity
    params: [f32; 4],
    spot_position: [f32; 4],
    light_position: [f32; 4],
    eye: [f32; 4],
    // xy: surface size in pixels, z: star point size
    screen: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
            params: [0.0, 0.0, 1.0, 0.0],
            spot_position: [0.0; 4],
            light_position: [0.0, 0.0, 0.0, 1.0],
            eye: [0.0, 0.0, 0.0, 1.0],
            screen: [1.0, 1.0, 1.0, 0.0],
        }
    }

    fn update_view_proj(&mut self, view_proj: Mat4, eye: Vec3) {
        self.view_proj = view_proj.to_cols_array_2d();
        self.eye = eye.extend(1.0).to_array();
    }

    fn update_model(&mut self, transform: &Transform) {
        self.model = transform.matrix().to_cols_array_2d();
    }
}

/// Generate an indexed UV sphere of radius 1.
///
/// Vertices form a `(n_lat + 1) x (n_lon + 1)` grid so the texture seam gets
/// its own column. North pole is (0, 1, 0). Triangles wind counter-clockwise
/// seen from outside.
pub fn generate_sphere_mesh(n_lat: u32, n_lon: u32) -> (Vec<Vertex>, Vec<u32>) {
    let n_lat = n_lat.max(2);
    let n_lon = n_lon.max(3);

    let mut vertices = Vec::with_capacity(((n_lat + 1) * (n_lon + 1)) as usize);
    for lat in 0..=n_lat {
        let v = lat as f32 / n_lat as f32;
        let theta = std::f32::consts::PI * v;
        for lon in 0..=n_lon {
            let u = lon as f32 / n_lon as f32;
            let phi = std::f32::consts::TAU * u;
            let p = [theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
            vertices.push(Vertex {
                position: p,
                normal: p,
                uv: [u, v],
            });
        }
    }

    let row = n_lon + 1;
    let mut indices = Vec::with_capacity((n_lat * n_lon * 6) as usize);
    for lat in 0..n_lat {
        for lon in 0..n_lon {
            let a = lat * row + lon;
            let b = a + row;
            indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }
    (vertices, indices)
}

/// Closed circle of `radius` in the XZ plane, as a line strip.
///
/// The last point repeats the first so the strip closes.
pub fn generate_orbit_ring(radius: f32, segments: u32) -> Vec<Vec3> {
    let segments = segments.max(3);
    (0..=segments)
        .map(|i| {
            let angle = std::f32::consts::TAU * (i % segments) as f32 / segments as f32;
            Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
        })
        .collect()
}

/// Largest size within `max` texels per side that keeps the aspect ratio.
///
/// Returns `None` for an empty image.
pub fn fit_texture_size(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || max == 0 {
        return None;
    }
    if width <= max && height <= max {
        return Some((width, height));
    }
    let scale = max as f64 / width.max(height) as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    Some((fit(width), fit(height)))
}

/// 0xRRGGBB in sRGB to linear RGBA.
pub fn color_to_linear(rgb: u32) -> [f32; 4] {
    let channel = |shift: u32| {
        let c = ((rgb >> shift) & 0xff) as f32 / 255.0;
        c.powf(2.2)
    };
    [channel(16), channel(8), channel(0), 1.0]
}

// One uniform buffer and bind group per thing we draw
struct DrawSlot {
    buffer: Buffer,
    bind_group: wgpu::BindGroup,
}

// Fixed-function state that differs between pipelines
struct PipelineOptions {
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    // Blended pipelines test depth but do not write it
    blend: Option<wgpu::BlendState>,
}

pub struct Renderer {
    adapter: Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    window: Arc<Window>,
    surface_format: wgpu::TextureFormat,
    size: winit::dpi::PhysicalSize<u32>,
    depth_view: wgpu::TextureView,
    body_pipeline: RenderPipeline,
    glow_pipeline: RenderPipeline,
    ring_pipeline: RenderPipeline,
    star_pipeline: RenderPipeline,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    ring_buffer: Buffer,
    ring_ranges: Vec<Range<u32>>,
    star_buffer: Buffer,
    star_count: u32,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white_texture: wgpu::BindGroup,
    textures: HashMap<TextureHandle, wgpu::BindGroup>,
    next_texture: u32,
    sun_slot: DrawSlot,
    glow_slot: DrawSlot,
    star_slot: DrawSlot,
    body_slots: Vec<DrawSlot>,
    ring_slots: Vec<DrawSlot>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self, RendererError> {
        // Initialize wgpu
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        // Get surface from window
        let surface = instance.create_surface(window.clone())?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::AdapterNotFound)?;
        info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        // Get surface capabilities
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RendererError::Surface("surface reports no formats".into()))?;

        let size = window.inner_size();
        configure_surface(&surface, &adapter, &device, surface_format, size);
        let depth_view = create_depth_view(&device, size);

        // Load shader
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
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

        let body_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Body Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let untextured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Untextured Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let vertex_buffer_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &BODY_ATTRIBUTES,
        };
        let ring_buffer_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &POINT_ATTRIBUTES,
        };
        let star_buffer_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &POINT_ATTRIBUTES,
        };

        let body_pipeline = create_pipeline(
            &device,
            "Body Pipeline",
            &body_layout,
            &shader_module,
            ("vs_main", "fs_main"),
            vertex_buffer_layout.clone(),
            PipelineOptions {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                blend: None,
            },
            surface_format,
        );
        // Back faces only, so the halo shows around the sun and not over it
        let glow_pipeline = create_pipeline(
            &device,
            "Glow Pipeline",
            &untextured_layout,
            &shader_module,
            ("vs_main", "fs_glow"),
            vertex_buffer_layout,
            PipelineOptions {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Front),
                blend: Some(ADDITIVE_BLENDING),
            },
            surface_format,
        );
        let ring_pipeline = create_pipeline(
            &device,
            "Orbit Ring Pipeline",
            &untextured_layout,
            &shader_module,
            ("vs_line", "fs_line"),
            ring_buffer_layout,
            PipelineOptions {
                topology: wgpu::PrimitiveTopology::LineStrip,
                cull_mode: None,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            },
            surface_format,
        );
        let star_pipeline = create_pipeline(
            &device,
            "Star Pipeline",
            &untextured_layout,
            &shader_module,
            ("vs_star", "fs_star"),
            star_buffer_layout,
            PipelineOptions {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            },
            surface_format,
        );

        let (vertices, indices) = generate_sphere_mesh(SPHERE_LATITUDES, SPHERE_LONGITUDES);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut ring_points = Vec::new();
        let mut ring_ranges = Vec::with_capacity(scene.bodies().len());
        for body in scene.bodies() {
            let start = ring_points.len() as u32;
            ring_points.extend(
                generate_orbit_ring(body.orbit_radius, RING_SEGMENTS)
                    .into_iter()
                    .map(PointVertex::from),
            );
            ring_ranges.push(start..ring_points.len() as u32);
        }
        let ring_buffer = create_point_buffer(&device, "Orbit Ring Buffer", ring_points);

        let stars: Vec<PointVertex> = scene
            .starfield
            .points
            .iter()
            .copied()
            .map(PointVertex::from)
            .collect();
        let star_buffer = create_point_buffer(&device, "Star Instance Buffer", stars);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        let white_texture = create_texture_bind_group(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            &white,
            "White Texture",
        );

        let sun_slot = create_draw_slot(&device, &uniform_layout, "Sun Uniforms");
        let glow_slot = create_draw_slot(&device, &uniform_layout, "Sun Glow Uniforms");
        let star_slot = create_draw_slot(&device, &uniform_layout, "Star Uniforms");
        let body_slots = scene
            .bodies()
            .iter()
            .map(|b| create_draw_slot(&device, &uniform_layout, &b.name))
            .collect();
        let ring_slots = scene
            .bodies()
            .iter()
            .map(|b| create_draw_slot(&device, &uniform_layout, &format!("{} Orbit", b.name)))
            .collect();

        Ok(Self {
            adapter,
            device,
            queue,
            surface,
            window,
            surface_format,
            size,
            depth_view,
            body_pipeline,
            glow_pipeline,
            ring_pipeline,
            star_pipeline,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            ring_buffer,
            ring_ranges,
            star_buffer,
            star_count: scene.starfield.points.len() as u32,
            texture_layout,
            sampler,
            white_texture,
            textures: HashMap::new(),
            next_texture: 0,
            sun_slot,
            glow_slot,
            star_slot,
            body_slots,
            ring_slots,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        configure_surface(
            &self.surface,
            &self.adapter,
            &self.device,
            self.surface_format,
            new_size,
        );
        self.depth_view = create_depth_view(&self.device, new_size);
    }

    /// Uploads a decoded image and returns a handle for `Material::Texture`.
    ///
    /// Images larger than the device allows are scaled down to fit. Returns
    /// `None` for an empty image.
    pub fn upload_texture(&mut self, image: &RgbaImage) -> Option<TextureHandle> {
        let max = self.device.limits().max_texture_dimension_2d;
        let (width, height) = fit_texture_size(image.width(), image.height(), max)?;
        let scaled;
        let image = if (width, height) == image.dimensions() {
            image
        } else {
            warn!(
                "{}x{} texture exceeds the {}px limit, scaling to {}x{}",
                image.width(),
                image.height(),
                max,
                width,
                height
            );
            scaled = imageops::resize(image, width, height, FilterType::Triangle);
            &scaled
        };

        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        let bind_group = create_texture_bind_group(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            image,
            "Body Texture",
        );
        self.textures.insert(handle, bind_group);
        debug!("uploaded {}x{} texture as {:?}", width, height, handle);
        Some(handle)
    }

    pub fn release_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle).is_none() {
            warn!("release of unknown texture {:?}", handle);
        }
    }

    /// Draws one frame of `scene` as seen through `view_proj` from `eye`.
    pub fn render(&mut self, scene: &Scene, view_proj: Mat4, eye: Vec3) {
        self.write_uniforms(scene, view_proj, eye);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("surface lost ({e}), reconfiguring");
                self.resize(self.window.inner_size());
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // Opaque spheres first, blended geometry after
            render_pass.set_pipeline(&self.body_pipeline);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            render_pass.set_bind_group(0, &self.sun_slot.bind_group, &[]);
            render_pass.set_bind_group(1, &self.white_texture, &[]);
            render_pass.draw_indexed(0..self.index_count, 0, 0..1);

            for (slot, body) in self.body_slots.iter().zip(scene.bodies()) {
                let texture = match body.material {
                    Material::Texture(handle) => {
                        self.textures.get(&handle).unwrap_or(&self.white_texture)
                    }
                    Material::Color(_) => &self.white_texture,
                };
                render_pass.set_bind_group(0, &slot.bind_group, &[]);
                render_pass.set_bind_group(1, texture, &[]);
                render_pass.draw_indexed(0..self.index_count, 0, 0..1);
            }

            if self.star_count > 0 {
                render_pass.set_pipeline(&self.star_pipeline);
                render_pass.set_bind_group(0, &self.star_slot.bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.star_buffer.slice(..));
                render_pass.draw(0..STAR_QUAD_VERTICES, 0..self.star_count);
            }

            render_pass.set_pipeline(&self.ring_pipeline);
            render_pass.set_vertex_buffer(0, self.ring_buffer.slice(..));
            for (slot, range) in self.ring_slots.iter().zip(&self.ring_ranges) {
                render_pass.set_bind_group(0, &slot.bind_group, &[]);
                render_pass.draw(range.clone(), 0..1);
            }

            render_pass.set_pipeline(&self.glow_pipeline);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_bind_group(0, &self.glow_slot.bind_group, &[]);
            render_pass.draw_indexed(0..self.index_count, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn write_uniforms(&self, scene: &Scene, view_proj: Mat4, eye: Vec3) {
        let mut uniforms = Uniforms::new();
        uniforms.update_view_proj(view_proj, eye);
        uniforms.screen = [
            self.size.width as f32,
            self.size.height as f32,
            scene.starfield.point_size,
            0.0,
        ];
        if let Some(spot) = scene.spotlight {
            uniforms.params[1] = 1.0;
            uniforms.spot_position = spot.position.extend(1.0).to_array();
        }

        let mut stars = uniforms;
        stars.color = color_to_linear(STAR_COLOR);
        stars.params[2] = STAR_OPACITY;
        self.write_slot(&self.star_slot, stars);

        let mut sun = uniforms;
        sun.update_model(&scene.sun.transform());
        sun.color = color_to_linear(scene.sun.color);
        sun.params[0] = 1.0;
        self.write_slot(&self.sun_slot, sun);

        let mut glow = uniforms;
        glow.update_model(&scene.sun.glow_transform());
        glow.color = color_to_linear(scene.sun.color);
        glow.params[2] = GLOW_OPACITY;
        self.write_slot(&self.glow_slot, glow);

        for (slot, body) in self.body_slots.iter().zip(scene.bodies()) {
            let mut u = uniforms;
            u.update_model(&body.transform());
            u.color = match body.material {
                Material::Color(rgb) => color_to_linear(rgb),
                Material::Texture(_) => [1.0; 4],
            };
            self.write_slot(slot, u);
        }

        for (slot, body) in self.ring_slots.iter().zip(scene.bodies()) {
            let mut u = uniforms;
            u.color = color_to_linear(body.color);
            u.params[2] = RING_OPACITY;
            self.write_slot(slot, u);
        }
    }

    fn write_slot(&self, slot: &DrawSlot, uniforms: Uniforms) {
        self.queue
            .write_buffer(&slot.buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }
}

fn configure_surface(
    surface: &wgpu::Surface<'static>,
    adapter: &Adapter,
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: winit::dpi::PhysicalSize<u32>,
) {
    let surface_caps = surface.get_capabilities(adapter);
    surface.configure(
        device,
        &wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        },
    );
}

fn create_depth_view(
    device: &wgpu::Device,
    size: winit::dpi::PhysicalSize<u32>,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    (vs_entry, fs_entry): (&str, &str),
    vertex_layout: wgpu::VertexBufferLayout<'_>,
    options: PipelineOptions,
    format: wgpu::TextureFormat,
) -> RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: vs_entry,
            buffers: &[vertex_layout],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: fs_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: options.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: options.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: options.cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: options.blend.is_none(),
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn create_point_buffer(device: &wgpu::Device, label: &str, mut points: Vec<PointVertex>) -> Buffer {
    // Zero-sized buffers are not allowed, so keep one dummy vertex around
    if points.is_empty() {
        points.push(PointVertex::from(Vec3::ZERO));
    }
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&points),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

fn create_draw_slot(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> DrawSlot {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&[Uniforms::new()]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    DrawSlot { buffer, bind_group }
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    image: &RgbaImage,
    label: &str,
) -> wgpu::BindGroup {
    let (width, height) = image.dimensions();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
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
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_mesh_counts() {
        let (vertices, indices) = generate_sphere_mesh(4, 8);
        assert_eq!(vertices.len(), 5 * 9);
        assert_eq!(indices.len(), 4 * 8 * 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn sphere_mesh_is_unit_and_starts_at_north_pole() {
        let (vertices, _) = generate_sphere_mesh(8, 16);
        let first = Vec3::from(vertices[0].position);
        assert!((first - Vec3::Y).length() < 1e-6);
        for v in &vertices {
            assert!((Vec3::from(v.position).length() - 1.0).abs() < 1e-5);
            assert_eq!(v.position, v.normal);
            assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
        }
    }

    #[test]
    fn sphere_triangles_face_outward() {
        let (vertices, indices) = generate_sphere_mesh(8, 16);
        for tri in indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(vertices[i as usize].position));
            let normal = (b - a).cross(c - a);
            // Triangles touching a pole collapse to zero area
            if normal.length() < 1e-6 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn sphere_mesh_clamps_degenerate_resolution() {
        let (vertices, indices) = generate_sphere_mesh(0, 0);
        assert_eq!(vertices.len(), 3 * 4);
        assert_eq!(indices.len(), 2 * 3 * 6);
    }

    #[test]
    fn orbit_ring_is_closed_circle_in_xz_plane() {
        let ring = generate_orbit_ring(60.0, 128);
        assert_eq!(ring.len(), 129);
        assert_eq!(ring.first(), ring.last());
        for p in &ring {
            assert_eq!(p.y, 0.0);
            assert!((p.length() - 60.0).abs() < 1e-3);
        }
    }

    #[test]
    fn orbit_ring_clamps_segment_count() {
        assert_eq!(generate_orbit_ring(1.0, 0).len(), 4);
    }

    #[test]
    fn texture_within_limit_is_untouched() {
        assert_eq!(fit_texture_size(2048, 1024, 8192), Some((2048, 1024)));
        assert_eq!(fit_texture_size(8192, 8192, 8192), Some((8192, 8192)));
    }

    #[test]
    fn oversized_texture_is_scaled_to_limit() {
        assert_eq!(fit_texture_size(10_000, 5_000, 8192), Some((8192, 4096)));
        assert_eq!(fit_texture_size(4_000, 16_384, 8192), Some((2000, 8192)));
        assert_eq!(fit_texture_size(20_000, 1, 8192), Some((8192, 1)));
    }

    #[test]
    fn empty_texture_is_rejected() {
        assert_eq!(fit_texture_size(0, 512, 8192), None);
        assert_eq!(fit_texture_size(512, 0, 8192), None);
    }

    #[test]
    fn scaled_texture_keeps_its_pixels() {
        let image = RgbaImage::from_pixel(40, 20, image::Rgba([10, 20, 30, 255]));
        let (width, height) = fit_texture_size(40, 20, 16).unwrap();
        let scaled = imageops::resize(&image, width, height, FilterType::Triangle);
        assert_eq!(scaled.dimensions(), (16, 8));
        assert_eq!(scaled.get_pixel(8, 4).0, [10, 20, 30, 255]);
    }

    #[test]
    fn color_conversion() {
        assert_eq!(color_to_linear(0xffffff), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(color_to_linear(0x000000), [0.0, 0.0, 0.0, 1.0]);
        let c = color_to_linear(0xff0000);
        assert_eq!(c[0], 1.0);
        assert_eq!(c[1], 0.0);
    }

    #[test]
    fn uniform_block_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 224);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(std::mem::size_of::<PointVertex>(), 12);
    }
}
