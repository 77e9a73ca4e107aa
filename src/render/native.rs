//! wgpu renderer for the desktop demo.
//!
//! Draws two kinds of geometry: the pinch pointer, whose vertex buffer is
//! rewritten in place whenever the pinch reshapes it, and a shared unit
//! sphere instanced per draw for hand joints and the ray cursor.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::config::PointerConfig;
use crate::geometry::{uv_sphere, MeshData, PointerGeometry};
use crate::render::CameraParams;

const SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
};

struct Object {
    model: mat4x4<f32>,
    color: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var<uniform> object: Object;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.view_proj * object.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return object.color;
}
"#;

const SPHERE_SECTORS: usize = 24;
const SPHERE_STACKS: usize = 16;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
}

impl GlobalUniform {
    fn from_camera(camera: &CameraParams) -> Self {
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectConstants {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl ObjectConstants {
    fn new(model: Mat4, color: Vec3, opacity: f32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: [color.x, color.y, color.z, opacity],
        }
    }
}

/// One draw of the shared sphere mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereInstance {
    pub center: Vec3,
    pub radius: f32,
    pub color: Vec3,
    pub opacity: f32,
}

#[derive(Clone, Copy)]
struct PointerDraw {
    model: Mat4,
    color: Vec3,
    opacity: f32,
    visible: bool,
}

impl Default for PointerDraw {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            color: Vec3::ONE,
            opacity: 1.0,
            visible: false,
        }
    }
}

struct DepthBuffer {
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth buffer"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }
}

/// Vertex and index buffers for one mesh.
pub struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        Self::with_usage(device, mesh, label, wgpu::BufferUsages::VERTEX)
    }

    /// Vertex buffer that also accepts `write_buffer` updates.
    fn from_mesh_dynamic(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        Self::with_usage(
            device,
            mesh,
            label,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn with_usage(
        device: &wgpu::Device,
        mesh: &MeshData,
        label: &str,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.positions),
            usage,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    sphere_mesh: MeshBuffers,
    pointer_mesh: MeshBuffers,
    pointer_draw: PointerDraw,
    // Keeps the surface's window alive; dropped after the surface.
    window: Arc<Window>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, pointer: &PointerConfig) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        // SAFETY: the window handle outlives the surface; the renderer
        // stores the Arc alongside it.
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .context("failed to create a rendering surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter found")?;
        log::info!("rendering with {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("widget device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create a GPU device")?;

        let capabilities = surface.get_capabilities(&adapter);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format(&capabilities),
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(&capabilities),
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth = DepthBuffer::new(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("widget shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals layout"),
            entries: &[uniform_layout_entry(0, wgpu::ShaderStages::VERTEX)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object layout"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            )],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("widget pipeline layout"),
            bind_group_layouts: &[&global_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("widget pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (3 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<GlobalUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let sphere_mesh = MeshBuffers::from_mesh(
            &device,
            &uv_sphere(1.0, SPHERE_SECTORS, SPHERE_STACKS),
            "sphere mesh",
        );
        let pointer_mesh = MeshBuffers::from_mesh_dynamic(
            &device,
            &PointerGeometry::new(pointer).mesh_data(),
            "pointer mesh",
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth,
            pipeline,
            global_buffer,
            global_bind_group,
            object_layout,
            sphere_mesh,
            pointer_mesh,
            pointer_draw: PointerDraw::default(),
            window,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::new(&self.device, &self.config);
    }

    pub fn update_globals(&self, camera: &CameraParams) {
        self.queue.write_buffer(
            &self.global_buffer,
            0,
            bytemuck::bytes_of(&GlobalUniform::from_camera(camera)),
        );
    }

    /// Uploads the pointer's vertex arena when it changed and records the
    /// draw state for the next `render` call.
    pub fn update_pointer(
        &mut self,
        geometry: &mut PointerGeometry,
        model: Mat4,
        color: Vec3,
        opacity: f32,
        visible: bool,
    ) {
        if geometry.take_dirty() {
            self.queue.write_buffer(
                &self.pointer_mesh.vertex,
                0,
                bytemuck::cast_slice(geometry.positions()),
            );
        }
        self.pointer_draw = PointerDraw {
            model,
            color,
            opacity,
            visible,
        };
    }

    pub fn hide_pointer(&mut self) {
        self.pointer_draw.visible = false;
    }

    pub fn render(&mut self, spheres: &[SphereInstance]) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut bind_groups = Vec::with_capacity(spheres.len() + 1);
        for sphere in spheres {
            let constants =
                ObjectConstants::new(sphere_model(sphere), sphere.color, sphere.opacity);
            bind_groups.push(self.object_bind_group(&constants));
        }
        if self.pointer_draw.visible {
            let constants = ObjectConstants::new(
                self.pointer_draw.model,
                self.pointer_draw.color,
                self.pointer_draw.opacity,
            );
            bind_groups.push(self.object_bind_group(&constants));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("widget encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("widget pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.03,
                            a: 1.0,
                        }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.global_bind_group, &[]);

            pass.set_vertex_buffer(0, self.sphere_mesh.vertex.slice(..));
            pass.set_index_buffer(self.sphere_mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            for bind_group in &bind_groups[..spheres.len()] {
                pass.set_bind_group(1, bind_group, &[]);
                pass.draw_indexed(0..self.sphere_mesh.index_count, 0, 0..1);
            }

            // The translucent pointer draws last so its alpha blends over
            // the spheres already in the frame.
            if self.pointer_draw.visible {
                pass.set_vertex_buffer(0, self.pointer_mesh.vertex.slice(..));
                pass.set_index_buffer(
                    self.pointer_mesh.index.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                pass.set_bind_group(1, &bind_groups[spheres.len()], &[]);
                pass.draw_indexed(0..self.pointer_mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn object_bind_group(&self, constants: &ObjectConstants) -> wgpu::BindGroup {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object constants"),
                contents: bytemuck::bytes_of(constants),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object constants"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }
}

fn uniform_layout_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn surface_format(capabilities: &wgpu::SurfaceCapabilities) -> wgpu::TextureFormat {
    capabilities
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .unwrap_or(capabilities.formats[0])
}

fn present_mode(capabilities: &wgpu::SurfaceCapabilities) -> wgpu::PresentMode {
    if capabilities
        .present_modes
        .contains(&wgpu::PresentMode::Mailbox)
    {
        wgpu::PresentMode::Mailbox
    } else {
        wgpu::PresentMode::Fifo
    }
}

fn sphere_model(instance: &SphereInstance) -> Mat4 {
    Mat4::from_translation(instance.center) * Mat4::from_scale(Vec3::splat(instance.radius))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn sphere_model_scales_then_translates() {
        let instance = SphereInstance {
            center: Vec3::new(0.1, 0.2, -0.3),
            radius: 0.02,
            color: Vec3::ONE,
            opacity: 1.0,
        };
        let surface_point = sphere_model(&instance).transform_point3(Vec3::X);
        assert_abs_diff_eq!(surface_point.x, 0.12, epsilon = 1e-6);
        assert_abs_diff_eq!(surface_point.y, 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(surface_point.z, -0.3, epsilon = 1e-6);
    }

    #[test]
    fn uniform_structs_match_the_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 64);
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 80);
    }

    #[test]
    fn object_constants_carry_opacity_in_alpha() {
        let constants = ObjectConstants::new(Mat4::IDENTITY, Vec3::new(0.2, 0.4, 0.8), 0.5);
        assert_eq!(constants.color, [0.2, 0.4, 0.8, 0.5]);
    }
}
