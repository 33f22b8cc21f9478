//! GPU backend on wgpu
//!
//! ## Binding model
//!
//! - Vertex attribute `i` of a buffer layout is `@location(i)`, tightly packed.
//! - Uniform `i` of a shader (construction order) is `@group(0) @binding(i)`.
//!   Each draw gets its own slice of a per-frame uniform buffer through a
//!   dynamic offset, so rebinding a uniform between two draws of the same
//!   pass works as recorded.
//! - Render pipelines are built on first use and cached per
//!   (shader, vertex layout, uniform types).

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::window::Window;

use super::backend::GraphicsBackend;
use super::command::CommandBuffer;
use super::error::{GfxError, GfxResult};
use super::frame::{self, DrawPlan, FramePlan};
use super::handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
use super::resources::{ResourceTable, check_stage_source};
use super::types::{
    FRAGMENT_ENTRY, ShaderStage, UniformType, VERTEX_ENTRY, VertexAttribute, Viewport,
};

/// Compiled stage modules of a shader program
pub struct GpuShader {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
}

/// Uploaded vertex data
pub struct GpuVertexBuffer {
    buffer: wgpu::Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    shader: ShaderHandle,
    layout: Vec<VertexAttribute>,
    uniforms: Vec<UniformType>,
}

struct CachedPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

/// wgpu implementation of [`GraphicsBackend`] rendering to a window surface
pub struct WgpuBackend {
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    resources: ResourceTable<GpuShader, GpuVertexBuffer>,
    pipelines: HashMap<PipelineKey, CachedPipeline>,
    uniform_alignment: usize,
}

impl WgpuBackend {
    /// Creates a backend rendering into the given window
    pub async fn new(window: Arc<Window>, vsync: bool) -> anyhow::Result<Self> {
        info!("Initializing wgpu backend");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        info!(
            adapter.name = adapter.get_info().name,
            adapter.backend = ?adapter.get_info().backend,
            "Found GPU adapter"
        );

        let (device, queue) = adapter.request_device(&device_descriptor()).await?;

        // Colours are written as given, so prefer a linear surface format
        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("surface reports no supported formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        info!(
            surface.width = config.width,
            surface.height = config.height,
            surface.format = ?config.format,
            "Surface configured"
        );

        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment as usize;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            resources: ResourceTable::new(),
            pipelines: HashMap::new(),
            uniform_alignment,
        })
    }

    fn pipeline_key(&self, draw: &DrawPlan) -> GfxResult<PipelineKey> {
        Ok(PipelineKey {
            shader: draw.shader,
            layout: self
                .resources
                .vertex_buffer(draw.vertex_buffer)?
                .layout
                .clone(),
            uniforms: draw.uniforms.iter().map(|(_, v)| v.ty()).collect(),
        })
    }

    /// Builds and caches the pipeline for `key` if it does not exist yet
    fn ensure_pipeline(&mut self, key: &PipelineKey) -> GfxResult<()> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }

        let shader = &self.resources.shader(key.shader)?.payload;

        let entries: Vec<wgpu::BindGroupLayoutEntry> = key
            .uniforms
            .iter()
            .enumerate()
            .map(|(slot, ty)| wgpu::BindGroupLayoutEntry {
                binding: slot as u32,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(ty.padded_size() as u64),
                },
                count: None,
            })
            .collect();

        let bind_group_layout = (!entries.is_empty()).then(|| {
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Uniform Bind Group Layout"),
                    entries: &entries,
                })
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
            bind_group_layout.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Triangle Pipeline Layout"),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        let mut offset = 0;
        let attributes: Vec<wgpu::VertexAttribute> = key
            .layout
            .iter()
            .enumerate()
            .map(|(location, attribute)| {
                let attr = wgpu::VertexAttribute {
                    format: vertex_format(*attribute),
                    offset,
                    shader_location: location as u32,
                };
                offset += attribute.size() as wgpu::BufferAddress;
                attr
            })
            .collect();

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: offset,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Triangle Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader.vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[vertex_layout],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader.fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
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
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            });

        if let Some(err) = futures::executor::block_on(self.device.pop_error_scope()) {
            return Err(GfxError::Device(format!("pipeline creation failed: {err}")));
        }

        debug!(shader = ?key.shader, uniforms = key.uniforms.len(), "Pipeline created");
        self.pipelines.insert(
            key.clone(),
            CachedPipeline {
                pipeline,
                bind_group_layout,
            },
        );
        Ok(())
    }

    /// Packs every draw's uniform values into one buffer image
    ///
    /// Returns the bytes and, per draw, the dynamic offset of each binding.
    fn pack_uniforms(&self, plan: &FramePlan) -> (Vec<u8>, Vec<Vec<u32>>) {
        let mut bytes = Vec::new();
        let mut offsets = Vec::with_capacity(plan.draw_count());

        for draw in plan.draws() {
            let mut draw_offsets = Vec::with_capacity(draw.uniforms.len());
            for (_, value) in &draw.uniforms {
                let start = bytes.len();
                draw_offsets.push(start as u32);
                bytes.extend_from_slice(value.as_bytes());
                let slot = value.ty().padded_size().next_multiple_of(self.uniform_alignment);
                bytes.resize(start + slot, 0);
            }
            offsets.push(draw_offsets);
        }

        (bytes, offsets)
    }

    /// Acquires the next surface texture, reconfiguring once if the surface went stale
    ///
    /// `None` means the frame is skipped.
    fn acquire_frame(&mut self) -> GfxResult<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                skip_on_timeout(self.surface.get_current_texture())
            }
            result => skip_on_timeout(result),
        }
    }

    fn execute(&mut self, plan: &FramePlan) -> GfxResult<()> {
        if plan.is_empty() {
            return Ok(());
        }

        let keys = plan
            .draws()
            .map(|draw| self.pipeline_key(draw))
            .collect::<GfxResult<Vec<_>>>()?;
        for key in &keys {
            self.ensure_pipeline(key)?;
        }

        let (uniform_bytes, uniform_offsets) = self.pack_uniforms(plan);
        let uniform_buffer = (!uniform_bytes.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Frame Uniform Buffer"),
                    contents: &uniform_bytes,
                    usage: wgpu::BufferUsages::UNIFORM,
                })
        });

        let mut bind_groups: HashMap<&PipelineKey, wgpu::BindGroup> = HashMap::new();
        if let Some(buffer) = &uniform_buffer {
            for key in &keys {
                if bind_groups.contains_key(key) {
                    continue;
                }
                let Some(layout) = self
                    .pipelines
                    .get(key)
                    .and_then(|p| p.bind_group_layout.as_ref())
                else {
                    continue;
                };
                let entries: Vec<wgpu::BindGroupEntry> = key
                    .uniforms
                    .iter()
                    .enumerate()
                    .map(|(slot, ty)| wgpu::BindGroupEntry {
                        binding: slot as u32,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset: 0,
                            size: NonZeroU64::new(ty.padded_size() as u64),
                        }),
                    })
                    .collect();
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Frame Uniform Bind Group"),
                    layout,
                    entries: &entries,
                });
                bind_groups.insert(key, bind_group);
            }
        }

        let Some(output) = self.acquire_frame()? else {
            return Ok(());
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let mut draw_index = 0;
        for pass in &plan.passes {
            let load = match pass.clear {
                Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &pass.draws {
                let index = draw_index;
                draw_index += 1;

                if draw.viewport.width == 0 || draw.viewport.height == 0 || draw.count == 0 {
                    continue;
                }

                let key = &keys[index];
                let Some(cached) = self.pipelines.get(key) else {
                    continue;
                };
                let vertex_buffer = &self.resources.vertex_buffer(draw.vertex_buffer)?.payload;

                rpass.set_pipeline(&cached.pipeline);
                rpass.set_viewport(
                    0.0,
                    0.0,
                    draw.viewport.width as f32,
                    draw.viewport.height as f32,
                    0.0,
                    1.0,
                );
                if let Some(bind_group) = bind_groups.get(key) {
                    rpass.set_bind_group(0, bind_group, &uniform_offsets[index]);
                }
                rpass.set_vertex_buffer(0, vertex_buffer.buffer.slice(..));
                rpass.draw(draw.start..draw.start + draw.count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// Device requested by [`WgpuBackend::new`]
pub fn device_descriptor() -> wgpu::DeviceDescriptor<'static> {
    wgpu::DeviceDescriptor {
        label: Some("Triangle Device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: wgpu::Trace::Off,
        experimental_features: Default::default(),
    }
}

/// Compiles one WGSL stage, turning validation errors into [`GfxError::ShaderCompile`]
pub fn compile_stage(
    device: &Device,
    stage: ShaderStage,
    source: &str,
) -> GfxResult<wgpu::ShaderModule> {
    check_stage_source(stage, source)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "Vertex Stage",
            ShaderStage::Fragment => "Fragment Stage",
        }),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    match futures::executor::block_on(device.pop_error_scope()) {
        Some(err) => Err(GfxError::ShaderCompile {
            stage,
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

/// A timed-out acquire skips the frame; any other surface error is returned
fn skip_on_timeout<T>(result: Result<T, wgpu::SurfaceError>) -> GfxResult<Option<T>> {
    match result {
        Ok(output) => Ok(Some(output)),
        Err(wgpu::SurfaceError::Timeout) => {
            warn!("Surface timeout, skipping frame");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn vertex_format(attribute: VertexAttribute) -> wgpu::VertexFormat {
    match attribute {
        VertexAttribute::Float => wgpu::VertexFormat::Float32,
        VertexAttribute::Float2 => wgpu::VertexFormat::Float32x2,
        VertexAttribute::Float3 => wgpu::VertexFormat::Float32x3,
        VertexAttribute::Float4 => wgpu::VertexFormat::Float32x4,
    }
}

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn target_size(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            info!(width, height, "Surface resized");
        }
    }

    fn construct_shader(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> GfxResult<ShaderHandle> {
        let vertex = compile_stage(&self.device, ShaderStage::Vertex, vertex_src)?;
        let fragment = compile_stage(&self.device, ShaderStage::Fragment, fragment_src)?;

        let handle = self.resources.insert_shader(GpuShader { vertex, fragment });
        debug!(?handle, "Shader constructed");
        Ok(handle)
    }

    fn construct_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        ty: UniformType,
    ) -> GfxResult<UniformHandle> {
        self.resources.insert_uniform(shader, name, ty)
    }

    fn construct_vertex_buffer(
        &mut self,
        layout: &[VertexAttribute],
        data: &[f32],
    ) -> GfxResult<VertexBufferHandle> {
        // Validate before touching the device
        super::resources::vertex_count(layout, data)?;

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });

        self.resources
            .insert_vertex_buffer(layout, data, GpuVertexBuffer { buffer })
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) -> GfxResult<()> {
        self.resources.remove_shader(shader)?;
        self.pipelines.retain(|key, _| key.shader != shader);
        Ok(())
    }

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferHandle) -> GfxResult<()> {
        let entry = self.resources.remove_vertex_buffer(buffer)?;
        entry.payload.buffer.destroy();
        Ok(())
    }

    fn submit_command_buffer(&mut self, cb: &mut CommandBuffer) -> GfxResult<FramePlan> {
        let commands = cb.drain();
        let resolved = frame::resolve(&commands, &self.resources, self.target_size())?;
        // A failed execute drops `resolved`, leaving uniform state untouched
        self.execute(resolved.plan())?;
        Ok(resolved.commit(&mut self.resources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_skips_frame() {
        assert!(matches!(
            skip_on_timeout::<u32>(Err(wgpu::SurfaceError::Timeout)),
            Ok(None)
        ));
        assert!(matches!(skip_on_timeout(Ok(7u32)), Ok(Some(7))));
    }

    #[test]
    fn test_other_surface_errors_fail_the_frame() {
        assert!(matches!(
            skip_on_timeout::<u32>(Err(wgpu::SurfaceError::OutOfMemory)),
            Err(GfxError::Surface(wgpu::SurfaceError::OutOfMemory))
        ));
        // A retry after reconfiguring that still reports a stale surface
        assert!(matches!(
            skip_on_timeout::<u32>(Err(wgpu::SurfaceError::Lost)),
            Err(GfxError::Surface(wgpu::SurfaceError::Lost))
        ));
    }

    #[test]
    fn test_vertex_formats_match_attribute_sizes() {
        for attribute in [
            VertexAttribute::Float,
            VertexAttribute::Float2,
            VertexAttribute::Float3,
            VertexAttribute::Float4,
        ] {
            assert_eq!(vertex_format(attribute).size() as usize, attribute.size());
        }
    }
}
