//! Render pipelines for batched primitives, keyed by the fixed-function state
//! they bake in.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::Viewport;
use crate::render::{
    BlendMode, CompareFunc, PrimitiveStyle, RenderStateBlock, StencilOp, StencilState, Vertex,
    WrapMode,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    origin: [f32; 2],
    size: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4, // color
        2 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Everything a pipeline object bakes in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) struct PipelineKey {
    pub style: PrimitiveStyle,
    pub blend: BlendMode,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub depth_func: CompareFunc,
    pub depth_write: bool,
    pub stencil: StencilState,
}

impl PipelineKey {
    pub fn new(
        state: &RenderStateBlock,
        style: PrimitiveStyle,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        // Depth and stencil state only matter when there is a buffer to test against.
        let has_stencil = depth_format.is_some_and(|f| f.has_stencil_aspect());
        Self {
            style,
            blend: state.blend,
            color_format,
            depth_format,
            depth_func: if depth_format.is_some() { state.depth_func } else { CompareFunc::Always },
            depth_write: depth_format.is_some() && state.depth_write,
            stencil: if has_stencil { state.stencil } else { StencilState::default() },
        }
    }
}

/// Shader, layouts, samplers and the pipeline cache of one device.
///
/// Dropped with the device; everything here is recreated on the next one.
pub(crate) struct PipelineCache {
    shader: wgpu::ShaderModule,
    viewport_layout: wgpu::BindGroupLayout,
    pattern_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    white_view: wgpu::TextureView,
    samplers: HashMap<WrapMode, wgpu::Sampler>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lazarus primitive shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/primitive.wgsl").into()),
        });

        let viewport_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lazarus viewport bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ViewportUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pattern_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lazarus pattern bgl"),
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

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lazarus primitive pipeline layout"),
            bind_group_layouts: &[&viewport_layout, &pattern_layout],
            immediate_size: 0,
        });

        // Untextured primitives sample a single white texel.
        let white = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("lazarus white texel"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        let white_view = white.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            shader,
            viewport_layout,
            pattern_layout,
            layout,
            white_view,
            samplers: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    pub fn pipeline(&mut self, device: &wgpu::Device, key: &PipelineKey) -> &wgpu::RenderPipeline {
        if !self.pipelines.contains_key(key) {
            log::debug!("creating primitive pipeline #{}: {key:?}", self.pipelines.len() + 1);
            let pipeline = self.create_pipeline(device, key);
            self.pipelines.insert(*key, pipeline);
        }
        &self.pipelines[key]
    }

    /// Uniform bind group mapping surface pixels of `viewport` to NDC.
    pub fn viewport_group(&self, device: &wgpu::Device, viewport: Viewport) -> wgpu::BindGroup {
        let uniform = ViewportUniform {
            origin: [viewport.x as f32, viewport.y as f32],
            size: [viewport.width.max(1) as f32, viewport.height.max(1) as f32],
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lazarus viewport ubo"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lazarus viewport bind group"),
            layout: &self.viewport_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    /// Pattern bind group; `None` binds the white texel.
    pub fn pattern_group(
        &mut self,
        device: &wgpu::Device,
        view: Option<&wgpu::TextureView>,
        wrap: WrapMode,
    ) -> wgpu::BindGroup {
        let sampler = self
            .samplers
            .entry(wrap)
            .or_insert_with(|| create_sampler(device, wrap));
        let view = view.unwrap_or(&self.white_view);
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lazarus pattern bind group"),
            layout: &self.pattern_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: &PipelineKey) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lazarus primitive pipeline"),
            layout: Some(&self.layout),

            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.color_format,
                    blend: blend_state(key.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: topology(key.style),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: key.depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: key.depth_write,
                depth_compare: compare(key.depth_func),
                stencil: stencil_state(&key.stencil),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        })
    }
}

fn create_sampler(device: &wgpu::Device, wrap: WrapMode) -> wgpu::Sampler {
    let mode = match wrap {
        WrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::Mirror => wgpu::AddressMode::MirrorRepeat,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("lazarus pattern sampler"),
        address_mode_u: mode,
        address_mode_v: mode,
        address_mode_w: mode,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

fn topology(style: PrimitiveStyle) -> wgpu::PrimitiveTopology {
    match style {
        PrimitiveStyle::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveStyle::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveStyle::TriangleList => wgpu::PrimitiveTopology::TriangleList,
    }
}

pub(crate) fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    let component = |src, dst| wgpu::BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: wgpu::BlendOperation::Add,
    };
    match mode {
        BlendMode::Opaque => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => Some(wgpu::BlendState {
            color: component(wgpu::BlendFactor::SrcAlpha, wgpu::BlendFactor::One),
            alpha: component(wgpu::BlendFactor::One, wgpu::BlendFactor::One),
        }),
        BlendMode::Multiply => Some(wgpu::BlendState {
            color: component(wgpu::BlendFactor::Dst, wgpu::BlendFactor::Zero),
            alpha: component(wgpu::BlendFactor::DstAlpha, wgpu::BlendFactor::Zero),
        }),
    }
}

pub(crate) fn compare(func: CompareFunc) -> wgpu::CompareFunction {
    match func {
        CompareFunc::Never => wgpu::CompareFunction::Never,
        CompareFunc::Less => wgpu::CompareFunction::Less,
        CompareFunc::Equal => wgpu::CompareFunction::Equal,
        CompareFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunc::Greater => wgpu::CompareFunction::Greater,
        CompareFunc::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunc::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        CompareFunc::Always => wgpu::CompareFunction::Always,
    }
}

fn stencil_op(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        StencilOp::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
        StencilOp::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
        StencilOp::Invert => wgpu::StencilOperation::Invert,
        StencilOp::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOp::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

pub(crate) fn stencil_state(stencil: &StencilState) -> wgpu::StencilState {
    if !stencil.enabled {
        return wgpu::StencilState::default();
    }
    let face = wgpu::StencilFaceState {
        compare: compare(stencil.func),
        fail_op: stencil_op(stencil.fail_op),
        depth_fail_op: stencil_op(stencil.depth_fail_op),
        pass_op: stencil_op(stencil.pass_op),
    };
    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: stencil.read_mask,
        write_mask: stencil.write_mask,
    }
}
