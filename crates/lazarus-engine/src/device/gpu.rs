use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::monitor::MonitorHandle;
use winit::window::{Fullscreen, Window};

use crate::coords::{Color, Viewport};
use crate::render::{BatchState, ClearFlags, PrimitiveStyle, RenderStateBlock, Vertex};

use super::frame::GpuFrame;
use super::pipeline::{PipelineCache, PipelineKey};
use super::surface::{
    choose_alpha_mode, choose_present_mode, choose_surface_format, color_texture_format,
    depth_texture_format, map_surface_error, SurfaceErrorAction,
};
use super::{
    AdapterCaps, BackendConfig, BufferInfo, DepthStencilFormat, DeviceStatus, GpuBackend,
    GpuHandle, PixelFormat, PresentationParameters, RenderBufferDesc, RenderBufferKind,
    ResetOutcome, ResultCode, ResultKind, StaticCaps, SwapEffect, VideoMode, VsyncInterval,
    WindowKey,
};

const BACK_BUFFER: GpuHandle = GpuHandle::new(1);
const AUTO_DEPTH: GpuHandle = GpuHandle::new(2);
const FIRST_OBJECT_HANDLE: u64 = 16;

/// A secondary window the device can present into.
struct AuxWindow {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

impl DepthBuffer {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lazarus depth buffer"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            format,
        }
    }
}

enum GpuObject {
    ColorBuffer {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
    },
    DepthBuffer(DepthBuffer),
    Pattern {
        _texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
    SwapChain {
        window: WindowKey,
        format: wgpu::TextureFormat,
        frame: Option<GpuFrame>,
    },
}

struct BoundTarget {
    color: GpuHandle,
    depth: Option<GpuHandle>,
    viewport: Viewport,
    uniform: wgpu::BindGroup,
}

/// A resolved render-pass attachment.
struct Attachment<'a> {
    view: &'a wgpu::TextureView,
    format: wgpu::TextureFormat,
}

/// Objects owned by one logical device. Dropped as a whole when the device
/// is released or recreated after a loss.
struct DeviceObjects {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    auto_depth: Option<DepthBuffer>,
    pipelines: PipelineCache,
    objects: HashMap<GpuHandle, GpuObject>,
    frame: Option<GpuFrame>,
    encoder: Option<wgpu::CommandEncoder>,
    target: Option<BoundTarget>,
    state: BatchState,
    pattern_group: wgpu::BindGroup,
}

/// `GpuBackend` on wgpu, presenting into a winit window.
///
/// The instance, adapter and window surfaces live for the whole backend; the
/// logical device and everything created from it live in `DeviceObjects`
/// and are rebuilt when wgpu reports the device lost.
pub struct WgpuBackend {
    config: BackendConfig,
    window: Arc<Window>,
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    caps: StaticCaps,

    windows: HashMap<WindowKey, AuxWindow>,
    next_window: u64,

    /// Set from the device-lost callback, possibly on another thread.
    lost: Arc<AtomicBool>,
    /// A surface reported Lost/Outdated; the next probe asks for a reset.
    surface_stale: bool,
    /// Unrecoverable failure reported by the next probe.
    failure: Option<ResultCode>,

    gpu: Option<DeviceObjects>,
    next_handle: u64,
}

impl WgpuBackend {
    /// Creates the instance, window surface and adapter.
    ///
    /// The logical device is created later by `create_device`.
    pub async fn new(window: Arc<Window>, config: BackendConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let caps = query_caps(&window, &surface, &adapter);

        Ok(Self {
            config,
            window,
            instance,
            surface,
            adapter,
            caps,
            windows: HashMap::new(),
            next_window: 1,
            lost: Arc::new(AtomicBool::new(false)),
            surface_stale: false,
            failure: None,
            gpu: None,
            next_handle: FIRST_OBJECT_HANDLE,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Makes `window` available as a swap chain target.
    pub fn register_window(&mut self, window: Arc<Window>) -> Result<WindowKey> {
        let surface = self
            .instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface for secondary window")?;
        let key = WindowKey(self.next_window);
        self.next_window += 1;
        self.windows.insert(key, AuxWindow { window, surface });
        Ok(key)
    }

    pub fn unregister_window(&mut self, key: WindowKey) {
        self.windows.remove(&key);
    }

    fn allocate_handle(&mut self) -> GpuHandle {
        let handle = GpuHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn is_minimized(&self) -> bool {
        let size = self.window.inner_size();
        self.window.is_minimized().unwrap_or(false) || size.width == 0 || size.height == 0
    }

    fn open_device(&mut self, params: &PresentationParameters) -> Result<(), ResultCode> {
        let (device, queue) = pollster::block_on(self.adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("lazarus device"),
            required_features: self.config.required_features,
            required_limits: self.config.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| ResultCode::new(ResultKind::CannotCreate, format!("request_device: {e}")))?;

        self.lost.store(false, Ordering::SeqCst);
        let lost = self.lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            if !matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                log::warn!("wgpu device lost ({reason:?}): {message}");
                lost.store(true, Ordering::SeqCst);
            }
        });

        let caps = self.surface.get_capabilities(&self.adapter);
        let format = choose_surface_format(&caps, self.config.prefer_srgb).ok_or_else(|| {
            ResultCode::new(ResultKind::NotAvailable, "surface reports no formats")
        })?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: params.back_buffer_width.max(1),
            height: params.back_buffer_height.max(1),
            present_mode: choose_present_mode(&caps, params.presentation_interval),
            alpha_mode: choose_alpha_mode(&caps, self.config.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: self.frame_latency(params),
        };

        self.apply_window_mode(params);
        self.surface.configure(&device, &surface_config);

        let auto_depth = depth_texture_format(params.auto_depth_stencil_format)
            .map(|f| DepthBuffer::new(&device, f, surface_config.width, surface_config.height));
        let mut pipelines = PipelineCache::new(&device, &queue);
        let state = BatchState::new(RenderStateBlock::default(), None);
        let pattern_group = pipelines.pattern_group(&device, None, state.render.wrap);

        log::debug!(
            "wgpu device ready: {:?} {}x{} {:?}",
            surface_config.format,
            surface_config.width,
            surface_config.height,
            surface_config.present_mode
        );

        self.gpu = Some(DeviceObjects {
            device,
            queue,
            surface_config,
            auto_depth,
            pipelines,
            objects: HashMap::new(),
            frame: None,
            encoder: None,
            target: None,
            state,
            pattern_group,
        });
        self.surface_stale = false;
        Ok(())
    }

    fn frame_latency(&self, params: &PresentationParameters) -> u32 {
        if params.swap_effect == SwapEffect::Copy {
            return 1;
        }
        params
            .back_buffer_count
            .min(self.config.desired_maximum_frame_latency)
            .max(1)
    }

    /// Moves the window in or out of exclusive fullscreen to match `params`.
    fn apply_window_mode(&self, params: &PresentationParameters) {
        if params.windowed {
            if self.window.fullscreen().is_some() {
                self.window.set_fullscreen(None);
            }
            return;
        }

        let monitor = self.window.current_monitor();
        let exclusive = monitor.as_ref().and_then(|m| {
            m.video_modes().find(|v| {
                let size = v.size();
                size.width == params.back_buffer_width
                    && size.height == params.back_buffer_height
                    && (params.refresh_rate == 0
                        || v.refresh_rate_millihertz() / 1000 == params.refresh_rate)
            })
        });
        match exclusive {
            Some(mode) => self.window.set_fullscreen(Some(Fullscreen::Exclusive(mode))),
            None => {
                log::debug!(
                    "no exclusive mode {}x{}; using borderless fullscreen",
                    params.back_buffer_width,
                    params.back_buffer_height
                );
                self.window.set_fullscreen(Some(Fullscreen::Borderless(monitor)));
            }
        }
    }

    /// Reconfigures the surfaces of a live device for new parameters.
    fn reconfigure(&mut self, params: &PresentationParameters) {
        self.apply_window_mode(params);
        let latency = self.frame_latency(params);
        let caps = self.surface.get_capabilities(&self.adapter);
        let Some(gpu) = self.gpu.as_mut() else { return };

        gpu.frame = None;
        gpu.encoder = None;
        gpu.target = None;

        let config = &mut gpu.surface_config;
        config.width = params.back_buffer_width.max(1);
        config.height = params.back_buffer_height.max(1);
        config.present_mode = choose_present_mode(&caps, params.presentation_interval);
        config.desired_maximum_frame_latency = latency;
        self.surface.configure(&gpu.device, config);

        gpu.auto_depth = depth_texture_format(params.auto_depth_stencil_format)
            .map(|f| DepthBuffer::new(&gpu.device, f, config.width, config.height));
        self.surface_stale = false;
    }

    /// Acquires the swap chain image of the bound target if it is a window.
    ///
    /// Returns `false` when nothing can be drawn this frame.
    fn prepare_target(&mut self) -> bool {
        if self.lost.load(Ordering::SeqCst) || self.failure.is_some() {
            return false;
        }
        let Some(gpu) = self.gpu.as_mut() else { return false };
        let Some(target) = gpu.target.as_ref() else { return false };

        let acquired = if target.color == BACK_BUFFER {
            if gpu.frame.is_some() {
                return true;
            }
            GpuFrame::acquire(&self.surface).map(|f| gpu.frame = Some(f))
        } else {
            match gpu.objects.get_mut(&target.color) {
                Some(GpuObject::SwapChain { window, frame, .. }) => {
                    if frame.is_some() {
                        return true;
                    }
                    let Some(aux) = self.windows.get(&*window) else { return false };
                    GpuFrame::acquire(&aux.surface).map(|f| *frame = Some(f))
                }
                Some(_) => return true,
                None => return false,
            }
        };

        match acquired {
            Ok(()) => true,
            Err(err) => {
                match map_surface_error(&err) {
                    SurfaceErrorAction::Reconfigure => self.surface_stale = true,
                    SurfaceErrorAction::SkipFrame => log::debug!("skipping frame: {err}"),
                    SurfaceErrorAction::Fatal => {
                        self.failure = Some(ResultCode::new(
                            ResultKind::OutOfVideoMemory,
                            format!("surface acquisition failed: {err}"),
                        ));
                    }
                }
                false
            }
        }
    }

    fn gpu_or_invalid(&mut self) -> Result<&mut DeviceObjects, ResultCode> {
        self.gpu
            .as_mut()
            .ok_or_else(|| ResultCode::new(ResultKind::InvalidCall, "no device"))
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    }
}

fn resolve_color<'a>(
    handle: GpuHandle,
    frame: &'a Option<GpuFrame>,
    surface_format: wgpu::TextureFormat,
    objects: &'a HashMap<GpuHandle, GpuObject>,
) -> Option<Attachment<'a>> {
    if handle == BACK_BUFFER {
        return frame.as_ref().map(|f| Attachment {
            view: &f.view,
            format: surface_format,
        });
    }
    match objects.get(&handle)? {
        GpuObject::ColorBuffer { view, format, .. } => Some(Attachment {
            view,
            format: *format,
        }),
        GpuObject::SwapChain { format, frame, .. } => frame.as_ref().map(|f| Attachment {
            view: &f.view,
            format: *format,
        }),
        _ => None,
    }
}

fn resolve_depth<'a>(
    handle: GpuHandle,
    auto_depth: &'a Option<DepthBuffer>,
    objects: &'a HashMap<GpuHandle, GpuObject>,
) -> Option<Attachment<'a>> {
    let buffer = if handle == AUTO_DEPTH {
        auto_depth.as_ref()?
    } else {
        match objects.get(&handle)? {
            GpuObject::DepthBuffer(buffer) => buffer,
            _ => return None,
        }
    };
    Some(Attachment {
        view: &buffer.view,
        format: buffer.format,
    })
}

/// Clamps `viewport` into a `width` x `height` attachment; `None` if nothing is left.
fn clamp_viewport(viewport: Viewport, width: u32, height: u32) -> Option<Viewport> {
    let x = viewport.x.min(width);
    let y = viewport.y.min(height);
    let w = viewport.width.min(width - x);
    let h = viewport.height.min(height - y);
    (w > 0 && h > 0).then(|| Viewport {
        x,
        y,
        width: w,
        height: h,
        ..viewport
    })
}

fn target_size(
    handle: GpuHandle,
    surface_config: &wgpu::SurfaceConfiguration,
    frame: &Option<GpuFrame>,
    objects: &HashMap<GpuHandle, GpuObject>,
) -> (u32, u32) {
    if handle == BACK_BUFFER {
        return frame
            .as_ref()
            .map_or((surface_config.width, surface_config.height), GpuFrame::size);
    }
    match objects.get(&handle) {
        Some(GpuObject::ColorBuffer { texture, .. }) => (texture.width(), texture.height()),
        Some(GpuObject::SwapChain { frame: Some(f), .. }) => f.size(),
        _ => (0, 0),
    }
}

fn query_caps(window: &Window, surface: &wgpu::Surface<'_>, adapter: &wgpu::Adapter) -> StaticCaps {
    let mut caps = StaticCaps::default();
    let monitor: Option<MonitorHandle> = window.current_monitor();

    if let Some(monitor) = monitor {
        let size = monitor.size();
        let hz = monitor.refresh_rate_millihertz().unwrap_or(60_000) / 1000;
        caps.desktop = VideoMode::new(size.width, size.height, PixelFormat::X8R8G8B8)
            .with_refresh_rate(hz);

        let mut modes: Vec<VideoMode> = monitor
            .video_modes()
            .map(|v| {
                let PhysicalSize { width, height } = v.size();
                let format = if v.bit_depth() <= 16 {
                    PixelFormat::R5G6B5
                } else {
                    PixelFormat::X8R8G8B8
                };
                VideoMode::new(width, height, format)
                    .with_refresh_rate(v.refresh_rate_millihertz() / 1000)
            })
            .collect();
        modes.dedup();
        if !modes.is_empty() {
            caps.modes = modes;
        }
    }

    let surface_caps = surface.get_capabilities(adapter);
    caps.vsync_intervals = vec![VsyncInterval::One];
    if surface_caps.present_modes.contains(&wgpu::PresentMode::Immediate) {
        caps.vsync_intervals.push(VsyncInterval::Immediate);
    }
    caps.depth_formats = vec![
        DepthStencilFormat::D16,
        DepthStencilFormat::D24X8,
        DepthStencilFormat::D24S8,
        DepthStencilFormat::D32,
    ];
    caps
}

impl GpuBackend for WgpuBackend {
    fn capabilities(&self) -> &dyn AdapterCaps {
        &self.caps
    }

    fn create_device(&mut self, params: &PresentationParameters) -> Result<(), ResultCode> {
        if params.windowed {
            let _ = self.window.request_inner_size(PhysicalSize::new(
                params.back_buffer_width,
                params.back_buffer_height,
            ));
        }
        self.failure = None;
        self.open_device(params)
    }

    fn cooperative_level(&mut self) -> Result<DeviceStatus, ResultCode> {
        if let Some(failure) = self.failure.clone() {
            return Err(failure);
        }
        if self.gpu.is_none() {
            return Err(ResultCode::new(ResultKind::InvalidCall, "no device"));
        }
        if self.is_minimized() {
            return Ok(DeviceStatus::Lost);
        }
        if self.lost.load(Ordering::SeqCst) || self.surface_stale {
            return Ok(DeviceStatus::NotReset);
        }
        Ok(DeviceStatus::Operational)
    }

    fn reset(&mut self, params: &PresentationParameters) -> Result<ResetOutcome, ResultCode> {
        if let Some(failure) = self.failure.clone() {
            return Err(failure);
        }
        if self.is_minimized() {
            return Ok(ResetOutcome::NotReady);
        }

        if self.lost.load(Ordering::SeqCst) || self.gpu.is_none() {
            if let Some(old) = self.gpu.take() {
                if !old.objects.is_empty() {
                    log::warn!("{} objects still alive across device loss", old.objects.len());
                }
            }
            self.open_device(params)?;
        } else {
            self.reconfigure(params);
        }
        Ok(ResetOutcome::Ready)
    }

    fn release_device(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            log::debug!("releasing wgpu device ({} objects)", gpu.objects.len());
        }
        if self.window.fullscreen().is_some() {
            self.window.set_fullscreen(None);
        }
    }

    fn back_buffer(&mut self) -> Result<BufferInfo, ResultCode> {
        let gpu = self.gpu_or_invalid()?;
        Ok(BufferInfo {
            handle: BACK_BUFFER,
            width: gpu.surface_config.width,
            height: gpu.surface_config.height,
        })
    }

    fn auto_depth_stencil(&mut self) -> Option<BufferInfo> {
        let gpu = self.gpu.as_ref()?;
        gpu.auto_depth.as_ref().map(|_| BufferInfo {
            handle: AUTO_DEPTH,
            width: gpu.surface_config.width,
            height: gpu.surface_config.height,
        })
    }

    fn create_render_buffer(&mut self, desc: &RenderBufferDesc) -> Result<BufferInfo, ResultCode> {
        let handle = self.allocate_handle();
        let gpu = self.gpu_or_invalid()?;
        let object = match desc.kind {
            RenderBufferKind::Color(format) => {
                let format = color_texture_format(format);
                let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("lazarus offscreen color"),
                    size: extent(desc.width, desc.height),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                GpuObject::ColorBuffer {
                    texture,
                    view,
                    format,
                }
            }
            RenderBufferKind::DepthStencil(format) => {
                let format = depth_texture_format(format).ok_or_else(|| {
                    ResultCode::new(ResultKind::InvalidCall, "depth buffer without a depth format")
                })?;
                GpuObject::DepthBuffer(DepthBuffer::new(&gpu.device, format, desc.width, desc.height))
            }
        };
        gpu.objects.insert(handle, object);
        Ok(BufferInfo {
            handle,
            width: desc.width.max(1),
            height: desc.height.max(1),
        })
    }

    fn create_swap_chain(
        &mut self,
        window: WindowKey,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<BufferInfo, ResultCode> {
        let handle = self.allocate_handle();
        let Some(aux) = self.windows.get(&window) else {
            return Err(ResultCode::new(
                ResultKind::InvalidCall,
                format!("window {} is not registered", window.0),
            ));
        };
        let Some(gpu) = self.gpu.as_mut() else {
            return Err(ResultCode::new(ResultKind::InvalidCall, "no device"));
        };

        let caps = aux.surface.get_capabilities(&self.adapter);
        let surface_format = choose_surface_format(&caps, self.config.prefer_srgb)
            .ok_or_else(|| ResultCode::new(ResultKind::NotAvailable, "surface reports no formats"))?;
        log::debug!("swap chain for window {}: {format:?} as {surface_format:?}", window.0);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: gpu.surface_config.present_mode,
            alpha_mode: choose_alpha_mode(&caps, self.config.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: gpu.surface_config.desired_maximum_frame_latency,
        };
        aux.surface.configure(&gpu.device, &config);

        gpu.objects.insert(
            handle,
            GpuObject::SwapChain {
                window,
                format: surface_format,
                frame: None,
            },
        );
        Ok(BufferInfo {
            handle,
            width: config.width,
            height: config.height,
        })
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<GpuHandle, ResultCode> {
        let handle = self.allocate_handle();
        let gpu = self.gpu_or_invalid()?;
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lazarus pattern"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        gpu.objects.insert(
            handle,
            GpuObject::Pattern {
                _texture: texture,
                view,
            },
        );
        Ok(handle)
    }

    fn release(&mut self, handle: GpuHandle) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        gpu.objects.remove(&handle);
        if gpu
            .target
            .as_ref()
            .is_some_and(|t| t.color == handle || t.depth == Some(handle))
        {
            gpu.target = None;
        }
    }

    fn set_render_target(&mut self, color: GpuHandle, depth: Option<GpuHandle>, viewport: Viewport) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        let uniform = gpu.pipelines.viewport_group(&gpu.device, viewport);
        gpu.target = Some(BoundTarget {
            color,
            depth,
            viewport,
            uniform,
        });
    }

    fn apply_render_state(&mut self, state: &BatchState) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        let view = state.pattern.and_then(|h| match gpu.objects.get(&h) {
            Some(GpuObject::Pattern { view, .. }) => Some(view),
            _ => None,
        });
        gpu.pattern_group = gpu.pipelines.pattern_group(&gpu.device, view, state.render.wrap);
        gpu.state = *state;
    }

    fn draw(&mut self, style: PrimitiveStyle, vertices: &[Vertex]) {
        if vertices.is_empty() || !self.prepare_target() {
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else { return };
        let DeviceObjects {
            device,
            surface_config,
            auto_depth,
            pipelines,
            objects,
            frame,
            encoder,
            target,
            state,
            pattern_group,
            ..
        } = gpu;
        let Some(bound) = target.as_ref() else { return };
        let (width, height) = target_size(bound.color, surface_config, frame, objects);
        let Some(viewport) = clamp_viewport(bound.viewport, width, height) else { return };
        let Some(color) = resolve_color(bound.color, frame, surface_config.format, objects) else {
            return;
        };
        let depth = bound.depth.and_then(|h| resolve_depth(h, auto_depth, objects));

        let key = PipelineKey::new(&state.render, style, color.format, depth.as_ref().map(|d| d.format));
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lazarus batch vbo"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let pipeline = pipelines.pipeline(device, &key);
        let encoder = encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lazarus frame encoder"),
            })
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lazarus batch pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth.as_ref().map(|d| wgpu::RenderPassDepthStencilAttachment {
                view: d.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: d.format.has_stencil_aspect().then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bound.uniform, &[]);
        rpass.set_bind_group(1, &*pattern_group, &[]);
        rpass.set_vertex_buffer(0, vertex_buffer.slice(..));
        rpass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            viewport.min_depth,
            viewport.max_depth,
        );
        if key.stencil.enabled {
            rpass.set_stencil_reference(key.stencil.reference);
        }
        rpass.draw(0..vertices.len() as u32, 0..1);
    }

    fn clear(&mut self, flags: ClearFlags, color: Color, depth: f32, stencil: u32) {
        if !self.prepare_target() {
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else { return };
        let DeviceObjects {
            device,
            surface_config,
            auto_depth,
            objects,
            frame,
            encoder,
            target,
            ..
        } = gpu;
        let Some(bound) = target.as_ref() else { return };
        let Some(attachment) = resolve_color(bound.color, frame, surface_config.format, objects) else {
            return;
        };
        let depth_attachment = bound.depth.and_then(|h| resolve_depth(h, auto_depth, objects));

        let color_load = if flags.contains(ClearFlags::TARGET) {
            wgpu::LoadOp::Clear(wgpu::Color {
                r: color.r as f64,
                g: color.g as f64,
                b: color.b as f64,
                a: color.a as f64,
            })
        } else {
            wgpu::LoadOp::Load
        };
        let depth_load = if flags.contains(ClearFlags::DEPTH) {
            wgpu::LoadOp::Clear(depth.clamp(0.0, 1.0))
        } else {
            wgpu::LoadOp::Load
        };
        let stencil_load = if flags.contains(ClearFlags::STENCIL) {
            wgpu::LoadOp::Clear(stencil)
        } else {
            wgpu::LoadOp::Load
        };

        let encoder = encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lazarus frame encoder"),
            })
        });
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lazarus clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_attachment.as_ref().map(|d| {
                wgpu::RenderPassDepthStencilAttachment {
                    view: d.view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: d.format.has_stencil_aspect().then_some(wgpu::Operations {
                        load: stencil_load,
                        store: wgpu::StoreOp::Store,
                    }),
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn present(&mut self, swap_chain: Option<GpuHandle>) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        if let Some(encoder) = gpu.encoder.take() {
            gpu.queue.submit(std::iter::once(encoder.finish()));
        }

        match swap_chain {
            None => {
                if let Some(frame) = gpu.frame.take() {
                    self.window.pre_present_notify();
                    frame.present();
                }
            }
            Some(handle) => {
                if let Some(GpuObject::SwapChain { window, frame, .. }) = gpu.objects.get_mut(&handle) {
                    if let Some(frame) = frame.take() {
                        if let Some(aux) = self.windows.get(&*window) {
                            aux.window.pre_present_notify();
                        }
                        frame.present();
                    }
                }
            }
        }
    }
}
