//! Render target surfaces.
//!
//! One `RenderSurface` type covers every target variant. The variant only
//! decides where the color/depth buffers come from and how they are rebuilt
//! after a reset; drawing is identical for all of them.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coords::{Color, Point, Rect, Viewport};
use crate::device::{
    select_depth_stencil_format, BufferInfo, DepthStencilFormat, DeviceContext, DeviceError,
    DeviceResource, GpuBackend, PixelFormat, Registration, RenderBufferDesc, RenderBufferKind,
    ResourceId, TargetBinding, WindowKey,
};

use super::pattern::SharedPattern;
use super::raster::{self, Span};
use super::{BatchState, ClearFlags, PrimitiveStyle, RenderStateBlock, Vertex};

pub type SharedSurface = Rc<RefCell<RenderSurface>>;

/// Widest square pen `line_with_width` draws with; wider requests are clamped.
pub const MAX_PEN_WIDTH: u32 = 1 << 16;

/// Where a surface's buffers come from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TargetKind {
    /// The device back buffer and its automatic depth buffer.
    PrimaryWindow,
    /// An additional swap chain presenting into its own window.
    SwapChain { window: WindowKey },
    /// Color buffer (and optional depth buffer) that is never presented.
    Offscreen { use_depth: bool },
}

/// Drawable surface with its own render state.
///
/// The surface keeps identity and render state across device resets; only
/// the GPU buffers are dropped and rebuilt.
pub struct RenderSurface {
    kind: TargetKind,
    width: u32,
    height: u32,
    format: PixelFormat,
    depth_format: DepthStencilFormat,

    background: Color,
    render_state: RenderStateBlock,
    pattern: Option<SharedPattern>,
    pattern_offset: Point,
    default_view: Viewport,
    primitive_depth: f32,
    /// Overrides the context's clear mask when set.
    clear_mask: Option<ClearFlags>,

    color: Option<BufferInfo>,
    depth: Option<BufferInfo>,
    registration: Option<Registration>,
}

impl RenderSurface {
    /// Surface drawing into the device back buffer.
    pub fn primary(ctx: &mut DeviceContext) -> Result<SharedSurface, DeviceError> {
        let (width, height) = ctx
            .back_buffer_size()
            .or_else(|| ctx.params().map(|p| (p.back_buffer_width, p.back_buffer_height)))
            .unwrap_or((0, 0));
        let format = ctx
            .params()
            .map_or(PixelFormat::X8R8G8B8, |p| p.back_buffer_format);
        let depth_format = ctx
            .params()
            .map_or(DepthStencilFormat::None, |p| p.auto_depth_stencil_format);

        Self::attach(
            Self::with_kind(TargetKind::PrimaryWindow, width, height, format, depth_format),
            ctx,
        )
    }

    /// Offscreen color target, optionally with a depth buffer.
    pub fn offscreen(
        ctx: &mut DeviceContext,
        width: u32,
        height: u32,
        use_depth: bool,
    ) -> Result<SharedSurface, DeviceError> {
        let format = PixelFormat::A8R8G8B8;
        let depth_format = if use_depth {
            select_depth_stencil_format(true, false, format, ctx.gpu().capabilities())
        } else {
            DepthStencilFormat::None
        };

        Self::attach(
            Self::with_kind(
                TargetKind::Offscreen { use_depth },
                width.max(1),
                height.max(1),
                format,
                depth_format,
            ),
            ctx,
        )
    }

    /// Extra swap chain presenting into `window`.
    pub fn swap_chain(
        ctx: &mut DeviceContext,
        window: WindowKey,
        width: u32,
        height: u32,
    ) -> Result<SharedSurface, DeviceError> {
        let format = ctx
            .params()
            .map_or(PixelFormat::X8R8G8B8, |p| p.back_buffer_format);

        Self::attach(
            Self::with_kind(
                TargetKind::SwapChain { window },
                width.max(1),
                height.max(1),
                format,
                DepthStencilFormat::None,
            ),
            ctx,
        )
    }

    fn with_kind(
        kind: TargetKind,
        width: u32,
        height: u32,
        format: PixelFormat,
        depth_format: DepthStencilFormat,
    ) -> Self {
        Self {
            kind,
            width,
            height,
            format,
            depth_format,
            background: Color::BLACK,
            render_state: RenderStateBlock::default(),
            pattern: None,
            pattern_offset: Point::zero(),
            default_view: Viewport::full(width, height),
            primitive_depth: 0.0,
            clear_mask: None,
            color: None,
            depth: None,
            registration: None,
        }
    }

    fn attach(surface: Self, ctx: &mut DeviceContext) -> Result<SharedSurface, DeviceError> {
        let surface = Rc::new(RefCell::new(surface));
        let resource: Rc<RefCell<dyn DeviceResource>> = surface.clone();
        let registration = ctx.registry().register(&resource);
        log::debug!(
            "render surface {} ({:?}) registered",
            registration.id(),
            surface.borrow().kind
        );
        surface.borrow_mut().registration = Some(registration);

        // Devices created later hand out buffers through `notify_reset`.
        if ctx.is_drawable() {
            surface.borrow_mut().on_device_reset(ctx.gpu())?;
        }
        Ok(surface)
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn id(&self) -> Option<ResourceId> {
        self.registration.as_ref().map(Registration::id)
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::of_size(self.width, self.height)
    }

    pub fn default_view(&self) -> Viewport {
        self.default_view
    }

    /// True while GPU buffers are held (device active).
    pub fn has_buffers(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn is_active(&self, ctx: &DeviceContext) -> bool {
        self.id().is_some_and(|id| ctx.is_target_active(id))
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn render_state(&self) -> &RenderStateBlock {
        &self.render_state
    }

    /// Replaces the state block; the next primitive starts a new batch run.
    pub fn set_render_state(&mut self, state: RenderStateBlock) {
        self.render_state = state;
    }

    pub fn pattern(&self) -> Option<&SharedPattern> {
        self.pattern.as_ref()
    }

    pub fn set_pattern(&mut self, pattern: Option<SharedPattern>) {
        self.pattern = pattern;
    }

    pub fn pattern_offset(&self) -> Point {
        self.pattern_offset
    }

    pub fn set_pattern_offset(&mut self, offset: Point) {
        self.pattern_offset = offset;
    }

    pub fn primitive_depth(&self) -> f32 {
        self.primitive_depth
    }

    /// Z of every vertex emitted by this surface, clamped to `[0, 1]`.
    pub fn set_primitive_depth(&mut self, depth: f32) {
        self.primitive_depth = if depth.is_nan() { 0.0 } else { depth.clamp(0.0, 1.0) };
    }

    pub fn clear_mask(&self) -> Option<ClearFlags> {
        self.clear_mask
    }

    pub fn set_clear_mask(&mut self, mask: Option<ClearFlags>) {
        self.clear_mask = mask;
    }

    // ── drawing session ───────────────────────────────────────────────────

    fn binding(&self) -> Option<TargetBinding> {
        Some(TargetBinding {
            id: self.id()?,
            color: self.color?.handle,
            depth: self.depth.map(|d| d.handle),
            viewport: self.default_view,
        })
    }

    /// Makes this surface the active target, remembering the current one.
    ///
    /// No-op when already active or while the device cannot draw.
    pub fn begin_drawing(&mut self, ctx: &mut DeviceContext) -> Result<(), DeviceError> {
        match self.binding() {
            Some(binding) => ctx.begin_target(binding).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Flushes this surface's pending primitives and restores the previous target.
    pub fn end_drawing(&mut self, ctx: &mut DeviceContext) {
        if let Some(id) = self.id() {
            ctx.end_target(id);
        }
    }

    /// Clears the buffers selected by the clear mask.
    ///
    /// Wraps its own begin/end pair unless the surface is already the active target.
    pub fn clear(
        &mut self,
        ctx: &mut DeviceContext,
        color: Color,
        depth: f32,
        stencil: u32,
    ) -> Result<(), DeviceError> {
        let Some(binding) = self.binding() else {
            return Ok(());
        };
        let began = !ctx.is_target_active(binding.id) && ctx.begin_target(binding)?;

        let mut flags = self.clear_mask.unwrap_or(ctx.config().clear_mask);
        if self.depth.is_none() {
            flags.remove(ClearFlags::DEPTH | ClearFlags::STENCIL);
        }
        ctx.clear_target(flags, color, depth.clamp(0.0, 1.0), stencil);

        if began {
            ctx.end_target(binding.id);
        }
        Ok(())
    }

    /// Clears to the background color, far depth, and zero stencil.
    pub fn clear_background(&mut self, ctx: &mut DeviceContext) -> Result<(), DeviceError> {
        let background = self.background;
        self.clear(ctx, background, 1.0, 0)
    }

    // ── primitives ────────────────────────────────────────────────────────

    pub fn set_point(&mut self, ctx: &mut DeviceContext, at: Point, color: Color) {
        let brush = self.brush(color);
        self.emit(ctx, &[brush.pixel(at)], PrimitiveStyle::PointList);
    }

    /// One-pixel line from `p0` to `p1`.
    pub fn line(&mut self, ctx: &mut DeviceContext, p0: Point, p1: Point, color: Color) {
        let brush = self.brush(color);
        self.emit(ctx, &[brush.pixel(p0), brush.pixel(p1)], PrimitiveStyle::LineList);
    }

    /// Line drawn with a square pen of `width` pixels.
    ///
    /// Every stepped pixel is submitted on its own; they share one batch run.
    pub fn line_with_width(
        &mut self,
        ctx: &mut DeviceContext,
        p0: Point,
        p1: Point,
        color: Color,
        width: u32,
    ) {
        if width <= 1 {
            self.line(ctx, p0, p1, color);
            return;
        }

        let brush = self.brush(color);
        let w = width.min(MAX_PEN_WIDTH) as i32;
        // Pen positions whose square still touches the surface.
        let reach = self.bounds().outset(w);
        let mut quad = Vec::with_capacity(6);
        for p in raster::line_points(p0, p1, reach) {
            quad.clear();
            let origin = Point::new(p.x - w / 2, p.y - w / 2);
            brush.quad(&mut quad, Rect::new(origin.x, origin.y, w, w));
            self.emit(ctx, &quad, PrimitiveStyle::TriangleList);
        }
    }

    /// One-pixel outline just inside `rect`, clipped to the surface.
    pub fn rectangle(&mut self, ctx: &mut DeviceContext, rect: Rect, color: Color) {
        let r = rect.normalized();
        if r.is_empty() {
            return;
        }

        // Far edges may lie past the i32 range; such edges are off-surface anyway.
        let bottom = i32::try_from(i64::from(r.y) + i64::from(r.height) - 1).ok();
        let right = i32::try_from(i64::from(r.x) + i64::from(r.width) - 1).ok();

        let mut edges = vec![Rect::new(r.x, r.y, r.width, 1)];
        if r.height > 1 {
            edges.extend(bottom.map(|y| Rect::new(r.x, y, r.width, 1)));
        }
        if let (true, Some(top)) = (r.height > 2, r.y.checked_add(1)) {
            edges.push(Rect::new(r.x, top, 1, r.height - 2));
            if r.width > 1 {
                edges.extend(right.map(|x| Rect::new(x, top, 1, r.height - 2)));
            }
        }

        let bounds = self.bounds();
        let brush = self.brush(color);
        let mut out = Vec::with_capacity(24);
        for edge in edges.into_iter().filter_map(|e| e.intersect(bounds)) {
            brush.quad(&mut out, edge);
        }
        self.emit(ctx, &out, PrimitiveStyle::TriangleList);
    }

    /// Solid rectangle, clipped to the surface.
    pub fn filled_rectangle(&mut self, ctx: &mut DeviceContext, rect: Rect, color: Color) {
        let Some(r) = rect.intersect(self.bounds()) else {
            return;
        };
        let brush = self.brush(color);
        let mut out = Vec::with_capacity(6);
        brush.quad(&mut out, r);
        self.emit(ctx, &out, PrimitiveStyle::TriangleList);
    }

    pub fn circle(&mut self, ctx: &mut DeviceContext, center: Point, radius: i32, color: Color) {
        let brush = self.brush(color);
        let points: Vec<Vertex> = raster::circle_points(center, radius, self.bounds())
            .into_iter()
            .map(|p| brush.pixel(p))
            .collect();
        self.emit(ctx, &points, PrimitiveStyle::PointList);
    }

    pub fn filled_circle(
        &mut self,
        ctx: &mut DeviceContext,
        center: Point,
        radius: i32,
        color: Color,
    ) {
        if radius == 0 {
            self.set_point(ctx, center, color);
            return;
        }
        let spans = raster::circle_spans(center, radius, self.bounds());
        self.emit_spans(ctx, &spans, color);
    }

    pub fn ellipse(
        &mut self,
        ctx: &mut DeviceContext,
        center: Point,
        radius_x: i32,
        radius_y: i32,
        color: Color,
    ) {
        let brush = self.brush(color);
        let points: Vec<Vertex> = raster::ellipse_points(center, radius_x, radius_y, self.bounds())
            .into_iter()
            .map(|p| brush.pixel(p))
            .collect();
        self.emit(ctx, &points, PrimitiveStyle::PointList);
    }

    pub fn filled_ellipse(
        &mut self,
        ctx: &mut DeviceContext,
        center: Point,
        radius_x: i32,
        radius_y: i32,
        color: Color,
    ) {
        if radius_x == 0 && radius_y == 0 {
            self.set_point(ctx, center, color);
            return;
        }
        let spans = raster::ellipse_spans(center, radius_x, radius_y, self.bounds());
        self.emit_spans(ctx, &spans, color);
    }

    fn emit_spans(&mut self, ctx: &mut DeviceContext, spans: &[Span], color: Color) {
        let brush = self.brush(color);
        let mut out = Vec::with_capacity(spans.len() * 2);
        for span in spans {
            brush.span(&mut out, *span);
        }
        self.emit(ctx, &out, PrimitiveStyle::LineList);
    }

    /// Routes a primitive to the batch of this surface.
    fn emit(&self, ctx: &mut DeviceContext, vertices: &[Vertex], style: PrimitiveStyle) {
        if vertices.is_empty() {
            return;
        }
        let Some(binding) = self.binding() else {
            return;
        };
        ctx.draw_to(binding, vertices, style, self.batch_state());
    }

    fn batch_state(&self) -> BatchState {
        let pattern = self.pattern.as_ref().and_then(|p| p.borrow().texture());
        BatchState::new(self.render_state, pattern)
    }

    fn brush(&self, color: Color) -> Brush {
        let pattern = self.pattern.as_ref().map(|p| {
            let p = p.borrow();
            PatternFrame {
                offset_x: self.pattern_offset.x as f32,
                offset_y: self.pattern_offset.y as f32,
                width: p.width().max(1) as f32,
                height: p.height().max(1) as f32,
            }
        });
        Brush {
            z: self.primitive_depth,
            color,
            pattern,
        }
    }

    // ── presentation and size ─────────────────────────────────────────────

    /// Presents a swap-chain surface into its window.
    ///
    /// The primary target is presented by `DeviceContext::present`, which also
    /// probes the device.
    pub fn present(&mut self, ctx: &mut DeviceContext) -> bool {
        let (TargetKind::SwapChain { .. }, Some(color)) = (self.kind, self.color) else {
            log::debug!("present ignored for {:?} surface", self.kind);
            return false;
        };
        if !ctx.is_drawable() {
            return false;
        }
        ctx.flush();
        ctx.gpu().present(Some(color.handle));
        true
    }

    /// Resizes a swap-chain or offscreen surface, rebuilding its buffers.
    pub fn resize(
        &mut self,
        ctx: &mut DeviceContext,
        width: u32,
        height: u32,
    ) -> Result<(), DeviceError> {
        if self.kind == TargetKind::PrimaryWindow {
            log::debug!("primary surface follows the device back buffer; resize ignored");
            return Ok(());
        }
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }

        if let Some(id) = self.id() {
            ctx.flush();
            ctx.forget_target(id);
        }
        self.set_size(width, height);

        if self.color.is_some() {
            self.release_buffers(ctx.gpu());
            self.on_device_reset(ctx.gpu())?;
        }
        Ok(())
    }

    /// Releases GPU buffers and leaves the registry.
    pub fn release(&mut self, ctx: &mut DeviceContext) {
        if let Some(id) = self.id() {
            ctx.forget_target(id);
        }
        if let Err(e) = self.force_release(ctx.gpu()) {
            log::warn!("render surface release failed: {e}");
        }
        self.registration = None;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.default_view = Viewport::full(width, height);
    }

    fn release_buffers(&mut self, gpu: &mut dyn GpuBackend) {
        for buffer in [self.color.take(), self.depth.take()].into_iter().flatten() {
            gpu.release(buffer.handle);
        }
    }
}

impl DeviceResource for RenderSurface {
    fn on_device_lost(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        match self.kind {
            // Owned by the device; just forget the handles.
            TargetKind::PrimaryWindow => {
                self.color = None;
                self.depth = None;
            }
            _ => self.release_buffers(gpu),
        }
        Ok(())
    }

    fn on_device_reset(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        match self.kind {
            TargetKind::PrimaryWindow => {
                let back_buffer = gpu.back_buffer()?;
                self.set_size(back_buffer.width, back_buffer.height);
                self.color = Some(back_buffer);
                self.depth = gpu.auto_depth_stencil();
            }
            TargetKind::SwapChain { window } => {
                self.release_buffers(gpu);
                self.color =
                    Some(gpu.create_swap_chain(window, self.width, self.height, self.format)?);
            }
            TargetKind::Offscreen { use_depth } => {
                self.release_buffers(gpu);
                self.color = Some(gpu.create_render_buffer(&RenderBufferDesc {
                    width: self.width,
                    height: self.height,
                    kind: RenderBufferKind::Color(self.format),
                })?);
                if use_depth && self.depth_format != DepthStencilFormat::None {
                    self.depth = Some(gpu.create_render_buffer(&RenderBufferDesc {
                        width: self.width,
                        height: self.height,
                        kind: RenderBufferKind::DepthStencil(self.depth_format),
                    })?);
                }
            }
        }
        Ok(())
    }

    fn force_release(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.on_device_lost(gpu)
    }

    fn presents_to_window(&self) -> bool {
        matches!(self.kind, TargetKind::SwapChain { .. })
    }
}

#[derive(Debug, Copy, Clone)]
struct PatternFrame {
    offset_x: f32,
    offset_y: f32,
    width: f32,
    height: f32,
}

/// Per-primitive vertex factory: fixed Z, color, and pattern mapping.
#[derive(Debug, Copy, Clone)]
struct Brush {
    z: f32,
    color: Color,
    pattern: Option<PatternFrame>,
}

impl Brush {
    fn vertex(&self, x: f32, y: f32) -> Vertex {
        let uv = match self.pattern {
            None => [0.0, 0.0],
            Some(p) => [(x + p.offset_x) / p.width, (y + p.offset_y) / p.height],
        };
        Vertex::new(x, y, self.z, self.color, uv)
    }

    /// Vertex at the center of pixel `p`.
    fn pixel(&self, p: Point) -> Vertex {
        self.vertex(p.x as f32 + 0.5, p.y as f32 + 0.5)
    }

    /// Two triangles covering `r` edge to edge.
    fn quad(&self, out: &mut Vec<Vertex>, r: Rect) {
        let (x0, y0) = (r.x as f32, r.y as f32);
        let (x1, y1) = ((r.x + r.width) as f32, (r.y + r.height) as f32);
        out.extend_from_slice(&[
            self.vertex(x0, y0),
            self.vertex(x1, y0),
            self.vertex(x1, y1),
            self.vertex(x0, y0),
            self.vertex(x1, y1),
            self.vertex(x0, y1),
        ]);
    }

    /// Line segment covering every pixel of `span`.
    fn span(&self, out: &mut Vec<Vertex>, span: Span) {
        let y = span.y as f32 + 0.5;
        out.push(self.vertex(span.x0 as f32, y));
        out.push(self.vertex((span.x1 + 1) as f32, y));
    }
}
