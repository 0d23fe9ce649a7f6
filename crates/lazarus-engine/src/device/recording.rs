//! Headless backend that records every device call.
//!
//! Probe and reset results are scripted through a [`Recorder`] handle, which
//! makes lost-device sequences reproducible without a GPU.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::coords::{Color, Viewport};
use crate::render::{BatchState, ClearFlags, PrimitiveStyle, Vertex};

use super::{
    AdapterCaps, BufferInfo, DeviceStatus, GpuBackend, GpuHandle, PixelFormat,
    PresentationParameters, RenderBufferDesc, ResetOutcome, ResultCode, ResultKind, StaticCaps,
    WindowKey,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateDevice { width: u32, height: u32, windowed: bool },
    Reset { width: u32, height: u32, windowed: bool },
    ReleaseDevice,
    CreateRenderBuffer(RenderBufferDesc),
    CreateSwapChain { window: WindowKey, width: u32, height: u32 },
    CreateTexture { width: u32, height: u32 },
    Release(GpuHandle),
    SetRenderTarget { color: GpuHandle, depth: Option<GpuHandle>, viewport: Viewport },
    ApplyRenderState(BatchState),
    Draw { style: PrimitiveStyle, vertices: Vec<Vertex> },
    Clear { flags: ClearFlags, color: Color, depth: f32, stencil: u32 },
    Present(Option<GpuHandle>),
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<Call>,
    status: Option<DeviceStatus>,
    driver_failure: Option<ResultCode>,
    create_failure: Option<ResultCode>,
    reset_script: VecDeque<Result<ResetOutcome, ResultCode>>,
    params: Option<PresentationParameters>,
    back_buffer: Option<GpuHandle>,
    depth_buffer: Option<GpuHandle>,
    live: HashSet<GpuHandle>,
    leaked_on_reset: usize,
    next_handle: u64,
}

impl RecorderState {
    fn alloc(&mut self) -> GpuHandle {
        self.next_handle += 1;
        GpuHandle::new(self.next_handle)
    }

    fn rebuild_swap_chain(&mut self, params: &PresentationParameters) {
        self.params = Some(*params);
        self.back_buffer = Some(self.alloc());
        self.depth_buffer = if params.auto_depth_stencil_format.has_depth() {
            Some(self.alloc())
        } else {
            None
        };
    }
}

/// Backend half: owned by the device context.
pub struct RecordingBackend {
    caps: StaticCaps,
    state: Rc<RefCell<RecorderState>>,
}

/// Test half: scripts results and inspects recorded calls.
#[derive(Clone)]
pub struct Recorder {
    state: Rc<RefCell<RecorderState>>,
}

impl RecordingBackend {
    pub fn new() -> (Self, Recorder) {
        Self::with_caps(StaticCaps::default())
    }

    pub fn with_caps(caps: StaticCaps) -> (Self, Recorder) {
        let state = Rc::new(RefCell::new(RecorderState::default()));
        (
            Self {
                caps,
                state: state.clone(),
            },
            Recorder { state },
        )
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Recorder {
    /// Sets the status every following probe reports until changed.
    pub fn set_status(&self, status: DeviceStatus) {
        self.state.borrow_mut().status = Some(status);
    }

    /// Makes the next probe report an unrecoverable driver error.
    pub fn fail_driver(&self, code: ResultCode) {
        self.state.borrow_mut().driver_failure = Some(code);
    }

    pub fn fail_next_create(&self, code: ResultCode) {
        self.state.borrow_mut().create_failure = Some(code);
    }

    /// Queues the result of a future reset call. Unscripted resets succeed.
    pub fn script_reset(&self, outcome: Result<ResetOutcome, ResultCode>) {
        self.state.borrow_mut().reset_script.push_back(outcome);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// `(style, vertex count)` of every draw call so far.
    pub fn draws(&self) -> Vec<(PrimitiveStyle, usize)> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw { style, vertices } => Some((*style, vertices.len())),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.draws().len()
    }

    pub fn state_applications(&self) -> Vec<BatchState> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::ApplyRenderState(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Handles created through the backend and not yet released.
    pub fn live_handles(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Handles that were still alive when a reset succeeded.
    pub fn leaked_on_reset(&self) -> usize {
        self.state.borrow().leaked_on_reset
    }

    pub fn params(&self) -> Option<PresentationParameters> {
        self.state.borrow().params
    }
}

impl GpuBackend for RecordingBackend {
    fn capabilities(&self) -> &dyn AdapterCaps {
        &self.caps
    }

    fn create_device(&mut self, params: &PresentationParameters) -> Result<(), ResultCode> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::CreateDevice {
            width: params.back_buffer_width,
            height: params.back_buffer_height,
            windowed: params.windowed,
        });
        if let Some(code) = st.create_failure.take() {
            return Err(code);
        }
        st.status = Some(DeviceStatus::Operational);
        st.rebuild_swap_chain(params);
        Ok(())
    }

    fn cooperative_level(&mut self) -> Result<DeviceStatus, ResultCode> {
        let mut st = self.state.borrow_mut();
        if let Some(code) = st.driver_failure.take() {
            return Err(code);
        }
        Ok(st.status.unwrap_or(DeviceStatus::Operational))
    }

    fn reset(&mut self, params: &PresentationParameters) -> Result<ResetOutcome, ResultCode> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::Reset {
            width: params.back_buffer_width,
            height: params.back_buffer_height,
            windowed: params.windowed,
        });
        let outcome = st.reset_script.pop_front().unwrap_or(Ok(ResetOutcome::Ready));
        if outcome == Ok(ResetOutcome::Ready) {
            let leaked = st.live.len();
            st.leaked_on_reset += leaked;
            st.live.clear();
            st.status = Some(DeviceStatus::Operational);
            st.rebuild_swap_chain(params);
        }
        outcome
    }

    fn release_device(&mut self) {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::ReleaseDevice);
        st.back_buffer = None;
        st.depth_buffer = None;
    }

    fn back_buffer(&mut self) -> Result<BufferInfo, ResultCode> {
        let st = self.state.borrow();
        match (st.back_buffer, st.params) {
            (Some(handle), Some(p)) => Ok(BufferInfo {
                handle,
                width: p.back_buffer_width,
                height: p.back_buffer_height,
            }),
            _ => Err(ResultCode::new(ResultKind::InvalidCall, "no device has been created")),
        }
    }

    fn auto_depth_stencil(&mut self) -> Option<BufferInfo> {
        let st = self.state.borrow();
        let p = st.params?;
        st.depth_buffer.map(|handle| BufferInfo {
            handle,
            width: p.back_buffer_width,
            height: p.back_buffer_height,
        })
    }

    fn create_render_buffer(&mut self, desc: &RenderBufferDesc) -> Result<BufferInfo, ResultCode> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::CreateRenderBuffer(*desc));
        let handle = st.alloc();
        st.live.insert(handle);
        Ok(BufferInfo {
            handle,
            width: desc.width,
            height: desc.height,
        })
    }

    fn create_swap_chain(
        &mut self,
        window: WindowKey,
        width: u32,
        height: u32,
        _format: PixelFormat,
    ) -> Result<BufferInfo, ResultCode> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::CreateSwapChain { window, width, height });
        let handle = st.alloc();
        st.live.insert(handle);
        Ok(BufferInfo { handle, width, height })
    }

    fn create_texture(&mut self, width: u32, height: u32, _rgba: &[u8]) -> Result<GpuHandle, ResultCode> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::CreateTexture { width, height });
        let handle = st.alloc();
        st.live.insert(handle);
        Ok(handle)
    }

    fn release(&mut self, handle: GpuHandle) {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::Release(handle));
        st.live.remove(&handle);
    }

    fn set_render_target(&mut self, color: GpuHandle, depth: Option<GpuHandle>, viewport: Viewport) {
        self.record(Call::SetRenderTarget { color, depth, viewport });
    }

    fn apply_render_state(&mut self, state: &BatchState) {
        self.record(Call::ApplyRenderState(*state));
    }

    fn draw(&mut self, style: PrimitiveStyle, vertices: &[Vertex]) {
        self.record(Call::Draw {
            style,
            vertices: vertices.to_vec(),
        });
    }

    fn clear(&mut self, flags: ClearFlags, color: Color, depth: f32, stencil: u32) {
        self.record(Call::Clear { flags, color, depth, stencil });
    }

    fn present(&mut self, swap_chain: Option<GpuHandle>) {
        self.record(Call::Present(swap_chain));
    }
}
