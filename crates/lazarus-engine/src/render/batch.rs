//! Immediate-mode primitive batching.
//!
//! Primitives are appended to one fixed-capacity vertex batch and issued as a
//! single draw call per run of same-style, same-state primitives. A run ends
//! when the buffer would overflow, when the incoming state or style differs,
//! or when the drawing session ends. An empty batch never flushes.

use crate::device::GpuBackend;

use super::{BatchState, PrimitiveStyle, Vertex};

/// Default batch size in vertices.
pub const DEFAULT_BATCH_CAPACITY: usize = 4096;

/// Smallest capacity that still fits one primitive of every style.
const MIN_BATCH_CAPACITY: usize = 3;

/// Fixed-capacity vertex run with its style and state.
#[derive(Debug)]
pub struct VertexBatch {
    vertices: Vec<Vertex>,
    capacity: usize,
    style: PrimitiveStyle,
    state: Option<BatchState>,
    /// The run's state has not been applied to the device yet.
    dirty: bool,
}

impl VertexBatch {
    fn new(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            capacity,
            style: PrimitiveStyle::PointList,
            state: None,
            dirty: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn style(&self) -> PrimitiveStyle {
        self.style
    }

    #[inline]
    pub fn state(&self) -> Option<BatchState> {
        self.state
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    fn accepts(&self, style: PrimitiveStyle, state: &BatchState) -> bool {
        self.style == style && self.state.as_ref() == Some(state)
    }
}

/// Batching front end: decides when to flush and tracks applied device state.
#[derive(Debug)]
pub struct Batcher {
    batch: VertexBatch,
    /// Last state applied to the device; `None` after a reset.
    applied: Option<BatchState>,
    flushes: u64,
}

impl Batcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            batch: VertexBatch::new(capacity.max(MIN_BATCH_CAPACITY)),
            applied: None,
            flushes: 0,
        }
    }

    pub fn batch(&self) -> &VertexBatch {
        &self.batch
    }

    /// Number of draw calls issued since creation.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Appends one primitive list, flushing first when the run must end.
    ///
    /// Lists larger than the batch are split on primitive boundaries. A trailing
    /// partial primitive is dropped.
    pub fn submit(
        &mut self,
        gpu: &mut dyn GpuBackend,
        vertices: &[Vertex],
        style: PrimitiveStyle,
        state: BatchState,
    ) {
        let per = style.vertices_per_primitive();
        let whole = vertices.len() - vertices.len() % per;
        if whole != vertices.len() {
            log::debug!(
                "dropping {} trailing vertices of an incomplete {style:?} primitive",
                vertices.len() - whole
            );
        }
        let mut rest = &vertices[..whole];
        if rest.is_empty() {
            return;
        }

        let must_flush = !self.batch.is_empty()
            && (!self.batch.accepts(style, &state)
                || self.batch.len() + rest.len() > self.batch.capacity);
        if must_flush {
            self.flush(gpu);
        }

        if self.batch.is_empty() {
            self.begin_run(style, state);
        }

        let chunk = self.batch.capacity - self.batch.capacity % per;
        while self.batch.len() + rest.len() > self.batch.capacity {
            let room = (chunk - self.batch.len().min(chunk)) / per * per;
            let (head, tail) = rest.split_at(room.min(rest.len()));
            self.batch.vertices.extend_from_slice(head);
            rest = tail;
            self.flush(gpu);
        }
        self.batch.vertices.extend_from_slice(rest);
    }

    /// Issues the buffered run as one draw call. Returns false when empty.
    pub fn flush(&mut self, gpu: &mut dyn GpuBackend) -> bool {
        if self.batch.is_empty() {
            return false;
        }

        if let Some(state) = self.batch.state {
            if self.batch.dirty || self.applied != Some(state) {
                gpu.apply_render_state(&state);
                self.applied = Some(state);
            }
        }
        self.batch.dirty = false;

        gpu.draw(self.batch.style, &self.batch.vertices);
        self.batch.vertices.clear();
        self.flushes += 1;
        true
    }

    /// Drops buffered vertices without drawing them (device lost).
    pub fn discard(&mut self) {
        if !self.batch.is_empty() {
            log::debug!("discarding {} batched vertices", self.batch.len());
        }
        self.batch.vertices.clear();
        self.batch.dirty = false;
    }

    /// Forgets the applied state; the next run reapplies its state block.
    pub fn invalidate_applied(&mut self) {
        self.applied = None;
    }

    /// Records `state` as applied by someone else (e.g. default reapplication).
    pub fn mark_applied(&mut self, state: BatchState) {
        self.applied = Some(state);
    }

    fn begin_run(&mut self, style: PrimitiveStyle, state: BatchState) {
        self.batch.style = style;
        self.batch.dirty = self.applied != Some(state);
        self.batch.state = Some(state);
    }
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_CAPACITY)
    }
}
