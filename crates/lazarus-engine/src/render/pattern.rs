use std::cell::RefCell;
use std::rc::Rc;

use crate::coords::Color;
use crate::device::{
    DeviceContext, DeviceError, DeviceResource, GpuBackend, GpuHandle, Registration, ResultCode,
    ResultKind,
};

pub type SharedPattern = Rc<RefCell<PatternImage>>;

/// RGBA8 image used to texture primitives.
///
/// The pixels stay on the CPU side for the whole lifetime of the pattern; the
/// GPU texture is dropped on device loss and re-uploaded on reset.
pub struct PatternImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    texture: Option<GpuHandle>,
    registration: Option<Registration>,
}

impl PatternImage {
    /// Registers a pattern with `ctx`, uploading it right away when the device is active.
    pub fn create(
        ctx: &mut DeviceContext,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<SharedPattern, DeviceError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(ResultCode::new(
                ResultKind::InvalidCall,
                format!(
                    "pattern {width}x{height} needs {expected} RGBA bytes, got {}",
                    pixels.len()
                ),
            )
            .into());
        }

        let pattern = Rc::new(RefCell::new(Self {
            width,
            height,
            pixels,
            texture: None,
            registration: None,
        }));

        let resource: Rc<RefCell<dyn DeviceResource>> = pattern.clone();
        let registration = ctx.registry().register(&resource);
        pattern.borrow_mut().registration = Some(registration);

        if ctx.is_drawable() {
            pattern.borrow_mut().upload(ctx.gpu())?;
        }
        Ok(pattern)
    }

    /// Two-color checkerboard with square cells of `cell` pixels.
    pub fn checker(
        ctx: &mut DeviceContext,
        size: u32,
        cell: u32,
        a: Color,
        b: Color,
    ) -> Result<SharedPattern, DeviceError> {
        let cell = cell.max(1);
        let (a, b) = (to_rgba8(a), to_rgba8(b));
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let texel = if (x / cell + y / cell) % 2 == 0 { a } else { b };
                pixels.extend_from_slice(&texel);
            }
        }
        Self::create(ctx, size, size, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Current texture; `None` while the device is lost.
    pub fn texture(&self) -> Option<GpuHandle> {
        self.texture
    }

    /// Releases the texture and leaves the registry.
    pub fn release(&mut self, ctx: &mut DeviceContext) {
        self.release_texture(ctx.gpu());
        self.registration = None;
    }

    fn upload(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.release_texture(gpu);
        self.texture = Some(gpu.create_texture(self.width, self.height, &self.pixels)?);
        Ok(())
    }

    fn release_texture(&mut self, gpu: &mut dyn GpuBackend) {
        if let Some(texture) = self.texture.take() {
            gpu.release(texture);
        }
    }
}

impl DeviceResource for PatternImage {
    fn on_device_lost(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.release_texture(gpu);
        Ok(())
    }

    fn on_device_reset(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.upload(gpu)
    }

    fn force_release(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.release_texture(gpu);
        Ok(())
    }
}

fn to_rgba8(c: Color) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(c.r), q(c.g), q(c.b), q(c.a)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::recording::{Call, RecordingBackend};
    use crate::device::{DeviceConfig, DeviceStatus, PixelFormat, VideoMode, VsyncInterval};

    fn active_context() -> (DeviceContext, crate::device::recording::Recorder) {
        let (backend, rec) = RecordingBackend::new();
        let mut ctx = DeviceContext::new(Box::new(backend), DeviceConfig::default());
        ctx.set_mode(
            VideoMode::new(320, 240, PixelFormat::X8R8G8B8),
            true,
            false,
            false,
            false,
            VsyncInterval::Immediate,
        )
        .unwrap();
        (ctx, rec)
    }

    #[test]
    fn rejects_mismatched_pixel_buffer() {
        let (mut ctx, _rec) = active_context();
        let err = PatternImage::create(&mut ctx, 2, 2, vec![0; 15]).err().unwrap();
        assert!(matches!(err, DeviceError::Driver(ref rc) if rc.kind == ResultKind::InvalidCall));
    }

    #[test]
    fn texture_survives_a_reset_cycle_without_leaking() {
        let (mut ctx, rec) = active_context();
        let pattern =
            PatternImage::checker(&mut ctx, 8, 2, Color::WHITE, Color::BLACK).unwrap();
        let before = pattern.borrow().texture().unwrap();

        rec.set_status(DeviceStatus::Lost);
        ctx.probe().unwrap();
        assert_eq!(pattern.borrow().texture(), None);
        assert_eq!(rec.live_handles(), 0);

        rec.set_status(DeviceStatus::NotReset);
        ctx.probe().unwrap();
        let after = pattern.borrow().texture().unwrap();

        assert_ne!(before, after);
        assert_eq!(rec.leaked_on_reset(), 0);
        assert_eq!(rec.count(|c| matches!(c, Call::CreateTexture { width: 8, height: 8 })), 2);
        assert_eq!(pattern.borrow().pixels().len(), 8 * 8 * 4);
    }

    #[test]
    fn checker_alternates_cells() {
        let (mut ctx, _rec) = active_context();
        let pattern = PatternImage::checker(&mut ctx, 4, 2, Color::WHITE, Color::BLACK).unwrap();
        let px = pattern.borrow();
        assert_eq!(&px.pixels()[0..4], &[255, 255, 255, 255]);
        assert_eq!(&px.pixels()[8..12], &[0, 0, 0, 255]);
    }
}
