/// A single acquired swap chain image.
///
/// Held from the first draw into a window target until that target is
/// presented. Holding it prevents acquisition of the next image.
pub(crate) struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl GpuFrame {
    pub fn acquire(surface: &wgpu::Surface<'_>) -> Result<Self, wgpu::SurfaceError> {
        let surface_texture = surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            surface_texture,
            view,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        let size = self.surface_texture.texture.size();
        (size.width, size.height)
    }

    /// Presents the image. Commands writing to it must already be submitted.
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}
