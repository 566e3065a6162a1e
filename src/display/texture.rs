//! GPU texture for presentation frames
//!
//! RGB24 rows are widened into a reused RGBA staging buffer, since wgpu has
//! no three-channel texture formats, then uploaded in one write.

use crate::video::{PresentationFrame, PRESENTATION_BYTES_PER_PIXEL};

/// Widen RGB24 rows into tightly packed RGBA with opaque alpha
///
/// `staging` is resized as needed and keeps its allocation between frames.
pub fn expand_to_rgba(frame: &PresentationFrame<'_>, staging: &mut Vec<u8>) {
    let width = frame.width as usize;
    staging.resize(width * frame.height as usize * 4, 0);

    for (src, dst) in frame.rows().zip(staging.chunks_exact_mut(width * 4)) {
        for (rgb, rgba) in src
            .chunks_exact(PRESENTATION_BYTES_PER_PIXEL)
            .zip(dst.chunks_exact_mut(4))
        {
            rgba[..3].copy_from_slice(rgb);
            rgba[3] = u8::MAX;
        }
    }
}

/// A GPU texture holding the current video frame
pub struct VideoTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl VideoTexture {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Video Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        tracing::debug!("Created {}x{} video texture", width, height);

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Upload tightly packed RGBA pixels covering the whole texture
    pub fn upload_rgba(&self, queue: &wgpu::Queue, rgba: &[u8]) {
        debug_assert_eq!(rgba.len(), self.width as usize * self.height as usize * 4);

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}
