//! GPU-resident image layers
//!
//! Each image is decoded once at startup, converted to RGBA8, uploaded to
//! a texture, and never mutated afterwards. The per-layer UV rectangle
//! implementing the centered-fill rule lives in a small uniform buffer
//! that is rewritten when the composite target resizes.

use std::path::Path;

use super::fit::fill_uv_rect;
use crate::error::StartupError;

/// An immutable image on the GPU together with its draw bindings.
pub struct LayerTexture {
    width: u32,
    height: u32,
    _texture: wgpu::Texture,
    uv_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl LayerTexture {
    /// Decode the image at `path` and upload it.
    ///
    /// `target_w`/`target_h` size the initial centered-fill UV rectangle;
    /// call [`update_fit`](Self::update_fit) when the target resizes.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        path: &Path,
        target_w: u32,
        target_h: u32,
    ) -> Result<Self, StartupError> {
        let image = image::open(path)
            .map_err(|e| StartupError::Image {
                path: path.to_path_buf(),
                source: e,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();

        log::info!("Loaded {} ({}x{})", path.display(), width, height);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Layer Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uv_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Layer UV Buffer"),
            size: std::mem::size_of::<[f32; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uv_rect = fill_uv_rect(width, height, target_w, target_h);
        queue.write_buffer(&uv_buffer, 0, bytemuck::cast_slice(&uv_rect));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Layer Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uv_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            width,
            height,
            _texture: texture,
            uv_buffer,
            bind_group,
        })
    }

    /// Recompute the centered-fill UV rectangle for a new target size.
    pub fn update_fit(&self, queue: &wgpu::Queue, target_w: u32, target_h: u32) {
        let uv_rect = fill_uv_rect(self.width, self.height, target_w, target_h);
        queue.write_buffer(&self.uv_buffer, 0, bytemuck::cast_slice(&uv_rect));
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
