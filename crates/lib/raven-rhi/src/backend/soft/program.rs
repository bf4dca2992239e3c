use crate::backend::SamplerDesc;

use super::texture::SoftImage;

/// CPU stand-in of a fragment shader. Returning `None` discards the fragment.
pub type FragmentProgram = dyn Fn(&FragmentInput) -> Option<[f32; 4]> + Send + Sync;

pub(crate) struct BoundTexture<'a> {
    pub(crate) image: &'a SoftImage,
    pub(crate) sampler: SamplerDesc,
}

/// Everything a fragment program can see for one fragment.
pub struct FragmentInput<'a> {
    /// Integer pixel coordinate of the fragment.
    pub coord: [u32; 2],
    /// Extent of the render area.
    pub extent: [u32; 2],
    pub(crate) textures: &'a [Option<BoundTexture<'a>>],
    pub(crate) push_constants: &'a [u8],
}

impl<'a> FragmentInput<'a> {
    /// Normalized coordinate of the fragment center.
    pub fn uv(&self) -> [f32; 2] {
        [
            (self.coord[0] as f32 + 0.5) / self.extent[0] as f32,
            (self.coord[1] as f32 + 0.5) / self.extent[1] as f32,
        ]
    }

    /// Texel fetch relative to the fragment, clamped to the edge. Unbound textures read as zero.
    pub fn fetch_offset(&self, binding: u32, offset: [i32; 2]) -> [f32; 4] {
        self.fetch(
            binding,
            self.coord[0] as i32 + offset[0],
            self.coord[1] as i32 + offset[1],
        )
    }

    /// Texel fetch at absolute coordinates, clamped to the edge. Unbound textures read as zero.
    pub fn fetch(&self, binding: u32, x: i32, y: i32) -> [f32; 4] {
        self.texture(binding)
            .map(|texture| texture.image.fetch(x, y))
            .unwrap_or_default()
    }

    /// Filtered lookup with the bound sampler. Unbound textures read as zero.
    pub fn sample(&self, binding: u32, uv: [f32; 2]) -> [f32; 4] {
        self.texture(binding)
            .map(|texture| texture.image.sample(&texture.sampler, uv))
            .unwrap_or_default()
    }

    /// Read the push constant block as `T`, `None` if not enough bytes were pushed.
    pub fn push_constants<T: bytemuck::Pod>(&self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        if self.push_constants.len() < size {
            return None;
        }

        bytemuck::try_pod_read_unaligned(&self.push_constants[..size]).ok()
    }

    fn texture(&self, binding: u32) -> Option<&BoundTexture<'a>> {
        self.textures.get(binding as usize).and_then(|texture| texture.as_ref())
    }
}
