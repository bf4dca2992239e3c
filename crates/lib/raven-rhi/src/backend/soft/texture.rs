use ash::vk;

use crate::backend::{format_info, FormatInfo, FormatKind, ImageDesc, RhiError, SamplerDesc};

/// Image living in host memory, every texel is stored widened to four floats.
pub struct SoftImage {
    pub(crate) name: String,
    pub(crate) desc: ImageDesc,
    pub(crate) info: FormatInfo,
    pub(crate) texels: Vec<[f32; 4]>,
}

impl SoftImage {
    pub(crate) fn new(desc: ImageDesc, name: &str) -> anyhow::Result<Self, RhiError> {
        let info = format_info(desc.format)
            .ok_or(RhiError::UnsupportedFormat { format: desc.format })?;

        Ok(Self {
            name: name.to_owned(),
            desc,
            info,
            // fresh memory content is undefined
            texels: vec![[f32::NAN; 4]; desc.texel_count()],
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    #[inline]
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Texel at integer coordinates, clamped to the image edge.
    pub fn fetch(&self, x: i32, y: i32) -> [f32; 4] {
        let [width, height] = self.desc.extent;
        let x = x.clamp(0, width as i32 - 1) as usize;
        let y = y.clamp(0, height as i32 - 1) as usize;

        self.texels[y * width as usize + x]
    }

    /// Sample at normalized coordinates.
    pub fn sample(&self, sampler: &SamplerDesc, uv: [f32; 2]) -> [f32; 4] {
        let [width, height] = self.desc.extent;
        let x = uv[0] * width as f32 - 0.5;
        let y = uv[1] * height as f32 - 0.5;

        match sampler.filter {
            vk::Filter::NEAREST => {
                let x = self.address(sampler, x.round() as i32, width);
                let y = self.address(sampler, y.round() as i32, height);
                self.fetch(x, y)
            }
            _ => {
                let x0 = x.floor();
                let y0 = y.floor();
                let fx = x - x0;
                let fy = y - y0;

                let (x0, y0) = (x0 as i32, y0 as i32);
                let xs = [self.address(sampler, x0, width), self.address(sampler, x0 + 1, width)];
                let ys = [self.address(sampler, y0, height), self.address(sampler, y0 + 1, height)];

                let top = lerp4(self.fetch(xs[0], ys[0]), self.fetch(xs[1], ys[0]), fx);
                let bottom = lerp4(self.fetch(xs[0], ys[1]), self.fetch(xs[1], ys[1]), fx);
                lerp4(top, bottom, fy)
            }
        }
    }

    fn address(&self, sampler: &SamplerDesc, coord: i32, size: u32) -> i32 {
        match sampler.address_mode {
            vk::SamplerAddressMode::REPEAT => coord.rem_euclid(size as i32),
            _ => coord.clamp(0, size as i32 - 1),
        }
    }

    /// Convert a shader output to what the format can actually hold.
    pub(crate) fn quantize(&self, value: [f32; 4]) -> [f32; 4] {
        quantize(&self.info, value)
    }

    pub(crate) fn fill(&mut self, value: [f32; 4]) {
        let value = self.quantize(value);
        self.texels.iter_mut().for_each(|texel| *texel = value);
    }

    pub(crate) fn poison(&mut self) {
        self.texels.iter_mut().for_each(|texel| *texel = [f32::NAN; 4]);
    }
}

pub(crate) fn quantize(info: &FormatInfo, value: [f32; 4]) -> [f32; 4] {
    let mut stored = [0.0, 0.0, 0.0, 1.0];

    for (channel, dst) in stored.iter_mut().enumerate().take(info.channels) {
        *dst = match info.kind {
            FormatKind::Unorm { bits } | FormatKind::DepthUnorm { bits } => quantize_unorm(value[channel], bits),
            FormatKind::Float | FormatKind::DepthFloat => value[channel],
        };
    }

    stored
}

#[inline]
fn quantize_unorm(value: f32, bits: u32) -> f32 {
    let max = ((1_u32 << bits) - 1) as f32;
    (value.clamp(0.0, 1.0) * max).round() / max
}

#[inline]
fn lerp4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = a[i] + (b[i] - a[i]) * t;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StockSampler;

    fn gradient() -> SoftImage {
        let mut image = SoftImage::new(ImageDesc::new_2d([2, 1], vk::Format::R32G32B32A32_SFLOAT), "gradient").unwrap();
        image.texels = vec![[0.0; 4], [1.0; 4]];
        image
    }

    #[test]
    fn unorm_quantization() {
        let image = SoftImage::new(ImageDesc::new_2d([1, 1], vk::Format::R8G8_UNORM), "rg").unwrap();
        let stored = image.quantize([0.5, 2.0, 0.7, 0.2]);

        assert_eq!(stored[0], 128.0 / 255.0);
        assert_eq!(stored[1], 1.0);
        // missing channels read back as (0, 1)
        assert_eq!(&stored[2..], &[0.0, 1.0]);
    }

    #[test]
    fn linear_sampling_between_texels() {
        let image = gradient();
        let linear = StockSampler::LinearClamp.desc();
        let nearest = StockSampler::NearestClamp.desc();

        assert_eq!(image.sample(&linear, [0.5, 0.5])[0], 0.5);
        assert_eq!(image.sample(&linear, [0.0, 0.5])[0], 0.0);
        assert_eq!(image.sample(&nearest, [0.9, 0.5])[0], 1.0);
        assert_eq!(image.fetch(-3, 7)[0], 0.0);
    }

    #[test]
    fn unsupported_format() {
        assert!(matches!(
            SoftImage::new(ImageDesc::new_2d([1, 1], vk::Format::BC1_RGB_UNORM_BLOCK), "bc1"),
            Err(RhiError::UnsupportedFormat { .. })
        ));
    }
}
