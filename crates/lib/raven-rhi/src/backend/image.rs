use ash::vk;

/// Backend specific identifier of a physical image.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageHandle(pub u32);

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ImageDesc {
    pub extent: [u32; 2],
    pub format: vk::Format,
    // we can infer usage by its AccessType, so user do not need to explicitly fill in here
    // but we still give user choice to add usage flags if needed
    pub usage: vk::ImageUsageFlags,
    /// The image may be sampled through a unorm view even if its format is srgb.
    pub unorm_srgb_alias: bool,
}

impl Default for ImageDesc {
    fn default() -> Self {
        Self {
            extent: [0, 0],
            format: vk::Format::UNDEFINED,
            usage: vk::ImageUsageFlags::default(),
            unorm_srgb_alias: false,
        }
    }
}

impl ImageDesc {
    pub fn new_2d(extent: [u32; 2], format: vk::Format) -> Self {
        Self {
            extent,
            format,
            ..Default::default()
        }
    }

    #[inline]
    pub fn format(mut self, format: vk::Format) -> Self {
        self.format = format;
        self
    }

    #[inline]
    pub fn usage_flags(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.extent[0]
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.extent[1]
    }

    #[inline]
    pub fn texel_count(&self) -> usize {
        self.extent[0] as usize * self.extent[1] as usize
    }
}

/// A physical image as seen by the render graph and the recording primitives.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ImageView {
    pub handle: ImageHandle,
    pub desc: ImageDesc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatKind {
    /// Normalized unsigned integer channels with the given bit width.
    Unorm { bits: u32 },
    Float,
    /// Depth channel stored as normalized unsigned integer with the given bit width.
    DepthUnorm { bits: u32 },
    DepthFloat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatInfo {
    pub channels: usize,
    pub kind: FormatKind,
}

impl FormatInfo {
    #[inline]
    pub fn is_depth(&self) -> bool {
        matches!(self.kind, FormatKind::DepthUnorm { .. } | FormatKind::DepthFloat)
    }
}

/// Layout information of the formats raven knows how to store.
pub fn format_info(format: vk::Format) -> Option<FormatInfo> {
    let info = match format {
        vk::Format::R8_UNORM => FormatInfo { channels: 1, kind: FormatKind::Unorm { bits: 8 } },
        vk::Format::R8G8_UNORM => FormatInfo { channels: 2, kind: FormatKind::Unorm { bits: 8 } },
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::B8G8R8A8_UNORM
        | vk::Format::B8G8R8A8_SRGB => FormatInfo { channels: 4, kind: FormatKind::Unorm { bits: 8 } },
        vk::Format::R16G16_SFLOAT | vk::Format::R32G32_SFLOAT => FormatInfo { channels: 2, kind: FormatKind::Float },
        vk::Format::R16G16B16A16_SFLOAT
        | vk::Format::R32G32B32A32_SFLOAT => FormatInfo { channels: 4, kind: FormatKind::Float },
        vk::Format::D16_UNORM => FormatInfo { channels: 1, kind: FormatKind::DepthUnorm { bits: 16 } },
        vk::Format::D32_SFLOAT => FormatInfo { channels: 1, kind: FormatKind::DepthFloat },
        _ => return None,
    };

    Some(info)
}

/// Formats sampled with srgb decoding, which need a unorm alias to be read raw.
#[inline]
pub fn is_srgb_format(format: vk::Format) -> bool {
    matches!(format, vk::Format::R8G8B8A8_SRGB | vk::Format::B8G8R8A8_SRGB)
}

#[inline]
pub fn is_depth_format(format: vk::Format) -> bool {
    match format {
        vk::Format::D16_UNORM
        | vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::X8_D24_UNORM_PACK32
        | vk::Format::D32_SFLOAT
        | vk::Format::D32_SFLOAT_S8_UINT => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_extent() {
        let desc = ImageDesc::new_2d([1920, 1080], vk::Format::R8G8B8A8_UNORM)
            .format(vk::Format::R8G8_UNORM)
            .usage_flags(vk::ImageUsageFlags::SAMPLED);

        assert_eq!(desc.width(), 1920);
        assert_eq!(desc.height(), 1080);
        assert_eq!(desc.format, vk::Format::R8G8_UNORM);
        assert_eq!(desc.texel_count(), 1920 * 1080);
    }

    #[test]
    fn depth_formats() {
        assert!(is_depth_format(vk::Format::D16_UNORM));
        assert!(!is_depth_format(vk::Format::R8G8_UNORM));
        assert!(format_info(vk::Format::D16_UNORM).unwrap().is_depth());
        assert_eq!(format_info(vk::Format::R8G8_UNORM).unwrap().channels, 2);
        assert!(format_info(vk::Format::BC7_UNORM_BLOCK).is_none());
    }
}
