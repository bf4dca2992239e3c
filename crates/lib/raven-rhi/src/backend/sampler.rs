use ash::vk;

#[derive(Clone, Hash, Eq, PartialEq, Debug)]
pub struct SamplerDesc {
    pub filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode: vk::SamplerAddressMode,
}

/// Samplers every backend keeps around, selected by kind instead of by description.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum StockSampler {
    LinearClamp,
    NearestClamp,
    LinearWrap,
    NearestWrap,
}

impl StockSampler {
    pub fn desc(self) -> SamplerDesc {
        let (filter, mipmap_mode) = match self {
            StockSampler::LinearClamp | StockSampler::LinearWrap => {
                (vk::Filter::LINEAR, vk::SamplerMipmapMode::LINEAR)
            }
            StockSampler::NearestClamp | StockSampler::NearestWrap => {
                (vk::Filter::NEAREST, vk::SamplerMipmapMode::NEAREST)
            }
        };

        let address_mode = match self {
            StockSampler::LinearClamp | StockSampler::NearestClamp => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            StockSampler::LinearWrap | StockSampler::NearestWrap => vk::SamplerAddressMode::REPEAT,
        };

        SamplerDesc { filter, mipmap_mode, address_mode }
    }
}
