use ash::vk;

pub use vk_sync::AccessType;
use vk_sync::AccessType::*;

use super::ImageView;

/// Image layout/access transition recorded between two passes.
#[derive(Clone, Copy, Debug)]
pub struct ImageBarrier {
    pub image: ImageView,
    pub prev_access: AccessType,
    pub next_access: AccessType,
    /// Previous content is not needed anymore.
    pub discard: bool,
}

/// Image usage flags an access implies, used to accumulate usages of graph resources.
pub fn image_access_to_usage_flags(access: &AccessType) -> vk::ImageUsageFlags {
    match access {
        FragmentShaderReadSampledImageOrUniformTexelBuffer |
        ComputeShaderReadSampledImageOrUniformTexelBuffer |
        AnyShaderReadSampledImageOrUniformTexelBuffer => vk::ImageUsageFlags::SAMPLED,
        FragmentShaderWrite | ComputeShaderWrite | AnyShaderWrite => vk::ImageUsageFlags::STORAGE,
        ColorAttachmentRead | ColorAttachmentWrite => vk::ImageUsageFlags::COLOR_ATTACHMENT,
        DepthStencilAttachmentRead |
        DepthStencilAttachmentWrite |
        DepthAttachmentWriteStencilReadOnly |
        StencilAttachmentWriteDepthReadOnly => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        FragmentShaderReadColorInputAttachment |
        FragmentShaderReadDepthStencilInputAttachment => vk::ImageUsageFlags::INPUT_ATTACHMENT,
        TransferRead => vk::ImageUsageFlags::TRANSFER_SRC,
        TransferWrite => vk::ImageUsageFlags::TRANSFER_DST,
        _ => vk::ImageUsageFlags::empty(),
    }
}
