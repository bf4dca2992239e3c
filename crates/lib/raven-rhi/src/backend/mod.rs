pub mod barrier;
pub mod image;
pub mod sampler;
pub mod pipeline;
pub mod command;
mod error;

/// CPU reference backend.
pub mod soft;

pub use image::{ImageDesc, ImageHandle, ImageView, FormatInfo, FormatKind, format_info, is_depth_format, is_srgb_format};
pub use sampler::{StockSampler, SamplerDesc};
pub use pipeline::{QuadShaders, QuadDrawState};
pub use command::{
    CommandRecorder, RenderDevice, RenderPassBeginInfo,
    ColorAttachment, DepthStencilAttachment, LoadOp,
};
pub use barrier::{AccessType, ImageBarrier};
pub use error::RhiError;

pub use ash::vk;
