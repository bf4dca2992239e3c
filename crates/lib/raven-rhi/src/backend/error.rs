use ash::vk;
use raven_core::thiserror::Error;

use super::ImageHandle;

#[derive(Debug, Error)]
pub enum RhiError {
    #[error("Image format {format:?} is not supported by this backend!")]
    UnsupportedFormat { format: vk::Format },

    #[error("Invalid image {handle:?}!")]
    InvalidImage { handle: ImageHandle },

    #[error("Texture binding {binding} is out of range (max {max})!")]
    InvalidBinding { binding: u32, max: u32 },

    #[error("Push constants of {size} bytes exceed the limit of {max} bytes!")]
    PushConstantsTooLarge { size: usize, max: usize },

    #[error("Command requires an active render pass!")]
    NotInRenderPass,

    #[error("Render pass {name:?} began while another render pass is active!")]
    AlreadyInRenderPass { name: String },

    #[error("No fragment program registered for shader {fragment:?}!")]
    MissingShader { fragment: String },

    #[error("Invalid render pass {name:?}: {reason}")]
    InvalidRenderPass { name: String, reason: String },

    #[error("Image {handle:?} is bound as a texture and as an attachment at the same time!")]
    FeedbackLoop { handle: ImageHandle },

    #[error("Image {handle:?} has a srgb format and was not created with a unorm alias!")]
    MissingUnormAlias { handle: ImageHandle },

    #[error("Upload of {got} texels does not match image {handle:?} with {expected} texels!")]
    UploadSizeMismatch { handle: ImageHandle, expected: usize, got: usize },
}
