use ash::vk;

use super::{ImageBarrier, ImageDesc, ImageView, QuadDrawState, QuadShaders, RhiError, StockSampler};

pub const MAX_TEXTURE_BINDINGS: u32 = 8;
pub const MAX_PUSH_CONSTANTS_SIZE: usize = 128;

/// What happens to the previous content of an attachment when a render pass begins.
#[derive(Clone, Copy, Debug)]
pub enum LoadOp<T> {
    Clear(T),
    Load,
    DontCare,
}

#[derive(Clone, Copy)]
pub struct ColorAttachment {
    pub view: ImageView,
    pub load_op: LoadOp<vk::ClearColorValue>,
}

#[derive(Clone, Copy)]
pub struct DepthStencilAttachment {
    pub view: ImageView,
    pub load_op: LoadOp<vk::ClearDepthStencilValue>,
    pub read_only: bool,
}

pub struct RenderPassBeginInfo<'a> {
    pub name: &'a str,
    pub color_attachments: &'a [ColorAttachment],
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

/// Command recording primitives the render graph hands to pass callbacks.
pub trait CommandRecorder {
    fn image_barrier(&mut self, barrier: ImageBarrier);

    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo) -> anyhow::Result<(), RhiError>;

    fn set_texture(&mut self, binding: u32, view: &ImageView, sampler: StockSampler) -> anyhow::Result<(), RhiError>;

    /// Bind through a unorm view, the image must be created with `unorm_srgb_alias`
    /// if its format is srgb.
    fn set_unorm_texture(&mut self, binding: u32, view: &ImageView, sampler: StockSampler) -> anyhow::Result<(), RhiError>;

    fn push_constants(&mut self, bytes: &[u8]) -> anyhow::Result<(), RhiError>;

    /// Draw a quad covering the whole render area.
    fn draw_quad(&mut self, shaders: QuadShaders, state: QuadDrawState) -> anyhow::Result<(), RhiError>;

    fn end_render_pass(&mut self) -> anyhow::Result<(), RhiError>;
}

pub trait RenderDevice: CommandRecorder {
    fn create_image(&mut self, desc: ImageDesc, name: &str) -> anyhow::Result<ImageView, RhiError>;
}
