use raven_rhi::backend::{CommandRecorder, ImageView};

use crate::error::RgError;

/// Physical images of one pass, in the order the pass declared them.
#[derive(Clone, Debug, Default)]
pub struct PassImages {
    pub texture_inputs: Vec<ImageView>,
    pub color_outputs: Vec<ImageView>,
    pub depth_stencil: Option<ImageView>,
}

/// Render pass context to give user to do custom command recording.
/// Handed to the record callback of a pass while its render pass is active.
pub struct RenderPassContext<'a> {
    /// Recorder to record rendering commands to.
    pub cmd: &'a mut dyn CommandRecorder,
    pass_name: &'a str,
    images: PassImages,
}

impl<'a> RenderPassContext<'a> {
    pub fn new(cmd: &'a mut dyn CommandRecorder, pass_name: &'a str, images: PassImages) -> Self {
        Self {
            cmd,
            pass_name,
            images,
        }
    }

    #[inline]
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// Physical image of the `index`th texture input.
    pub fn texture_input(&self, index: usize) -> anyhow::Result<ImageView, RgError> {
        self.images.texture_inputs.get(index).copied().ok_or_else(|| self.missing("texture input", index))
    }

    /// Physical image of the `index`th color output.
    pub fn color_output(&self, index: usize) -> anyhow::Result<ImageView, RgError> {
        self.images.color_outputs.get(index).copied().ok_or_else(|| self.missing("color output", index))
    }

    /// Physical image of the depth stencil output or input.
    pub fn depth_stencil(&self) -> anyhow::Result<ImageView, RgError> {
        self.images.depth_stencil.ok_or_else(|| self.missing("depth stencil", 0))
    }

    fn missing(&self, kind: &'static str, index: usize) -> RgError {
        RgError::MissingPassResource {
            pass: self.pass_name.to_owned(),
            kind,
            index,
        }
    }
}
