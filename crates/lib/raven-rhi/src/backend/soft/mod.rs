//! Rasterizes full-screen quads on the CPU.
//!
//! Fragment shaders are replaced by [`FragmentProgram`]s registered under the path of the
//! fragment shader they stand in for. Every draw is recorded as a [`DrawRecord`] so callers
//! can inspect what a pass did (bound textures, push constants, how many fragments ran).

mod program;
mod texture;

use std::collections::HashMap;

use arrayvec::ArrayVec;
use ash::vk;

use super::command::{MAX_PUSH_CONSTANTS_SIZE, MAX_TEXTURE_BINDINGS};
use super::{
    format_info, is_srgb_format, CommandRecorder, ImageBarrier, ImageDesc, ImageHandle, ImageView, LoadOp,
    QuadDrawState, QuadShaders, RenderDevice, RenderPassBeginInfo, RhiError, SamplerDesc, StockSampler,
};

pub use program::{FragmentInput, FragmentProgram};
pub use texture::SoftImage;

use program::BoundTexture;

/// Depth the full-screen quad is rasterized at.
pub const QUAD_DEPTH: f32 = 0.0;

const MAX_BINDINGS: usize = MAX_TEXTURE_BINDINGS as usize;

#[derive(Clone, Debug)]
struct SoftBinding {
    image: ImageHandle,
    sampler: SamplerDesc,
}

struct ActivePass {
    name: String,
    extent: [u32; 2],
    color: Option<ImageHandle>,
    depth: Option<ImageHandle>,
    depth_read_only: bool,
}

/// What one `draw_quad` did.
#[derive(Clone, Debug)]
pub struct DrawRecord {
    pub pass: String,
    pub shaders: QuadShaders,
    pub state: QuadDrawState,
    pub push_constants: Vec<u8>,
    /// (binding, image) pairs bound at draw time.
    pub textures: Vec<(u32, ImageHandle)>,
    /// Fragments that passed the depth test and ran the program.
    pub fragments_shaded: u64,
    /// Fragments that were not discarded by the program.
    pub fragments_written: u64,
}

impl DrawRecord {
    pub fn push_constants<T: bytemuck::Pod>(&self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        if self.push_constants.len() < size {
            return None;
        }

        bytemuck::try_pod_read_unaligned(&self.push_constants[..size]).ok()
    }
}

#[derive(Default)]
pub struct SoftDevice {
    images: Vec<SoftImage>,
    programs: HashMap<&'static str, Box<FragmentProgram>>,

    bindings: ArrayVec<Option<SoftBinding>, MAX_BINDINGS>,
    push_constants: Vec<u8>,
    active_pass: Option<ActivePass>,

    draws: Vec<DrawRecord>,
    barriers: Vec<ImageBarrier>,
}

impl SoftDevice {
    pub fn new() -> Self {
        let mut device = Self::default();
        device.reset_bindings();
        device
    }

    /// Use `program` whenever a quad is drawn with `fragment` as fragment shader.
    pub fn register_program(
        &mut self,
        fragment: &'static str,
        program: impl Fn(&FragmentInput) -> Option<[f32; 4]> + Send + Sync + 'static,
    ) {
        if self.programs.insert(fragment, Box::new(program)).is_some() {
            glog::warn!("Fragment program of {} replaced!", fragment);
        }
    }

    pub fn image(&self, handle: ImageHandle) -> anyhow::Result<&SoftImage, RhiError> {
        self.images.get(handle.0 as usize).ok_or(RhiError::InvalidImage { handle })
    }

    /// Overwrite the whole content of an image, values are quantized to its format.
    pub fn upload(&mut self, handle: ImageHandle, texels: &[[f32; 4]]) -> anyhow::Result<(), RhiError> {
        let image = self.images.get_mut(handle.0 as usize).ok_or(RhiError::InvalidImage { handle })?;

        if texels.len() != image.texels.len() {
            return Err(RhiError::UploadSizeMismatch {
                handle,
                expected: image.texels.len(),
                got: texels.len(),
            });
        }

        for (dst, src) in image.texels.iter_mut().zip(texels) {
            *dst = texture::quantize(&image.info, *src);
        }

        Ok(())
    }

    pub fn read_back(&self, handle: ImageHandle) -> anyhow::Result<Vec<[f32; 4]>, RhiError> {
        Ok(self.image(handle)?.texels.clone())
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn barriers(&self) -> &[ImageBarrier] {
        &self.barriers
    }

    /// Forget recorded draws and barriers, images are kept.
    pub fn reset_stats(&mut self) {
        self.draws.clear();
        self.barriers.clear();
    }

    fn reset_bindings(&mut self) {
        self.bindings.clear();
        self.bindings.extend(std::iter::repeat(None).take(MAX_BINDINGS));
        self.push_constants.clear();
    }

    fn bind(&mut self, binding: u32, view: &ImageView, sampler: StockSampler) -> anyhow::Result<(), RhiError> {
        if self.active_pass.is_none() {
            return Err(RhiError::NotInRenderPass);
        }
        if binding >= MAX_TEXTURE_BINDINGS {
            return Err(RhiError::InvalidBinding { binding, max: MAX_TEXTURE_BINDINGS });
        }
        self.image(view.handle)?;

        self.bindings[binding as usize] = Some(SoftBinding {
            image: view.handle,
            sampler: sampler.desc(),
        });
        Ok(())
    }

    fn attachment_extent(
        &self,
        pass_name: &str,
        extent: &mut Option<[u32; 2]>,
        handle: ImageHandle,
    ) -> anyhow::Result<(), RhiError> {
        let image = self.image(handle)?;

        match extent {
            Some(extent) if *extent != image.desc.extent => Err(RhiError::InvalidRenderPass {
                name: pass_name.to_owned(),
                reason: format!(
                    "attachment {} is {:?}, expected {:?}",
                    image.name, image.desc.extent, extent
                ),
            }),
            Some(_) => Ok(()),
            None => {
                *extent = Some(image.desc.extent);
                Ok(())
            }
        }
    }
}

fn depth_compare(op: vk::CompareOp, fragment: f32, stored: f32) -> bool {
    match op {
        vk::CompareOp::NEVER => false,
        vk::CompareOp::LESS => fragment < stored,
        vk::CompareOp::EQUAL => fragment == stored,
        vk::CompareOp::LESS_OR_EQUAL => fragment <= stored,
        vk::CompareOp::GREATER => fragment > stored,
        vk::CompareOp::NOT_EQUAL => fragment != stored,
        vk::CompareOp::GREATER_OR_EQUAL => fragment >= stored,
        _ => true,
    }
}

impl CommandRecorder for SoftDevice {
    fn image_barrier(&mut self, barrier: ImageBarrier) {
        glog::trace!(
            "barrier on {:?}: {:?} -> {:?}",
            barrier.image.handle, barrier.prev_access, barrier.next_access
        );
        self.barriers.push(barrier);
    }

    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo) -> anyhow::Result<(), RhiError> {
        if let Some(active) = &self.active_pass {
            return Err(RhiError::AlreadyInRenderPass { name: active.name.clone() });
        }

        let invalid = |reason: String| RhiError::InvalidRenderPass {
            name: info.name.to_owned(),
            reason,
        };

        if info.color_attachments.len() > 1 {
            return Err(invalid(format!(
                "{} color attachments, only one is supported",
                info.color_attachments.len()
            )));
        }

        let mut extent = None;
        for attachment in info.color_attachments {
            self.attachment_extent(info.name, &mut extent, attachment.view.handle)?;
            if self.image(attachment.view.handle)?.info.is_depth() {
                return Err(invalid("depth image used as color attachment".to_owned()));
            }
        }
        if let Some(attachment) = &info.depth_stencil_attachment {
            self.attachment_extent(info.name, &mut extent, attachment.view.handle)?;
            if !self.image(attachment.view.handle)?.info.is_depth() {
                return Err(invalid("color image used as depth stencil attachment".to_owned()));
            }
        }
        let extent = extent.ok_or_else(|| invalid("render pass without attachments".to_owned()))?;

        for attachment in info.color_attachments {
            let image = &mut self.images[attachment.view.handle.0 as usize];
            match attachment.load_op {
                // SAFETY: every member of the union is 16 bytes of plain data, read as floats.
                LoadOp::Clear(value) => image.fill(unsafe { value.float32 }),
                LoadOp::Load => {}
                LoadOp::DontCare => image.poison(),
            }
        }
        if let Some(attachment) = &info.depth_stencil_attachment {
            let image = &mut self.images[attachment.view.handle.0 as usize];
            match attachment.load_op {
                LoadOp::Clear(value) => image.fill([value.depth, value.stencil as f32, 0.0, 0.0]),
                LoadOp::Load => {}
                LoadOp::DontCare => image.poison(),
            }
        }

        self.reset_bindings();
        self.active_pass = Some(ActivePass {
            name: info.name.to_owned(),
            extent,
            color: info.color_attachments.first().map(|attachment| attachment.view.handle),
            depth: info.depth_stencil_attachment.as_ref().map(|attachment| attachment.view.handle),
            depth_read_only: info.depth_stencil_attachment.as_ref().map_or(false, |attachment| attachment.read_only),
        });

        Ok(())
    }

    fn set_texture(&mut self, binding: u32, view: &ImageView, sampler: StockSampler) -> anyhow::Result<(), RhiError> {
        self.bind(binding, view, sampler)
    }

    fn set_unorm_texture(&mut self, binding: u32, view: &ImageView, sampler: StockSampler) -> anyhow::Result<(), RhiError> {
        let desc = &self.image(view.handle)?.desc;
        if is_srgb_format(desc.format) && !desc.unorm_srgb_alias {
            return Err(RhiError::MissingUnormAlias { handle: view.handle });
        }

        // texels are kept without any color space encoding, so the unorm view reads the same data
        self.bind(binding, view, sampler)
    }

    fn push_constants(&mut self, bytes: &[u8]) -> anyhow::Result<(), RhiError> {
        if bytes.len() > MAX_PUSH_CONSTANTS_SIZE {
            return Err(RhiError::PushConstantsTooLarge { size: bytes.len(), max: MAX_PUSH_CONSTANTS_SIZE });
        }

        self.push_constants.clear();
        self.push_constants.extend_from_slice(bytes);
        Ok(())
    }

    fn draw_quad(&mut self, shaders: QuadShaders, state: QuadDrawState) -> anyhow::Result<(), RhiError> {
        let pass = self.active_pass.as_ref().ok_or(RhiError::NotInRenderPass)?;
        let program = self.programs
            .get(shaders.fragment)
            .ok_or_else(|| RhiError::MissingShader { fragment: shaders.fragment.to_owned() })?;

        let invalid = |reason: &str| RhiError::InvalidRenderPass {
            name: pass.name.clone(),
            reason: reason.to_owned(),
        };
        if state.depth_test && pass.depth.is_none() {
            return Err(invalid("depth test enabled without a depth stencil attachment"));
        }
        let depth_write = state.depth_test && state.depth_write;
        if depth_write && pass.depth_read_only {
            return Err(invalid("depth write enabled on a read-only depth stencil attachment"));
        }

        for binding in self.bindings.iter().flatten() {
            if Some(binding.image) == pass.color || Some(binding.image) == pass.depth {
                return Err(RhiError::FeedbackLoop { handle: binding.image });
            }
        }

        // move the attachments out so that bound textures can be borrowed at the same time
        let color_info = pass.color.map(|handle| self.images[handle.0 as usize].info);
        let mut color = pass.color.map(|handle| std::mem::take(&mut self.images[handle.0 as usize].texels));
        let depth_info = pass.depth.map(|handle| self.images[handle.0 as usize].info);
        let mut depth = pass.depth.map(|handle| std::mem::take(&mut self.images[handle.0 as usize].texels));

        let textures: ArrayVec<Option<BoundTexture>, MAX_BINDINGS> = self.bindings
            .iter()
            .map(|binding| binding.as_ref().map(|binding| BoundTexture {
                image: &self.images[binding.image.0 as usize],
                sampler: binding.sampler.clone(),
            }))
            .collect();

        let [width, height] = pass.extent;
        let mut fragments_shaded = 0;
        let mut fragments_written = 0;

        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize;

                if state.depth_test {
                    let stored = depth.as_ref().map_or(1.0, |depth| depth[idx][0]);
                    if !depth_compare(state.depth_compare, QUAD_DEPTH, stored) {
                        continue;
                    }
                }

                fragments_shaded += 1;

                let input = FragmentInput {
                    coord: [x, y],
                    extent: pass.extent,
                    textures: &textures,
                    push_constants: &self.push_constants,
                };
                let output = match program(&input) {
                    Some(output) => output,
                    None => continue,
                };

                if let (Some(color), Some(info)) = (color.as_mut(), color_info.as_ref()) {
                    color[idx] = texture::quantize(info, output);
                }
                if depth_write {
                    if let (Some(depth), Some(info)) = (depth.as_mut(), depth_info.as_ref()) {
                        depth[idx] = texture::quantize(info, [QUAD_DEPTH, 0.0, 0.0, 0.0]);
                    }
                }

                fragments_written += 1;
            }
        }
        drop(textures);

        let record = DrawRecord {
            pass: pass.name.clone(),
            shaders,
            state,
            push_constants: self.push_constants.clone(),
            textures: self.bindings
                .iter()
                .enumerate()
                .filter_map(|(binding, bound)| bound.as_ref().map(|bound| (binding as u32, bound.image)))
                .collect(),
            fragments_shaded,
            fragments_written,
        };

        let (color_handle, depth_handle) = (pass.color, pass.depth);
        if let (Some(handle), Some(texels)) = (color_handle, color) {
            self.images[handle.0 as usize].texels = texels;
        }
        if let (Some(handle), Some(texels)) = (depth_handle, depth) {
            self.images[handle.0 as usize].texels = texels;
        }

        glog::trace!(
            "{}: {} shaded {} written {} fragments",
            record.pass, shaders.fragment, fragments_shaded, fragments_written
        );
        self.draws.push(record);

        Ok(())
    }

    fn end_render_pass(&mut self) -> anyhow::Result<(), RhiError> {
        self.active_pass.take().ok_or(RhiError::NotInRenderPass)?;
        self.reset_bindings();
        Ok(())
    }
}

impl RenderDevice for SoftDevice {
    fn create_image(&mut self, desc: ImageDesc, name: &str) -> anyhow::Result<ImageView, RhiError> {
        if format_info(desc.format).is_none() {
            return Err(RhiError::UnsupportedFormat { format: desc.format });
        }

        let handle = ImageHandle(self.images.len() as u32);
        self.images.push(SoftImage::new(desc, name)?);

        glog::debug!("Created soft image {} {:?} {:?}", name, desc.extent, desc.format);
        Ok(ImageView { handle, desc })
    }
}
