use ash::vk;
use vk_sync::AccessType;

use raven_rhi::backend::is_depth_format;

use crate::error::RgError;
use crate::graph::RenderGraph;
use crate::graph_resource::ResourceHandle;
use crate::pass_context::RenderPassContext;
use crate::resource::{AttachmentInfo, ResourceRole};

/// Asked once per color attachment before recording, `None` leaves the attachment content undefined.
pub type ClearColorFunc = dyn Fn(u32) -> Option<vk::ClearColorValue> + Send + Sync;
/// Asked before recording, `None` leaves the depth stencil content undefined.
pub type ClearDepthStencilFunc = dyn Fn() -> Option<vk::ClearDepthStencilValue> + Send + Sync;
/// Records the commands of a pass.
pub type RenderFunc = dyn Fn(&mut RenderPassContext) -> anyhow::Result<()> + Send + Sync;

/// Index of a pass inside one render graph.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PassHandle(pub(crate) u32);

impl PassHandle {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Resource handle of the resource in the render graph and the access type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassResourceAccess {
    pub resource: ResourceHandle,
    pub access: AccessType,
}

/// Render Pass in the render graph.
/// Plain declaration of what a pass reads and writes plus the callbacks the executor invokes.
pub struct Pass {
    pub(crate) name: String,
    pub(crate) stages: vk::PipelineStageFlags,

    pub(crate) color_outputs: Vec<PassResourceAccess>,
    pub(crate) texture_inputs: Vec<PassResourceAccess>,
    pub(crate) depth_stencil_output: Option<PassResourceAccess>,
    pub(crate) depth_stencil_input: Option<PassResourceAccess>,

    pub(crate) clear_color: Option<Box<ClearColorFunc>>,
    pub(crate) clear_depth_stencil: Option<Box<ClearDepthStencilFunc>>,
    pub(crate) render_func: Option<Box<RenderFunc>>,
}

impl Pass {
    pub(crate) fn new_empty(name: &str, stages: vk::PipelineStageFlags) -> Self {
        Self {
            name: name.to_owned(),
            stages,
            color_outputs: Vec::new(),
            texture_inputs: Vec::new(),
            depth_stencil_output: None,
            depth_stencil_input: None,
            clear_color: None,
            clear_depth_stencil: None,
            render_func: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn stages(&self) -> vk::PipelineStageFlags {
        self.stages
    }

    #[inline]
    pub fn color_outputs(&self) -> &[PassResourceAccess] {
        &self.color_outputs
    }

    #[inline]
    pub fn texture_inputs(&self) -> &[PassResourceAccess] {
        &self.texture_inputs
    }

    #[inline]
    pub fn depth_stencil_output(&self) -> Option<&PassResourceAccess> {
        self.depth_stencil_output.as_ref()
    }

    #[inline]
    pub fn depth_stencil_input(&self) -> Option<&PassResourceAccess> {
        self.depth_stencil_input.as_ref()
    }

    /// Every resource this pass reads.
    pub fn inputs(&self) -> impl Iterator<Item = &PassResourceAccess> {
        self.texture_inputs.iter().chain(self.depth_stencil_input.iter())
    }

    /// Every resource this pass writes.
    pub fn outputs(&self) -> impl Iterator<Item = &PassResourceAccess> {
        self.color_outputs.iter().chain(self.depth_stencil_output.iter())
    }

    /// Ask the clear color negotiator, `None` if there is none.
    pub fn get_clear_color(&self, attachment: u32) -> Option<vk::ClearColorValue> {
        self.clear_color.as_ref().and_then(|func| func(attachment))
    }

    /// Ask the clear depth stencil negotiator, `None` if there is none.
    pub fn get_clear_depth_stencil(&self) -> Option<vk::ClearDepthStencilValue> {
        self.clear_depth_stencil.as_ref().and_then(|func| func())
    }

    /// Invoke the record callback, a pass without one records nothing.
    pub fn record(&self, ctx: &mut RenderPassContext) -> anyhow::Result<()> {
        match &self.render_func {
            Some(func) => func(ctx),
            None => Ok(()),
        }
    }
}

/// Helper struct to build a Pass already added to the render graph.
pub struct PassBuilder<'rg> {
    pub(crate) rg: &'rg mut RenderGraph,
    pub(crate) handle: PassHandle,
}

impl<'rg> PassBuilder<'rg> {
    #[inline]
    pub fn handle(&self) -> PassHandle {
        self.handle
    }

    /// Write to a color attachment, declares the resource if it does not exist yet.
    pub fn add_color_output(&mut self, name: &str, info: AttachmentInfo) -> anyhow::Result<ResourceHandle, RgError> {
        if info.format.map_or(false, is_depth_format) {
            return Err(RgError::RoleMismatch {
                resource: name.to_owned(),
                expected: ResourceRole::Color,
            });
        }

        let resource = self.write_impl(name, info, ResourceRole::Color)?;
        self.pass_mut().color_outputs.push(PassResourceAccess {
            resource,
            access: AccessType::ColorAttachmentWrite,
        });

        Ok(resource)
    }

    /// Sample an existing resource, addressed by the order of declaration.
    pub fn add_texture_input(&mut self, name: &str) -> anyhow::Result<ResourceHandle, RgError> {
        let resource = self.rg.find_resource(name)?;

        self.pass_mut().texture_inputs.push(PassResourceAccess {
            resource,
            access: AccessType::FragmentShaderReadSampledImageOrUniformTexelBuffer,
        });
        self.rg.touch();

        Ok(resource)
    }

    /// Write to the depth stencil attachment, declares the resource if it does not exist yet.
    pub fn set_depth_stencil_output(&mut self, name: &str, info: AttachmentInfo) -> anyhow::Result<ResourceHandle, RgError> {
        self.check_no_depth_stencil()?;

        if info.format.map_or(false, |format| !is_depth_format(format)) {
            return Err(RgError::RoleMismatch {
                resource: name.to_owned(),
                expected: ResourceRole::DepthStencil,
            });
        }

        let resource = self.write_impl(name, info, ResourceRole::DepthStencil)?;
        self.pass_mut().depth_stencil_output = Some(PassResourceAccess {
            resource,
            access: AccessType::DepthStencilAttachmentWrite,
        });

        Ok(resource)
    }

    /// Test against an existing depth stencil resource without writing it.
    pub fn set_depth_stencil_input(&mut self, name: &str) -> anyhow::Result<ResourceHandle, RgError> {
        self.check_no_depth_stencil()?;

        let resource = self.rg.find_resource(name)?;
        let texture = self.rg.texture(resource);

        let is_depth = match texture.role {
            Some(role) => role == ResourceRole::DepthStencil,
            None => texture.declared_format().map_or(true, is_depth_format),
        };
        if !is_depth {
            return Err(RgError::RoleMismatch {
                resource: name.to_owned(),
                expected: ResourceRole::DepthStencil,
            });
        }

        self.pass_mut().depth_stencil_input = Some(PassResourceAccess {
            resource,
            access: AccessType::DepthStencilAttachmentRead,
        });
        self.rg.touch();

        Ok(resource)
    }

    pub fn set_get_clear_color(
        &mut self,
        func: impl Fn(u32) -> Option<vk::ClearColorValue> + Send + Sync + 'static,
    ) -> anyhow::Result<(), RgError> {
        let pass = self.pass_mut();
        if pass.clear_color.is_some() {
            return Err(RgError::CallbackAlreadySet { pass: pass.name.clone(), callback: "clear color" });
        }

        pass.clear_color = Some(Box::new(func));
        Ok(())
    }

    pub fn set_get_clear_depth_stencil(
        &mut self,
        func: impl Fn() -> Option<vk::ClearDepthStencilValue> + Send + Sync + 'static,
    ) -> anyhow::Result<(), RgError> {
        let pass = self.pass_mut();
        if pass.clear_depth_stencil.is_some() {
            return Err(RgError::CallbackAlreadySet { pass: pass.name.clone(), callback: "clear depth stencil" });
        }

        pass.clear_depth_stencil = Some(Box::new(func));
        Ok(())
    }

    /// Add render function to this pass.
    pub fn render(
        &mut self,
        func: impl Fn(&mut RenderPassContext) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> anyhow::Result<(), RgError> {
        let pass = self.pass_mut();
        if pass.render_func.is_some() {
            return Err(RgError::CallbackAlreadySet { pass: pass.name.clone(), callback: "render" });
        }

        pass.render_func = Some(Box::new(func));
        Ok(())
    }

    fn pass_mut(&mut self) -> &mut Pass {
        &mut self.rg.passes[self.handle.index()]
    }

    fn check_no_depth_stencil(&mut self) -> anyhow::Result<(), RgError> {
        let pass = self.pass_mut();
        if pass.depth_stencil_output.is_some() || pass.depth_stencil_input.is_some() {
            return Err(RgError::DepthStencilConflict { pass: pass.name.clone() });
        }
        Ok(())
    }

    fn write_impl(&mut self, name: &str, info: AttachmentInfo, role: ResourceRole) -> anyhow::Result<ResourceHandle, RgError> {
        let pass_name = self.rg.passes[self.handle.index()].name.clone();

        if let Some(resource) = self.rg.resource_handle(name) {
            let texture = self.rg.texture(resource);

            if texture.is_imported() {
                return Err(RgError::ImportedResourceWrite { resource: name.to_owned() });
            }
            if let Some(writer) = texture.writer {
                return Err(RgError::DuplicateWriter {
                    resource: name.to_owned(),
                    pass: pass_name,
                    writer: self.rg.passes[writer.index()].name.clone(),
                });
            }
            if texture.role.map_or(false, |declared| declared != role) {
                return Err(RgError::RoleMismatch { resource: name.to_owned(), expected: role });
            }
        }

        let resource = self.rg.declare_resource(name, info)?;

        let texture = self.rg.texture_mut(resource);
        texture.role = Some(role);
        texture.writer = Some(self.handle);

        Ok(resource)
    }
}
