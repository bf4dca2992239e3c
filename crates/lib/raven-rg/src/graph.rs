use std::collections::HashMap;

use ash::vk;

use raven_rhi::backend::{barrier, is_depth_format, ImageDesc, ImageView};

use crate::compiled_graph::CompiledRenderGraph;
use crate::error::RgError;
use crate::graph_resource::{GraphResourceKind, ResourceHandle, TextureResource};
use crate::pass::{Pass, PassBuilder, PassHandle};
use crate::resource::{scaled_extent, AttachmentInfo, ResourceRole, SizeClass};

/// State of the graph a failed composition can go back to.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    resources: Vec<TextureResource>,
    pass_count: usize,
}

/// Declarative render graph.
///
/// Resources and passes are addressed by name while composing and by handle afterwards.
/// Passes execute in declaration order, so every input must be produced by an earlier pass,
/// be imported or be declared by the host.
#[derive(Default)]
pub struct RenderGraph {
    pub(crate) resources: Vec<TextureResource>,
    resource_names: HashMap<String, ResourceHandle>,
    pub(crate) passes: Vec<Pass>,
    pass_names: HashMap<String, PassHandle>,

    /// Bumped on every change, the executor recompiles when it differs.
    revision: u64,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Declare a graph owned resource or update the description of a not yet written one.
    pub fn declare_resource(&mut self, name: &str, info: AttachmentInfo) -> anyhow::Result<ResourceHandle, RgError> {
        if name.is_empty() {
            return Err(RgError::EmptyName);
        }
        if let Some(relative) = info.relative_to() {
            if relative != name {
                self.find_resource(relative)?;
            }
        }

        let handle = match self.resource_names.get(name) {
            Some(&handle) => {
                let texture = &mut self.resources[handle.index()];
                match &mut texture.kind {
                    GraphResourceKind::Created(declared) => {
                        texture.unorm_srgb_alias |= info.unorm_srgb_alias;
                        *declared = info;
                    }
                    GraphResourceKind::Imported(_) => {
                        return Err(RgError::ImportedResourceWrite { resource: name.to_owned() });
                    }
                }
                handle
            }
            None => {
                let handle = ResourceHandle(self.resources.len() as u32);
                self.resources.push(TextureResource::created(name, info));
                self.resource_names.insert(name.to_owned(), handle);
                handle
            }
        };

        self.touch();
        Ok(handle)
    }

    /// Bring a host owned image into the graph, it can only be read by passes.
    pub fn import_image(&mut self, name: &str, view: ImageView) -> anyhow::Result<ResourceHandle, RgError> {
        if name.is_empty() {
            return Err(RgError::EmptyName);
        }
        if self.resource_names.contains_key(name) {
            return Err(RgError::ImportedResourceWrite { resource: name.to_owned() });
        }

        let handle = ResourceHandle(self.resources.len() as u32);
        self.resources.push(TextureResource::imported(name, view));
        self.resource_names.insert(name.to_owned(), handle);

        self.touch();
        Ok(handle)
    }

    /// Add a new render pass to the render graph.
    pub fn add_pass<'rg>(&'rg mut self, name: &str, stages: vk::PipelineStageFlags) -> anyhow::Result<PassBuilder<'rg>, RgError> {
        if name.is_empty() {
            return Err(RgError::EmptyName);
        }
        if self.pass_names.contains_key(name) {
            return Err(RgError::DuplicatePass { name: name.to_owned() });
        }

        let handle = PassHandle(self.passes.len() as u32);
        self.passes.push(Pass::new_empty(name, stages));
        self.pass_names.insert(name.to_owned(), handle);

        glog::trace!("Pass {} added to render graph", name);

        self.touch();
        Ok(PassBuilder { rg: self, handle })
    }

    /// Continue building an already added pass.
    pub fn pass(&mut self, handle: PassHandle) -> anyhow::Result<PassBuilder<'_>, RgError> {
        if handle.index() >= self.passes.len() {
            return Err(RgError::UnknownPass { index: handle.index() });
        }

        self.touch();
        Ok(PassBuilder { rg: self, handle })
    }

    pub fn get_pass(&self, handle: PassHandle) -> Option<&Pass> {
        self.passes.get(handle.index())
    }

    pub fn find_pass(&self, name: &str) -> Option<PassHandle> {
        self.pass_names.get(name).copied()
    }

    #[inline]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    #[inline]
    pub fn resources(&self) -> &[TextureResource] {
        &self.resources
    }

    #[inline]
    pub fn resource_handle(&self, name: &str) -> Option<ResourceHandle> {
        self.resource_names.get(name).copied()
    }

    pub(crate) fn find_resource(&self, name: &str) -> anyhow::Result<ResourceHandle, RgError> {
        if name.is_empty() {
            return Err(RgError::EmptyName);
        }
        self.resource_handle(name)
            .ok_or_else(|| RgError::UnknownResource { name: name.to_owned() })
    }

    pub fn texture_resource(&self, name: &str) -> Option<&TextureResource> {
        self.resource_handle(name).map(|handle| self.texture(handle))
    }

    pub fn texture_resource_mut(&mut self, name: &str) -> Option<&mut TextureResource> {
        let handle = self.resource_handle(name)?;
        self.touch();
        Some(self.texture_mut(handle))
    }

    #[inline]
    pub(crate) fn texture(&self, handle: ResourceHandle) -> &TextureResource {
        &self.resources[handle.index()]
    }

    #[inline]
    pub(crate) fn texture_mut(&mut self, handle: ResourceHandle) -> &mut TextureResource {
        &mut self.resources[handle.index()]
    }

    /// Remember the current state of the graph.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            resources: self.resources.clone(),
            pass_count: self.passes.len(),
        }
    }

    /// Drop every pass and resource added after the checkpoint and restore the resources
    /// that existed at that time. Passes added before the checkpoint are kept as they are.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let dropped_passes = self.passes.len().saturating_sub(checkpoint.pass_count);

        self.passes.truncate(checkpoint.pass_count);
        self.resources = checkpoint.resources;

        self.pass_names = self.passes.iter()
            .enumerate()
            .map(|(idx, pass)| (pass.name.clone(), PassHandle(idx as u32)))
            .collect();
        self.resource_names = self.resources.iter()
            .enumerate()
            .map(|(idx, texture)| (texture.name.clone(), ResourceHandle(idx as u32)))
            .collect();

        glog::debug!("Render graph rolled back, {} passes dropped", dropped_passes);
        self.touch();
    }
}

/// Compile Render Graph relative functions.
impl RenderGraph {
    /// Resolve every resource to a physical image description and check the pass order.
    pub fn compile(&self) -> anyhow::Result<CompiledRenderGraph, RgError> {
        let mut resolved: Vec<Option<ImageDesc>> = vec![None; self.resources.len()];
        for idx in 0..self.resources.len() {
            let mut visiting = Vec::new();
            self.resolve_desc(ResourceHandle(idx as u32), &mut resolved, &mut visiting)?;
        }

        let mut descs = resolved.into_iter()
            .map(|desc| desc.unwrap_or_default())
            .collect::<Vec<_>>();

        for (texture, desc) in self.resources.iter().zip(&descs) {
            let is_depth = is_depth_format(desc.format);

            match texture.role {
                Some(ResourceRole::Color) if is_depth => {
                    return Err(RgError::RoleMismatch { resource: texture.name.clone(), expected: ResourceRole::Color });
                }
                Some(ResourceRole::DepthStencil) if !is_depth => {
                    return Err(RgError::RoleMismatch { resource: texture.name.clone(), expected: ResourceRole::DepthStencil });
                }
                _ => {}
            }
        }

        // usage flags are inferred from the accesses
        for (pass_idx, pass) in self.passes.iter().enumerate() {
            for input in pass.inputs() {
                let texture = self.texture(input.resource);

                match texture.writer {
                    Some(writer) if writer.index() >= pass_idx => {
                        return Err(RgError::ReadBeforeWrite {
                            pass: pass.name.clone(),
                            resource: texture.name.clone(),
                        });
                    }
                    None if !texture.is_imported() => {
                        glog::warn!("Pass {} reads {} which no pass writes!", pass.name, texture.name);
                    }
                    _ => {}
                }
            }

            for access in pass.inputs().chain(pass.outputs()) {
                descs[access.resource.index()].usage |= barrier::image_access_to_usage_flags(&access.access);
            }
        }

        let order = (0..self.passes.len() as u32).map(PassHandle).collect();

        Ok(CompiledRenderGraph {
            revision: self.revision,
            descs,
            order,
            resource_names: self.resource_names.clone(),
        })
    }

    fn resolve_desc(
        &self,
        handle: ResourceHandle,
        resolved: &mut Vec<Option<ImageDesc>>,
        visiting: &mut Vec<ResourceHandle>,
    ) -> anyhow::Result<ImageDesc, RgError> {
        if let Some(desc) = resolved[handle.index()] {
            return Ok(desc);
        }

        let texture = self.texture(handle);
        if visiting.contains(&handle) {
            return Err(RgError::CyclicSize { resource: texture.name.clone() });
        }
        visiting.push(handle);

        // imported images keep the desc they were created with
        let desc = match &texture.kind {
            GraphResourceKind::Imported(view) => view.desc,
            GraphResourceKind::Created(info) => {
                let (extent, base_format) = match &info.size_class {
                    SizeClass::Absolute { width, height } => ([*width, *height], None),
                    SizeClass::InputRelative(name) => {
                        let base = self.find_resource(name)?;
                        let base = self.resolve_desc(base, resolved, visiting)?;
                        (base.extent, Some(base.format))
                    }
                };

                let format = info.format
                    .or(base_format)
                    .ok_or_else(|| RgError::UnresolvedFormat { resource: texture.name.clone() })?;

                ImageDesc {
                    unorm_srgb_alias: texture.unorm_srgb_alias,
                    ..ImageDesc::new_2d(scaled_extent(extent, info.scale), format)
                }
            }
        };

        visiting.pop();
        resolved[handle.index()] = Some(desc);
        Ok(desc)
    }
}
