use anyhow::Context;

use raven_rhi::backend::{
    AccessType, ColorAttachment, DepthStencilAttachment, ImageBarrier, ImageView, LoadOp,
    RenderDevice, RenderPassBeginInfo,
};

use crate::compiled_graph::CompiledRenderGraph;
use crate::error::RgError;
use crate::graph::RenderGraph;
use crate::graph_resource::{GraphResourceKind, ResourceHandle};
use crate::pass::{Pass, PassResourceAccess};
use crate::pass_context::{PassImages, RenderPassContext};

/// Physical image of a graph resource and the last access recorded on it.
#[derive(Clone, Copy, Debug)]
struct RegisteredResource {
    view: ImageView,
    access: AccessType,
    /// Host owned content must survive the first transition.
    imported: bool,
}

/// Render graph executor to run a render graph with a render device.
///
/// Physical images of graph owned resources are created on the first frame. When the graph
/// changes, images whose resolved description did not change are kept by name.
pub struct Executor {
    compiled: CompiledRenderGraph,
    registered_resources: Vec<Option<RegisteredResource>>,
}

impl Executor {
    pub fn new(graph: &RenderGraph) -> anyhow::Result<Self> {
        let compiled = graph.compile().context("Failed to compile render graph")?;

        Ok(Self {
            registered_resources: vec![None; compiled.descs.len()],
            compiled,
        })
    }

    #[inline]
    pub fn compiled(&self) -> &CompiledRenderGraph {
        &self.compiled
    }

    /// Physical image of the named resource, `None` before the first frame.
    pub fn physical_image(&self, name: &str) -> Option<ImageView> {
        let handle = self.compiled.resource_names.get(name)?;
        self.registered_resources[handle.index()].map(|registered| registered.view)
    }

    /// Record one frame, passes run in order and every error is returned as is.
    pub fn execute<D: RenderDevice>(&mut self, graph: &RenderGraph, device: &mut D) -> anyhow::Result<()> {
        if graph.revision() != self.compiled.revision {
            glog::debug!("Render graph changed, recompiling");
            self.recompile(graph)?;
        }

        self.prepare_resources(graph, device)?;

        let order = self.compiled.order.clone();
        for handle in order {
            let pass = &graph.passes[handle.index()];
            self.record_pass_commands(pass, device)?;
        }

        Ok(())
    }

    fn recompile(&mut self, graph: &RenderGraph) -> anyhow::Result<()> {
        let compiled = graph.compile().context("Failed to compile render graph")?;

        let mut registered_resources = vec![None; compiled.descs.len()];
        let mut kept = 0;
        for (name, handle) in &compiled.resource_names {
            if graph.resources[handle.index()].is_imported() {
                continue;
            }

            let old = match self.compiled.resource_names.get(name) {
                Some(old) => *old,
                None => continue,
            };
            if self.compiled.descs[old.index()] != compiled.descs[handle.index()] {
                continue;
            }

            // access state travels with the image, so the next barrier starts from it
            if let Some(registered) = self.registered_resources[old.index()].filter(|registered| !registered.imported) {
                registered_resources[handle.index()] = Some(registered);
                kept += 1;
            }
        }

        glog::debug!("Kept {} of {} physical images", kept, compiled.descs.len());

        self.compiled = compiled;
        self.registered_resources = registered_resources;
        Ok(())
    }

    fn prepare_resources<D: RenderDevice>(&mut self, graph: &RenderGraph, device: &mut D) -> anyhow::Result<()> {
        for (idx, texture) in graph.resources.iter().enumerate() {
            if self.registered_resources[idx].is_some() {
                continue;
            }

            let imported = texture.is_imported();
            let view = match &texture.kind {
                GraphResourceKind::Imported(view) => *view,
                GraphResourceKind::Created(_) => {
                    let desc = self.compiled.descs[idx];
                    device.create_image(desc, &texture.name)
                        .with_context(|| format!("Failed to create image {}: {:?}", texture.name, desc))?
                }
            };

            self.registered_resources[idx] = Some(RegisteredResource {
                view,
                access: AccessType::Nothing,
                imported,
            });
        }

        Ok(())
    }

    fn record_pass_commands<D: RenderDevice>(&mut self, pass: &Pass, device: &mut D) -> anyhow::Result<()> {
        glog::trace!("Recording {} pass", pass.name());

        // transition all the pass resources to dst access
        for access in pass.inputs().chain(pass.outputs()) {
            self.resource_transition(access, device)?;
        }

        let images = PassImages {
            texture_inputs: pass.texture_inputs()
                .iter()
                .map(|access| self.view(access.resource))
                .collect::<anyhow::Result<_, _>>()?,
            color_outputs: pass.color_outputs()
                .iter()
                .map(|access| self.view(access.resource))
                .collect::<anyhow::Result<_, _>>()?,
            depth_stencil: pass.depth_stencil_output()
                .or(pass.depth_stencil_input())
                .map(|access| self.view(access.resource))
                .transpose()?,
        };

        // negotiate clear values, asked once per attachment before recording
        let color_attachments = images.color_outputs
            .iter()
            .enumerate()
            .map(|(idx, view)| ColorAttachment {
                view: *view,
                load_op: match pass.get_clear_color(idx as u32) {
                    Some(value) => LoadOp::Clear(value),
                    None => LoadOp::DontCare,
                },
            })
            .collect::<Vec<_>>();

        let depth_stencil_attachment = match (pass.depth_stencil_output(), pass.depth_stencil_input()) {
            (Some(output), _) => Some(DepthStencilAttachment {
                view: self.view(output.resource)?,
                load_op: match pass.get_clear_depth_stencil() {
                    Some(value) => LoadOp::Clear(value),
                    None => LoadOp::DontCare,
                },
                read_only: false,
            }),
            (None, Some(input)) => Some(DepthStencilAttachment {
                view: self.view(input.resource)?,
                load_op: LoadOp::Load,
                read_only: true,
            }),
            (None, None) => None,
        };

        device.begin_render_pass(&RenderPassBeginInfo {
            name: pass.name(),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
        })?;

        let result = {
            let mut ctx = RenderPassContext::new(&mut *device, pass.name(), images);
            pass.record(&mut ctx)
        };
        let end_result = device.end_render_pass();

        result?;
        end_result?;
        Ok(())
    }

    fn resource_transition<D: RenderDevice>(
        &mut self,
        access: &PassResourceAccess,
        device: &mut D,
    ) -> anyhow::Result<(), RgError> {
        let registered = match self.registered_resources[access.resource.index()].as_mut() {
            Some(registered) => registered,
            None => return Err(missing_image(&self.compiled, access.resource)),
        };

        if registered.access == access.access {
            return Ok(());
        }

        device.image_barrier(ImageBarrier {
            image: registered.view,
            prev_access: registered.access,
            next_access: access.access,
            // created resources have no meaningful content yet
            discard: registered.access == AccessType::Nothing && !registered.imported,
        });
        registered.access = access.access;

        Ok(())
    }

    fn view(&self, resource: ResourceHandle) -> anyhow::Result<ImageView, RgError> {
        self.registered_resources[resource.index()]
            .map(|registered| registered.view)
            .ok_or_else(|| missing_image(&self.compiled, resource))
    }
}

fn missing_image(compiled: &CompiledRenderGraph, resource: ResourceHandle) -> RgError {
    let name = compiled.resource_names
        .iter()
        .find(|(_, handle)| **handle == resource)
        .map_or_else(|| format!("#{}", resource.index()), |(name, _)| name.clone());

    RgError::MissingPhysicalImage { resource: name }
}
