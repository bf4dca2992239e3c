use std::collections::HashMap;

use raven_rhi::backend::ImageDesc;

use crate::graph_resource::ResourceHandle;
use crate::pass::PassHandle;

/// Resolved resources and execution order of a render graph.
#[derive(Clone, Debug)]
pub struct CompiledRenderGraph {
    pub(crate) revision: u64,
    /// Physical description of every resource, indexed by handle.
    pub(crate) descs: Vec<ImageDesc>,
    pub(crate) order: Vec<PassHandle>,
    pub(crate) resource_names: HashMap<String, ResourceHandle>,
}

impl CompiledRenderGraph {
    #[inline]
    pub fn resource_desc(&self, handle: ResourceHandle) -> &ImageDesc {
        &self.descs[handle.index()]
    }

    pub fn find_resource_desc(&self, name: &str) -> Option<&ImageDesc> {
        self.resource_names.get(name).map(|handle| self.resource_desc(*handle))
    }

    #[inline]
    pub fn order(&self) -> &[PassHandle] {
        &self.order
    }

    /// Revision of the graph this was compiled from.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
