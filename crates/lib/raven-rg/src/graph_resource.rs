use ash::vk;

use raven_rhi::backend::ImageView;

use crate::pass::PassHandle;
use crate::resource::{AttachmentInfo, ResourceRole};

/// Handle of a resource inside one render graph.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceHandle(pub(crate) u32);

impl ResourceHandle {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub(crate) enum GraphResourceKind {
    /// Owned by the graph, allocated by the executor.
    Created(AttachmentInfo),
    /// Physical image provided by the host.
    Imported(ImageView),
}

/// A named image resource of the render graph.
#[derive(Clone, Debug)]
pub struct TextureResource {
    pub(crate) name: String,
    pub(crate) kind: GraphResourceKind,
    pub(crate) role: Option<ResourceRole>,
    pub(crate) writer: Option<PassHandle>,
    pub(crate) unorm_srgb_alias: bool,
}

impl TextureResource {
    pub(crate) fn created(name: &str, info: AttachmentInfo) -> Self {
        Self {
            name: name.to_owned(),
            unorm_srgb_alias: info.unorm_srgb_alias,
            kind: GraphResourceKind::Created(info),
            role: None,
            writer: None,
        }
    }

    pub(crate) fn imported(name: &str, view: ImageView) -> Self {
        Self {
            name: name.to_owned(),
            unorm_srgb_alias: view.desc.unorm_srgb_alias,
            kind: GraphResourceKind::Imported(view),
            role: None,
            writer: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_imported(&self) -> bool {
        matches!(self.kind, GraphResourceKind::Imported(_))
    }

    /// Format as declared, `None` when it is inherited.
    pub fn declared_format(&self) -> Option<vk::Format> {
        match &self.kind {
            GraphResourceKind::Created(info) => info.format,
            GraphResourceKind::Imported(view) => Some(view.desc.format),
        }
    }

    #[inline]
    pub fn role(&self) -> Option<ResourceRole> {
        self.role
    }

    /// Pass writing this resource, if any.
    #[inline]
    pub fn writer(&self) -> Option<PassHandle> {
        self.writer
    }

    #[inline]
    pub fn unorm_srgb_alias(&self) -> bool {
        self.unorm_srgb_alias
    }

    /// Allow sampling the resource through a unorm view even if its format is srgb.
    ///
    /// Imported resources keep the alias of their image.
    pub fn set_unorm_srgb_alias(&mut self, alias: bool) {
        if !self.is_imported() {
            self.unorm_srgb_alias = alias;
        }
    }
}
