use raven_core::thiserror::Error;

use crate::resource::ResourceRole;

/// Contract violations of the render graph.
///
/// Declaration errors are returned synchronously by the builder functions,
/// the remaining ones surface on compile or execution.
#[derive(Debug, Error)]
pub enum RgError {
    #[error("Resource and pass names must not be empty!")]
    EmptyName,

    #[error("Unknown resource {name:?}!")]
    UnknownResource { name: String },

    #[error("Unknown pass {index}!")]
    UnknownPass { index: usize },

    #[error("Pass {name:?} already exists!")]
    DuplicatePass { name: String },

    #[error("Resource {resource:?} is already written by pass {writer:?}, {pass:?} can not write it too!")]
    DuplicateWriter { resource: String, pass: String, writer: String },

    #[error("Pass {pass:?} already has a depth stencil attachment!")]
    DepthStencilConflict { pass: String },

    #[error("Resource {resource:?} can not be used as {expected:?} attachment!")]
    RoleMismatch { resource: String, expected: ResourceRole },

    #[error("Imported resource {resource:?} is read-only inside the graph!")]
    ImportedResourceWrite { resource: String },

    #[error("Callback {callback} of pass {pass:?} is already set!")]
    CallbackAlreadySet { pass: String, callback: &'static str },

    #[error("Input and output can not be the same resource {name:?}!")]
    SameInputOutput { name: String },

    #[error("Pass {pass:?} reads {resource:?} before it is written!")]
    ReadBeforeWrite { pass: String, resource: String },

    #[error("Size of resource {resource:?} is relative to itself!")]
    CyclicSize { resource: String },

    #[error("Format of resource {resource:?} can not be resolved!")]
    UnresolvedFormat { resource: String },

    #[error("Pass {pass:?} has no {kind} at index {index}!")]
    MissingPassResource { pass: String, kind: &'static str, index: usize },

    #[error("Imported resource {resource:?} has a srgb format and can not be sampled through a unorm view!")]
    MissingUnormAlias { resource: String },

    #[error("Resource {resource:?} has no physical image!")]
    MissingPhysicalImage { resource: String },
}
