mod graph;
mod compiled_graph;

mod resource;
mod graph_resource;

mod pass;
mod pass_context;

mod executor;
mod error;

pub use resource::{AttachmentInfo, SizeClass, ResourceRole};
pub use graph_resource::{ResourceHandle, TextureResource};
pub use graph::{RenderGraph, Checkpoint};
pub use compiled_graph::CompiledRenderGraph;
pub use pass::{Pass, PassBuilder, PassHandle, PassResourceAccess, ClearColorFunc, ClearDepthStencilFunc, RenderFunc};
pub use pass_context::{RenderPassContext, PassImages};
pub use executor::Executor;
pub use error::RgError;

extern crate log as glog;
