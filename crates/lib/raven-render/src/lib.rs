extern crate log as glog;

mod asset;
mod renderer;

pub mod smaa_reference;

pub use asset::{BuiltinAssets, SMAA_AREA_TEXTURE, SMAA_SEARCH_TEXTURE};
pub use renderer::smaa_renderer::{
    setup_smaa_postprocess, rt_metrics, SmaaPasses,
    SMAA_EDGE_DETECTION_SHADERS, SMAA_BLEND_WEIGHT_SHADERS, SMAA_NEIGHBOR_BLEND_SHADERS,
};
