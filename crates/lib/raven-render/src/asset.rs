use raven_rhi::backend::ImageView;

pub const SMAA_AREA_TEXTURE: &str = "builtin://textures/smaa/area.ktx";
pub const SMAA_SEARCH_TEXTURE: &str = "builtin://textures/smaa/search.ktx";

/// Provider of the textures shipped with the engine, addressed by `builtin://` path.
pub trait BuiltinAssets {
    fn request_texture(&self, path: &str) -> anyhow::Result<ImageView>;
}
