use anyhow::Context;
use ash::vk;
use glam::Vec4;

use raven_rg::{AttachmentInfo, PassHandle, RenderGraph, RgError};
use raven_rhi::backend::{is_srgb_format, ImageView, QuadDrawState, QuadShaders, StockSampler};

use crate::asset::{BuiltinAssets, SMAA_AREA_TEXTURE, SMAA_SEARCH_TEXTURE};

pub const SMAA_EDGE_DETECTION_SHADERS: QuadShaders = QuadShaders::new(
    "builtin://shaders/post/smaa_edge_detection.vert",
    "builtin://shaders/post/smaa_edge_detection.frag",
);
pub const SMAA_BLEND_WEIGHT_SHADERS: QuadShaders = QuadShaders::new(
    "builtin://shaders/post/smaa_blend_weight.vert",
    "builtin://shaders/post/smaa_blend_weight.frag",
);
pub const SMAA_NEIGHBOR_BLEND_SHADERS: QuadShaders = QuadShaders::new(
    "builtin://shaders/post/smaa_neighbor_blend.vert",
    "builtin://shaders/post/smaa_neighbor_blend.frag",
);

/// Edge pixels are marked in a depth mask by the edge pass, the weight pass only shades them.
const MASKED_EDGE: bool = true;

/// Passes and resources of one SMAA instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmaaPasses {
    pub edge_pass: PassHandle,
    pub weight_pass: PassHandle,
    pub blend_pass: PassHandle,

    pub input: String,
    pub output: String,
    pub edge_output: String,
    pub weight_output: String,
    /// `None` when the edge mask is not used.
    pub mask: Option<String>,
}

/// `(1/w, 1/h, w, h)` of the image.
#[inline]
pub fn rt_metrics(image: &ImageView) -> Vec4 {
    let width = image.desc.extent[0] as f32;
    let height = image.desc.extent[1] as f32;

    Vec4::new(1.0 / width, 1.0 / height, width, height)
}

/// Add the three SMAA passes reading `input` and writing `output` to the render graph.
///
/// The output is sized and formatted like the input. Intermediate resources are named after
/// the output, so several instances can live in one graph. On error nothing is left in the graph.
///
/// An imported srgb input must be created with `unorm_srgb_alias`, created inputs get it here.
pub fn setup_smaa_postprocess(
    rg: &mut RenderGraph,
    assets: &dyn BuiltinAssets,
    input: &str,
    output: &str,
) -> anyhow::Result<SmaaPasses> {
    setup_smaa_postprocess_with_mask(rg, assets, input, output, MASKED_EDGE)
}

pub(crate) fn setup_smaa_postprocess_with_mask(
    rg: &mut RenderGraph,
    assets: &dyn BuiltinAssets,
    input: &str,
    output: &str,
    masked_edge: bool,
) -> anyhow::Result<SmaaPasses> {
    if input.is_empty() || output.is_empty() {
        return Err(RgError::EmptyName.into());
    }
    if input == output {
        return Err(RgError::SameInputOutput { name: input.to_owned() }.into());
    }
    // the edge pass reads the input through a unorm view, imported images can not gain the alias later
    if let Some(texture) = rg.texture_resource(input) {
        let is_srgb = texture.declared_format().map_or(false, is_srgb_format);
        if texture.is_imported() && is_srgb && !texture.unorm_srgb_alias() {
            return Err(RgError::MissingUnormAlias { resource: input.to_owned() }.into());
        }
    }

    let checkpoint = rg.checkpoint();

    match add_smaa_passes(rg, assets, input, output, masked_edge) {
        Ok(passes) => {
            if let Some(texture) = rg.texture_resource_mut(input) {
                texture.set_unorm_srgb_alias(true);
            }

            glog::debug!("SMAA {} -> {} composed (masked edge: {})", input, output, masked_edge);
            Ok(passes)
        }
        Err(err) => {
            rg.rollback(checkpoint);
            Err(err)
        }
    }
}

fn add_smaa_passes(
    rg: &mut RenderGraph,
    assets: &dyn BuiltinAssets,
    input: &str,
    output: &str,
    masked_edge: bool,
) -> anyhow::Result<SmaaPasses> {
    let area_texture = assets.request_texture(SMAA_AREA_TEXTURE)
        .with_context(|| format!("Failed to request texture {}", SMAA_AREA_TEXTURE))?;
    let search_texture = assets.request_texture(SMAA_SEARCH_TEXTURE)
        .with_context(|| format!("Failed to request texture {}", SMAA_SEARCH_TEXTURE))?;

    let edge_output = format!("{}-smaa-edge", output);
    let weight_output = format!("{}-smaa-weights", output);
    let mask = format!("{}-smaa-mask", output);
    let blend_pass_name = format!("{}-smaa-blend", output);

    let edge_pass = {
        let mut pass = rg.add_pass(&edge_output, vk::PipelineStageFlags::ALL_GRAPHICS)?;

        pass.add_texture_input(input)?;
        pass.add_color_output(&edge_output, AttachmentInfo::relative(input).format(vk::Format::R8G8_UNORM))?;
        pass.set_get_clear_color(|_| Some(vk::ClearColorValue { float32: [0.0; 4] }))?;

        if masked_edge {
            pass.set_depth_stencil_output(&mask, AttachmentInfo::relative(input).format(vk::Format::D16_UNORM))?;
            pass.set_get_clear_depth_stencil(|| Some(vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 }))?;
        }

        pass.render(move |ctx| {
            let input = ctx.texture_input(0)?;

            ctx.cmd.set_unorm_texture(0, &input, StockSampler::LinearClamp)?;
            ctx.cmd.push_constants(bytemuck::bytes_of(&rt_metrics(&input)))?;
            // non-edge fragments are discarded, so only edges leave the quad depth in the mask
            ctx.cmd.draw_quad(
                SMAA_EDGE_DETECTION_SHADERS,
                QuadDrawState::depth(masked_edge, masked_edge, vk::CompareOp::ALWAYS),
            )?;

            Ok(())
        })?;

        pass.handle()
    };

    let weight_pass = {
        let mut pass = rg.add_pass(&weight_output, vk::PipelineStageFlags::ALL_GRAPHICS)?;

        pass.add_texture_input(&edge_output)?;
        pass.add_color_output(&weight_output, AttachmentInfo::relative(input).format(vk::Format::R8G8B8A8_UNORM))?;
        pass.set_get_clear_color(|_| Some(vk::ClearColorValue { float32: [0.0; 4] }))?;

        if masked_edge {
            pass.set_depth_stencil_input(&mask)?;
        }

        pass.render(move |ctx| {
            let edge = ctx.texture_input(0)?;

            ctx.cmd.set_texture(0, &edge, StockSampler::LinearClamp)?;
            ctx.cmd.set_texture(1, &area_texture, StockSampler::LinearClamp)?;
            ctx.cmd.set_texture(2, &search_texture, StockSampler::LinearClamp)?;
            ctx.cmd.push_constants(bytemuck::bytes_of(&rt_metrics(&edge)))?;
            ctx.cmd.draw_quad(
                SMAA_BLEND_WEIGHT_SHADERS,
                QuadDrawState::depth(masked_edge, false, vk::CompareOp::EQUAL),
            )?;

            Ok(())
        })?;

        pass.handle()
    };

    let blend_pass = {
        let mut pass = rg.add_pass(&blend_pass_name, vk::PipelineStageFlags::ALL_GRAPHICS)?;

        pass.add_texture_input(input)?;
        pass.add_texture_input(&weight_output)?;
        // format is inherited from the input
        pass.add_color_output(output, AttachmentInfo::relative(input))?;

        pass.render(move |ctx| {
            let input = ctx.texture_input(0)?;
            let weights = ctx.texture_input(1)?;

            ctx.cmd.set_texture(0, &input, StockSampler::LinearClamp)?;
            ctx.cmd.set_texture(1, &weights, StockSampler::LinearClamp)?;
            ctx.cmd.push_constants(bytemuck::bytes_of(&rt_metrics(&input)))?;
            ctx.cmd.draw_quad(SMAA_NEIGHBOR_BLEND_SHADERS, QuadDrawState::no_depth())?;

            Ok(())
        })?;

        pass.handle()
    };

    Ok(SmaaPasses {
        edge_pass,
        weight_pass,
        blend_pass,
        input: input.to_owned(),
        output: output.to_owned(),
        edge_output,
        weight_output,
        mask: masked_edge.then(|| mask),
    })
}
