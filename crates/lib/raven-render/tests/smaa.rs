use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use raven_render::smaa_reference::{self, ReferenceAssets};
use raven_render::{
    setup_smaa_postprocess, BuiltinAssets, SmaaPasses, SMAA_AREA_TEXTURE, SMAA_BLEND_WEIGHT_SHADERS,
};
use raven_rg::{AttachmentInfo, Executor, RenderGraph, RgError};
use raven_rhi::backend::soft::SoftDevice;
use raven_rhi::backend::{vk, AccessType, ImageDesc, ImageHandle, ImageView, RenderDevice};

/// Hands out placeholder views, nothing is ever executed with them.
struct PlaceholderAssets;

impl BuiltinAssets for PlaceholderAssets {
    fn request_texture(&self, path: &str) -> anyhow::Result<ImageView> {
        let handle = if path == SMAA_AREA_TEXTURE { 1000 } else { 1001 };
        Ok(ImageView {
            handle: ImageHandle(handle),
            desc: ImageDesc::new_2d([16, 16], vk::Format::R8G8_UNORM),
        })
    }
}

/// Fails on the search texture.
struct MissingSearchTexture;

impl BuiltinAssets for MissingSearchTexture {
    fn request_texture(&self, path: &str) -> anyhow::Result<ImageView> {
        if path == SMAA_AREA_TEXTURE {
            PlaceholderAssets.request_texture(path)
        } else {
            Err(anyhow::anyhow!("{} not found", path))
        }
    }
}

fn placeholder_input(extent: [u32; 2], format: vk::Format) -> ImageView {
    ImageView {
        handle: ImageHandle(0),
        desc: ImageDesc::new_2d(extent, format),
    }
}

fn graph_with_input(extent: [u32; 2], format: vk::Format) -> RenderGraph {
    let mut rg = RenderGraph::new();
    rg.import_image("color", placeholder_input(extent, format)).unwrap();
    rg
}

fn rg_error(err: &anyhow::Error) -> &RgError {
    err.downcast_ref::<RgError>().unwrap()
}

/// Diagonal gradient with a hard step in the middle.
fn test_image(extent: [u32; 2]) -> Vec<[f32; 4]> {
    let [width, height] = extent;
    (0..height)
        .flat_map(|y| (0..width).map(move |x| {
            let value = if x * height > y * width { 0.9 } else { 0.1 };
            [value, value * 0.5, 1.0 - value, 1.0]
        }))
        .collect()
}

#[test]
fn full_hd_composition() {
    let mut view = placeholder_input([1920, 1080], vk::Format::R8G8B8A8_SRGB);
    view.desc.unorm_srgb_alias = true;
    let mut rg = RenderGraph::new();
    rg.import_image("color", view).unwrap();
    let passes = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "color", "resolved").unwrap();

    assert_eq!(rg.passes().len(), 3);
    assert_eq!(rg.get_pass(passes.edge_pass).unwrap().name(), "resolved-smaa-edge");
    assert_eq!(rg.get_pass(passes.weight_pass).unwrap().name(), "resolved-smaa-weights");
    assert_eq!(rg.get_pass(passes.blend_pass).unwrap().name(), "resolved-smaa-blend");
    assert!(rg.texture_resource("color").unwrap().unorm_srgb_alias());

    let compiled = rg.compile().unwrap();
    assert_eq!(compiled.order(), &[passes.edge_pass, passes.weight_pass, passes.blend_pass]);

    let expected = [
        ("resolved-smaa-edge", vk::Format::R8G8_UNORM),
        ("resolved-smaa-weights", vk::Format::R8G8B8A8_UNORM),
        ("resolved-smaa-mask", vk::Format::D16_UNORM),
        ("resolved", vk::Format::R8G8B8A8_SRGB),
    ];
    for (name, format) in expected {
        let desc = compiled.find_resource_desc(name).unwrap();
        assert_eq!(desc.extent, [1920, 1080], "{}", name);
        assert_eq!(desc.format, format, "{}", name);
    }

    let edge = rg.get_pass(passes.edge_pass).unwrap();
    assert_eq!(edge.texture_inputs().len(), 1);
    assert!(edge.depth_stencil_output().is_some());
    assert_eq!(edge.get_clear_color(0).map(|value| unsafe { value.float32 }), Some([0.0; 4]));
    assert_eq!(edge.get_clear_depth_stencil().map(|value| (value.depth, value.stencil)), Some((1.0, 0)));

    let weights = rg.get_pass(passes.weight_pass).unwrap();
    let mask = weights.depth_stencil_input().unwrap();
    assert_eq!(mask.access, AccessType::DepthStencilAttachmentRead);
    assert!(weights.depth_stencil_output().is_none());
    assert!(weights.get_clear_color(0).is_some());

    let blend = rg.get_pass(passes.blend_pass).unwrap();
    assert_eq!(blend.texture_inputs().len(), 2);
    assert!(blend.get_clear_color(0).is_none());
    assert!(blend.depth_stencil_output().is_none() && blend.depth_stencil_input().is_none());
}

proptest! {
    #[test]
    fn intermediates_follow_input_size(width in 1u32..8192, height in 1u32..8192) {
        let mut rg = graph_with_input([width, height], vk::Format::R16G16B16A16_SFLOAT);
        let passes = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "color", "resolved").unwrap();
        let compiled = rg.compile().unwrap();

        let mask = passes.mask.clone().unwrap();
        for name in [&passes.edge_output, &passes.weight_output, &mask, &passes.output] {
            prop_assert_eq!(compiled.find_resource_desc(name).unwrap().extent, [width, height]);
        }
        prop_assert_eq!(
            compiled.find_resource_desc(&passes.output).unwrap().format,
            vk::Format::R16G16B16A16_SFLOAT
        );
    }

    #[test]
    fn rt_metrics_are_reciprocal(width in 1u32..16384, height in 1u32..16384) {
        let metrics = raven_render::rt_metrics(&placeholder_input([width, height], vk::Format::R8G8B8A8_UNORM));

        prop_assert_eq!(metrics.z, width as f32);
        prop_assert_eq!(metrics.w, height as f32);
        prop_assert!((metrics.x * metrics.z - 1.0).abs() <= 4.0 * f32::EPSILON);
        prop_assert!((metrics.y * metrics.w - 1.0).abs() <= 4.0 * f32::EPSILON);
    }
}

fn soft_setup(extent: [u32; 2]) -> (SoftDevice, ReferenceAssets, RenderGraph) {
    soft_setup_with(ImageDesc::new_2d(extent, vk::Format::R8G8B8A8_UNORM))
}

fn soft_setup_with(desc: ImageDesc) -> (SoftDevice, ReferenceAssets, RenderGraph) {
    let mut device = SoftDevice::new();
    smaa_reference::register_programs(&mut device);
    let assets = ReferenceAssets::new(&mut device).unwrap();

    let color = device.create_image(desc, "color").unwrap();
    device.upload(color.handle, &test_image(desc.extent)).unwrap();

    let mut rg = RenderGraph::new();
    rg.import_image("color", color).unwrap();

    (device, assets, rg)
}

#[test]
fn weights_never_read_undefined_edges() {
    let extent = [24, 16];
    let (mut device, assets, mut rg) = soft_setup(extent);

    let nan_reads = Arc::new(AtomicU32::new(0));
    {
        let nan_reads = nan_reads.clone();
        device.register_program(SMAA_BLEND_WEIGHT_SHADERS.fragment, move |input| {
            let [width, height] = input.extent;
            for y in 0..height as i32 {
                for x in 0..width as i32 {
                    if input.fetch(0, x, y).iter().any(|value| value.is_nan()) {
                        nan_reads.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
            smaa_reference::blend_weight(input)
        });
    }

    let passes = setup_smaa_postprocess(&mut rg, &assets, "color", "resolved").unwrap();
    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();

    let draws = device.draws();
    let order = draws.iter().map(|draw| draw.pass.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["resolved-smaa-edge", "resolved-smaa-weights", "resolved-smaa-blend"]);
    assert!(draws[1].fragments_shaded > 0);
    assert_eq!(nan_reads.load(Ordering::SeqCst), 0);

    let output = executor.physical_image(&passes.output).unwrap();
    assert_eq!(output.desc.extent, extent);
    let texels = device.read_back(output.handle).unwrap();
    assert!(texels.iter().flatten().all(|value| value.is_finite()));
}

#[test]
fn antialiasing_smooths_the_step() {
    let extent = [24, 16];
    let (mut device, assets, mut rg) = soft_setup(extent);

    let passes = setup_smaa_postprocess(&mut rg, &assets, "color", "resolved").unwrap();
    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();

    let input = executor.physical_image("color").unwrap();
    let output = executor.physical_image(&passes.output).unwrap();
    let before = device.read_back(input.handle).unwrap();
    let after = device.read_back(output.handle).unwrap();

    // flat corners are untouched, some pixels along the step are blended
    let [width, height] = extent;
    let bottom_left = ((height - 1) * width) as usize;
    let top_right = (width - 1) as usize;
    assert_eq!(before[bottom_left], after[bottom_left]);
    assert_eq!(before[top_right], after[top_right]);
    assert!(before.iter().zip(&after).any(|(before, after)| before != after));
}

#[test]
fn srgb_input_with_alias_executes() {
    let extent = [16, 12];
    let mut desc = ImageDesc::new_2d(extent, vk::Format::R8G8B8A8_SRGB);
    desc.unorm_srgb_alias = true;
    let (mut device, assets, mut rg) = soft_setup_with(desc);

    let passes = setup_smaa_postprocess(&mut rg, &assets, "color", "resolved").unwrap();
    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();

    let output = executor.physical_image(&passes.output).unwrap();
    assert_eq!(output.desc.format, vk::Format::R8G8B8A8_SRGB);
    assert_eq!(device.draws().len(), 3);

    // the unorm view reads the stored texels, so the result matches a unorm input
    let (mut unorm_device, unorm_assets, mut unorm_rg) = soft_setup(extent);
    setup_smaa_postprocess(&mut unorm_rg, &unorm_assets, "color", "resolved").unwrap();
    let mut unorm_executor = Executor::new(&unorm_rg).unwrap();
    unorm_executor.execute(&unorm_rg, &mut unorm_device).unwrap();

    let unorm_output = unorm_executor.physical_image("resolved").unwrap();
    assert_eq!(
        device.read_back(output.handle).unwrap(),
        unorm_device.read_back(unorm_output.handle).unwrap(),
    );
}

#[test]
fn reject_srgb_input_without_alias() {
    let mut rg = graph_with_input([64, 64], vk::Format::B8G8R8A8_SRGB);

    let err = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "color", "resolved").unwrap_err();
    assert!(matches!(rg_error(&err), RgError::MissingUnormAlias { resource } if resource == "color"));

    assert!(rg.passes().is_empty());
    assert_eq!(rg.resources().len(), 1);
    assert!(!rg.texture_resource("color").unwrap().unorm_srgb_alias());
}

#[test]
fn independent_instances() {
    let extent = [16, 16];
    let (mut device, assets, mut rg) = soft_setup(extent);

    let first = setup_smaa_postprocess(&mut rg, &assets, "color", "first").unwrap();
    let second = setup_smaa_postprocess(&mut rg, &assets, "color", "second").unwrap();

    assert_ne!(first.edge_output, second.edge_output);
    assert_ne!(first.weight_output, second.weight_output);
    assert_ne!(first.mask, second.mask);
    assert_eq!(rg.passes().len(), 6);

    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();
    assert_eq!(device.draws().len(), 6);

    let first_output = device.read_back(executor.physical_image("first").unwrap().handle).unwrap();
    let second_output = device.read_back(executor.physical_image("second").unwrap().handle).unwrap();
    assert_eq!(first_output, second_output);
}

#[test]
fn chained_instances() {
    let (mut device, assets, mut rg) = soft_setup([16, 8]);

    setup_smaa_postprocess(&mut rg, &assets, "color", "first").unwrap();
    let second = setup_smaa_postprocess(&mut rg, &assets, "first", "second").unwrap();
    assert!(rg.texture_resource("first").unwrap().unorm_srgb_alias());

    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();

    let output = executor.physical_image(&second.output).unwrap();
    assert_eq!(output.desc.extent, [16, 8]);
    assert!(executor.physical_image("first").unwrap().desc.unorm_srgb_alias);
    assert_eq!(device.draws().len(), 6);
}

#[test]
fn reject_invalid_names() {
    let mut rg = graph_with_input([64, 64], vk::Format::R8G8B8A8_UNORM);

    let err = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "", "resolved").unwrap_err();
    assert!(matches!(rg_error(&err), RgError::EmptyName));
    let err = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "color", "").unwrap_err();
    assert!(matches!(rg_error(&err), RgError::EmptyName));

    let err = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "color", "color").unwrap_err();
    assert!(matches!(rg_error(&err), RgError::SameInputOutput { name } if name == "color"));

    let err = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "missing", "resolved").unwrap_err();
    assert!(matches!(rg_error(&err), RgError::UnknownResource { name } if name == "missing"));

    // nothing is left behind by the failed attempts
    assert!(rg.passes().is_empty());
    assert_eq!(rg.resources().len(), 1);
    assert!(!rg.texture_resource("color").unwrap().unorm_srgb_alias());
}

#[test]
fn duplicate_output_keeps_first_instance() {
    let mut rg = graph_with_input([64, 64], vk::Format::R8G8B8A8_UNORM);

    let first: SmaaPasses = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "color", "resolved").unwrap();
    let resources = rg.resources().len();

    let err = setup_smaa_postprocess(&mut rg, &PlaceholderAssets, "color", "resolved").unwrap_err();
    assert!(matches!(rg_error(&err), RgError::DuplicatePass { name } if name == "resolved-smaa-edge"));

    assert_eq!(rg.passes().len(), 3);
    assert_eq!(rg.resources().len(), resources);
    assert_eq!(rg.find_pass("resolved-smaa-blend"), Some(first.blend_pass));
    rg.compile().unwrap();
}

#[test]
fn asset_failure_rolls_back() {
    let mut rg = RenderGraph::new();
    rg.declare_resource("color", AttachmentInfo::absolute(64, 64).format(vk::Format::R8G8B8A8_SRGB)).unwrap();

    let err = setup_smaa_postprocess(&mut rg, &MissingSearchTexture, "color", "resolved").unwrap_err();
    assert!(format!("{:#}", err).contains("not found"));

    assert!(rg.passes().is_empty());
    assert_eq!(rg.resources().len(), 1);
    assert!(!rg.texture_resource("color").unwrap().unorm_srgb_alias());
}
