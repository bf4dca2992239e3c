use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use raven_rg::{AttachmentInfo, Executor, RenderGraph};
use raven_rhi::backend::soft::SoftDevice;
use raven_rhi::backend::{
    vk, AccessType, ImageDesc, QuadDrawState, QuadShaders, RenderDevice, StockSampler,
};

const STAGES: vk::PipelineStageFlags = vk::PipelineStageFlags::ALL_GRAPHICS;
const COPY: QuadShaders = QuadShaders::new("test/quad.vert", "test/copy.frag");
const INVERT: QuadShaders = QuadShaders::new("test/quad.vert", "test/invert.frag");

fn unorm8(value: u32) -> f32 {
    value as f32 / 255.0
}

fn device() -> SoftDevice {
    let mut device = SoftDevice::new();
    device.register_program(COPY.fragment, |input| Some(input.sample(0, input.uv())));
    device.register_program(INVERT.fragment, |input| {
        let [r, g, b, a] = input.fetch_offset(0, [0, 0]);
        Some([1.0 - r, 1.0 - g, 1.0 - b, a])
    });
    device
}

/// src -> copy -> "a" -> invert -> "b"
fn copy_invert_graph(device: &mut SoftDevice, clear_queries: Arc<AtomicU32>) -> RenderGraph {
    let src = device.create_image(ImageDesc::new_2d([4, 4], vk::Format::R8G8B8A8_UNORM), "src").unwrap();
    device.upload(src.handle, &[[0.2, 0.4, 0.6, 1.0]; 16]).unwrap();

    let mut rg = RenderGraph::new();
    rg.import_image("src", src).unwrap();

    {
        let mut pass = rg.add_pass("copy", STAGES).unwrap();
        pass.add_texture_input("src").unwrap();
        pass.add_color_output("a", AttachmentInfo::relative("src")).unwrap();
        pass.set_get_clear_color(move |_| {
            clear_queries.fetch_add(1, Ordering::SeqCst);
            Some(vk::ClearColorValue { float32: [0.0; 4] })
        }).unwrap();
        pass.render(|ctx| {
            let src = ctx.texture_input(0)?;
            ctx.cmd.set_texture(0, &src, StockSampler::NearestClamp)?;
            ctx.cmd.draw_quad(COPY, QuadDrawState::no_depth())?;
            Ok(())
        }).unwrap();
    }
    {
        let mut pass = rg.add_pass("invert", STAGES).unwrap();
        pass.add_texture_input("a").unwrap();
        pass.add_color_output("b", AttachmentInfo::relative("a")).unwrap();
        pass.render(|ctx| {
            let a = ctx.texture_input(0)?;
            ctx.cmd.set_texture(0, &a, StockSampler::NearestClamp)?;
            ctx.cmd.draw_quad(INVERT, QuadDrawState::no_depth())?;
            Ok(())
        }).unwrap();
    }

    rg
}

#[test]
fn execute_in_declaration_order() {
    let mut device = device();
    let clear_queries = Arc::new(AtomicU32::new(0));
    let rg = copy_invert_graph(&mut device, clear_queries.clone());

    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();

    let draws = device.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].pass, "copy");
    assert_eq!(draws[1].pass, "invert");
    assert_eq!(clear_queries.load(Ordering::SeqCst), 1);

    let b = executor.physical_image("b").unwrap();
    assert_eq!(b.desc.extent, [4, 4]);
    assert_eq!(b.desc.format, vk::Format::R8G8B8A8_UNORM);

    let expected = [unorm8(204), unorm8(153), unorm8(102), 1.0];
    assert!(device.read_back(b.handle).unwrap().iter().all(|texel| *texel == expected));
}

#[test]
fn barriers_follow_access_changes() {
    let mut device = device();
    let rg = copy_invert_graph(&mut device, Arc::new(AtomicU32::new(0)));

    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();

    let a = executor.physical_image("a").unwrap();
    let transitions = device.barriers()
        .iter()
        .filter(|barrier| barrier.image.handle == a.handle)
        .map(|barrier| (barrier.prev_access, barrier.next_access))
        .collect::<Vec<_>>();
    assert_eq!(transitions, vec![
        (AccessType::Nothing, AccessType::ColorAttachmentWrite),
        (AccessType::ColorAttachmentWrite, AccessType::FragmentShaderReadSampledImageOrUniformTexelBuffer),
    ]);
    assert_eq!(device.barriers().len(), 4);

    // imported content is kept, created images start undefined
    let src = executor.physical_image("src").unwrap();
    for barrier in device.barriers() {
        let first_use = barrier.prev_access == AccessType::Nothing;
        assert_eq!(barrier.discard, first_use && barrier.image.handle != src.handle);
    }

    // second frame: images are reused, only "a" changes its access
    device.reset_stats();
    executor.execute(&rg, &mut device).unwrap();

    assert_eq!(executor.physical_image("a").unwrap().handle, a.handle);
    assert_eq!(device.barriers().len(), 2);
    assert!(device.barriers().iter().all(|barrier| barrier.image.handle == a.handle && !barrier.discard));
}

#[test]
fn pass_errors_propagate_unmodified() {
    let mut device = device();
    let mut rg = copy_invert_graph(&mut device, Arc::new(AtomicU32::new(0)));

    {
        let mut pass = rg.add_pass("broken", STAGES).unwrap();
        pass.add_texture_input("b").unwrap();
        pass.add_color_output("c", AttachmentInfo::relative("b")).unwrap();
        pass.render(|_| Err(anyhow::anyhow!("pass exploded"))).unwrap();
    }

    let mut executor = Executor::new(&rg).unwrap();
    let err = executor.execute(&rg, &mut device).unwrap_err();
    assert_eq!(err.to_string(), "pass exploded");

    // the failed pass did not leave the render pass open
    let err = executor.execute(&rg, &mut device).unwrap_err();
    assert_eq!(err.to_string(), "pass exploded");
}

#[test]
fn recompile_when_graph_changes() {
    let mut device = device();
    let mut rg = copy_invert_graph(&mut device, Arc::new(AtomicU32::new(0)));

    let mut executor = Executor::new(&rg).unwrap();
    executor.execute(&rg, &mut device).unwrap();
    assert!(executor.physical_image("c").is_none());
    let a = executor.physical_image("a").unwrap();
    let b = executor.physical_image("b").unwrap();

    {
        let mut pass = rg.add_pass("copy again", STAGES).unwrap();
        pass.add_texture_input("b").unwrap();
        pass.add_color_output("c", AttachmentInfo::relative("b")).unwrap();
        pass.render(|ctx| {
            let b = ctx.texture_input(0)?;
            ctx.cmd.set_texture(0, &b, StockSampler::NearestClamp)?;
            ctx.cmd.draw_quad(COPY, QuadDrawState::no_depth())?;
            Ok(())
        }).unwrap();
    }

    device.reset_stats();
    executor.execute(&rg, &mut device).unwrap();

    assert_eq!(device.draws().len(), 3);
    assert!(executor.physical_image("c").is_some());

    // "a" keeps its image and content, "b" is sampled now and gets a new one
    assert_eq!(executor.physical_image("a").unwrap(), a);
    assert_ne!(executor.physical_image("b").unwrap().handle, b.handle);
    let transitions = device.barriers()
        .iter()
        .filter(|barrier| barrier.image.handle == a.handle)
        .map(|barrier| (barrier.prev_access, barrier.next_access, barrier.discard))
        .collect::<Vec<_>>();
    assert_eq!(transitions, vec![
        (AccessType::FragmentShaderReadSampledImageOrUniformTexelBuffer, AccessType::ColorAttachmentWrite, false),
        (AccessType::ColorAttachmentWrite, AccessType::FragmentShaderReadSampledImageOrUniformTexelBuffer, false),
    ]);
}
