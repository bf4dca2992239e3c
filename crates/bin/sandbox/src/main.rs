// use log macros.
#[macro_use]
extern crate log as _log;

use anyhow::Context;

use raven_core::console::{self, ConsoleVars};
use raven_render::smaa_reference::{self, ReferenceAssets};
use raven_rg::{Executor, RenderGraph};
use raven_rhi::backend::soft::SoftDevice;
use raven_rhi::backend::{vk, ImageDesc, RenderDevice};

const FRAME_COUNT: u32 = 2;

/// A disc on a flat background, every angle of edge shows up on its silhouette.
fn render_scene(width: u32, height: u32) -> Vec<[f32; 4]> {
    let center = [width as f32 * 0.5, height as f32 * 0.5];
    let radius = width.min(height) as f32 * 0.35;

    (0..height)
        .flat_map(|y| (0..width).map(move |x| {
            let dx = x as f32 + 0.5 - center[0];
            let dy = y as f32 + 0.5 - center[1];

            if dx * dx + dy * dy <= radius * radius {
                [0.9, 0.6, 0.2, 1.0]
            } else {
                [0.1, 0.1, 0.3, 1.0]
            }
        }))
        .collect()
}

fn run(vars: &ConsoleVars) -> anyhow::Result<()> {
    let mut device = SoftDevice::new();
    smaa_reference::register_programs(&mut device);
    let assets = ReferenceAssets::new(&mut device).context("Failed to upload builtin textures")?;

    let scene = device.create_image(
        ImageDesc::new_2d([vars.width, vars.height], vk::Format::R8G8B8A8_UNORM),
        "scene",
    )?;
    let scene_texels = render_scene(vars.width, vars.height);
    device.upload(scene.handle, &scene_texels)?;

    let mut rg = RenderGraph::new();
    rg.import_image("scene", scene)?;
    let smaa = raven_render::setup_smaa_postprocess(&mut rg, &assets, "scene", "final")?;

    let mut executor = Executor::new(&rg)?;
    for frame in 0..FRAME_COUNT {
        device.reset_stats();
        executor.execute(&rg, &mut device)
            .with_context(|| format!("Failed to execute frame {}", frame))?;

        for draw in device.draws() {
            debug!(
                "[frame {}] {}: {} fragments shaded, {} written",
                frame, draw.pass, draw.fragments_shaded, draw.fragments_written
            );
        }
        debug!("[frame {}] {} barriers", frame, device.barriers().len());
    }

    let output = executor.physical_image(&smaa.output)
        .with_context(|| format!("{} was never created", smaa.output))?;
    let output_texels = device.read_back(output.handle)?;

    let blended = scene_texels.iter()
        .zip(&output_texels)
        .filter(|(before, after)| before != after)
        .count();
    info!(
        "SMAA {} -> {} ({}x{}, {:?}): {} of {} pixels blended",
        smaa.input, smaa.output, output.desc.extent[0], output.desc.extent[1],
        output.desc.format, blended, output_texels.len()
    );

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let vars = console::from_args()?;
    raven_core::log::init_log(vars.log_config())?;

    info!("raven sandbox started");
    let result = run(&vars);
    if let Err(err) = &result {
        error!("{:?}", err);
    }
    info!("raven sandbox shutdown");

    result
}
