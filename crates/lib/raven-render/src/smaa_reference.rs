//! CPU versions of the SMAA shader pairs and lookup tables for the soft backend.
//!
//! Only orthogonal patterns are handled, diagonal and corner detection are left out.
//! Texture slots and the push constant block match what the SMAA passes bind.

use std::collections::HashMap;

use anyhow::Context;
use ash::vk;

use raven_rhi::backend::soft::{FragmentInput, SoftDevice};
use raven_rhi::backend::{ImageDesc, ImageView, RenderDevice};

use crate::asset::{BuiltinAssets, SMAA_AREA_TEXTURE, SMAA_SEARCH_TEXTURE};
use crate::renderer::smaa_renderer::{
    SMAA_BLEND_WEIGHT_SHADERS, SMAA_EDGE_DETECTION_SHADERS, SMAA_NEIGHBOR_BLEND_SHADERS,
};

pub const EDGE_THRESHOLD: f32 = 0.1;
pub const LOCAL_CONTRAST_ADAPTATION_FACTOR: f32 = 2.0;
pub const MAX_SEARCH_STEPS: i32 = 16;

/// Distances per crossing pattern along one axis of the area table.
pub const AREA_TABLE_STRIDE: u32 = MAX_SEARCH_STEPS as u32 + 1;
/// Crossing patterns are 0 (none), 1 (current side), 3 (opposite side) and 4 (both).
pub const AREA_TABLE_EXTENT: [u32; 2] = [5 * AREA_TABLE_STRIDE, 5 * AREA_TABLE_STRIDE];
pub const SEARCH_TABLE_EXTENT: [u32; 2] = [2, 2];

const AREA_SAMPLES: u32 = 32;

#[inline]
fn luma(color: [f32; 4]) -> f32 {
    0.2126 * color[0] + 0.7152 * color[1] + 0.0722 * color[2]
}

#[inline]
fn step(edge: f32, value: f32) -> f32 {
    if value >= edge { 1.0 } else { 0.0 }
}

/// Size of the render target from the pushed `rt_metrics`, the render area otherwise.
fn target_size(input: &FragmentInput) -> [i32; 2] {
    match input.push_constants::<[f32; 4]>() {
        Some(metrics) => [metrics[2] as i32, metrics[3] as i32],
        None => [input.extent[0] as i32, input.extent[1] as i32],
    }
}

/// Luma edge detection. Writes `(left, top)` edges and discards pixels without any.
pub fn edge_detection(input: &FragmentInput) -> Option<[f32; 4]> {
    let luma_at = |dx: i32, dy: i32| luma(input.fetch_offset(0, [dx, dy]));

    let center = luma_at(0, 0);
    let left = luma_at(-1, 0);
    let top = luma_at(0, -1);

    let delta = [(center - left).abs(), (center - top).abs()];
    let mut edges = [step(EDGE_THRESHOLD, delta[0]), step(EDGE_THRESHOLD, delta[1])];
    if edges == [0.0, 0.0] {
        return None;
    }

    // local contrast adaptation
    let max_delta = delta[0]
        .max(delta[1])
        .max((center - luma_at(1, 0)).abs())
        .max((center - luma_at(0, 1)).abs());
    let final_delta = max_delta
        .max((left - luma_at(-2, 0)).abs())
        .max((top - luma_at(0, -2)).abs());

    for (edge, delta) in edges.iter_mut().zip(delta) {
        if LOCAL_CONTRAST_ADAPTATION_FACTOR * delta < final_delta {
            *edge = 0.0;
        }
    }
    if edges == [0.0, 0.0] {
        return None;
    }

    Some([edges[0], edges[1], 0.0, 0.0])
}

/// Blend weights of the top edge in `rg` and of the left edge in `ba`.
/// `r`/`b` are the coverage of this pixel, `g`/`a` the coverage of the neighbor across the edge.
pub fn blend_weight(input: &FragmentInput) -> Option<[f32; 4]> {
    let [width, height] = target_size(input);
    let [x, y] = [input.coord[0] as i32, input.coord[1] as i32];

    let edge = |x: i32, y: i32, channel: usize| {
        x >= 0 && x < width && y >= 0 && y < height && input.fetch(0, x, y)[channel] > 0.5
    };
    let left_edge = |x: i32, y: i32| edge(x, y, 0);
    let top_edge = |x: i32, y: i32| edge(x, y, 1);

    let crossing = |current_side: bool, opposite_side: bool| {
        let encoded = input.fetch(2, current_side as i32, opposite_side as i32)[0];
        (encoded * 4.0).round() as i32
    };
    let lookup_area = |e1: i32, e2: i32, d1: i32, d2: i32| {
        let stride = AREA_TABLE_STRIDE as i32;
        input.fetch(1, e1 * stride + d1, e2 * stride + d2)
    };

    let mut weights = [0.0; 4];

    if top_edge(x, y) {
        let mut d1 = 0;
        while d1 < MAX_SEARCH_STEPS && top_edge(x - d1 - 1, y) {
            d1 += 1;
        }
        let mut d2 = 0;
        while d2 < MAX_SEARCH_STEPS && top_edge(x + d2 + 1, y) {
            d2 += 1;
        }

        let e1 = crossing(left_edge(x - d1, y), left_edge(x - d1, y - 1));
        let e2 = crossing(left_edge(x + d2 + 1, y), left_edge(x + d2 + 1, y - 1));
        let area = lookup_area(e1, e2, d1, d2);
        weights[0] = area[0];
        weights[1] = area[1];
    }

    if left_edge(x, y) {
        let mut d1 = 0;
        while d1 < MAX_SEARCH_STEPS && left_edge(x, y - d1 - 1) {
            d1 += 1;
        }
        let mut d2 = 0;
        while d2 < MAX_SEARCH_STEPS && left_edge(x, y + d2 + 1) {
            d2 += 1;
        }

        let e1 = crossing(top_edge(x, y - d1), top_edge(x - 1, y - d1));
        let e2 = crossing(top_edge(x, y + d2 + 1), top_edge(x - 1, y + d2 + 1));
        let area = lookup_area(e1, e2, d1, d2);
        weights[2] = area[0];
        weights[3] = area[1];
    }

    Some(weights)
}

/// Blend every pixel with its neighbors along the dominant edge direction.
pub fn neighbor_blend(input: &FragmentInput) -> Option<[f32; 4]> {
    let [width, height] = target_size(input);
    let [x, y] = [input.coord[0] as i32, input.coord[1] as i32];

    let weight = |x: i32, y: i32, channel: usize| {
        if x < width && y < height {
            input.fetch(1, x, y)[channel]
        } else {
            0.0
        }
    };

    let top = weight(x, y, 0);
    let bottom = weight(x, y + 1, 1);
    let left = weight(x, y, 2);
    let right = weight(x + 1, y, 3);

    let color = input.fetch_offset(0, [0, 0]);
    if top + bottom + left + right == 0.0 {
        return Some(color);
    }

    let (w1, c1, w2, c2) = if top.max(bottom) >= left.max(right) {
        (top, input.fetch_offset(0, [0, -1]), bottom, input.fetch_offset(0, [0, 1]))
    } else {
        (left, input.fetch_offset(0, [-1, 0]), right, input.fetch_offset(0, [1, 0]))
    };

    let mut blended = [0.0; 4];
    for i in 0..4 {
        blended[i] = color[i] * (1.0 - w1 - w2) + c1[i] * w1 + c2[i] * w2;
    }
    Some(blended)
}

/// Coverage `[current, opposite]` of the pixel `d1` steps from the start of an edge line
/// with `d2` more pixels after it, `e1`/`e2` being the crossing patterns at both ends.
pub fn area(e1: u32, e2: u32, d1: u32, d2: u32) -> [f32; 2] {
    let end_height = |e: u32| match e {
        1 => 0.5,
        3 => -0.5,
        _ => 0.0,
    };
    let (h1, h2) = (end_height(e1), end_height(e2));

    let length = (d1 + d2 + 1) as f32;
    let half = length * 0.5;
    let silhouette = |t: f32| {
        if h1 * h2 < 0.0 {
            // Z shape
            h1 + (h2 - h1) * t / length
        } else if t <= half {
            h1 * (1.0 - t / half)
        } else {
            h2 * (t - half) / half
        }
    };

    let mut coverage = [0.0_f32; 2];
    for sample in 0..AREA_SAMPLES {
        let t = d1 as f32 + (sample as f32 + 0.5) / AREA_SAMPLES as f32;
        let height = silhouette(t);

        if height > 0.0 {
            coverage[0] += height / AREA_SAMPLES as f32;
        } else {
            coverage[1] -= height / AREA_SAMPLES as f32;
        }
    }

    [coverage[0].min(0.5), coverage[1].min(0.5)]
}

/// Texels of the area table, `(e1 * stride + d1, e2 * stride + d2)` holds `area(e1, e2, d1, d2)`.
pub fn area_table() -> Vec<[f32; 4]> {
    let [width, height] = AREA_TABLE_EXTENT;
    let mut texels = vec![[0.0, 0.0, 0.0, 1.0]; (width * height) as usize];

    for e1 in 0..5 {
        for e2 in 0..5 {
            for d1 in 0..AREA_TABLE_STRIDE {
                for d2 in 0..AREA_TABLE_STRIDE {
                    let x = e1 * AREA_TABLE_STRIDE + d1;
                    let y = e2 * AREA_TABLE_STRIDE + d2;
                    let [current, opposite] = area(e1, e2, d1, d2);

                    texels[(y * width + x) as usize] = [current, opposite, 0.0, 1.0];
                }
            }
        }
    }

    texels
}

/// Texels of the crossing edge decoder, `(current side, opposite side)` holds `pattern / 4`.
pub fn search_table() -> Vec<[f32; 4]> {
    let mut texels = Vec::with_capacity(4);

    for opposite_side in 0..2 {
        for current_side in 0..2 {
            let pattern = current_side + opposite_side * 3;
            texels.push([pattern as f32 / 4.0, 0.0, 0.0, 1.0]);
        }
    }

    texels
}

/// Use the reference programs for the SMAA shaders on `device`.
pub fn register_programs(device: &mut SoftDevice) {
    device.register_program(SMAA_EDGE_DETECTION_SHADERS.fragment, edge_detection);
    device.register_program(SMAA_BLEND_WEIGHT_SHADERS.fragment, blend_weight);
    device.register_program(SMAA_NEIGHBOR_BLEND_SHADERS.fragment, neighbor_blend);
}

/// Built-in textures living on a soft device.
pub struct ReferenceAssets {
    textures: HashMap<&'static str, ImageView>,
}

impl ReferenceAssets {
    /// Upload the SMAA lookup tables to `device`.
    pub fn new(device: &mut SoftDevice) -> anyhow::Result<Self> {
        let mut textures = HashMap::new();

        let tables: [(&'static str, [u32; 2], vk::Format, Vec<[f32; 4]>); 2] = [
            (SMAA_AREA_TEXTURE, AREA_TABLE_EXTENT, vk::Format::R8G8_UNORM, area_table()),
            (SMAA_SEARCH_TEXTURE, SEARCH_TABLE_EXTENT, vk::Format::R8_UNORM, search_table()),
        ];

        for (path, extent, format, texels) in tables {
            let view = device.create_image(ImageDesc::new_2d(extent, format), path)?;
            device.upload(view.handle, &texels)
                .with_context(|| format!("Failed to upload {}", path))?;

            textures.insert(path, view);
        }

        Ok(Self { textures })
    }
}

impl BuiltinAssets for ReferenceAssets {
    fn request_texture(&self, path: &str) -> anyhow::Result<ImageView> {
        self.textures.get(path)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown builtin texture {}", path))
    }
}
