use std::path::Path;

use anyhow::Context;

use crate::foundation::error::QuakereelResult;
use crate::plan::job::{FrameLayer, FrameParams};
use crate::render::backend::Renderer;
use crate::sequence::store::FrameStore;

const SKY: [u8; 3] = [120, 170, 220];
const GROUND: [u8; 3] = [110, 90, 70];
const SPACE: [u8; 3] = [16, 16, 24];
const MAP: [u8; 3] = [40, 60, 40];
const NEEDLE: [u8; 3] = [255, 255, 255];
const SCALE_BAR: [u8; 3] = [230, 230, 120];

/// Deterministic diagram of a frame's parameters, written as PNG.
///
/// The map occupies everything below a horizon placed by the tilt; under a virtual tilt the area
/// above the horizon is a sky over ground backdrop instead of empty space. The layer is a tint
/// over the map weighted by opacity, the azimuth a needle from the centre, `scale_t` and
/// `scale_x` bars along the top and bottom edges. Ground-motion frames composite the overlay for
/// their timestep when it exists.
#[derive(Clone, Debug)]
pub struct SchematicRenderer {
    width: u32,
    height: u32,
    store: FrameStore,
}

impl SchematicRenderer {
    /// Renderer reading overlays from `store`.
    pub fn new(store: FrameStore, width: u32, height: u32) -> Self {
        Self {
            width: width.max(8),
            height: height.max(8),
            store,
        }
    }

    fn horizon(&self, params: &FrameParams) -> u32 {
        let tilt = params
            .tilt
            .virtual_tilt
            .map(f64::to_degrees)
            .unwrap_or(params.tilt.render_tilt)
            .clamp(0.0, 90.0);
        let h = f64::from(self.height);
        (h * 0.5 * (1.0 - tilt / 90.0)).round() as u32
    }

    fn load_overlay(&self, params: &FrameParams) -> QuakereelResult<Option<image::GrayImage>> {
        let FrameLayer::GroundMotion { timestep, .. } = params.layer else {
            return Ok(None);
        };
        let path = self.store.overlay_path(timestep);
        if !path.exists() {
            return Ok(None);
        }
        let img = image::open(&path)
            .with_context(|| format!("read overlay '{}'", path.display()))?
            .to_luma8();
        Ok(Some(img))
    }
}

fn tint(layer: &FrameLayer) -> [u8; 3] {
    match layer {
        FrameLayer::Slip => [200, 80, 40],
        FrameLayer::SlipRate { .. } => [220, 140, 40],
        FrameLayer::GroundMotion { .. } => [60, 60, 200],
        FrameLayer::Hazard { overlay, .. } => {
            let h = overlay.bytes().fold(7u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b));
            [h, 255 - h, 128]
        }
        FrameLayer::PathNetwork { .. } => [240, 240, 240],
    }
}

fn mix(a: [u8; 3], b: [u8; 3], w: f64) -> [u8; 3] {
    let w = w.clamp(0.0, 1.0);
    let c = |x: u8, y: u8| (f64::from(x) * (1.0 - w) + f64::from(y) * w).round() as u8;
    [c(a[0], b[0]), c(a[1], b[1]), c(a[2], b[2])]
}

impl Renderer for SchematicRenderer {
    fn render(&self, params: &FrameParams, out: &Path) -> QuakereelResult<()> {
        let (w, h) = (self.width, self.height);
        let horizon = self.horizon(params);
        let backdrop = params.tilt.virtual_tilt.is_some();
        let opacity = 1.0 - params.transparency / 100.0;
        let layer_tint = tint(&params.layer);
        let overlay = self.load_overlay(params)?;
        let reveal = match params.layer {
            FrameLayer::PathNetwork { proportion, .. } => Some(proportion.clamp(0.0, 1.0)),
            _ => None,
        };

        let mut img = image::RgbImage::from_fn(w, h, |x, y| {
            if y < horizon {
                let px = if backdrop {
                    if y * 2 < horizon { SKY } else { GROUND }
                } else {
                    SPACE
                };
                return image::Rgb(px);
            }
            let mut px = mix(MAP, layer_tint, opacity);
            if let Some(p) = reveal
                && f64::from(x) > p * f64::from(w)
            {
                px = MAP;
            }
            if let Some(ov) = overlay.as_ref() {
                let ox = (u64::from(x) * u64::from(ov.width()) / u64::from(w)) as u32;
                let oy = (u64::from(y) * u64::from(ov.height()) / u64::from(h)) as u32;
                let v = f64::from(ov.get_pixel(ox, oy).0[0]) / 255.0;
                px = mix(px, [255, 40, 40], v * opacity);
            }
            image::Rgb(px)
        });

        let bar = |frac: f64| (frac.clamp(0.0, 1.0) * f64::from(w)).round() as u32;
        for x in 0..bar(params.scale_t) {
            img.put_pixel(x, 0, image::Rgb(SCALE_BAR));
            img.put_pixel(x, 1, image::Rgb(SCALE_BAR));
        }
        for x in 0..bar(params.scale_x) {
            img.put_pixel(x, h - 1, image::Rgb(SCALE_BAR));
            img.put_pixel(x, h - 2, image::Rgb(SCALE_BAR));
        }

        let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0);
        let len = cx.min(cy) * 0.8;
        let theta = params.camera.azimuth.to_radians();
        let steps = len.ceil() as u32;
        for s in 0..=steps {
            let r = f64::from(s);
            let x = cx + r * theta.sin();
            let y = cy - r * theta.cos();
            if x >= 0.0 && y >= 0.0 && (x as u32) < w && (y as u32) < h {
                img.put_pixel(x as u32, y as u32, image::Rgb(NEEDLE));
            }
        }

        img.save_with_format(out, image::ImageFormat::Png)
            .with_context(|| format!("write frame '{}'", out.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/schematic.rs"]
mod tests;
