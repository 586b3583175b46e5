// raster.rs — CPU 端逐像素执行投影核心，生成展开后的圆柱贴图

use crate::map::EquirectMap;
use crate::projection::{project, CylinderUv, ParameterSet};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Cylinder coordinate at the center of texel `(x, y)`. Row 0 is the top rim.
pub fn texel_uv(x: u32, y: u32, width: u32, height: u32) -> CylinderUv {
    CylinderUv::new(
        (x as f32 + 0.5) / width as f32,
        1.0 - (y as f32 + 0.5) / height as f32,
    )
}

/// Evaluate the kernel for every texel. Rows run in parallel; texels never share state.
pub fn render(
    params: &ParameterSet,
    map: &EquirectMap,
    width: u32,
    height: u32,
    void_color: Rgba<u8>,
) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }
    let row_len = width as usize * 4;

    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                let uv = texel_uv(x as u32, y as u32, width, height);
                let color = match project(uv, params) {
                    Some(coord) => map.sample(coord),
                    None => void_color,
                };
                texel.copy_from_slice(&color.0);
            }
        });

    out
}

/// Projected texture owned by the CPU renderer; every refresh re-renders it in full.
#[derive(Debug)]
pub struct ProjectedTexture {
    map: EquirectMap,
    image: RgbaImage,
    void_color: Rgba<u8>,
    generation: u64,
}

impl ProjectedTexture {
    pub fn new(map: EquirectMap, width: u32, height: u32, void_color: Rgba<u8>) -> Self {
        Self {
            map,
            image: RgbaImage::from_pixel(width, height, void_color),
            void_color,
            generation: 0,
        }
    }

    pub fn refresh(&mut self, params: &ParameterSet) {
        let (w, h) = self.image.dimensions();
        self.image = render(params, &self.map, w, h, self.void_color);
        self.generation += 1;
        log::debug!("projected texture refreshed (generation {})", self.generation);
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Number of completed refreshes.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
