// map.rs — 等距圆柱世界地图：读取与采样

use crate::error::MapError;
use crate::projection::TextureCoordinate;
use image::io::Reader as ImageReader;
use image::{GenericImageView, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

/// Source map, sampled with wrap-around on `s` and clamp on `t`.
#[derive(Debug, Clone)]
pub struct EquirectMap {
    image: RgbaImage,
}

impl EquirectMap {
    pub fn new(image: RgbaImage) -> Result<Self, MapError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(MapError::Empty);
        }
        let (w, h) = image.dimensions();
        if w != 2 * h {
            log::warn!("map is {w}x{h}, not 2:1; latitudes will be stretched");
        }
        Ok(Self { image })
    }

    pub fn open(path: &Path) -> Result<Self, MapError> {
        Self::new(decode_rgba(path)?)
    }

    /// Bilinear sample. `t = 1` reads the top row (north pole).
    pub fn sample(&self, coord: TextureCoordinate) -> Rgba<u8> {
        let (w, h) = self.image.dimensions();
        let x = coord.s * w as f32 - 0.5;
        let y = (1.0 - coord.t) * h as f32 - 0.5;

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let wrap = |i: f32| (i as i64).rem_euclid(w as i64) as u32;
        let clamp = |j: f32| (j as i64).clamp(0, h as i64 - 1) as u32;

        let (xa, xb) = (wrap(x0), wrap(x0 + 1.0));
        let (ya, yb) = (clamp(y0), clamp(y0 + 1.0));

        let p00 = self.image.get_pixel(xa, ya).0;
        let p10 = self.image.get_pixel(xb, ya).0;
        let p01 = self.image.get_pixel(xa, yb).0;
        let p11 = self.image.get_pixel(xb, yb).0;

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
            let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
            out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
        Rgba(out)
    }
}

/// Decode any supported image file to RGBA8 without the decoder's size limits.
pub fn decode_rgba(path: &Path) -> Result<RgbaImage, MapError> {
    let file = File::open(path).map_err(|source| MapError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let img = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|mut r| {
            r.no_limits();
            r.decode()
        })
        .map_err(|source| MapError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let (w, h) = img.dimensions();
    log::info!("loaded map {} ({w}x{h})", path.display());
    Ok(img.to_rgba8())
}

/// Decode `path` on a worker thread. The outcome is always sent, so the receiver
/// learns about failures as well as finished maps.
pub fn load_in_background(
    path: PathBuf,
    tx: Sender<Result<RgbaImage, MapError>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        log::info!("loading map {} in background", path.display());
        let result = decode_rgba(&path);
        if let Err(e) = &result {
            log::error!("{e}");
        }
        if tx.send(result).is_err() {
            log::error!("viewer closed before map finished loading");
        }
    })
}

/// Shrink `img` so neither side exceeds `max_dimension`, keeping the aspect ratio.
pub fn fit_within(img: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    if src_w <= max_dimension && src_h <= max_dimension {
        return img;
    }
    let scale = (max_dimension as f32 / src_w.max(src_h) as f32).min(1.0);
    let new_w = ((src_w as f32 * scale) as u32).max(1);
    let new_h = ((src_h as f32 * scale) as u32).max(1);
    log::warn!("map {src_w}x{src_h} exceeds {max_dimension}, scaled to {new_w}x{new_h}");
    image::DynamicImage::ImageRgba8(img)
        .resize(new_w, new_h, image::imageops::FilterType::Lanczos3)
        .to_rgba8()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped() -> EquirectMap {
        // 4x2: left half red, right half blue; bottom row darker
        let img = RgbaImage::from_fn(4, 2, |x, y| {
            let v = if y == 0 { 200 } else { 100 };
            if x < 2 {
                Rgba([v, 0, 0, 255])
            } else {
                Rgba([0, 0, v, 255])
            }
        });
        EquirectMap::new(img).unwrap()
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(matches!(
            EquirectMap::new(RgbaImage::new(0, 0)),
            Err(MapError::Empty)
        ));
    }

    #[test]
    fn texel_centers_sample_exactly() {
        let map = striped();
        let c = map.sample(TextureCoordinate { s: 0.125, t: 0.75 });
        assert_eq!(c, Rgba([200, 0, 0, 255]));
        let c = map.sample(TextureCoordinate { s: 0.625, t: 0.25 });
        assert_eq!(c, Rgba([0, 0, 100, 255]));
    }

    #[test]
    fn s_wraps_across_the_seam() {
        let map = striped();
        // halfway between the last column (blue) and the first (red)
        let c = map.sample(TextureCoordinate { s: 0.0, t: 0.75 });
        assert_eq!(c, Rgba([100, 0, 100, 255]));
    }

    #[test]
    fn t_clamps_at_poles() {
        let map = striped();
        let north = map.sample(TextureCoordinate { s: 0.125, t: 1.0 });
        let south = map.sample(TextureCoordinate { s: 0.125, t: 0.0 });
        assert_eq!(north, Rgba([200, 0, 0, 255]));
        assert_eq!(south, Rgba([100, 0, 0, 255]));
    }

    #[test]
    fn fit_within_keeps_small_images() {
        let img = RgbaImage::new(8, 4);
        assert_eq!(fit_within(img, 16).dimensions(), (8, 4));
        let img = RgbaImage::new(64, 32);
        assert_eq!(fit_within(img, 16).dimensions(), (16, 8));
    }

    #[test]
    fn background_load_reports_failure() {
        let missing = std::env::temp_dir().join("globe_projection_missing_bg_map.png");
        let (tx, rx) = std::sync::mpsc::channel();
        load_in_background(missing, tx).join().unwrap();
        assert!(matches!(rx.recv().unwrap(), Err(MapError::Open { .. })));
    }

    #[test]
    fn background_load_delivers_decoded_map() {
        let path = std::env::temp_dir().join(format!(
            "globe_projection_bg_map_{}.png",
            std::process::id()
        ));
        RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        load_in_background(path.clone(), tx).join().unwrap();
        let img = rx.recv().unwrap().unwrap();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(*img.get_pixel(3, 2), Rgba([10, 20, 30, 255]));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn open_reports_missing_file() {
        let missing = std::env::temp_dir().join("globe_projection_missing_map.png");
        assert!(matches!(
            EquirectMap::open(&missing),
            Err(MapError::Open { .. })
        ));
    }
}
