//! Histogram adjustment: global equalization and CLAHE.
//!
//! Both variants derive a single-channel image internally and return a
//! single-channel output of identical dimensions. CLAHE is implemented
//! here directly (tile histograms with clip-and-redistribute, bilinear
//! blending between tile mappings) since `imageproc` only ships the global
//! variant.

use crate::buffer::RasterBuffer;
use crate::core::Result;
use image::GrayImage;
use imageproc::contrast::equalize_histogram;

/// CLAHE contrast clip limit, relative to a uniform histogram.
const CLAHE_CLIP_LIMIT: f32 = 2.0;
/// CLAHE tile grid (columns, rows).
const CLAHE_TILES: (u32, u32) = (8, 8);

/// Global histogram equalization.
pub fn equalize(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    Ok(RasterBuffer::Gray(equalize_histogram(&gray)))
}

/// Contrast-limited adaptive histogram equalization.
pub fn clahe(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    Ok(RasterBuffer::Gray(clahe_gray(
        &gray,
        CLAHE_CLIP_LIMIT,
        CLAHE_TILES,
    )))
}

/// Per-tile equalization lookup tables, blended bilinearly per pixel.
fn clahe_gray(gray: &GrayImage, clip_limit: f32, (tiles_x, tiles_y): (u32, u32)) -> GrayImage {
    let (width, height) = gray.dimensions();
    let tiles_x = tiles_x.min(width).max(1);
    let tiles_y = tiles_y.min(height).max(1);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    // One 256-entry mapping per tile.
    let mut mappings = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as u32;
            mappings[(ty * tiles_x + tx) as usize] = tile_mapping(&hist, area, clip_limit);
        }
    }

    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let v = pixel.0[0] as usize;

        // Position relative to tile centers, for bilinear blending.
        let fx = (x as f32 / tile_w as f32 - 0.5).clamp(0.0, tiles_x as f32 - 1.0);
        let fy = (y as f32 / tile_h as f32 - 0.5).clamp(0.0, tiles_y as f32 - 1.0);
        let tx0 = fx.floor() as u32;
        let ty0 = fy.floor() as u32;
        let tx1 = (tx0 + 1).min(tiles_x - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wx = fx - tx0 as f32;
        let wy = fy - ty0 as f32;

        let m00 = mappings[(ty0 * tiles_x + tx0) as usize][v] as f32;
        let m10 = mappings[(ty0 * tiles_x + tx1) as usize][v] as f32;
        let m01 = mappings[(ty1 * tiles_x + tx0) as usize][v] as f32;
        let m11 = mappings[(ty1 * tiles_x + tx1) as usize][v] as f32;

        let blended = m00 * (1.0 - wx) * (1.0 - wy)
            + m10 * wx * (1.0 - wy)
            + m01 * (1.0 - wx) * wy
            + m11 * wx * wy;
        out.put_pixel(x, y, image::Luma([blended.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Builds one tile's clipped-and-redistributed equalization table.
fn tile_mapping(hist: &[u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    // The absolute clip level scales with tile area, floored at 1.
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);

    let mut clipped = [0u32; 256];
    let mut excess = 0u32;
    for (bin, &count) in hist.iter().enumerate() {
        if count > limit {
            clipped[bin] = limit;
            excess += count - limit;
        } else {
            clipped[bin] = count;
        }
    }
    let bonus = excess / 256;
    for count in clipped.iter_mut() {
        *count += bonus;
    }

    let mut mapping = [0u8; 256];
    let mut cdf = 0u64;
    let total: u64 = clipped.iter().map(|&c| c as u64).sum();
    for (bin, &count) in clipped.iter().enumerate() {
        cdf += count as u64;
        mapping[bin] = if total > 0 {
            ((cdf * 255) / total) as u8
        } else {
            bin as u8
        };
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn low_contrast() -> RasterBuffer {
        // Values squeezed into 100..=140.
        RasterBuffer::from_rgb(RgbImage::from_fn(64, 64, |x, y| {
            let v = 100 + ((x + y) % 41) as u8;
            Rgb([v, v, v])
        }))
        .unwrap()
    }

    #[test]
    fn outputs_are_single_channel_same_shape() {
        let buffer = low_contrast();
        for out in [equalize(&buffer).unwrap(), clahe(&buffer).unwrap()] {
            assert_eq!(out.channels(), 1);
            assert_eq!(out.dimensions(), (64, 64));
        }
    }

    #[test]
    fn equalize_stretches_dynamic_range() {
        let out = equalize(&low_contrast()).unwrap();
        match out {
            RasterBuffer::Gray(img) => {
                let max = img.pixels().map(|p| p.0[0]).max().unwrap();
                let min = img.pixels().map(|p| p.0[0]).min().unwrap();
                assert!(max >= 250, "max after equalization: {}", max);
                assert!(max - min > 100, "range after equalization: {}", max - min);
            }
            _ => panic!("expected gray output"),
        }
    }

    #[test]
    fn clahe_stretches_local_contrast() {
        let out = clahe(&low_contrast()).unwrap();
        match out {
            RasterBuffer::Gray(img) => {
                let max = img.pixels().map(|p| p.0[0]).max().unwrap();
                let min = img.pixels().map(|p| p.0[0]).min().unwrap();
                assert!(max - min > 80, "range after clahe: {}", max - min);
            }
            _ => panic!("expected gray output"),
        }
    }

    #[test]
    fn clahe_is_deterministic() {
        let buffer = low_contrast();
        assert_eq!(clahe(&buffer).unwrap(), clahe(&buffer).unwrap());
    }

    #[test]
    fn clahe_handles_images_smaller_than_the_grid() {
        let tiny = RasterBuffer::from_gray(GrayImage::from_pixel(3, 3, Luma([9]))).unwrap();
        let out = clahe(&tiny).unwrap();
        assert_eq!(out.dimensions(), (3, 3));
    }
}
