//! Convolution and denoising filters.
//!
//! All filters preserve dimensions and channel count. Kernel and window
//! sizes are validated upstream to be positive odd integers; the sigma for
//! Gaussian kernels is derived from the kernel size with the conventional
//! `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule.

use crate::buffer::RasterBuffer;
use crate::core::Result;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::filter::{bilateral_filter, filter3x3, gaussian_blur_f32, median_filter};

/// 3x3 sharpening kernel (unsharp center-weighted).
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian blur with a `kernel_size` x `kernel_size` kernel.
pub fn blur(buffer: &RasterBuffer, kernel_size: u32) -> Result<RasterBuffer> {
    let sigma = sigma_for_kernel(kernel_size);
    let out = match buffer {
        RasterBuffer::Gray(img) => RasterBuffer::Gray(gaussian_blur_f32(img, sigma)),
        RasterBuffer::Rgb(img) => RasterBuffer::Rgb(gaussian_blur_f32(img, sigma)),
    };
    Ok(out)
}

/// Sharpens with the fixed 3x3 kernel.
pub fn sharpen(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let out = match buffer {
        RasterBuffer::Gray(img) => {
            RasterBuffer::Gray(filter3x3::<_, f32, u8>(img, &SHARPEN_KERNEL))
        }
        RasterBuffer::Rgb(img) => {
            RasterBuffer::Rgb(filter3x3::<_, f32, u8>(img, &SHARPEN_KERNEL))
        }
    };
    Ok(out)
}

/// Edge-preserving bilateral filter.
///
/// Color input is filtered per channel with shared spatial and range
/// sigmas.
pub fn bilateral(
    buffer: &RasterBuffer,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> Result<RasterBuffer> {
    let out = match buffer {
        RasterBuffer::Gray(img) => {
            RasterBuffer::Gray(bilateral_filter(img, diameter, sigma_color, sigma_space))
        }
        RasterBuffer::Rgb(img) => {
            let channels = split_channels(img);
            let filtered: Vec<GrayImage> = channels
                .iter()
                .map(|c| bilateral_filter(c, diameter, sigma_color, sigma_space))
                .collect();
            RasterBuffer::Rgb(merge_channels(&filtered[0], &filtered[1], &filtered[2]))
        }
    };
    Ok(out)
}

/// Median filter over a `kernel_size` x `kernel_size` window.
pub fn median(buffer: &RasterBuffer, kernel_size: u32) -> Result<RasterBuffer> {
    let radius = kernel_size / 2;
    let out = match buffer {
        RasterBuffer::Gray(img) => RasterBuffer::Gray(median_filter(img, radius, radius)),
        RasterBuffer::Rgb(img) => RasterBuffer::Rgb(median_filter(img, radius, radius)),
    };
    Ok(out)
}

fn split_channels(img: &RgbImage) -> [GrayImage; 3] {
    let (w, h) = img.dimensions();
    let mut channels = [GrayImage::new(w, h), GrayImage::new(w, h), GrayImage::new(w, h)];
    for (x, y, pixel) in img.enumerate_pixels() {
        for (c, channel) in channels.iter_mut().enumerate() {
            channel.put_pixel(x, y, image::Luma([pixel.0[c]]));
        }
    }
    channels
}

fn merge_channels(r: &GrayImage, g: &GrayImage, b: &GrayImage) -> RgbImage {
    RgbImage::from_fn(r.width(), r.height(), |x, y| {
        Rgb([
            r.get_pixel(x, y).0[0],
            g.get_pixel(x, y).0[0],
            b.get_pixel(x, y).0[0],
        ])
    })
}
