//! Image backend implementation, on top of libvips.
//!
//! Photos are handled as 3-band 8-bit sRGB images, frame templates as 4-band
//! 8-bit sRGBA images. Every operation returns a new image; inputs are never
//! modified.

mod color;

pub use crate::image::color::Color;

use crate::error::{Error, Result};
use crate::layout::{CropRect, SlotRect};

use libvips::{ops, VipsApp, VipsImage};
use std::path::Path;
use std::sync::OnceLock;

static VIPS: OnceLock<std::result::Result<VipsApp, String>> = OnceLock::new();

fn vips_app() -> Result<&'static VipsApp> {
    VIPS.get_or_init(|| VipsApp::default("collagist").map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| Error::VipsError(e.clone()))
}

/// Handle to the image library.
///
/// libvips is initialized once per process and never shut down, so backends
/// are cheap to create and can be shared between threads.
#[derive(Clone, Copy)]
pub struct ImgBackend {
    vips_app: &'static VipsApp,
}

impl ImgBackend {
    pub fn new() -> Result<Self> {
        Ok(Self { vips_app: vips_app()? })
    }

    pub fn err(&self, e: libvips::error::Error) -> Error {
        let buffer = self.vips_app.error_buffer().unwrap_or("").trim().to_string();
        self.vips_app.error_clear();
        if buffer.is_empty() {
            Error::VipsError(e.to_string())
        } else {
            Error::VipsError(format!("{e}\n{buffer}"))
        }
    }

    /// Casts to 8-bit sRGB. Wider integer formats are shifted down, not clamped.
    fn reinterpret(&self, img: &VipsImage) -> Result<VipsImage> {
        let img = ops::cast_with_opts(img, ops::BandFormat::Uchar, &ops::CastOptions { shift: true })
            .map_err(|e| self.err(e))?;
        ops::copy_with_opts(
            &img,
            &ops::CopyOptions {
                interpretation: ops::Interpretation::Srgb,
                width: img.get_width(),
                height: img.get_height(),
                bands: img.get_bands(),
                format: ops::BandFormat::Uchar,
                ..Default::default()
            },
        )
        .map_err(|e| self.err(e))
    }

    /// Reduces any image to 3-band sRGB, dropping alpha and expanding grey.
    pub fn to_rgb(&self, img: &VipsImage) -> Result<VipsImage> {
        let img = match img.get_bands() {
            1 | 2 => {
                let grey = ops::extract_band(img, 0).map_err(|e| self.err(e))?;
                let g = ops::copy(&grey).map_err(|e| self.err(e))?;
                let b = ops::copy(&grey).map_err(|e| self.err(e))?;
                ops::bandjoin(&mut [grey, g, b]).map_err(|e| self.err(e))?
            }
            3 => ops::copy(img).map_err(|e| self.err(e))?,
            _ => ops::extract_band_with_opts(img, 0, &ops::ExtractBandOptions { n: 3 })
                .map_err(|e| self.err(e))?,
        };
        self.reinterpret(&img)
    }

    /// Reduces any image to 8-bit sRGB, keeping an alpha band if there is one.
    pub fn to_rgba_or_rgb(&self, img: &VipsImage) -> Result<VipsImage> {
        match img.get_bands() {
            2 => {
                let rgb = self.to_rgb(img)?;
                let alpha = ops::extract_band(img, 1).map_err(|e| self.err(e))?;
                let alpha = self.reinterpret(&alpha)?;
                let img = ops::bandjoin(&mut [rgb, alpha]).map_err(|e| self.err(e))?;
                self.reinterpret(&img)
            }
            b if b >= 4 => {
                let img = ops::extract_band_with_opts(img, 0, &ops::ExtractBandOptions { n: 4 })
                    .map_err(|e| self.err(e))?;
                self.reinterpret(&img)
            }
            _ => self.to_rgb(img),
        }
    }

    /// Opens a photo as 3-band sRGB.
    pub fn open_photo(&self, fp: impl AsRef<Path>) -> Result<VipsImage> {
        let img = self.load(fp)?;
        self.to_rgb(&img)
    }

    /// Opens a frame template, keeping its alpha band.
    pub fn open_frame(&self, fp: impl AsRef<Path>) -> Result<VipsImage> {
        let img = self.load(fp)?;
        self.to_rgba_or_rgb(&img)
    }

    fn load(&self, fp: impl AsRef<Path>) -> Result<VipsImage> {
        let fp = fp.as_ref().to_string_lossy();
        let mut img = VipsImage::new_from_file(&fp).map_err(|e| self.err(e))?;
        img.image_wio_input().map_err(|e| self.err(e))?;
        Ok(img)
    }

    /// Builds a photo from packed 8-bit RGB rows, as delivered by a camera.
    pub fn from_rgb_bytes(&self, buffer: &[u8], width: u32, height: u32) -> Result<VipsImage> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || buffer.len() != expected {
            return Err(Error::VipsError(format!(
                "expected {expected} bytes for a {width}x{height} RGB frame, got {}",
                buffer.len()
            )));
        }
        let img = VipsImage::new_from_memory(
            buffer,
            width as i32,
            height as i32,
            3,
            ops::BandFormat::Uchar,
        )
        .map_err(|e| self.err(e))?;
        let img = VipsImage::image_copy_memory(img).map_err(|e| self.err(e))?;
        self.reinterpret(&img)
    }

    /// Solid 3-band canvas.
    pub fn new_canvas(&self, bg: &Color, width: u32, height: u32) -> Result<VipsImage> {
        let img = ops::black_with_opts(width as i32, height as i32, &ops::BlackOptions { bands: 3 })
            .map_err(|e| self.err(e))?;
        let img = VipsImage::new_from_image(&img, &bg.bands3()).map_err(|e| self.err(e))?;
        self.reinterpret(&img)
    }

    /// Solid 4-band canvas; colors without alpha are opaque.
    pub fn new_rgba_canvas(&self, color: &Color, width: u32, height: u32) -> Result<VipsImage> {
        let img = ops::black_with_opts(width as i32, height as i32, &ops::BlackOptions { bands: 4 })
            .map_err(|e| self.err(e))?;
        let img = VipsImage::new_from_image(&img, &color.bands4()).map_err(|e| self.err(e))?;
        self.reinterpret(&img)
    }

    pub fn crop(&self, img: &VipsImage, rect: CropRect) -> Result<VipsImage> {
        ops::extract_area(
            img,
            rect.x as i32,
            rect.y as i32,
            rect.width as i32,
            rect.height as i32,
        )
        .map_err(|e| self.err(e))
    }

    /// Resizes to exactly `width × height`, without keeping the aspect ratio.
    ///
    /// libvips rounds the scaled size, so the result is edge-extended or
    /// clipped to the requested size afterwards.
    pub fn resize_exact(&self, img: &VipsImage, width: u32, height: u32) -> Result<VipsImage> {
        let (iw, ih) = (img.get_width(), img.get_height());
        let img = if (iw, ih) == (width as i32, height as i32) {
            ops::copy(img).map_err(|e| self.err(e))?
        } else {
            let sx = width as f64 / iw as f64;
            let sy = height as f64 / ih as f64;
            ops::resize_with_opts(
                img,
                sx,
                &ops::ResizeOptions {
                    vscale: sy,
                    kernel: ops::Kernel::Linear,
                    ..Default::default()
                },
            )
            .map_err(|e| self.err(e))?
        };
        if (img.get_width(), img.get_height()) == (width as i32, height as i32) {
            return self.reinterpret(&img);
        }
        let img = ops::embed_with_opts(
            &img,
            0,
            0,
            width as i32,
            height as i32,
            &ops::EmbedOptions {
                extend: ops::Extend::Copy,
                ..Default::default()
            },
        )
        .map_err(|e| self.err(e))?;
        self.reinterpret(&img)
    }

    /// Draws `src` over `base` with its top-left corner at `(x, y)`.
    pub fn insert(&self, base: &VipsImage, src: &VipsImage, x: u32, y: u32) -> Result<VipsImage> {
        ops::insert(base, src, x as i32, y as i32).map_err(|e| self.err(e))
    }

    /// Fills a slot-shaped area of `base` with `color`.
    pub fn fill(&self, base: &VipsImage, rect: SlotRect, color: &Color) -> Result<VipsImage> {
        let patch = if base.get_bands() >= 4 {
            self.new_rgba_canvas(color, rect.width, rect.height)?
        } else {
            self.new_canvas(color, rect.width, rect.height)?
        };
        self.insert(base, &patch, rect.x, rect.y)
    }

    /// Alpha-composites a 4-band `fg` over a 3-band `base` of the same size.
    ///
    /// Computes `(fg·a + base·(255 − a)) / 255` per band, which is exact
    /// wherever `a` is 0 or 255.
    pub fn blend_over(&self, base: &VipsImage, fg: &VipsImage) -> Result<VipsImage> {
        let rgb = ops::extract_band_with_opts(fg, 0, &ops::ExtractBandOptions { n: 3 })
            .map_err(|e| self.err(e))?;
        let alpha = ops::extract_band(fg, 3).map_err(|e| self.err(e))?;
        let inv_alpha = ops::linear(&alpha, &mut [-1.0], &mut [255.0]).map_err(|e| self.err(e))?;
        let fg_part = ops::multiply(&rgb, &alpha).map_err(|e| self.err(e))?;
        let bg_part = ops::multiply(base, &inv_alpha).map_err(|e| self.err(e))?;
        let sum = ops::add(&fg_part, &bg_part).map_err(|e| self.err(e))?;
        let scale = VipsImage::new_from_image1(&sum, 255.0).map_err(|e| self.err(e))?;
        let img = ops::divide(&sum, &scale).map_err(|e| self.err(e))?;
        self.reinterpret(&img)
    }

    /// Packed pixel bytes, row by row.
    pub fn pixels(&self, img: &VipsImage) -> Vec<u8> {
        img.image_write_to_memory()
    }

    /// Encodes an image in memory, the format following `suffix` (".jpg", ".png", ...).
    pub fn encode(&self, img: &VipsImage, suffix: &str) -> Result<Vec<u8>> {
        img.image_write_to_buffer(suffix).map_err(|e| self.err(e))
    }

    /// Writes an image to disk, the format following the file extension.
    pub fn write(&self, img: &VipsImage, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_string_lossy();
        img.image_write_to_file(&path).map_err(|e| self.err(e))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn pixel_at(ib: &ImgBackend, img: &VipsImage, x: u32, y: u32) -> Vec<u8> {
        let bands = img.get_bands() as usize;
        let width = img.get_width() as usize;
        let buf = ib.pixels(img);
        let i = (y as usize * width + x as usize) * bands;
        buf[i..i + bands].to_vec()
    }

    #[test]
    fn canvas_is_solid() {
        let ib = ImgBackend::new().unwrap();
        let img = ib.new_canvas(&Color::rgb(10, 20, 30), 7, 5).unwrap();
        assert_eq!((img.get_width(), img.get_height(), img.get_bands()), (7, 5, 3));
        assert!(ib.pixels(&img).chunks(3).all(|p| p == [10, 20, 30]));
    }

    #[test]
    fn resize_hits_exact_size() {
        let ib = ImgBackend::new().unwrap();
        let img = ib.new_canvas(&Color::rgb(200, 100, 50), 1280, 855).unwrap();
        for (w, h) in [(419, 280), (586, 397), (1, 1), (2000, 1500)] {
            let out = ib.resize_exact(&img, w, h).unwrap();
            assert_eq!((out.get_width(), out.get_height()), (w as i32, h as i32));
            assert_eq!(pixel_at(&ib, &out, w / 2, h / 2), vec![200, 100, 50]);
        }
    }

    #[test]
    fn raw_rgb_frame_round_trips_pixels() {
        let ib = ImgBackend::new().unwrap();
        let buf: Vec<u8> = (0..4 * 3 * 3).map(|i| i as u8).collect();
        let img = ib.from_rgb_bytes(&buf, 4, 3).unwrap();
        assert_eq!(ib.pixels(&img), buf);
        assert!(ib.from_rgb_bytes(&buf[1..], 4, 3).is_err());
    }

    #[test]
    fn grey_and_alpha_photos_become_rgb() {
        let ib = ImgBackend::new().unwrap();
        let rgba = ib.new_rgba_canvas(&Color::rgba(1, 2, 3, 4), 3, 3).unwrap();
        let rgb = ib.to_rgb(&rgba).unwrap();
        assert_eq!(rgb.get_bands(), 3);
        assert_eq!(pixel_at(&ib, &rgb, 1, 1), vec![1, 2, 3]);

        let grey = ops::extract_band(&rgba, 2).unwrap();
        let rgb = ib.to_rgb(&grey).unwrap();
        assert_eq!(pixel_at(&ib, &rgb, 0, 0), vec![3, 3, 3]);
    }

    #[test]
    fn sixteen_bit_images_are_scaled_down() {
        let ib = ImgBackend::new().unwrap();
        let rgba = ib.new_rgba_canvas(&Color::rgba(200, 100, 0, 255), 3, 3).unwrap();
        let wide = ops::linear(&rgba, &mut [257.0], &mut [0.0]).unwrap();
        let wide = ops::cast(&wide, ops::BandFormat::Ushort).unwrap();

        let rgb = ib.to_rgb(&wide).unwrap();
        assert_eq!(pixel_at(&ib, &rgb, 1, 1), vec![200, 100, 0]);
        let frame = ib.to_rgba_or_rgb(&wide).unwrap();
        assert_eq!(pixel_at(&ib, &frame, 1, 1), vec![200, 100, 0, 255]);
    }

    #[test]
    fn blend_respects_alpha_extremes() {
        let ib = ImgBackend::new().unwrap();
        let base = ib.new_canvas(&Color::rgb(10, 20, 30), 4, 2).unwrap();
        let clear = ib.new_rgba_canvas(&Color::rgba(255, 0, 0, 0), 4, 1).unwrap();
        let solid = ib.new_rgba_canvas(&Color::rgba(255, 0, 0, 255), 4, 1).unwrap();
        let frame = ib.new_rgba_canvas(&Color::TRANSPARENT, 4, 2).unwrap();
        let frame = ib.insert(&frame, &clear, 0, 0).unwrap();
        let frame = ib.insert(&frame, &solid, 0, 1).unwrap();

        let out = ib.blend_over(&base, &frame).unwrap();
        assert_eq!(out.get_bands(), 3);
        assert_eq!(pixel_at(&ib, &out, 2, 0), vec![10, 20, 30]);
        assert_eq!(pixel_at(&ib, &out, 2, 1), vec![255, 0, 0]);
    }
}
