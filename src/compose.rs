//! Collage compositing.
//!
//! [`Compositor::compose`] places photos into the slots of a layout: each photo
//! is center-cropped to its slot's aspect ratio, resized to the exact slot size
//! and drawn onto a fresh canvas. [`Compositor::overlay`] then draws a frame
//! template over a finished collage. The compositor keeps no state between
//! calls; the [`Collage`] it returns keeps the unframed image so any number
//! of frames can be tried on it without recomposing.

use crate::error::{Error, Result};
use crate::image::{Color, ImgBackend};
use crate::layout::{center_crop, LayoutGeometry, SlotRect};

use libvips::VipsImage;

#[derive(Clone, Copy)]
pub struct Compositor<'a> {
    backend: &'a ImgBackend,
    background: Color,
}

/// A composed collage, before any frame is applied.
pub struct Collage {
    image: VipsImage,
    geometry: LayoutGeometry,
    slots: Vec<SlotRect>,
}

impl<'a> Compositor<'a> {
    pub fn new(backend: &'a ImgBackend) -> Self {
        Self { backend, background: Color::BLACK }
    }

    /// Sets the color of canvas pixels outside every slot.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn backend(&self) -> &'a ImgBackend {
        self.backend
    }

    /// Composes `photos` into `geometry`, the i-th photo going into the i-th slot.
    ///
    /// Fails with [`Error::InvalidGeometry`] or [`Error::SlotCountMismatch`]
    /// before any pixel is touched.
    pub fn compose(&self, photos: &[VipsImage], geometry: &LayoutGeometry) -> Result<Collage> {
        let slots = geometry.slots()?;
        if photos.len() != slots.len() {
            return Err(Error::slot_count(slots.len(), photos.len()));
        }
        if let Some(i) = photos.iter().position(|p| p.get_width() <= 0 || p.get_height() <= 0) {
            return Err(Error::EmptyPhoto(i));
        }

        let ib = self.backend;
        let (w, h) = geometry.canvas_size();
        let mut canvas = ib.new_canvas(&self.background, w, h)?;
        for (photo, slot) in photos.iter().zip(slots.iter()) {
            let tile = self.fit(photo, slot)?;
            canvas = ib.insert(&canvas, &tile, slot.x, slot.y)?;
        }
        log::debug!("composed {} photos on a {w}x{h} canvas", photos.len());
        Ok(Collage { image: canvas, geometry: geometry.clone(), slots })
    }

    fn fit(&self, photo: &VipsImage, slot: &SlotRect) -> Result<VipsImage> {
        let ib = self.backend;
        let photo = ib.to_rgb(photo)?;
        let (pw, ph) = (photo.get_width() as u32, photo.get_height() as u32);
        let crop = center_crop(pw, ph, slot.width, slot.height);
        let cropped = ib.crop(&photo, crop)?;
        ib.resize_exact(&cropped, slot.width, slot.height)
    }

    /// Draws a frame template over `collage`.
    ///
    /// The template is stretched to the collage size if needed. Templates
    /// without an alpha band leave the collage unchanged.
    pub fn overlay(&self, collage: &VipsImage, template: &VipsImage) -> Result<VipsImage> {
        let ib = self.backend;
        let template = ib.to_rgba_or_rgb(template)?;
        if template.get_bands() < 4 {
            log::warn!("frame template has no alpha band, skipping overlay");
            return ib.to_rgb(collage);
        }
        let (w, h) = (collage.get_width() as u32, collage.get_height() as u32);
        let template = ib.resize_exact(&template, w, h)?;
        let base = ib.to_rgb(collage)?;
        ib.blend_over(&base, &template)
    }
}

impl Collage {
    /// The collage without any frame.
    pub fn image(&self) -> &VipsImage {
        &self.image
    }

    pub fn into_image(self) -> VipsImage {
        self.image
    }

    pub fn geometry(&self) -> &LayoutGeometry {
        &self.geometry
    }

    /// Resolved slots, in photo order.
    pub fn slots(&self) -> &[SlotRect] {
        &self.slots
    }

    /// A framed copy of the collage; the collage itself is left as is.
    pub fn framed(&self, compositor: &Compositor, template: &VipsImage) -> Result<VipsImage> {
        compositor.overlay(&self.image, template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tests::pixel_at;
    use crate::layout::{Arrangement, FreeFormLayout, GridLayout, Padding};
    use crate::registry::builtin;

    const COLORS: [Color; 4] = [
        Color::rgb(220, 40, 40),
        Color::rgb(40, 200, 60),
        Color::rgb(30, 60, 230),
        Color::rgb(240, 220, 20),
    ];

    fn photos(ib: &ImgBackend, n: usize, w: u32, h: u32) -> Vec<VipsImage> {
        COLORS[..n].iter().map(|c| ib.new_canvas(c, w, h).unwrap()).collect()
    }

    #[test]
    fn slot_count_mismatch_is_rejected() {
        let ib = ImgBackend::new().unwrap();
        let compositor = Compositor::new(&ib);
        let geometry = builtin("2x2").unwrap();
        let result = compositor.compose(&photos(&ib, 3, 64, 48), &geometry);
        assert!(matches!(
            result,
            Err(Error::SlotCountMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let ib = ImgBackend::new().unwrap();
        let geometry = LayoutGeometry::from(GridLayout::new(
            (100, 100),
            Padding::new(60, 60, 0, 0),
            0,
            Arrangement::new(1, 1),
        ));
        let result = Compositor::new(&ib).compose(&photos(&ib, 1, 8, 8), &geometry);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn photos_land_in_their_slots() {
        let ib = ImgBackend::new().unwrap();
        let geometry = FreeFormLayout::new(
            (300, 200),
            vec![SlotRect::new(10, 10, 100, 50), SlotRect::new(150, 80, 60, 100)],
        )
        .into();
        let collage = Compositor::new(&ib)
            .compose(&photos(&ib, 2, 640, 480), &geometry)
            .unwrap();
        let img = collage.image();
        assert_eq!((img.get_width(), img.get_height(), img.get_bands()), (300, 200, 3));
        assert_eq!(pixel_at(&ib, img, 10, 10), COLORS[0].to_rgb().to_vec());
        assert_eq!(pixel_at(&ib, img, 109, 59), COLORS[0].to_rgb().to_vec());
        assert_eq!(pixel_at(&ib, img, 150, 80), COLORS[1].to_rgb().to_vec());
        assert_eq!(pixel_at(&ib, img, 209, 179), COLORS[1].to_rgb().to_vec());
        assert_eq!(pixel_at(&ib, img, 110, 10), vec![0, 0, 0]);
        assert_eq!(pixel_at(&ib, img, 299, 199), vec![0, 0, 0]);
    }

    #[test]
    fn later_slots_cover_earlier_ones() {
        let ib = ImgBackend::new().unwrap();
        let geometry = FreeFormLayout::new(
            (100, 100),
            vec![SlotRect::new(0, 0, 60, 60), SlotRect::new(40, 40, 60, 60)],
        )
        .into();
        let collage = Compositor::new(&ib)
            .compose(&photos(&ib, 2, 30, 30), &geometry)
            .unwrap();
        assert_eq!(pixel_at(&ib, collage.image(), 50, 50), COLORS[1].to_rgb().to_vec());
        assert_eq!(pixel_at(&ib, collage.image(), 20, 20), COLORS[0].to_rgb().to_vec());
    }

    #[test]
    fn background_color_fills_the_gaps() {
        let ib = ImgBackend::new().unwrap();
        let white = Color::rgb(255, 255, 255);
        let collage = Compositor::new(&ib)
            .with_background(white)
            .compose(&photos(&ib, 2, 320, 240), &builtin("1x2").unwrap())
            .unwrap();
        assert_eq!(pixel_at(&ib, collage.image(), 0, 0), vec![255, 255, 255]);
        assert_eq!(pixel_at(&ib, collage.image(), 63, 50), COLORS[0].to_rgb().to_vec());
    }

    #[test]
    fn composing_is_deterministic() {
        let ib = ImgBackend::new().unwrap();
        let mut gradient = Vec::with_capacity(97 * 61 * 3);
        for y in 0..61u32 {
            for x in 0..97u32 {
                gradient.extend_from_slice(&[(x * 2) as u8, (y * 4) as u8, ((x + y) % 256) as u8]);
            }
        }
        let photo = ib.from_rgb_bytes(&gradient, 97, 61).unwrap();
        let copy = ib.from_rgb_bytes(&gradient, 97, 61).unwrap();
        let geometry = builtin("2x1").unwrap();
        let compositor = Compositor::new(&ib);
        let a = compositor.compose(&[photo, copy], &geometry).unwrap();
        let photo = ib.from_rgb_bytes(&gradient, 97, 61).unwrap();
        let copy = ib.from_rgb_bytes(&gradient, 97, 61).unwrap();
        let b = compositor.compose(&[photo, copy], &geometry).unwrap();
        assert_eq!(ib.pixels(a.image()), ib.pixels(b.image()));
    }

    #[test]
    fn frame_without_alpha_is_ignored() {
        let ib = ImgBackend::new().unwrap();
        let compositor = Compositor::new(&ib);
        let collage = compositor
            .compose(&photos(&ib, 2, 320, 240), &builtin("1x2").unwrap())
            .unwrap();
        let opaque = ib.new_canvas(&Color::rgb(9, 9, 9), 943, 974).unwrap();
        let out = collage.framed(&compositor, &opaque).unwrap();
        assert_eq!(ib.pixels(&out), ib.pixels(collage.image()));
    }

    #[test]
    fn grey_frame_with_alpha_is_applied() {
        let ib = ImgBackend::new().unwrap();
        let compositor = Compositor::new(&ib);
        let collage = compositor
            .compose(&photos(&ib, 2, 320, 240), &builtin("1x2").unwrap())
            .unwrap();
        // bands 2 and 3 of this canvas make a grey + alpha image
        let rgba = ib.new_rgba_canvas(&Color::rgba(0, 0, 90, 255), 943, 974).unwrap();
        let grey_alpha =
            libvips::ops::extract_band_with_opts(&rgba, 2, &libvips::ops::ExtractBandOptions { n: 2 })
                .unwrap();
        assert_eq!(grey_alpha.get_bands(), 2);
        let out = collage.framed(&compositor, &grey_alpha).unwrap();
        assert_eq!(pixel_at(&ib, &out, 100, 100), vec![90, 90, 90]);
    }

    #[test]
    fn frame_is_stretched_to_the_canvas() {
        let ib = ImgBackend::new().unwrap();
        let compositor = Compositor::new(&ib);
        let collage = compositor
            .compose(&photos(&ib, 2, 320, 240), &builtin("1x2").unwrap())
            .unwrap();
        let small = ib.new_rgba_canvas(&Color::rgba(1, 2, 3, 255), 100, 50).unwrap();
        let out = collage.framed(&compositor, &small).unwrap();
        assert_eq!((out.get_width(), out.get_height(), out.get_bands()), (943, 974, 3));
        assert_eq!(pixel_at(&ib, &out, 500, 500), vec![1, 2, 3]);
    }
}
