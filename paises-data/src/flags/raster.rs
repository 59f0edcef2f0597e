use image::{RgbImage, codecs::jpeg::JpegEncoder};
use resvg::{tiny_skia, usvg};

use super::RasterError;

/// Turns a vector flag into JPEG bytes.
pub trait Rasteriser {
    /// Render `svg` and encode the result.
    fn rasterise(&self, svg: &[u8]) -> Result<Vec<u8>, RasterError>;
}

impl<T: Rasteriser + ?Sized> Rasteriser for &T {
    fn rasterise(&self, svg: &[u8]) -> Result<Vec<u8>, RasterError> {
        (**self).rasterise(svg)
    }
}

const JPEG_QUALITY: u8 = 90;
const BACKGROUND: [u8; 3] = [255, 255, 255];

/// [`Rasteriser`] rendering with `resvg` onto a white background.
///
/// JPEG has no alpha channel, so transparent regions come out white. The
/// image keeps the document's intrinsic size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SvgRasteriser;

impl Rasteriser for SvgRasteriser {
    fn rasterise(&self, svg: &[u8]) -> Result<Vec<u8>, RasterError> {
        let tree = usvg::Tree::from_data(svg, &usvg::Options::default())?;
        let size = tree.size().to_int_size();
        let (width, height) = (size.width(), size.height());
        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(RasterError::EmptyCanvas { width, height })?;

        let [red, green, blue] = BACKGROUND;
        pixmap.fill(tiny_skia::Color::from_rgba8(red, green, blue, 255));
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        // The background is opaque, so premultiplied channels equal straight ones.
        let rgb: Vec<u8> = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|pixel| pixel.iter().take(3).copied())
            .collect();
        let image = RgbImage::from_raw(width, height, rgb)
            .ok_or(RasterError::EmptyCanvas { width, height })?;

        let mut jpeg = Vec::new();
        image.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))?;
        Ok(jpeg)
    }
}
