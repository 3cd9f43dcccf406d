//! Image sample decoding.
//!
//! Turns the stored samples of an [`ImageObject`] into a premultiplied RGBA
//! pixmap the device can draw.

use super::error::{PDFError, PDFResult};
use super::page::{ImageColorSpace, ImageEncoding, ImageObject, gray_level};
use flate2::read::ZlibDecoder;
use std::io::Read;
use tiny_skia::{IntSize, Pixmap};

/// Decompresses zlib-wrapped deflate data.
pub fn decode_flate(compressed_data: &[u8]) -> PDFResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed_data);
    let mut decompressed = Vec::new();

    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| PDFError::DecodeError(format!("FlateDecode error: {}", e)))?;

    Ok(decompressed)
}

/// Decodes `image` into a pixmap, optionally converting it to gray.
pub fn decode_image(image: &ImageObject, gray: bool) -> PDFResult<Pixmap> {
    let samples = match image.encoding {
        ImageEncoding::Raw => image.data.to_vec(),
        ImageEncoding::Flate => decode_flate(&image.data)?,
    };

    let components = image.color_space.components();
    let expected = (image.width as usize)
        .checked_mul(image.height as usize)
        .and_then(|n| n.checked_mul(components))
        .ok_or_else(|| {
            PDFError::DecodeError(format!("image too large: {}x{}", image.width, image.height))
        })?;
    if samples.len() < expected {
        return Err(PDFError::DecodeError(format!(
            "image data too short: expected {} bytes, got {}",
            expected,
            samples.len()
        )));
    }

    let size = IntSize::from_wh(image.width, image.height).ok_or_else(|| {
        PDFError::DecodeError(format!("invalid image size {}x{}", image.width, image.height))
    })?;

    let mut rgba = Vec::with_capacity(expected / components * 4);
    for pixel in samples[..expected].chunks_exact(components) {
        let (r, g, b, a) = match image.color_space {
            ImageColorSpace::Gray => (pixel[0], pixel[0], pixel[0], 255),
            ImageColorSpace::Rgb => (pixel[0], pixel[1], pixel[2], 255),
            ImageColorSpace::Rgba => (pixel[0], pixel[1], pixel[2], pixel[3]),
        };
        let (r, g, b) = if gray {
            let luma = gray_level(r, g, b);
            (luma, luma, luma)
        } else {
            (r, g, b)
        };
        rgba.extend_from_slice(&[premultiply(r, a), premultiply(g, a), premultiply(b, a), a]);
    }

    Pixmap::from_vec(rgba, size)
        .ok_or_else(|| PDFError::DecodeError("failed to create image pixmap".to_string()))
}

fn premultiply(c: u8, a: u8) -> u8 {
    ((u16::from(c) * u16::from(a) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;
    use std::rc::Rc;
    use tiny_skia::Transform;

    fn image(color_space: ImageColorSpace, encoding: ImageEncoding, data: Vec<u8>) -> ImageObject {
        ImageObject {
            width: 2,
            height: 1,
            color_space,
            encoding,
            data: Rc::from(data),
            matrix: Transform::identity(),
        }
    }

    #[test]
    fn test_decode_flate_simple() {
        let original = b"Hello, PDF world! This is test data.";

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decode_flate(&compressed).unwrap(), original);
    }

    #[test]
    fn test_decode_flate_garbage() {
        assert!(matches!(
            decode_flate(b"not zlib at all"),
            Err(PDFError::DecodeError(_))
        ));
    }

    #[test]
    fn test_decode_rgb_image() {
        let pixmap = decode_image(
            &image(ImageColorSpace::Rgb, ImageEncoding::Raw, vec![255, 0, 0, 0, 0, 255]),
            false,
        )
        .unwrap();

        assert_eq!((pixmap.width(), pixmap.height()), (2, 1));
        let first = pixmap.pixel(0, 0).unwrap();
        assert_eq!((first.red(), first.green(), first.blue(), first.alpha()), (255, 0, 0, 255));
        let second = pixmap.pixel(1, 0).unwrap();
        assert_eq!(second.blue(), 255);
    }

    #[test]
    fn test_decode_flate_gray_image_in_gray_mode() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&[0, 200]).unwrap();
        let compressed = encoder.finish().unwrap();

        let pixmap = decode_image(
            &image(ImageColorSpace::Gray, ImageEncoding::Flate, compressed),
            true,
        )
        .unwrap();

        let second = pixmap.pixel(1, 0).unwrap();
        assert_eq!((second.red(), second.green(), second.blue()), (200, 200, 200));
    }

    #[test]
    fn test_decode_premultiplies_alpha() {
        let pixmap = decode_image(
            &image(
                ImageColorSpace::Rgba,
                ImageEncoding::Raw,
                vec![255, 255, 255, 0, 200, 100, 0, 255],
            ),
            false,
        )
        .unwrap();

        let transparent = pixmap.pixel(0, 0).unwrap();
        assert_eq!(transparent.alpha(), 0);
        assert_eq!(transparent.red(), 0);
    }

    #[test]
    fn test_decode_short_data() {
        let result = decode_image(
            &image(ImageColorSpace::Rgb, ImageEncoding::Raw, vec![1, 2, 3]),
            false,
        );
        assert!(matches!(result, Err(PDFError::DecodeError(_))));
    }
}
