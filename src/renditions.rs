use std::io::Cursor;

use image::{ImageError, ImageOutputFormat};

/// Bound for the derived "medium" rendition, longest side in pixels.
pub const MEDIUM_MAX_DIM: u32 = 300;

#[derive(thiserror::Error, Debug)]
pub enum RenditionError {
    #[error("could not decode image")]
    Decode(#[source] ImageError),

    #[error("could not encode image rendition")]
    Encode(#[source] ImageError),

    #[error("unsupported image content type: {0}")]
    UnsupportedContentType(String),
}

fn output_format(content_type: &str) -> Result<ImageOutputFormat, RenditionError> {
    match content_type {
        "image/png" => Ok(ImageOutputFormat::Png),
        "image/jpeg" | "image/jpg" => Ok(ImageOutputFormat::Jpeg(85)),
        other => Err(RenditionError::UnsupportedContentType(other.to_string())),
    }
}

/// Derive the medium rendition of an uploaded image: bounded to
/// [`MEDIUM_MAX_DIM`]², aspect ratio preserved, same format as the source.
/// Sources already within bounds are passed through untouched, so the
/// rendition only ever shrinks.
pub fn medium_rendition(bytes: &[u8], content_type: &str) -> Result<Vec<u8>, RenditionError> {
    let format = output_format(content_type)?;

    let source = image::load_from_memory(bytes).map_err(RenditionError::Decode)?;

    if source.width() <= MEDIUM_MAX_DIM && source.height() <= MEDIUM_MAX_DIM {
        return Ok(bytes.to_vec());
    }

    let medium = source.thumbnail(MEDIUM_MAX_DIM, MEDIUM_MAX_DIM);

    let mut out = Cursor::new(Vec::new());
    medium
        .write_to(&mut out, format)
        .map_err(RenditionError::Encode)?;

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgba8(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png)
            .expect("encode test image");
        out.into_inner()
    }

    #[test]
    fn shrinks_oversized_image_preserving_aspect() {
        let medium = medium_rendition(&png_bytes(600, 400), "image/png").expect("rendition");

        let decoded = image::load_from_memory(&medium).expect("decode rendition");
        assert_eq!((decoded.width(), decoded.height()), (300, 200));
    }

    #[test]
    fn keeps_image_already_within_bounds() {
        let original = png_bytes(120, 80);
        let medium = medium_rendition(&original, "image/png").expect("rendition");

        assert_eq!(medium, original);
    }

    #[test]
    fn never_exceeds_bound_on_either_axis() {
        let medium = medium_rendition(&png_bytes(400, 1000), "image/png").expect("rendition");

        let decoded = image::load_from_memory(&medium).expect("decode rendition");
        assert!(decoded.width() <= MEDIUM_MAX_DIM);
        assert!(decoded.height() <= MEDIUM_MAX_DIM);
    }

    #[test]
    fn rejects_undecodable_bytes() {
        let result = medium_rendition(b"definitely not an image", "image/png");

        assert!(matches!(result, Err(RenditionError::Decode(_))));
    }

    #[test]
    fn rejects_unknown_content_type() {
        let result = medium_rendition(&png_bytes(10, 10), "text/plain");

        assert!(matches!(
            result,
            Err(RenditionError::UnsupportedContentType(_))
        ));
    }
}
