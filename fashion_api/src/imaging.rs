use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbImage;

use crate::error::ApiError;

/// Decodes a base64 image, optionally given as a `data:image/...;base64,` URL.
pub fn decode_image(encoded: &str) -> Result<RgbImage, ApiError> {
    let encoded = encoded.trim();
    let payload = match encoded.strip_prefix("data:") {
        Some(url) => url
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| ApiError::BadRequest("Malformed data URL".into()))?,
        None => encoded,
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ApiError::BadRequest(format!("Invalid image data: {e}")))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("Invalid image data: {e}")))?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
pub(crate) fn encode_png(image: &RgbImage) -> String {
    let mut buf = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("png encoding");
    STANDARD.encode(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn decodes_plain_and_data_url() {
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 200, 30]));
        let encoded = encode_png(&image);

        assert_eq!(decode_image(&encoded).unwrap(), image);
        let url = format!("data:image/png;base64,{encoded}");
        assert_eq!(decode_image(&url).unwrap(), image);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_image("not base64!"), Err(ApiError::BadRequest(_))));
        // Valid base64, not an image.
        assert!(matches!(decode_image("aGVsbG8="), Err(ApiError::BadRequest(_))));
        assert!(matches!(decode_image("data:image/png"), Err(ApiError::BadRequest(_))));
    }
}
