// THEORY:
// The decode boundary. Everything about file formats stops here: bytes go in,
// a `PixelGrid` comes out, or the image is declared `InvalidImage`. The core
// never sees a decoder error type and never decides what an undecodable file
// means. That decision belongs to the caller's decode failure policy.

pub mod image_helper {
    use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;
    use crate::error::ClassificationError;
    use image::ImageEncoder;

    /// Decodes an encoded image (PNG or JPEG) into an RGB `PixelGrid`. Alpha is dropped.
    pub fn decode_image(bytes: &[u8]) -> Result<PixelGrid, ClassificationError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ClassificationError::InvalidImage(format!("decode failed: {e}")))?;
        Ok(PixelGrid::from(img.to_rgb8()))
    }

    /// Encodes `grid` as an 8-bit RGB PNG.
    pub fn encode_png(grid: &PixelGrid) -> Result<Vec<u8>, image::ImageError> {
        let raw: Vec<u8> = grid
            .pixels()
            .iter()
            .flat_map(|p| [p.red, p.green, p.blue])
            .collect();
        let mut output = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut output);
        encoder.write_image(&raw, grid.width(), grid.height(), image::ExtendedColorType::Rgb8)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::image_helper::*;
    use crate::core_modules::pixel_grid::pixel_grid::{PixelGrid, Rgb};
    use crate::error::ClassificationError;

    #[test]
    fn png_survives_a_round_trip() {
        let mut pixels = vec![Rgb::WHITE; 25];
        pixels[12] = Rgb::new(12, 80, 40);
        let grid = PixelGrid::new(5, 5, pixels).unwrap();

        let bytes = encode_png(&grid).expect("Error encoding PNG.");
        assert_eq!(decode_image(&bytes).unwrap(), grid);
    }

    #[test]
    fn garbage_is_an_invalid_image() {
        let result = decode_image(b"definitely not a png");
        assert!(matches!(result, Err(ClassificationError::InvalidImage(_))));
    }

    #[test]
    fn alpha_is_dropped() {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("Error encoding PNG.");

        let grid = decode_image(&bytes).unwrap();
        assert!(grid.pixels().iter().all(|&p| p == Rgb::new(10, 20, 30)));
    }
}
