// THEORY:
// The `PixelGrid` is the most fundamental unit of the severity engine. It is a
// "dumb" data container for one decoded leaf photograph: a height x width grid
// of RGB samples, 8 bits per channel, stored row-major in a flat `Vec`.
//
// Key principles:
// 1) Immutable after construction: every later stage derives a new grid from it
//    and never writes back.
// 2) Size honesty: the constructor refuses a sample buffer whose length does not
//    match `width * height`, so no later stage has to re-check the arithmetic.
// 3) Degenerate shapes are representable. A 0 x N grid can be built, because
//    rejecting it is the Grayscale Reducer's job and it reports that as an
//    `InvalidImage` condition.
//
// Alpha is not part of the model. Decoders drop it before a grid is built.

pub mod pixel_grid {
    use crate::error::ClassificationError;

    pub type Channel = u8;
    pub type Luminance = f64;

    const CHANNELS: usize = 3;

    /// A single RGB sample.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Rgb {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Rgb {
        pub const WHITE: Rgb = Rgb::gray(255);

        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// A neutral sample with all three channels set to `level`.
        pub const fn gray(level: Channel) -> Self {
            Self::new(level, level, level)
        }

        /// Perceived brightness using the Rec. 601 luma weights, in 0.0..=255.0.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }
    }

    impl From<[Channel; CHANNELS]> for Rgb {
        fn from(bytes: [Channel; CHANNELS]) -> Self {
            Rgb::new(bytes[0], bytes[1], bytes[2])
        }
    }

    /// A decoded color image: `height` rows of `width` RGB samples.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PixelGrid {
        width: u32,
        height: u32,
        pixels: Vec<Rgb>,
    }

    impl PixelGrid {
        /// Builds a grid from row-major samples. Fails if the sample count does not match.
        pub fn new(width: u32, height: u32, pixels: Vec<Rgb>) -> Result<Self, ClassificationError> {
            let expected = width as usize * height as usize;
            if pixels.len() != expected {
                return Err(ClassificationError::InvalidImage(format!(
                    "{}x{} grid needs {} samples, got {}",
                    width,
                    height,
                    expected,
                    pixels.len()
                )));
            }
            Ok(Self { width, height, pixels })
        }

        /// Builds a grid from an interleaved `RGBRGB...` byte buffer.
        pub fn from_raw_rgb(width: u32, height: u32, bytes: &[u8]) -> Result<Self, ClassificationError> {
            if bytes.len() % CHANNELS != 0 {
                return Err(ClassificationError::InvalidImage(format!(
                    "{} bytes is not a whole number of RGB samples",
                    bytes.len()
                )));
            }
            let pixels = bytes
                .chunks_exact(CHANNELS)
                .map(|rgb| Rgb::new(rgb[0], rgb[1], rgb[2]))
                .collect();
            Self::new(width, height, pixels)
        }

        /// A grid where every sample is `pixel`.
        pub fn filled(width: u32, height: u32, pixel: Rgb) -> Self {
            Self {
                width,
                height,
                pixels: vec![pixel; width as usize * height as usize],
            }
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        /// Row-major samples.
        pub fn pixels(&self) -> &[Rgb] {
            &self.pixels
        }

        pub fn pixel_count(&self) -> usize {
            self.pixels.len()
        }

        /// True when either dimension is zero.
        pub fn is_degenerate(&self) -> bool {
            self.width == 0 || self.height == 0
        }
    }

    impl From<image::RgbImage> for PixelGrid {
        fn from(img: image::RgbImage) -> Self {
            let (width, height) = img.dimensions();
            let pixels = img.pixels().map(|p| Rgb::from(p.0)).collect();
            Self { width, height, pixels }
        }
    }
}
