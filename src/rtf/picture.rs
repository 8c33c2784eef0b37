//! Embedded picture formats and the image codec seam.
//!
//! RTF carries pictures as hex-encoded blobs inside `\pict` groups. The
//! parser collects the bytes and hands them to an [`ImageCodec`] for decoding;
//! the writer asks the same codec to re-encode document images as PNG.
//!
//! With the `imgconv` feature enabled, [`RasterCodec`] implements the codec on
//! top of the `image` crate. It handles the raster formats (PNG, JPEG, BMP and
//! headerless DIB); metafile formats are reported as unsupported.

use thiserror::Error;

/// Picture encoding declared inside a `\pict` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PictureFormat {
    /// Enhanced Metafile (`\emfblip`)
    Emf,
    /// PNG image (`\pngblip`)
    Png,
    /// JPEG image (`\jpegblip`)
    Jpeg,
    /// QuickDraw PICT (`\macpict`)
    MacPict,
    /// OS/2 Presentation Manager metafile (`\pmmetafile`)
    Os2Metafile,
    /// Windows Metafile (`\wmetafile`), the RTF default
    #[default]
    Wmf,
    /// Device-independent bitmap without file header (`\dibitmap`)
    Dib,
    /// Windows bitmap (`\wbitmap`)
    Bmp,
}

impl PictureFormat {
    /// MIME type associated with the format.
    pub const fn mime_type(self) -> &'static str {
        match self {
            PictureFormat::Emf => "image/x-emf",
            PictureFormat::Png => "image/png",
            PictureFormat::Jpeg => "image/jpeg",
            PictureFormat::MacPict => "image/x-pict",
            PictureFormat::Os2Metafile => "OS/2 Presentation Manager",
            PictureFormat::Wmf => "image/x-wmf",
            PictureFormat::Dib | PictureFormat::Bmp => "image/x-bmp",
        }
    }
}

/// Detect a picture format from its leading bytes.
///
/// Headerless DIBs and OS/2 metafiles carry no signature and are never
/// detected.
pub fn detect_picture_format(data: &[u8]) -> Option<PictureFormat> {
    if data.starts_with(&[0xFF, 0xD8]) {
        return Some(PictureFormat::Jpeg);
    }

    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(PictureFormat::Png);
    }

    // EMF header record type 1 with the " EMF" signature at offset 40
    if data.len() >= 44 && data[0..4] == [0x01, 0x00, 0x00, 0x00] && data[40..44] == *b" EMF" {
        return Some(PictureFormat::Emf);
    }

    // Aldus placeable metafile
    if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
        return Some(PictureFormat::Wmf);
    }

    if data.starts_with(b"BM") {
        return Some(PictureFormat::Bmp);
    }

    None
}

/// Decoded raster image: 8-bit RGBA, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    /// Wrap an RGBA buffer. Returns `None` if the buffer length does not
    /// match the dimensions.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Image codec failures. These never abort a parse or a serialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The codec cannot handle this picture format
    #[error("no decoder for {}", .0.mime_type())]
    Unsupported(PictureFormat),
    /// The picture data is corrupt or truncated
    #[error("picture decoding failed: {0}")]
    Decode(String),
    /// The image could not be encoded
    #[error("picture encoding failed: {0}")]
    Encode(String),
    /// Zero-sized target or a buffer that does not match its dimensions
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Image decoding, encoding and scaling used by the parser and the writer.
pub trait ImageCodec {
    /// Decode `data`, scaling the result to `size` when given.
    fn decode(
        &self,
        data: &[u8],
        format: PictureFormat,
        size: Option<(u32, u32)>,
    ) -> Result<Image, ImageError>;

    /// Encode an image as PNG.
    fn encode_png(&self, image: &Image) -> Result<Vec<u8>, ImageError>;

    /// Resample an image to the given dimensions.
    fn scale(&self, image: &Image, width: u32, height: u32) -> Result<Image, ImageError>;
}

#[cfg(feature = "imgconv")]
pub use raster::RasterCodec;

/// Codec used when the caller installs none: [`RasterCodec`] with the
/// `imgconv` feature, otherwise nothing.
pub(crate) fn default_codec() -> Option<Box<dyn ImageCodec>> {
    #[cfg(feature = "imgconv")]
    {
        Some(Box::new(RasterCodec::new()))
    }
    #[cfg(not(feature = "imgconv"))]
    {
        None
    }
}

#[cfg(feature = "imgconv")]
mod raster {
    use super::{Image, ImageCodec, ImageError, PictureFormat};
    use image::codecs::bmp::BmpDecoder;
    use image::imageops::FilterType;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    /// [`ImageCodec`] backed by the `image` crate.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RasterCodec;

    impl RasterCodec {
        pub fn new() -> Self {
            Self
        }
    }

    fn to_buffer(image: &Image) -> Result<RgbaImage, ImageError> {
        RgbaImage::from_raw(image.width(), image.height(), image.pixels().to_vec()).ok_or(
            ImageError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            },
        )
    }

    fn from_dynamic(decoded: DynamicImage) -> Result<Image, ImageError> {
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Image::from_rgba(width, height, rgba.into_raw())
            .ok_or(ImageError::InvalidDimensions { width, height })
    }

    fn decode_error(err: image::ImageError) -> ImageError {
        ImageError::Decode(err.to_string())
    }

    impl ImageCodec for RasterCodec {
        fn decode(
            &self,
            data: &[u8],
            format: PictureFormat,
            size: Option<(u32, u32)>,
        ) -> Result<Image, ImageError> {
            let decoded = match format {
                PictureFormat::Png => image::load_from_memory_with_format(data, ImageFormat::Png),
                PictureFormat::Jpeg => {
                    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
                },
                PictureFormat::Bmp => image::load_from_memory_with_format(data, ImageFormat::Bmp),
                PictureFormat::Dib => BmpDecoder::new_without_file_header(Cursor::new(data))
                    .and_then(|decoder| DynamicImage::from_decoder(decoder)),
                PictureFormat::Emf
                | PictureFormat::Wmf
                | PictureFormat::MacPict
                | PictureFormat::Os2Metafile => return Err(ImageError::Unsupported(format)),
            }
            .map_err(decode_error)?;

            let image = from_dynamic(decoded)?;
            match size {
                Some((width, height))
                    if width > 0
                        && height > 0
                        && (width, height) != (image.width(), image.height()) =>
                {
                    self.scale(&image, width, height)
                },
                _ => Ok(image),
            }
        }

        fn encode_png(&self, image: &Image) -> Result<Vec<u8>, ImageError> {
            let buffer = to_buffer(image)?;
            let mut out = Cursor::new(Vec::new());
            buffer
                .write_to(&mut out, ImageFormat::Png)
                .map_err(|err| ImageError::Encode(err.to_string()))?;
            Ok(out.into_inner())
        }

        fn scale(&self, image: &Image, width: u32, height: u32) -> Result<Image, ImageError> {
            if width == 0 || height == 0 {
                return Err(ImageError::InvalidDimensions { width, height });
            }
            let buffer = to_buffer(image)?;
            let resized = image::imageops::resize(&buffer, width, height, FilterType::Triangle);
            Image::from_rgba(width, height, resized.into_raw())
                .ok_or(ImageError::InvalidDimensions { width, height })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_picture_format() {
        assert_eq!(
            detect_picture_format(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(PictureFormat::Jpeg)
        );
        assert_eq!(
            detect_picture_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            Some(PictureFormat::Png)
        );
        assert_eq!(
            detect_picture_format(&[0xD7, 0xCD, 0xC6, 0x9A, 0x00]),
            Some(PictureFormat::Wmf)
        );
        assert_eq!(detect_picture_format(b"BM\x00\x00"), Some(PictureFormat::Bmp));
        assert_eq!(detect_picture_format(&[]), None);
        assert_eq!(detect_picture_format(&[0x28, 0x00, 0x00, 0x00]), None);
    }

    #[test]
    fn test_detect_emf() {
        let mut data = vec![0u8; 48];
        data[0] = 0x01;
        data[40..44].copy_from_slice(b" EMF");
        assert_eq!(detect_picture_format(&data), Some(PictureFormat::Emf));
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(PictureFormat::default(), PictureFormat::Wmf);
        assert_eq!(PictureFormat::Png.mime_type(), "image/png");
        assert_eq!(PictureFormat::Dib.mime_type(), PictureFormat::Bmp.mime_type());
    }

    #[test]
    fn test_image_from_rgba_checks_length() {
        assert!(Image::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(Image::from_rgba(2, 2, vec![0; 15]).is_none());
        let image = Image::filled(3, 1, [1, 2, 3, 4]);
        assert_eq!(image.pixels(), &[1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[cfg(feature = "imgconv")]
    #[test]
    fn test_raster_codec_png_round_trip() {
        let codec = RasterCodec::new();
        let image = Image::filled(4, 3, [255, 0, 0, 255]);
        let png = codec.encode_png(&image).unwrap();
        assert_eq!(detect_picture_format(&png), Some(PictureFormat::Png));

        let decoded = codec.decode(&png, PictureFormat::Png, None).unwrap();
        assert_eq!(decoded, image);

        let resized = codec.decode(&png, PictureFormat::Png, Some((8, 6))).unwrap();
        assert_eq!((resized.width(), resized.height()), (8, 6));
    }

    #[cfg(feature = "imgconv")]
    #[test]
    fn test_raster_codec_rejects_metafiles() {
        let codec = RasterCodec::new();
        assert_eq!(
            codec.decode(&[0xD7, 0xCD, 0xC6, 0x9A], PictureFormat::Wmf, None),
            Err(ImageError::Unsupported(PictureFormat::Wmf))
        );
        assert!(matches!(
            codec.decode(&[1, 2, 3], PictureFormat::Png, None),
            Err(ImageError::Decode(_))
        ));
    }
}
