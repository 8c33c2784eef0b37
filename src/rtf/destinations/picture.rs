//! Picture destinations (`\pict` and `\*\shppict`).
//!
//! The hex payload is decoded incrementally on every flush, so a picture
//! split by nested groups decodes the same as a contiguous one. The bytes are
//! handed to the parser's [`ImageCodec`](crate::rtf::ImageCodec) when the
//! group closes.

use super::footnote::in_footnote;
use super::{
    ControlWord, DestinationInfo, DestinationKind, State, WordTable, discard_text, no_cleanup,
    no_codepage,
};
use crate::common::encoding::decode_hex_chunk;
use crate::common::unit::twips_to_pixels;
use crate::rtf::error::{RtfError, RtfResult};
use crate::rtf::parser::ParserContext;
use crate::rtf::picture::{PictureFormat, detect_picture_format};
use crate::rtf::sink::Anchor;
use phf::phf_map;
use std::mem;

pub(crate) static PICTURE_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&PICTURE_WORDS],
    new_state: || State::Picture(PictureState::default()),
    inherit_attributes: false,
    flush: flush_picture,
    cleanup: insert_picture,
    codepage: no_codepage,
};

/// `\*\shppict` only wraps a `\pict`; its own text is dropped.
pub(crate) static SHAPE_PICTURE_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&SHAPE_PICTURE_WORDS],
    new_state: || State::Ignore,
    inherit_attributes: false,
    flush: discard_text,
    cleanup: no_cleanup,
    codepage: no_codepage,
};

static PICTURE_WORDS: WordTable = phf_map! {
    "dibitmap" => ControlWord::required(pic_dibitmap, false),
    "emfblip" => ControlWord::no_parameter(pic_emfblip, false),
    "jpegblip" => ControlWord::no_parameter(pic_jpegblip, false),
    "macpict" => ControlWord::no_parameter(pic_macpict, false),
    "pich" => ControlWord::required(pic_pich, false),
    "pichgoal" => ControlWord::required(pic_pichgoal, false),
    "picscalex" => ControlWord::optional(pic_picscalex, 100, false),
    "picscaley" => ControlWord::optional(pic_picscaley, 100, false),
    "picw" => ControlWord::required(pic_picw, false),
    "picwgoal" => ControlWord::required(pic_picwgoal, false),
    "pmmetafile" => ControlWord::required(pic_pmmetafile, false),
    "pngblip" => ControlWord::no_parameter(pic_pngblip, false),
    "wbitmap" => ControlWord::required(pic_wbitmap, false),
    "wmetafile" => ControlWord::optional(pic_wmetafile, 1, false),
};

static SHAPE_PICTURE_WORDS: WordTable = phf_map! {
    "pict" => ControlWord::destination(None, DestinationKind::Picture, false),
};

/// Properties declared in a `\pict` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureState {
    pub format: PictureFormat,
    /// Mapping mode of `\wmetafile` or type of `\pmmetafile`
    pub metafile_mode: i32,
    /// Source size from `\picw` and `\pich`
    pub width: i32,
    pub height: i32,
    /// Display size in pixels from `\picwgoal` and `\pichgoal`
    pub width_goal: i32,
    pub height_goal: i32,
    /// Percentages
    pub scale_x: i32,
    pub scale_y: i32,
}

impl Default for PictureState {
    fn default() -> Self {
        Self {
            format: PictureFormat::default(),
            metafile_mode: 1,
            width: 0,
            height: 0,
            width_goal: 0,
            height_goal: 0,
            scale_x: 100,
            scale_y: 100,
        }
    }
}

impl PictureState {
    /// Size to decode at: the goal size if given, else the source size.
    pub fn size_hint(&self) -> Option<(u32, u32)> {
        [
            (self.width_goal, self.height_goal),
            (self.width, self.height),
        ]
        .into_iter()
        .find(|&(w, h)| w > 0 && h > 0)
        .map(|(w, h)| (w as u32, h as u32))
    }

    #[inline]
    fn is_scaled(&self) -> bool {
        self.scale_x != 100 || self.scale_y != 100
    }
}

fn update(ctx: &mut ParserContext<'_>, f: impl FnOnce(&mut PictureState)) -> RtfResult<()> {
    if let State::Picture(state) = &mut ctx.dest.state {
        f(state);
    }
    Ok(())
}

fn format(ctx: &mut ParserContext<'_>, format: PictureFormat) -> RtfResult<()> {
    update(ctx, |state| state.format = format)
}

fn pic_dibitmap(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    if param != 0 {
        return Err(RtfError::BadPictureType {
            word: "dibitmap",
            value: param,
        });
    }
    format(ctx, PictureFormat::Dib)
}

fn pic_wbitmap(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    if param != 0 {
        return Err(RtfError::BadPictureType {
            word: "wbitmap",
            value: param,
        });
    }
    format(ctx, PictureFormat::Bmp)
}

fn pic_emfblip(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    format(ctx, PictureFormat::Emf)
}

fn pic_jpegblip(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    format(ctx, PictureFormat::Jpeg)
}

fn pic_macpict(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    format(ctx, PictureFormat::MacPict)
}

fn pic_pngblip(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    format(ctx, PictureFormat::Png)
}

fn pic_pmmetafile(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| {
        state.format = PictureFormat::Os2Metafile;
        state.metafile_mode = param;
    })
}

fn pic_wmetafile(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| {
        state.format = PictureFormat::Wmf;
        state.metafile_mode = param;
    })
}

fn pic_picw(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.width = param)
}

fn pic_pich(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.height = param)
}

fn pic_picwgoal(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let pixels = twips_to_pixels(param, ctx.dpi);
    update(ctx, |state| state.width_goal = pixels)
}

fn pic_pichgoal(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let pixels = twips_to_pixels(param, ctx.dpi);
    update(ctx, |state| state.height_goal = pixels)
}

fn pic_picscalex(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.scale_x = param)
}

fn pic_picscaley(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.scale_y = param)
}

/// Decode the pending hex text into the payload.
fn flush_picture(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    let text = ctx.take_text();
    let dest = &mut ctx.dest;
    if dest.failed || text.is_empty() {
        return Ok(());
    }
    if let Err(byte) = decode_hex_chunk(text.as_bytes(), &mut dest.carry, &mut dest.payload) {
        tracing::warn!(byte, "invalid hex digit in picture data");
        dest.failed = true;
        dest.payload.clear();
    }
    Ok(())
}

#[inline]
fn scaled(extent: u32, percent: i32) -> u32 {
    (extent as u64 * percent.max(0) as u64 / 100) as u32
}

/// Decode the collected payload and insert the picture.
fn insert_picture(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    let State::Picture(state) = ctx.dest.state else {
        return Ok(());
    };
    if ctx.dest.failed || ctx.dest.payload.is_empty() {
        return Ok(());
    }
    let Some(codec) = ctx.codec else {
        tracing::debug!(format = ?state.format, "no image codec, skipping picture");
        return Ok(());
    };
    if ctx.dest.carry.take().is_some() {
        tracing::warn!("picture data has an odd number of hex digits");
    }
    let payload = mem::take(&mut ctx.dest.payload);
    let format = match detect_picture_format(&payload) {
        Some(found) if found != state.format => {
            tracing::debug!(
                declared = ?state.format,
                ?found,
                "picture data does not match its blip type"
            );
            found
        },
        _ => state.format,
    };
    tracing::trace!(
        ?format,
        mode = state.metafile_mode,
        bytes = payload.len(),
        "decoding picture"
    );

    let mut image = match codec.decode(&payload, format, state.size_hint()) {
        Ok(image) => image,
        Err(err) => {
            tracing::warn!(%err, "could not load picture");
            return Ok(());
        },
    };
    if state.is_scaled() {
        let width = scaled(image.width(), state.scale_x);
        let height = scaled(image.height(), state.scale_y);
        match codec.scale(&image, width, height) {
            Ok(resized) => image = resized,
            Err(err) => tracing::warn!(%err, "could not scale picture"),
        }
    }

    if in_footnote(ctx) {
        ctx.sink.insert_image(Anchor::End, &image);
        ctx.sink.move_mark(ctx.end, Anchor::Mark(ctx.start));
    } else {
        let end = Anchor::Mark(ctx.end);
        ctx.sink.insert_image(end, &image);
        ctx.sink.move_mark(ctx.start, end);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtf::buffer::{OBJECT_REPLACEMENT, RichTextBuffer};
    use crate::rtf::parser::Parser;
    use crate::rtf::picture::{Image, ImageCodec, ImageError};

    /// Decodes PNG payloads into an image as wide as the payload is long,
    /// or at the requested size.
    struct LengthCodec;

    impl ImageCodec for LengthCodec {
        fn decode(
            &self,
            data: &[u8],
            format: PictureFormat,
            size: Option<(u32, u32)>,
        ) -> Result<Image, ImageError> {
            if format != PictureFormat::Png {
                return Err(ImageError::Unsupported(format));
            }
            let (width, height) = size.unwrap_or((data.len() as u32, 1));
            Ok(Image::filled(width, height, [data[0], 0, 0, 255]))
        }

        fn encode_png(&self, _: &Image) -> Result<Vec<u8>, ImageError> {
            Err(ImageError::Encode("not supported".to_string()))
        }

        fn scale(&self, image: &Image, width: u32, height: u32) -> Result<Image, ImageError> {
            if width == 0 || height == 0 {
                return Err(ImageError::InvalidDimensions { width, height });
            }
            Ok(Image::filled(width, height, [image.pixels()[0], 0, 0, 255]))
        }
    }

    fn parse_with_codec(input: &str) -> RtfResult<RichTextBuffer> {
        let mut doc = RichTextBuffer::new();
        Parser::new()
            .with_image_codec(Box::new(LengthCodec))
            .parse(input.as_bytes(), &mut doc)?;
        Ok(doc)
    }

    fn image_sizes(doc: &RichTextBuffer) -> Vec<(u32, u32)> {
        doc.images().map(|i| (i.width(), i.height())).collect()
    }

    #[test]
    fn test_picture_is_inserted_in_place() {
        let doc = parse_with_codec(r"{\rtf1 a{\pict\pngblip 0a0B 0c}b}").unwrap();
        assert_eq!(doc.text(), format!("a{OBJECT_REPLACEMENT}b"));
        assert_eq!(image_sizes(&doc), vec![(3, 1)]);
        assert_eq!(doc.images().next().unwrap().pixels()[0], 0x0a);
    }

    #[test]
    fn test_payload_split_by_groups() {
        let doc = parse_with_codec(r"{\rtf1{\pict\pngblip 0{\*\blipuid ff}a 1}}").unwrap();
        assert_eq!(image_sizes(&doc), vec![(1, 1)]);
        assert_eq!(doc.images().next().unwrap().pixels()[0], 0x0a);
    }

    #[test]
    fn test_size_hint_prefers_goal() {
        let doc = parse_with_codec(r"{\rtf1{\pict\pngblip\picw4\pich3 00}}").unwrap();
        assert_eq!(image_sizes(&doc), vec![(4, 3)]);

        // 160 twips at 72 dpi
        let doc = parse_with_codec(
            r"{\rtf1{\pict\pngblip\picw4\pich3\picwgoal160\pichgoal120 00}}",
        )
        .unwrap();
        assert_eq!(image_sizes(&doc), vec![(8, 6)]);
    }

    #[test]
    fn test_scaling() {
        let doc = parse_with_codec(
            r"{\rtf1{\pict\pngblip\picw4\pich2\picscalex50\picscaley300 00}}",
        )
        .unwrap();
        assert_eq!(image_sizes(&doc), vec![(2, 6)]);
    }

    #[test]
    fn test_undecodable_pictures_are_skipped() {
        // Unsupported format
        let doc = parse_with_codec(r"{\rtf1 a{\pict\wmetafile8 0102}b}").unwrap();
        assert_eq!(doc.text(), "ab");
        // Bad hex digit
        let doc = parse_with_codec(r"{\rtf1 a{\pict\pngblip 01zz}b}").unwrap();
        assert_eq!(doc.text(), "ab");
        // Empty payload
        let doc = parse_with_codec(r"{\rtf1 a{\pict\pngblip}b}").unwrap();
        assert_eq!(doc.text(), "ab");
    }

    #[test]
    fn test_signature_overrides_declared_format() {
        let doc = parse_with_codec(r"{\rtf1{\pict\jpegblip 89504e470d0a1a0a}}").unwrap();
        assert_eq!(image_sizes(&doc), vec![(8, 1)]);
        // Without a signature the declared format stands
        let doc = parse_with_codec(r"{\rtf1{\pict\jpegblip 0102}}").unwrap();
        assert!(image_sizes(&doc).is_empty());
    }

    #[test]
    fn test_no_codec_skips_pictures() {
        let mut doc = RichTextBuffer::new();
        Parser::new()
            .without_image_codec()
            .parse(br"{\rtf1 a{\pict\pngblip 0102}b}", &mut doc)
            .unwrap();
        assert_eq!(doc.text(), "ab");
    }

    #[test]
    fn test_legacy_bitmap_types() {
        assert_eq!(
            parse_with_codec(r"{\rtf1{\pict\dibitmap1 00}}").err(),
            Some(RtfError::BadPictureType {
                word: "dibitmap",
                value: 1
            })
        );
        assert_eq!(
            parse_with_codec(r"{\rtf1{\pict\wbitmap2 00}}").err(),
            Some(RtfError::BadPictureType {
                word: "wbitmap",
                value: 2
            })
        );
    }

    #[test]
    fn test_shape_picture_is_kept_once() {
        let doc = parse_with_codec(
            r"{\rtf1{\*\shppict{\pict\pngblip 0102}}{\nonshppict{\pict\pngblip 0304}}}",
        )
        .unwrap();
        assert_eq!(image_sizes(&doc), vec![(2, 1)]);
        assert_eq!(doc.images().next().unwrap().pixels()[0], 0x01);
    }

    #[test]
    fn test_size_hint() {
        let mut state = PictureState::default();
        assert_eq!(state.size_hint(), None);
        state.width = 10;
        assert_eq!(state.size_hint(), None);
        state.height = 5;
        assert_eq!(state.size_hint(), Some((10, 5)));
        state.width_goal = 20;
        state.height_goal = 10;
        assert_eq!(state.size_hint(), Some((20, 10)));
    }

    #[cfg(feature = "imgconv")]
    #[test]
    fn test_png_with_raster_codec() {
        use crate::rtf::picture::RasterCodec;
        use std::fmt::Write;

        let png = RasterCodec::new()
            .encode_png(&Image::filled(4, 3, [0, 255, 0, 255]))
            .unwrap();
        let hex = png.iter().fold(String::new(), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        });
        let input = format!("{{\\rtf1 x{{\\pict\\pngblip\\picscalex200\\picscaley200 {hex}}}}}");

        let mut doc = RichTextBuffer::new();
        Parser::new().parse(input.as_bytes(), &mut doc).unwrap();
        let image = doc.images().next().unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
        assert_eq!(&image.pixels()[..4], &[0, 255, 0, 255]);
    }
}
