//! Footnote destination (`\footnote`).
//!
//! Footnotes collect in a region at the very end of the document. The body's
//! insertion point stays in front of that region, so body text read after a
//! footnote still lands before it.

use super::document::{FORMATTING_WORDS, SPECIAL_WORDS, TEXT_WORDS, font_codepage};
use super::{DestinationInfo, DestinationKind, State};
use crate::rtf::error::RtfResult;
use crate::rtf::parser::ParserContext;
use crate::rtf::sink::{Anchor, Gravity};
use crate::rtf::state::Attributes;

pub(crate) static FOOTNOTE_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&SPECIAL_WORDS, &FORMATTING_WORDS, &TEXT_WORDS],
    new_state: || State::Attributes(Attributes::default()),
    inherit_attributes: true,
    flush: flush_footnote,
    cleanup: next_footnote,
    codepage: font_codepage,
};

/// Append the pending text to the end of the document.
fn flush_footnote(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    let mut text = ctx.take_text();
    if ctx.nesting == 0 && text.ends_with('\n') {
        text.pop();
    }
    let Some(attr) = ctx.dest.state.attributes().cloned() else {
        return Ok(());
    };
    if text.is_empty() || attr.unicode_ignore {
        return Ok(());
    }

    let placeholder = ctx.sink.create_mark(Anchor::End, Gravity::Left);
    ctx.sink.insert_text(Anchor::End, &text);
    ctx.apply_attributes(&attr, Anchor::Mark(placeholder), Anchor::End);
    ctx.sink.delete_mark(placeholder);

    // Body text keeps going in before the footnotes
    ctx.sink.move_mark(ctx.end, Anchor::Mark(ctx.start));
    Ok(())
}

/// Whether the active destination sits inside a footnote.
pub(crate) fn in_footnote(ctx: &ParserContext<'_>) -> bool {
    ctx.parents
        .iter()
        .rev()
        .map(|dest| dest.kind)
        .find(|&kind| kind != DestinationKind::ShapePicture)
        == Some(DestinationKind::Footnote)
}

fn next_footnote(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    ctx.footnote_number += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::rtf::buffer::{OBJECT_REPLACEMENT, RichTextBuffer};
    use crate::rtf::parser::Parser;
    use crate::rtf::picture::{Image, ImageCodec, ImageError, PictureFormat};
    use crate::rtf::sink::TagName;

    /// Decodes any payload into a 1x1 image.
    struct SolidCodec;

    impl ImageCodec for SolidCodec {
        fn decode(
            &self,
            _: &[u8],
            _: PictureFormat,
            _: Option<(u32, u32)>,
        ) -> Result<Image, ImageError> {
            Ok(Image::filled(1, 1, [0, 0, 0, 255]))
        }

        fn encode_png(&self, _: &Image) -> Result<Vec<u8>, ImageError> {
            Err(ImageError::Encode("not supported".to_string()))
        }

        fn scale(&self, image: &Image, _: u32, _: u32) -> Result<Image, ImageError> {
            Ok(image.clone())
        }
    }

    fn parse_doc(input: &str) -> RichTextBuffer {
        let mut doc = RichTextBuffer::new();
        Parser::new()
            .without_image_codec()
            .parse(input.as_bytes(), &mut doc)
            .unwrap();
        doc
    }

    #[test]
    fn test_footnote_goes_to_end() {
        let doc = parse_doc(r"{\rtf1 Body{\footnote Note.} more\par}");
        assert_eq!(doc.text(), "Body more\nNote.");
    }

    #[test]
    fn test_footnotes_are_numbered() {
        let doc = parse_doc(
            r"{\rtf1 A{\super\chftn}{\footnote{\super\chftn} one}B{\super\chftn}{\footnote{\super\chftn} two}}",
        );
        assert_eq!(doc.text(), "A1B2\n1 one\n2 two");
        assert_eq!(doc.tags_at(1), vec![&TagName::Superscript]);
        assert_eq!(doc.tags_at(3), vec![&TagName::Superscript]);
        assert_eq!(doc.tags_at(5), vec![&TagName::Superscript]);
        assert!(doc.tags_at(6).is_empty());
    }

    #[test]
    fn test_footnote_inherits_body_attributes() {
        let doc = parse_doc(r"{\rtf1\b x{\footnote y}}");
        assert_eq!(doc.text(), "x\ny");
        assert_eq!(doc.tags_at(0), vec![&TagName::Bold]);
        assert_eq!(doc.tags_at(2), vec![&TagName::Bold]);
    }

    #[test]
    fn test_footnote_picture_stays_in_footnote() {
        let mut doc = RichTextBuffer::new();
        Parser::new()
            .with_image_codec(Box::new(SolidCodec))
            .parse(
                br"{\rtf1 a{\footnote b{\pict\pngblip 0102}c{\*\shppict{\pict\pngblip 03}}}d}",
                &mut doc,
            )
            .unwrap();
        assert_eq!(
            doc.text(),
            format!("ad\nb{OBJECT_REPLACEMENT}c{OBJECT_REPLACEMENT}")
        );
    }

    #[test]
    fn test_footnote_formatting_stays_inside() {
        let doc = parse_doc(r"{\rtf1 a{\footnote\i b}c}");
        assert_eq!(doc.text(), "ac\nb");
        assert!(doc.tags_at(1).is_empty());
        assert_eq!(doc.tags_at(3), vec![&TagName::Italic]);
    }
}
