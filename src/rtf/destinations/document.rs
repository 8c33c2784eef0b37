//! Document body destination.
//!
//! Besides the body itself this module holds the control word tables that
//! other text-bearing destinations share: special characters, character and
//! paragraph formatting, and the words that only make sense in running text.

use super::{ControlWord, DestinationInfo, DestinationKind, State, WordTable, no_cleanup};
use crate::common::encoding::CharacterSet;
use crate::common::unit::{half_points_to_points, millipoints_to_points};
use crate::rtf::error::{RtfError, RtfResult};
use crate::rtf::parser::ParserContext;
use crate::rtf::sink::{Anchor, TagName};
use crate::rtf::state::{Attributes, CharFlags};
use crate::rtf::types::{Justification, TextDirection, Underline};
use phf::phf_map;

pub(crate) static DOCUMENT_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&SPECIAL_WORDS, &FORMATTING_WORDS, &TEXT_WORDS, &DOCUMENT_WORDS],
    new_state: || State::Attributes(Attributes::default()),
    inherit_attributes: false,
    flush: flush_document,
    cleanup: no_cleanup,
    codepage: font_codepage,
};

/// Characters written as control words or symbols, plus `\u` and `\uc`.
pub(crate) static SPECIAL_WORDS: WordTable = phf_map! {
    "\n" => ControlWord::special("\n"),
    "\r" => ControlWord::special("\n"),
    "-" => ControlWord::special("\u{00AD}"),
    "\\" => ControlWord::special("\\"),
    "_" => ControlWord::special("\u{2011}"),
    "{" => ControlWord::special("{"),
    "}" => ControlWord::special("}"),
    "~" => ControlWord::special("\u{00A0}"),
    "bullet" => ControlWord::special("\u{2022}"),
    "emdash" => ControlWord::special("\u{2014}"),
    "emspace" => ControlWord::special("\u{2003}"),
    "endash" => ControlWord::special("\u{2013}"),
    "enspace" => ControlWord::special("\u{2002}"),
    "line" => ControlWord::special("\u{2028}"),
    "ldblquote" => ControlWord::special("\u{201C}"),
    "lquote" => ControlWord::special("\u{2018}"),
    "ltrmark" => ControlWord::special("\u{200E}"),
    "par" => ControlWord::special("\n"),
    "qmspace" => ControlWord::special("\u{2005}"),
    "rdblquote" => ControlWord::special("\u{201D}"),
    "rquote" => ControlWord::special("\u{2019}"),
    "rtlmark" => ControlWord::special("\u{200F}"),
    "tab" => ControlWord::special("\t"),
    "u" => ControlWord::required(doc_u, false),
    "uc" => ControlWord::required(doc_uc, false),
    "zwbo" => ControlWord::special("\u{200B}"),
    "zwj" => ControlWord::special("\u{200D}"),
    "zwnj" => ControlWord::special("\u{200C}"),
};

/// Character and paragraph formatting.
pub(crate) static FORMATTING_WORDS: WordTable = phf_map! {
    "b" => ControlWord::optional(doc_b, 1, true),
    "cb" => ControlWord::optional(doc_cb, 0, true),
    "cf" => ControlWord::optional(doc_cf, 0, true),
    "charscalex" => ControlWord::optional(doc_charscalex, 100, true),
    "chcbpat" => ControlWord::optional(doc_cb, 0, true),
    "dn" => ControlWord::optional(doc_dn, 6, true),
    "f" => ControlWord::required(doc_f, true),
    "fi" => ControlWord::optional(doc_fi, 0, true),
    "fs" => ControlWord::optional(doc_fs, 24, true),
    "fsmilli" => ControlWord::required(doc_fsmilli, true),
    "highlight" => ControlWord::required(doc_highlight, true),
    "i" => ControlWord::optional(doc_i, 1, true),
    "lang" => ControlWord::required(doc_lang, true),
    "li" => ControlWord::optional(doc_li, 0, true),
    "ltrch" => ControlWord::no_parameter(doc_ltrch, true),
    "ltrpar" => ControlWord::no_parameter(doc_ltrpar, true),
    "nosupersub" => ControlWord::no_parameter(doc_nosupersub, true),
    "pard" => ControlWord::no_parameter(doc_pard, true),
    "plain" => ControlWord::no_parameter(doc_plain, true),
    "qc" => ControlWord::no_parameter(doc_qc, true),
    "qj" => ControlWord::no_parameter(doc_qj, true),
    "ql" => ControlWord::no_parameter(doc_ql, true),
    "qr" => ControlWord::no_parameter(doc_qr, true),
    "ri" => ControlWord::optional(doc_ri, 0, true),
    "rtlch" => ControlWord::no_parameter(doc_rtlch, true),
    "rtlpar" => ControlWord::no_parameter(doc_rtlpar, true),
    "sa" => ControlWord::optional(doc_sa, 0, true),
    "saauto" => ControlWord::optional(doc_saauto, 0, true),
    "sb" => ControlWord::optional(doc_sb, 0, true),
    "sbauto" => ControlWord::optional(doc_sbauto, 0, true),
    "scaps" => ControlWord::optional(doc_scaps, 1, true),
    "slleading" => ControlWord::optional(doc_slleading, 0, true),
    "strike" => ControlWord::optional(doc_strike, 1, true),
    "sub" => ControlWord::no_parameter(doc_sub, true),
    "super" => ControlWord::no_parameter(doc_super, true),
    "tx" => ControlWord::required(doc_tx, false),
    "ul" => ControlWord::optional(doc_ul, 1, true),
    "uld" => ControlWord::optional(doc_ul, 1, true),
    "uldash" => ControlWord::optional(doc_ul, 1, true),
    "uldashd" => ControlWord::optional(doc_ul, 1, true),
    "uldashdd" => ControlWord::optional(doc_ul, 1, true),
    "uldb" => ControlWord::optional(doc_uldb, 1, true),
    "ulhwave" => ControlWord::optional(doc_ulwave, 1, true),
    "ulldash" => ControlWord::optional(doc_ul, 1, true),
    "ulnone" => ControlWord::no_parameter(doc_ulnone, true),
    "ulstyle" => ControlWord::required(doc_ulstyle, true),
    "ulth" => ControlWord::optional(doc_ul, 1, true),
    "ulthd" => ControlWord::optional(doc_ul, 1, true),
    "ulthdash" => ControlWord::optional(doc_ul, 1, true),
    "ulthdashd" => ControlWord::optional(doc_ul, 1, true),
    "ulthdashdd" => ControlWord::optional(doc_ul, 1, true),
    "ulthldash" => ControlWord::optional(doc_ul, 1, true),
    "ululdbwave" => ControlWord::optional(doc_ulwave, 1, true),
    "ulw" => ControlWord::optional(doc_ul, 1, true),
    "ulwave" => ControlWord::optional(doc_ulwave, 1, true),
    "up" => ControlWord::optional(doc_up, 6, true),
    "v" => ControlWord::optional(doc_v, 1, true),
};

/// Words of running text, shared with footnotes.
pub(crate) static TEXT_WORDS: WordTable = phf_map! {
    "chftn" => ControlWord::no_parameter(doc_chftn, false),
    "cs" => ControlWord::required(doc_style, true),
    "ds" => ControlWord::required(doc_style, true),
    "nonshppict" => ControlWord::destination(None, DestinationKind::Ignore, false),
    "pict" => ControlWord::destination(None, DestinationKind::Picture, true),
    "s" => ControlWord::required(doc_style, true),
    "*shppict" => ControlWord::destination(None, DestinationKind::ShapePicture, true),
    "ts" => ControlWord::required(doc_style, true),
    "*ud" => ControlWord::no_parameter(doc_ud, true),
    "upr" => ControlWord::no_parameter(doc_upr, true),
};

/// Preamble and structure words of the document body.
static DOCUMENT_WORDS: WordTable = phf_map! {
    "ansi" => ControlWord::no_parameter(doc_ansi, false),
    "ansicpg" => ControlWord::required(doc_ansicpg, false),
    "cell" => ControlWord::special("\t"),
    "colortbl" => ControlWord::destination(None, DestinationKind::ColorTable, false),
    "deff" => ControlWord::required(doc_deff, false),
    "deflang" => ControlWord::required(doc_deflang, false),
    "fonttbl" => ControlWord::destination(None, DestinationKind::FontTable, false),
    "footnote" => ControlWord::destination(Some(doc_footnote), DestinationKind::Footnote, true),
    "header" => ControlWord::destination(None, DestinationKind::Ignore, false),
    "ilvl" => ControlWord::required(doc_ilvl, false),
    "info" => ControlWord::destination(None, DestinationKind::Ignore, false),
    "mac" => ControlWord::no_parameter(doc_mac, false),
    "NeXTGraphic" => ControlWord::destination(None, DestinationKind::Ignore, false),
    "pc" => ControlWord::no_parameter(doc_pc, false),
    "pca" => ControlWord::no_parameter(doc_pca, false),
    "row" => ControlWord::special("\n"),
    "rtf" => ControlWord::required(doc_rtf, false),
    "stylesheet" => ControlWord::destination(None, DestinationKind::Stylesheet, false),
};

/// Insert the pending text at the insertion point with the current
/// attributes.
fn flush_document(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    let mut text = ctx.take_text();
    // The final paragraph mark does not start a new paragraph
    if ctx.nesting == 0 && text.ends_with('\n') {
        text.pop();
    }
    let Some(attr) = ctx.dest.state.attributes().cloned() else {
        return Ok(());
    };
    if text.is_empty() || attr.unicode_ignore {
        return Ok(());
    }

    let start = Anchor::Mark(ctx.start);
    let end = Anchor::Mark(ctx.end);
    ctx.sink.insert_text(end, &text);
    ctx.apply_attributes(&attr, start, end);
    ctx.sink.move_mark(ctx.start, end);
    Ok(())
}

/// Codepage of the current font, falling back to the default font.
pub(crate) fn font_codepage(ctx: &ParserContext<'_>) -> Option<u16> {
    let attr = ctx.dest.state.attributes()?;
    let font = attr.character.font.or_else(|| ctx.fallback_font())?;
    ctx.fonts.get(font)?.codepage
}

/// Run `f` on the attributes of the innermost group.
#[inline]
fn update(ctx: &mut ParserContext<'_>, f: impl FnOnce(&mut Attributes)) -> RtfResult<()> {
    if let Some(attr) = ctx.attributes_mut() {
        f(attr);
    }
    Ok(())
}

fn positive(value: i32) -> RtfResult<i32> {
    if value <= 0 {
        return Err(RtfError::BadFontSize(value));
    }
    Ok(value)
}

// Special characters

fn doc_u(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    // Code units above 32767 are written as negative numbers
    ctx.push_unicode(param.rem_euclid(0x10000) as u16);
    let skip = ctx
        .dest
        .state
        .attributes()
        .map_or(1, |attr| attr.unicode_skip);
    for _ in 0..skip {
        ctx.lexer.skip_character_or_control_word()?;
    }
    Ok(())
}

fn doc_uc(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.unicode_skip = param.max(0) as u32)
}

// Character formatting

fn doc_b(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.set_flag(CharFlags::BOLD, param != 0))
}

fn doc_i(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.set_flag(CharFlags::ITALIC, param != 0))
}

fn doc_scaps(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.set_flag(CharFlags::SMALL_CAPS, param != 0))
}

fn doc_strike(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.set_flag(CharFlags::STRIKETHROUGH, param != 0))
}

fn doc_v(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.set_flag(CharFlags::INVISIBLE, param != 0))
}

fn doc_cb(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let color = ctx.color_ref(param)?;
    update(ctx, |attr| attr.character.background = Some(color))
}

fn doc_cf(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let color = ctx.color_ref(param)?;
    update(ctx, |attr| attr.character.foreground = Some(color))
}

fn doc_highlight(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let color = ctx.color_ref(param)?;
    update(ctx, |attr| attr.character.highlight = Some(color))
}

fn doc_charscalex(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let scale = positive(param)?;
    update(ctx, |attr| attr.character.scale = scale)
}

fn doc_dn(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.character.rise = param.saturating_neg())
}

fn doc_up(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.character.rise = param)
}

fn doc_f(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    if ctx.fonts.get(param).is_none() {
        tracing::warn!(font = param, "font is not defined in the font table");
        return Ok(());
    }
    update(ctx, |attr| attr.character.font = Some(param))
}

fn doc_fs(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let half_points = positive(param)?;
    update(ctx, |attr| {
        attr.character.size = Some(half_points_to_points(half_points))
    })
}

fn doc_fsmilli(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let millipoints = positive(param)?;
    update(ctx, |attr| {
        attr.character.size = Some(millipoints_to_points(millipoints))
    })
}

fn doc_lang(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.character.language = param)
}

fn doc_ltrch(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        attr.character.direction = Some(TextDirection::LeftToRight)
    })
}

fn doc_rtlch(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        attr.character.direction = Some(TextDirection::RightToLeft)
    })
}

fn doc_nosupersub(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        attr.set_flag(CharFlags::SUBSCRIPT | CharFlags::SUPERSCRIPT, false)
    })
}

fn doc_sub(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        attr.set_flag(CharFlags::SUBSCRIPT, true);
        attr.set_flag(CharFlags::SUPERSCRIPT, false);
    })
}

fn doc_super(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        attr.set_flag(CharFlags::SUPERSCRIPT, true);
        attr.set_flag(CharFlags::SUBSCRIPT, false);
    })
}

fn doc_plain(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    let language = ctx.default_language;
    update(ctx, |attr| attr.reset_character(language))
}

fn underline(ctx: &mut ParserContext<'_>, kind: Underline, param: i32) -> RtfResult<()> {
    let kind = if param != 0 { kind } else { Underline::None };
    update(ctx, |attr| attr.character.underline = kind)
}

fn doc_ul(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    underline(ctx, Underline::Single, param)
}

fn doc_uldb(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    underline(ctx, Underline::Double, param)
}

fn doc_ulwave(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    underline(ctx, Underline::Wave, param)
}

fn doc_ulnone(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    underline(ctx, Underline::None, 0)
}

/// Apple's `\ulstyle`: the low nibble selects the line style.
fn doc_ulstyle(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let kind = match param & 0xF {
        1 => Underline::Single,
        9 => Underline::Double,
        _ => Underline::None,
    };
    update(ctx, |attr| attr.character.underline = kind)
}

// Paragraph formatting

fn doc_pard(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, Attributes::reset_paragraph)
}

fn justify(ctx: &mut ParserContext<'_>, justification: Justification) -> RtfResult<()> {
    update(ctx, |attr| attr.paragraph.justification = Some(justification))
}

fn doc_qc(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    justify(ctx, Justification::Center)
}

fn doc_qj(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    justify(ctx, Justification::Fill)
}

fn doc_ql(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    justify(ctx, Justification::Left)
}

fn doc_qr(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    justify(ctx, Justification::Right)
}

fn doc_ltrpar(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        attr.paragraph.direction = Some(TextDirection::LeftToRight)
    })
}

fn doc_rtlpar(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        attr.paragraph.direction = Some(TextDirection::RightToLeft)
    })
}

fn doc_fi(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.paragraph.indent = param)
}

// Negative margins and spacing are ignored

fn doc_li(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        if param >= 0 {
            attr.paragraph.left_margin = param;
        }
    })
}

fn doc_ri(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        if param >= 0 {
            attr.paragraph.right_margin = param;
        }
    })
}

fn doc_sa(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        if param >= 0 {
            attr.paragraph.space_after = param;
        }
    })
}

fn doc_sb(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        if param >= 0 {
            attr.paragraph.space_before = param;
        }
    })
}

fn doc_slleading(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| {
        if param >= 0 {
            attr.paragraph.leading = param;
        }
    })
}

fn doc_saauto(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.paragraph.ignore_space_after = param != 0)
}

fn doc_sbauto(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.paragraph.ignore_space_before = param != 0)
}

fn doc_tx(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.push_tab(param))
}

// Running text

fn doc_chftn(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    let mut number = itoa::Buffer::new();
    let number = number.format(ctx.footnote_number);
    ctx.push_str(number);
    Ok(())
}

/// `\s`, `\cs`, `\ds` and `\ts`: select a style defined in the stylesheet.
fn doc_style(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    if !ctx.sink.has_tag(&TagName::Style(param)) {
        tracing::warn!(style = param, "style is not defined in the stylesheet");
        return Ok(());
    }
    update(ctx, |attr| attr.style = Some(param))
}

fn doc_ud(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.unicode_ignore = false)
}

fn doc_upr(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    update(ctx, |attr| attr.unicode_ignore = true)
}

// Document preamble and structure

fn character_set(ctx: &mut ParserContext<'_>, charset: CharacterSet) -> RtfResult<()> {
    ctx.default_codepage = charset.codepage();
    Ok(())
}

fn doc_ansi(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    character_set(ctx, CharacterSet::Ansi)
}

fn doc_mac(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    character_set(ctx, CharacterSet::Mac)
}

fn doc_pc(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    character_set(ctx, CharacterSet::Pc)
}

fn doc_pca(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    character_set(ctx, CharacterSet::Pca)
}

fn doc_ansicpg(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    match u16::try_from(param) {
        Ok(codepage) => ctx.codepage = Some(codepage),
        Err(_) => tracing::warn!(codepage = param, "invalid document codepage"),
    }
    Ok(())
}

fn doc_deff(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    ctx.default_font = Some(param);
    Ok(())
}

fn doc_deflang(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    ctx.default_language = param;
    doc_lang(ctx, param)
}

/// Open a footnote region at the end of the document. Body text keeps
/// going in before it.
fn doc_footnote(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    ctx.sink.insert_text(Anchor::End, "\n");
    ctx.sink.move_mark(ctx.end, Anchor::Mark(ctx.start));
    Ok(())
}

/// List level: indent the line with one tab per level.
fn doc_ilvl(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let tabs = "\t".repeat(param.clamp(0, 8) as usize);
    ctx.push_str(&tabs);
    Ok(())
}

fn doc_rtf(_: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    if param != 1 {
        return Err(RtfError::UnsupportedVersion(param));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::rtf::buffer::RichTextBuffer;
    use crate::rtf::error::RtfError;
    use crate::rtf::parser::Parser;
    use crate::rtf::sink::TagName;
    use crate::rtf::types::{Justification, TextDirection};

    fn parse_doc(input: &str) -> RichTextBuffer {
        let mut doc = RichTextBuffer::new();
        Parser::new()
            .without_image_codec()
            .parse(input.as_bytes(), &mut doc)
            .unwrap();
        doc
    }

    #[test]
    fn test_paragraph_formatting() {
        let doc = parse_doc(r"{\rtf1\pard\qc\li720\sb240 centered\par\pard plain}");
        assert_eq!(doc.text(), "centered\nplain");
        let tags = doc.tags_at(0);
        assert!(tags.contains(&&TagName::Justification(Justification::Center)));
        assert!(tags.contains(&&TagName::LeftMargin(720)));
        assert!(tags.contains(&&TagName::SpaceBefore(240)));
        assert!(doc.tags_at(9).is_empty());
    }

    #[test]
    fn test_negative_margins_are_ignored() {
        let doc = parse_doc(r"{\rtf1\li-100\ri-5 x}");
        assert!(doc.tags_at(0).is_empty());
    }

    #[test]
    fn test_auto_spacing_suppresses_space_tags() {
        let doc = parse_doc(r"{\rtf1\sa200\saauto1 x}");
        assert!(doc.tags_at(0).is_empty());
        let doc = parse_doc(r"{\rtf1\sa200\saauto0 x}");
        assert_eq!(doc.tags_at(0), vec![&TagName::SpaceAfter(200)]);
    }

    #[test]
    fn test_plain_restores_default_language() {
        let doc = parse_doc(r"{\rtf1\deflang1031\lang1033 a\plain b}");
        assert_eq!(doc.tags_at(0), vec![&TagName::Language(1033)]);
        assert_eq!(doc.tags_at(1), vec![&TagName::Language(1031)]);
    }

    #[test]
    fn test_superscript_and_subscript_exclude_each_other() {
        let doc = parse_doc(r"{\rtf1{\super\sub a}{\sub\super b}{\super\nosupersub c}}");
        assert_eq!(doc.tags_at(0), vec![&TagName::Subscript]);
        assert_eq!(doc.tags_at(1), vec![&TagName::Superscript]);
        assert!(doc.tags_at(2).is_empty());
    }

    #[test]
    fn test_rise_and_scale() {
        let doc = parse_doc(r"{\rtf1{\up a}{\dn4 b}{\charscalex150 c}}");
        assert_eq!(doc.tags_at(0), vec![&TagName::Rise(6)]);
        assert_eq!(doc.tags_at(1), vec![&TagName::Rise(-4)]);
        assert_eq!(doc.tags_at(2), vec![&TagName::Scale(150)]);
    }

    #[test]
    fn test_font_size_in_millipoints() {
        let doc = parse_doc(r"{\rtf1\fsmilli12500 x}");
        assert_eq!(doc.tags_at(0), vec![&TagName::FontSize(12500)]);
    }

    #[test]
    fn test_character_direction_wins_over_paragraph() {
        let doc = parse_doc(r"{\rtf1\rtlpar{\ltrch a}b}");
        assert_eq!(
            doc.tags_at(0),
            vec![&TagName::Direction(TextDirection::LeftToRight)]
        );
        assert_eq!(
            doc.tags_at(1),
            vec![&TagName::Direction(TextDirection::RightToLeft)]
        );
    }

    #[test]
    fn test_tab_stops_accumulate() {
        let doc = parse_doc(r"{\rtf1\tx720\tx1440 a\tab b}");
        assert_eq!(doc.text(), "a\tb");
        assert_eq!(doc.tags_at(0), vec![&TagName::Tabs([720, 1440].into_iter().collect())]);
    }

    #[test]
    fn test_highlight_uses_color_table() {
        let doc = parse_doc(r"{\rtf1{\colortbl;\red255\green255\blue0;}\highlight1 x}");
        assert_eq!(doc.tags_at(0), vec![&TagName::Highlight(1)]);

        let mut doc = RichTextBuffer::new();
        assert_eq!(
            Parser::new().parse(br"{\rtf1\highlight1 x}", &mut doc),
            Err(RtfError::UndefinedColor(1))
        );
    }

    #[test]
    fn test_table_cells_degrade_to_tabs() {
        let doc = parse_doc(r"{\rtf1 a\cell b\cell\row c}");
        assert_eq!(doc.text(), "a\tb\t\nc");
    }

    #[test]
    fn test_list_levels_insert_tabs() {
        let doc = parse_doc(r"{\rtf1\ilvl2 item}");
        assert_eq!(doc.text(), "\t\titem");
        let doc = parse_doc(r"{\rtf1\ilvl40 x}");
        assert_eq!(doc.text(), "\t\t\t\t\t\t\t\tx");
    }

    #[test]
    fn test_unicode_alternatives() {
        let doc = parse_doc(r"{\rtf1{\upr{ansi}{\*\ud{uni}}}}");
        assert_eq!(doc.text(), "uni");
    }

    #[test]
    fn test_undefined_style_is_ignored() {
        let doc = parse_doc(r"{\rtf1\s3 x}");
        assert_eq!(doc.text(), "x");
        assert!(doc.tags_at(0).is_empty());
    }

    #[test]
    fn test_code_pages() {
        let doc = parse_doc(r"{\rtf1\mac \'8e}");
        assert_eq!(doc.text(), "\u{e9}");
        let doc = parse_doc(r"{\rtf1\ansi\ansicpg1253 \'e1}");
        assert_eq!(doc.text(), "\u{3b1}");
        let doc = parse_doc(r"{\rtf1\pc \'82\'9b}");
        assert_eq!(doc.text(), "\u{e9}\u{a2}");
        let doc = parse_doc(r"{\rtf1\pca \'82\'9b}");
        assert_eq!(doc.text(), "\u{e9}\u{f8}");
        // \ansicpg wins over the character set
        let doc = parse_doc(r"{\rtf1\pc\ansicpg1252 \'82}");
        assert_eq!(doc.text(), "\u{201a}");
    }
}
