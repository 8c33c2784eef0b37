//! Stylesheet destination (`\stylesheet`).
//!
//! Every entry becomes a style tag carrying the merged properties of its
//! formatting words. The entry names themselves are discarded.

use super::document::{FORMATTING_WORDS, SPECIAL_WORDS, font_codepage};
use super::{ControlWord, DestinationInfo, State, WordTable, no_cleanup};
use crate::rtf::error::RtfResult;
use crate::rtf::parser::ParserContext;
use crate::rtf::sink::{TagName, TextProperties};
use crate::rtf::state::Attributes;
use crate::rtf::tags::attribute_tags;
use crate::rtf::types::StyleKind;
use phf::phf_map;

pub(crate) static STYLESHEET_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&SPECIAL_WORDS, &FORMATTING_WORDS, &STYLESHEET_WORDS],
    new_state: || State::Stylesheet(StylesheetState::default()),
    inherit_attributes: false,
    flush: flush_stylesheet,
    cleanup: no_cleanup,
    codepage: font_codepage,
};

static STYLESHEET_WORDS: WordTable = phf_map! {
    "*cs" => ControlWord::required(sty_cs, true),
    "*ds" => ControlWord::required(sty_ds, true),
    "s" => ControlWord::optional(sty_s, 0, true),
    "*ts" => ControlWord::required(sty_ts, true),
};

/// The style being read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StylesheetState {
    pub attributes: Attributes,
    pub index: i32,
    pub kind: StyleKind,
}

fn select(ctx: &mut ParserContext<'_>, index: i32, kind: StyleKind) -> RtfResult<()> {
    if let State::Stylesheet(state) = &mut ctx.dest.state {
        state.index = index;
        state.kind = kind;
    }
    Ok(())
}

fn sty_cs(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    select(ctx, param, StyleKind::Character)
}

fn sty_ds(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    select(ctx, param, StyleKind::Section)
}

fn sty_s(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    select(ctx, param, StyleKind::Paragraph)
}

fn sty_ts(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    select(ctx, param, StyleKind::Table)
}

/// Define a style tag at every semicolon.
fn flush_stylesheet(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    let text = ctx.take_text();
    for _ in memchr::memchr_iter(b';', text.as_bytes()) {
        let State::Stylesheet(state) = &mut ctx.dest.state else {
            return Ok(());
        };
        let style = std::mem::take(state);

        let mut properties = TextProperties::default();
        for tag in attribute_tags(&style.attributes, None) {
            if matches!(tag, TagName::Style(_)) {
                continue;
            }
            if let Some(props) = ctx.tag_properties(&tag) {
                properties.merge(&props);
            }
        }
        tracing::trace!(index = style.index, kind = ?style.kind, "defining style");
        // Redefining an index replaces the earlier style
        ctx.sink.define_tag(&TagName::Style(style.index), properties);
    }
    Ok(())
}
