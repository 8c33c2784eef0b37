//! Font table destination (`\fonttbl`).
//!
//! Each entry is registered with the document as a font tag as soon as its
//! terminating semicolon is read, because any entry may turn out to be the
//! `\deff` default font.

use super::document::SPECIAL_WORDS;
use super::{ControlWord, DestinationInfo, State, WordTable, no_cleanup};
use crate::common::encoding::charset_to_codepage;
use crate::rtf::error::RtfResult;
use crate::rtf::parser::ParserContext;
use crate::rtf::sink::{TagName, TextProperties};
use crate::rtf::types::{FontEntry, FontFamily};
use phf::phf_map;

pub(crate) static FONT_TABLE_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&SPECIAL_WORDS, &FONT_TABLE_WORDS],
    new_state: || State::FontTable(FontTableState::default()),
    inherit_attributes: false,
    flush: flush_font_table,
    cleanup: no_cleanup,
    codepage: entry_codepage,
};

static FONT_TABLE_WORDS: WordTable = phf_map! {
    "f" => ControlWord::required(ft_f, true),
    "fbidi" => ControlWord::no_parameter(ft_fbidi, true),
    "fcharset" => ControlWord::required(ft_fcharset, true),
    "fdecor" => ControlWord::no_parameter(ft_fdecor, true),
    "fmodern" => ControlWord::no_parameter(ft_fmodern, true),
    "fnil" => ControlWord::no_parameter(ft_fnil, true),
    "froman" => ControlWord::no_parameter(ft_froman, true),
    "fscript" => ControlWord::no_parameter(ft_fscript, true),
    "fswiss" => ControlWord::no_parameter(ft_fswiss, true),
    "ftech" => ControlWord::no_parameter(ft_ftech, true),
};

/// The entry being read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FontTableState {
    pub index: i32,
    pub family: FontFamily,
    pub codepage: Option<u16>,
    /// Name text read so far
    pub name: String,
}

impl FontTableState {
    fn take_entry(&mut self) -> FontEntry {
        let state = std::mem::take(self);
        FontEntry {
            index: state.index,
            family: state.family,
            codepage: state.codepage,
            name: state.name.trim().to_string(),
        }
    }
}

fn update(ctx: &mut ParserContext<'_>, f: impl FnOnce(&mut FontTableState)) -> RtfResult<()> {
    if let State::FontTable(state) = &mut ctx.dest.state {
        f(state);
    }
    Ok(())
}

fn ft_f(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.index = param)
}

fn ft_fcharset(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    let codepage = charset_to_codepage(param);
    if codepage.is_none() {
        tracing::warn!(charset = param, "unknown font charset");
    }
    update(ctx, |state| state.codepage = codepage)
}

fn family(ctx: &mut ParserContext<'_>, family: FontFamily) -> RtfResult<()> {
    update(ctx, |state| state.family = family)
}

fn ft_fbidi(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Bidi)
}

fn ft_fdecor(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Decor)
}

fn ft_fmodern(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Modern)
}

fn ft_fnil(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Nil)
}

fn ft_froman(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Roman)
}

fn ft_fscript(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Script)
}

fn ft_fswiss(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Swiss)
}

fn ft_ftech(ctx: &mut ParserContext<'_>, _: i32) -> RtfResult<()> {
    family(ctx, FontFamily::Tech)
}

/// Accumulate the font name and commit an entry at every semicolon.
fn flush_font_table(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    let text = ctx.take_text();
    let State::FontTable(state) = &mut ctx.dest.state else {
        return Ok(());
    };

    let mut rest = text.as_str();
    while let Some(pos) = memchr::memchr(b';', rest.as_bytes()) {
        state.name.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        let entry = state.take_entry();
        let properties = TextProperties {
            family: Some(entry.family_string()),
            ..TextProperties::default()
        };
        // A later entry with the same index replaces the earlier one
        ctx.sink.define_tag(&TagName::Font(entry.index), properties);
        ctx.fonts.insert(entry);
    }
    state.name.push_str(rest);
    Ok(())
}

/// `\'XX` escapes in a font name use the entry's own charset.
fn entry_codepage(ctx: &ParserContext<'_>) -> Option<u16> {
    match &ctx.dest.state {
        State::FontTable(state) => state.codepage,
        _ => None,
    }
}
