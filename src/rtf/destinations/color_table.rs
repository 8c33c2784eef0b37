//! Color table destination (`\colortbl`).

use super::document::SPECIAL_WORDS;
use super::{ControlWord, DestinationInfo, State, WordTable, no_cleanup, no_codepage};
use crate::rtf::error::{RtfError, RtfResult};
use crate::rtf::parser::ParserContext;
use crate::rtf::types::Color;
use phf::phf_map;

pub(crate) static COLOR_TABLE_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&SPECIAL_WORDS, &COLOR_TABLE_WORDS],
    new_state: || State::ColorTable(ColorTableState::default()),
    inherit_attributes: false,
    flush: flush_color_table,
    cleanup: no_cleanup,
    codepage: no_codepage,
};

static COLOR_TABLE_WORDS: WordTable = phf_map! {
    "red" => ControlWord::required(ct_red, true),
    "green" => ControlWord::required(ct_green, true),
    "blue" => ControlWord::required(ct_blue, true),
};

/// Components of the entry being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorTableState {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[inline]
fn component(param: i32) -> u8 {
    param.clamp(0, 255) as u8
}

fn update(ctx: &mut ParserContext<'_>, f: impl FnOnce(&mut ColorTableState)) -> RtfResult<()> {
    if let State::ColorTable(state) = &mut ctx.dest.state {
        f(state);
    }
    Ok(())
}

fn ct_red(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.red = component(param))
}

fn ct_green(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.green = component(param))
}

fn ct_blue(ctx: &mut ParserContext<'_>, param: i32) -> RtfResult<()> {
    update(ctx, |state| state.blue = component(param))
}

/// Commit one entry per semicolon. An entry with no components is black.
fn flush_color_table(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    let text = ctx.take_text();
    let State::ColorTable(state) = &mut ctx.dest.state else {
        return Ok(());
    };
    for _ in memchr::memchr_iter(b';', text.as_bytes()) {
        ctx.colors
            .add(Color::new(state.red, state.green, state.blue))
            .ok_or(RtfError::TooManyColors)?;
        *state = ColorTableState::default();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::rtf::buffer::RichTextBuffer;
    use crate::rtf::error::RtfError;
    use crate::rtf::parser::Parser;
    use crate::rtf::sink::TagName;
    use crate::rtf::types::Color;

    fn foreground_of(input: &str) -> Option<Color> {
        let mut doc = RichTextBuffer::new();
        Parser::new()
            .without_image_codec()
            .parse(input.as_bytes(), &mut doc)
            .unwrap();
        let tag = doc
            .tags_at(0)
            .into_iter()
            .find(|tag| matches!(tag, TagName::Foreground(_)))
            .cloned()?;
        doc.tag_properties(&tag)?.foreground
    }

    #[test]
    fn test_entries_in_order() {
        let table = r"{\colortbl;\red255\green0\blue0;\red0\green128\blue255;}";
        assert_eq!(
            foreground_of(&format!(r"{{\rtf1{table}\cf2 x}}")),
            Some(Color::new(0, 128, 255))
        );
        assert_eq!(
            foreground_of(&format!(r"{{\rtf1{table}\cf1 x}}")),
            Some(Color::new(255, 0, 0))
        );
        // The leading empty entry is black
        assert_eq!(
            foreground_of(&format!(r"{{\rtf1{table}\cf0 x}}")),
            Some(Color::black())
        );
    }

    #[test]
    fn test_unicode_escapes_count_as_text() {
        // \u59 is a semicolon and ends an entry; its fallback is skipped
        assert_eq!(
            foreground_of(r"{\rtf1{\colortbl;\u59?\red255;}\cf2 x}"),
            Some(Color::new(255, 0, 0))
        );
    }

    #[test]
    fn test_too_many_entries() {
        let parse = |entries: usize| {
            let input = format!(r"{{\rtf1{{\colortbl{}}}}}", ";".repeat(entries));
            let mut doc = RichTextBuffer::new();
            Parser::new()
                .without_image_codec()
                .parse(input.as_bytes(), &mut doc)
        };
        assert_eq!(parse(65536), Ok(()));
        assert_eq!(parse(65537), Err(RtfError::TooManyColors));
    }

    #[test]
    fn test_components_reset_after_commit() {
        assert_eq!(
            foreground_of(r"{\rtf1{\colortbl\red10\green20\blue30;\blue40;}\cf1 x}"),
            Some(Color::new(0, 0, 40))
        );
    }

    #[test]
    fn test_components_are_clamped() {
        assert_eq!(
            foreground_of(r"{\rtf1{\colortbl\red300\green-4\blue7;}\cf0 x}"),
            Some(Color::new(255, 0, 7))
        );
    }

    #[test]
    fn test_missing_component_parameter() {
        let mut doc = RichTextBuffer::new();
        assert_eq!(
            Parser::new().parse(br"{\rtf1{\colortbl\red;}}", &mut doc),
            Err(RtfError::MissingParameter {
                word: "red".to_string()
            })
        );
    }
}
