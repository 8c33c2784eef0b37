//! Formatting state carried by every group of a text-bearing destination.
//!
//! A fresh copy is pushed for each `{` and dropped on the matching `}`, so
//! formatting set inside a group never leaks out of it.

use super::types::{ColorRef, Justification, TabStops, TextDirection, Underline};
use bitflags::bitflags;

/// Windows language identifier meaning "no language".
pub const LANGUAGE_NONE: i32 = 1024;

bitflags! {
    /// On/off character properties
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CharFlags: u8 {
        const BOLD = 0x01;
        const ITALIC = 0x02;
        const SMALL_CAPS = 0x04;
        const STRIKETHROUGH = 0x08;
        const SUBSCRIPT = 0x10;
        const SUPERSCRIPT = 0x20;
        /// Hidden text (`\v`)
        const INVISIBLE = 0x40;
    }
}

/// Paragraph properties. Lengths are in twips.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphFormat {
    pub justification: Option<Justification>,
    pub direction: Option<TextDirection>,
    /// Space before paragraph
    pub space_before: i32,
    /// Space after paragraph
    pub space_after: i32,
    /// `\sbauto1` lets the consumer choose the space before
    pub ignore_space_before: bool,
    /// `\saauto1` lets the consumer choose the space after
    pub ignore_space_after: bool,
    /// Tab stops; `None` until the first `\tx`
    pub tabs: Option<TabStops>,
    pub left_margin: i32,
    pub right_margin: i32,
    /// First line indent
    pub indent: i32,
    /// Extra space between lines
    pub leading: i32,
}

/// Character properties.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterFormat {
    pub foreground: Option<ColorRef>,
    pub background: Option<ColorRef>,
    pub highlight: Option<ColorRef>,
    /// Font table index
    pub font: Option<i32>,
    /// Size in points
    pub size: Option<f64>,
    pub flags: CharFlags,
    pub underline: Underline,
    pub direction: Option<TextDirection>,
    /// Windows language identifier
    pub language: i32,
    /// Baseline shift in half-points; negative lowers the text
    pub rise: i32,
    /// Horizontal scale in percent
    pub scale: i32,
}

impl Default for CharacterFormat {
    fn default() -> Self {
        Self {
            foreground: None,
            background: None,
            highlight: None,
            font: None,
            size: None,
            flags: CharFlags::empty(),
            underline: Underline::None,
            direction: None,
            language: LANGUAGE_NONE,
            rise: 0,
            scale: 100,
        }
    }
}

/// Complete formatting state of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    /// Stylesheet index from `\s`, `\cs`, `\ds` or `\ts`
    pub style: Option<i32>,
    pub paragraph: ParagraphFormat,
    pub character: CharacterFormat,
    /// Fallback characters to skip after `\u` (`\uc`)
    pub unicode_skip: u32,
    /// Inside `\upr`, where only the `\*\ud` alternative is kept
    pub unicode_ignore: bool,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            style: None,
            paragraph: ParagraphFormat::default(),
            character: CharacterFormat::default(),
            unicode_skip: 1,
            unicode_ignore: false,
        }
    }
}

impl Attributes {
    /// Reset paragraph properties (`\pard`).
    pub fn reset_paragraph(&mut self) {
        self.style = None;
        self.paragraph = ParagraphFormat::default();
    }

    /// Reset character properties (`\plain`), restoring `language`.
    pub fn reset_character(&mut self, language: i32) {
        self.style = None;
        self.character = CharacterFormat {
            language,
            ..CharacterFormat::default()
        };
    }

    #[inline]
    pub fn set_flag(&mut self, flag: CharFlags, on: bool) {
        self.character.flags.set(flag, on);
    }

    #[inline]
    pub fn has_flag(&self, flag: CharFlags) -> bool {
        self.character.flags.contains(flag)
    }

    /// Append a tab stop, creating the tab list on first use.
    pub fn push_tab(&mut self, twips: i32) {
        self.paragraph
            .tabs
            .get_or_insert_with(TabStops::new)
            .push(twips);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let attr = Attributes::default();
        assert_eq!(attr.style, None);
        assert_eq!(attr.character.language, LANGUAGE_NONE);
        assert_eq!(attr.character.scale, 100);
        assert_eq!(attr.character.size, None);
        assert_eq!(attr.unicode_skip, 1);
        assert!(!attr.unicode_ignore);
        assert!(attr.paragraph.tabs.is_none());
    }

    #[test]
    fn test_reset_paragraph_keeps_character() {
        let mut attr = Attributes::default();
        attr.style = Some(2);
        attr.paragraph.left_margin = 720;
        attr.paragraph.justification = Some(Justification::Center);
        attr.push_tab(1440);
        attr.set_flag(CharFlags::BOLD, true);

        attr.reset_paragraph();
        assert_eq!(attr.style, None);
        assert_eq!(attr.paragraph, ParagraphFormat::default());
        assert!(attr.has_flag(CharFlags::BOLD));
    }

    #[test]
    fn test_reset_character_keeps_paragraph() {
        let mut attr = Attributes::default();
        attr.paragraph.indent = 360;
        attr.character.foreground = Some(3);
        attr.set_flag(CharFlags::ITALIC | CharFlags::SUPERSCRIPT, true);
        attr.unicode_skip = 0;

        attr.reset_character(1033);
        assert_eq!(attr.character.foreground, None);
        assert!(attr.character.flags.is_empty());
        assert_eq!(attr.character.language, 1033);
        assert_eq!(attr.paragraph.indent, 360);
        assert_eq!(attr.unicode_skip, 0);
    }

    #[test]
    fn test_tab_stops_deep_copy() {
        let mut outer = Attributes::default();
        outer.push_tab(720);
        let mut inner = outer.clone();
        inner.push_tab(1440);
        assert_eq!(outer.paragraph.tabs.as_deref(), Some(&[720][..]));
        assert_eq!(inner.paragraph.tabs.as_deref(), Some(&[720, 1440][..]));
    }
}
