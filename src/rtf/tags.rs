//! Named formatting tags shared between the parser and document sinks.
//!
//! The parser never hands raw attribute state to a document. Each active
//! attribute maps to a [`TagName`]; the document registers the tag once with
//! its [`TextProperties`] and then applies it to ranges by name. The same
//! `\b` or `\cf2` recurring anywhere therefore reuses one tag.

use super::state::{Attributes, CharFlags, LANGUAGE_NONE};
use super::types::{
    Color, ColorRef, ColorTable, Justification, TabStops, TextDirection, Underline,
    VerticalPosition,
};
use crate::common::unit::{millipoints_to_points, points_to_millipoints, twips_to_pixels};
use smallvec::SmallVec;
use std::fmt;

/// Scale applied to superscript and subscript text.
pub const SCRIPT_SCALE: f64 = 1.0 / (1.2 * 1.2);

/// Baseline shift of superscript and subscript text, in half-points.
pub const SCRIPT_RISE: i32 = 12;

/// Identity of a formatting tag.
///
/// Lengths are carried in twips and sizes in thousandths of a point so names
/// are exact and hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagName {
    Style(i32),
    Font(i32),
    Foreground(ColorRef),
    Background(ColorRef),
    Highlight(ColorRef),
    FontSize(i32),
    SpaceBefore(i32),
    SpaceAfter(i32),
    LeftMargin(i32),
    RightMargin(i32),
    Indent(i32),
    Leading(i32),
    Language(i32),
    Rise(i32),
    Scale(i32),
    Invisible,
    Italic,
    Bold,
    SmallCaps,
    Strikethrough,
    Underline(Underline),
    Justification(Justification),
    Direction(TextDirection),
    Subscript,
    Superscript,
    Tabs(TabStops),
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rtf-")?;
        match self {
            TagName::Style(index) => write!(f, "style-{}", index),
            TagName::Font(index) => write!(f, "font-{}", index),
            TagName::Foreground(color) => write!(f, "foreground-{}", color),
            TagName::Background(color) => write!(f, "background-{}", color),
            TagName::Highlight(color) => write!(f, "highlight-{}", color),
            TagName::FontSize(milli) => write!(f, "fontsize-{}.{:03}", milli / 1000, milli % 1000),
            TagName::SpaceBefore(twips) => write!(f, "space-before-{}", twips),
            TagName::SpaceAfter(twips) => write!(f, "space-after-{}", twips),
            TagName::LeftMargin(twips) => write!(f, "left-margin-{}", twips),
            TagName::RightMargin(twips) => write!(f, "right-margin-{}", twips),
            TagName::Indent(twips) => write!(f, "indent-{}", twips),
            TagName::Leading(twips) => write!(f, "leading-{}", twips),
            TagName::Language(code) => write!(f, "language-{}", code),
            TagName::Rise(half_points) if *half_points < 0 => write!(f, "down-{}", -half_points),
            TagName::Rise(half_points) => write!(f, "up-{}", half_points),
            TagName::Scale(percent) => write!(f, "scale-{}", percent),
            TagName::Invisible => f.write_str("invisible"),
            TagName::Italic => f.write_str("italic"),
            TagName::Bold => f.write_str("bold"),
            TagName::SmallCaps => f.write_str("smallcaps"),
            TagName::Strikethrough => f.write_str("strikethrough"),
            TagName::Underline(Underline::None) => f.write_str("underline-none"),
            TagName::Underline(Underline::Single) => f.write_str("underline-single"),
            TagName::Underline(Underline::Double) => f.write_str("underline-double"),
            TagName::Underline(Underline::Wave) => f.write_str("underline-wave"),
            TagName::Justification(Justification::Left) => f.write_str("left"),
            TagName::Justification(Justification::Right) => f.write_str("right"),
            TagName::Justification(Justification::Center) => f.write_str("center"),
            TagName::Justification(Justification::Fill) => f.write_str("justified"),
            TagName::Direction(TextDirection::LeftToRight) => f.write_str("left-to-right"),
            TagName::Direction(TextDirection::RightToLeft) => f.write_str("right-to-left"),
            TagName::Subscript => f.write_str("subscript"),
            TagName::Superscript => f.write_str("superscript"),
            TagName::Tabs(stops) => {
                f.write_str("tabs")?;
                for stop in stops {
                    write!(f, "-{}", stop)?;
                }
                Ok(())
            },
        }
    }
}

/// Formatting carried by one tag, in document units: pixels for lengths,
/// points for font sizes, half-points for the baseline rise.
///
/// Unset fields leave the property alone, so several tags can be layered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextProperties {
    /// Font family description, `"Name,Fallback"`
    pub family: Option<String>,
    /// Font size in points
    pub size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub small_caps: Option<bool>,
    pub strikethrough: Option<bool>,
    pub invisible: Option<bool>,
    pub underline: Option<Underline>,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub paragraph_background: Option<Color>,
    /// Baseline shift in half-points
    pub rise: Option<i32>,
    /// Horizontal scale factor, 1.0 is normal width
    pub scale: Option<f64>,
    pub vertical_position: Option<VerticalPosition>,
    /// Windows language identifier
    pub language: Option<i32>,
    pub justification: Option<Justification>,
    pub direction: Option<TextDirection>,
    pub space_above: Option<i32>,
    pub space_below: Option<i32>,
    /// Extra space between wrapped lines
    pub line_spacing: Option<i32>,
    pub left_margin: Option<i32>,
    pub right_margin: Option<i32>,
    /// First line indent
    pub indent: Option<i32>,
    pub tabs: Option<TabStops>,
}

macro_rules! overlay {
    ($dst:ident, $src:ident, $($field:ident),+ $(,)?) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field.clone();
            }
        )+
    };
}

impl TextProperties {
    /// Overlay every field set in `other` onto `self`.
    pub fn merge(&mut self, other: &TextProperties) {
        overlay!(
            self,
            other,
            family,
            size,
            bold,
            italic,
            small_caps,
            strikethrough,
            invisible,
            underline,
            foreground,
            background,
            paragraph_background,
            rise,
            scale,
            vertical_position,
            language,
            justification,
            direction,
            space_above,
            space_below,
            line_spacing,
            left_margin,
            right_margin,
            indent,
            tabs,
        );
    }

    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        *self == TextProperties::default()
    }
}

impl TagName {
    /// Properties for tags that are fully described by their name.
    ///
    /// Font and style tags are registered from the font table and stylesheet
    /// and return `None` here, as do colors missing from `colors`.
    pub fn properties(&self, colors: &ColorTable, dpi: u32) -> Option<TextProperties> {
        let px = |twips: i32| Some(twips_to_pixels(twips, dpi));
        let mut props = TextProperties::default();
        match self {
            TagName::Style(_) | TagName::Font(_) => return None,
            TagName::Foreground(color) => props.foreground = Some(*colors.get(*color)?),
            TagName::Background(color) => props.background = Some(*colors.get(*color)?),
            TagName::Highlight(color) => props.paragraph_background = Some(*colors.get(*color)?),
            TagName::FontSize(milli) => props.size = Some(millipoints_to_points(*milli)),
            TagName::SpaceBefore(twips) => props.space_above = px(*twips),
            TagName::SpaceAfter(twips) => props.space_below = px(*twips),
            TagName::LeftMargin(twips) => props.left_margin = px(*twips),
            TagName::RightMargin(twips) => props.right_margin = px(*twips),
            TagName::Indent(twips) => props.indent = px(*twips),
            TagName::Leading(twips) => props.line_spacing = px(*twips),
            TagName::Language(code) => props.language = Some(*code),
            TagName::Rise(half_points) => props.rise = Some(*half_points),
            TagName::Scale(percent) => props.scale = Some(*percent as f64 / 100.0),
            TagName::Invisible => props.invisible = Some(true),
            TagName::Italic => props.italic = Some(true),
            TagName::Bold => props.bold = Some(true),
            TagName::SmallCaps => props.small_caps = Some(true),
            TagName::Strikethrough => props.strikethrough = Some(true),
            TagName::Underline(kind) => props.underline = Some(*kind),
            TagName::Justification(justification) => props.justification = Some(*justification),
            TagName::Direction(direction) => props.direction = Some(*direction),
            TagName::Subscript => {
                props.rise = Some(-SCRIPT_RISE);
                props.scale = Some(SCRIPT_SCALE);
                props.vertical_position = Some(VerticalPosition::Subscript);
            },
            TagName::Superscript => {
                props.rise = Some(SCRIPT_RISE);
                props.scale = Some(SCRIPT_SCALE);
                props.vertical_position = Some(VerticalPosition::Superscript);
            },
            TagName::Tabs(stops) => {
                props.tabs = Some(stops.iter().map(|&tw| twips_to_pixels(tw, dpi)).collect())
            },
        }
        Some(props)
    }
}

/// Tags describing `attr`, in application order.
///
/// `fallback_font` is applied when the state names no font; the caller
/// passes the document default font only if it is registered.
pub fn attribute_tags(attr: &Attributes, fallback_font: Option<i32>) -> SmallVec<[TagName; 16]> {
    let para = &attr.paragraph;
    let chr = &attr.character;
    let mut tags = SmallVec::new();

    if let Some(style) = attr.style {
        tags.push(TagName::Style(style));
    }
    if let Some(color) = chr.foreground {
        tags.push(TagName::Foreground(color));
    }
    if let Some(color) = chr.background {
        tags.push(TagName::Background(color));
    }
    if let Some(color) = chr.highlight {
        tags.push(TagName::Highlight(color));
    }
    if let Some(size) = chr.size {
        tags.push(TagName::FontSize(points_to_millipoints(size)));
    }
    if para.space_before != 0 && !para.ignore_space_before {
        tags.push(TagName::SpaceBefore(para.space_before));
    }
    if para.space_after != 0 && !para.ignore_space_after {
        tags.push(TagName::SpaceAfter(para.space_after));
    }
    if para.left_margin != 0 {
        tags.push(TagName::LeftMargin(para.left_margin));
    }
    if para.right_margin != 0 {
        tags.push(TagName::RightMargin(para.right_margin));
    }
    if para.indent != 0 {
        tags.push(TagName::Indent(para.indent));
    }
    if chr.flags.contains(CharFlags::INVISIBLE) {
        tags.push(TagName::Invisible);
    }
    if chr.language != LANGUAGE_NONE {
        tags.push(TagName::Language(chr.language));
    }
    if chr.rise != 0 {
        tags.push(TagName::Rise(chr.rise));
    }
    if para.leading != 0 {
        tags.push(TagName::Leading(para.leading));
    }
    if chr.scale != 100 {
        tags.push(TagName::Scale(chr.scale));
    }

    let flag_tags = [
        (CharFlags::ITALIC, TagName::Italic),
        (CharFlags::BOLD, TagName::Bold),
        (CharFlags::SMALL_CAPS, TagName::SmallCaps),
        (CharFlags::STRIKETHROUGH, TagName::Strikethrough),
    ];
    for (flag, tag) in flag_tags {
        if chr.flags.contains(flag) {
            tags.push(tag);
        }
    }

    if chr.underline != Underline::None {
        tags.push(TagName::Underline(chr.underline));
    }
    if let Some(justification) = para.justification {
        tags.push(TagName::Justification(justification));
    }
    // Character direction overrides paragraph direction
    match (para.direction, chr.direction) {
        (_, Some(direction)) | (Some(direction), None) => {
            tags.push(TagName::Direction(direction));
        },
        (None, None) => {},
    }
    if chr.flags.contains(CharFlags::SUBSCRIPT) {
        tags.push(TagName::Subscript);
    }
    if chr.flags.contains(CharFlags::SUPERSCRIPT) {
        tags.push(TagName::Superscript);
    }

    if let Some(font) = chr.font.or(fallback_font) {
        tags.push(TagName::Font(font));
    }
    if let Some(stops) = &para.tabs {
        tags.push(TagName::Tabs(stops.clone()));
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::unit::DEFAULT_DPI;
    use smallvec::smallvec;

    #[test]
    fn test_tag_display_names() {
        assert_eq!(TagName::Bold.to_string(), "rtf-bold");
        assert_eq!(TagName::Foreground(3).to_string(), "rtf-foreground-3");
        assert_eq!(TagName::FontSize(12500).to_string(), "rtf-fontsize-12.500");
        assert_eq!(TagName::Rise(-6).to_string(), "rtf-down-6");
        assert_eq!(TagName::Rise(6).to_string(), "rtf-up-6");
        assert_eq!(TagName::Tabs(smallvec![720, 1440]).to_string(), "rtf-tabs-720-1440");
        assert_eq!(
            TagName::Justification(Justification::Fill).to_string(),
            "rtf-justified"
        );
    }

    #[test]
    fn test_default_attributes_have_no_tags() {
        assert!(attribute_tags(&Attributes::default(), None).is_empty());
    }

    #[test]
    fn test_attribute_tags_order_and_content() {
        let mut attr = Attributes::default();
        attr.style = Some(1);
        attr.character.foreground = Some(2);
        attr.character.size = Some(12.5);
        attr.set_flag(CharFlags::BOLD | CharFlags::SUPERSCRIPT, true);
        attr.paragraph.space_before = 120;
        attr.paragraph.ignore_space_before = true;
        attr.character.font = Some(0);

        let tags = attribute_tags(&attr, Some(7));
        assert_eq!(
            tags.as_slice(),
            &[
                TagName::Style(1),
                TagName::Foreground(2),
                TagName::FontSize(12500),
                TagName::Bold,
                TagName::Superscript,
                TagName::Font(0),
            ]
        );
    }

    #[test]
    fn test_fallback_font_only_without_explicit_font() {
        let attr = Attributes::default();
        assert_eq!(attribute_tags(&attr, Some(2)).as_slice(), &[TagName::Font(2)]);
    }

    #[test]
    fn test_character_direction_wins() {
        let mut attr = Attributes::default();
        attr.paragraph.direction = Some(TextDirection::RightToLeft);
        attr.character.direction = Some(TextDirection::LeftToRight);
        assert_eq!(
            attribute_tags(&attr, None).as_slice(),
            &[TagName::Direction(TextDirection::LeftToRight)]
        );
    }

    #[test]
    fn test_properties_from_name() {
        let mut colors = ColorTable::new();
        colors.add(Color::black());
        colors.add(Color::new(255, 0, 0));

        let props = TagName::Foreground(1).properties(&colors, DEFAULT_DPI).unwrap();
        assert_eq!(props.foreground, Some(Color::new(255, 0, 0)));
        assert!(TagName::Foreground(2).properties(&colors, DEFAULT_DPI).is_none());
        assert!(TagName::Font(0).properties(&colors, DEFAULT_DPI).is_none());

        let props = TagName::LeftMargin(720).properties(&colors, DEFAULT_DPI).unwrap();
        assert_eq!(props.left_margin, Some(36));

        let props = TagName::Subscript.properties(&colors, DEFAULT_DPI).unwrap();
        assert_eq!(props.rise, Some(-SCRIPT_RISE));
        assert_eq!(props.vertical_position, Some(VerticalPosition::Subscript));
    }

    #[test]
    fn test_merge_overlays_set_fields() {
        let mut base = TextProperties {
            bold: Some(true),
            size: Some(10.0),
            ..TextProperties::default()
        };
        let top = TextProperties {
            size: Some(14.0),
            italic: Some(true),
            ..TextProperties::default()
        };
        base.merge(&top);
        assert_eq!(base.bold, Some(true));
        assert_eq!(base.size, Some(14.0));
        assert_eq!(base.italic, Some(true));
        assert!(!base.is_empty());
        assert!(TextProperties::default().is_empty());
    }
}
