//! RTF document type definitions.

use smallvec::SmallVec;

/// Color reference (index into color table).
pub type ColorRef = u16;

/// Tab stop positions, in twips when held by the parser and in pixels once
/// they reach the document.
pub type TabStops = SmallVec<[i32; 8]>;

/// RTF color representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red component (0-255)
    pub red: u8,
    /// Green component (0-255)
    pub green: u8,
    /// Blue component (0-255)
    pub blue: u8,
}

impl Color {
    /// Create a new color.
    #[inline]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Black color.
    #[inline]
    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// White color.
    #[inline]
    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    #[inline]
    pub const fn is_black(&self) -> bool {
        self.red == 0 && self.green == 0 && self.blue == 0
    }
}

/// Color table containing document colors.
///
/// The parser appends every committed entry. The writer goes through
/// [`ColorTable::index_of_or_add`], which deduplicates and keeps black pinned
/// at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Color>,
}

impl ColorTable {
    /// Create an empty color table.
    #[inline]
    pub fn new() -> Self {
        Self { colors: Vec::new() }
    }

    /// Create a table whose index 0 is black.
    #[inline]
    pub fn with_black() -> Self {
        Self {
            colors: vec![Color::black()],
        }
    }

    /// Add a color to the table and return its index, or `None` once every
    /// [`ColorRef`] is taken.
    #[inline]
    pub fn add(&mut self, color: Color) -> Option<ColorRef> {
        let index = ColorRef::try_from(self.colors.len()).ok()?;
        self.colors.push(color);
        Some(index)
    }

    /// Get a color by reference.
    #[inline]
    pub fn get(&self, color_ref: ColorRef) -> Option<&Color> {
        self.colors.get(color_ref as usize)
    }

    /// Return the index of `color`, appending it if it is not in the table.
    ///
    /// Black always maps to index 0. Returns `None` if the color is new and
    /// the table is full.
    pub fn index_of_or_add(&mut self, color: Color) -> Option<ColorRef> {
        if color.is_black() {
            return Some(0);
        }
        match self.colors.iter().skip(1).position(|c| *c == color) {
            Some(pos) => ColorRef::try_from(pos + 1).ok(),
            None => {
                if self.colors.is_empty() {
                    self.colors.push(Color::black());
                }
                self.add(color)
            },
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Get all colors in the table.
    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Font family categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    /// Nil (unknown or default)
    #[default]
    Nil,
    /// Roman (serif) fonts
    Roman,
    /// Swiss (sans-serif) fonts
    Swiss,
    /// Modern (monospace) fonts
    Modern,
    /// Script fonts
    Script,
    /// Decorative fonts
    Decor,
    /// Technical, symbol, and mathematical fonts
    Tech,
    /// Arabic, Hebrew and other bidirectional fonts
    Bidi,
}

impl FontFamily {
    /// Generic family name to fall back on when the named font is missing.
    pub const fn fallback(self) -> Option<&'static str> {
        match self {
            FontFamily::Nil | FontFamily::Swiss => Some("Sans"),
            FontFamily::Roman => Some("Serif"),
            FontFamily::Modern => Some("Monospace"),
            FontFamily::Script => Some("Script"),
            FontFamily::Decor | FontFamily::Tech | FontFamily::Bidi => None,
        }
    }

    /// Family whose fallback is `name`, used when writing a font table.
    pub fn from_fallback(name: &str) -> Self {
        match name {
            "Sans" => FontFamily::Swiss,
            "Serif" => FontFamily::Roman,
            "Monospace" => FontFamily::Modern,
            "Script" => FontFamily::Script,
            _ => FontFamily::Nil,
        }
    }

    /// Font table control word for this family.
    pub const fn keyword(self) -> &'static str {
        match self {
            FontFamily::Nil => "fnil",
            FontFamily::Roman => "froman",
            FontFamily::Swiss => "fswiss",
            FontFamily::Modern => "fmodern",
            FontFamily::Script => "fscript",
            FontFamily::Decor => "fdecor",
            FontFamily::Tech => "ftech",
            FontFamily::Bidi => "fbidi",
        }
    }
}

/// One committed font table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontEntry {
    /// Index used by `\f`
    pub index: i32,
    /// Font family category
    pub family: FontFamily,
    /// Codepage derived from `\fcharset`, if any
    pub codepage: Option<u16>,
    /// Font name as written in the table
    pub name: String,
}

impl FontEntry {
    /// Family description handed to the document: the font name followed by
    /// the generic fallback, e.g. `"Times New Roman,Serif"`.
    pub fn family_string(&self) -> String {
        match self.family.fallback() {
            Some(fallback) if self.name.is_empty() => fallback.to_string(),
            Some(fallback) => format!("{},{}", self.name, fallback),
            None => self.name.clone(),
        }
    }
}

/// Font table containing document fonts.
///
/// Entries are kept in commit order. A later entry with the same index
/// shadows the earlier one for lookups.
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    entries: Vec<FontEntry>,
}

impl FontTable {
    /// Create a new font table.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn insert(&mut self, entry: FontEntry) {
        self.entries.push(entry);
    }

    /// Get the most recent entry registered for `index`.
    #[inline]
    pub fn get(&self, index: i32) -> Option<&FontEntry> {
        self.entries.iter().rev().find(|entry| entry.index == index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all entries in commit order.
    #[inline]
    pub fn entries(&self) -> &[FontEntry] {
        &self.entries
    }
}

/// Paragraph justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Justification {
    Left,
    Right,
    Center,
    /// Justified to both margins
    Fill,
}

/// Underline kinds the document model distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    Wave,
}

/// Text or paragraph direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
}

/// Superscript or subscript placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalPosition {
    Superscript,
    Subscript,
}

/// Stylesheet entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleKind {
    #[default]
    Paragraph,
    Character,
    Section,
    Table,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_table_parse_side_appends() {
        let mut table = ColorTable::new();
        assert_eq!(table.add(Color::black()), Some(0));
        assert_eq!(table.add(Color::new(255, 0, 0)), Some(1));
        assert_eq!(table.add(Color::new(255, 0, 0)), Some(2));
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1), Some(&Color::new(255, 0, 0)));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_color_table_is_bounded_by_color_ref() {
        let mut table = ColorTable::new();
        for _ in 0..=ColorRef::MAX {
            assert!(table.add(Color::white()).is_some());
        }
        assert_eq!(table.len(), 65536);
        assert_eq!(table.add(Color::white()), None);
        assert_eq!(table.len(), 65536);
        assert_eq!(table.index_of_or_add(Color::new(1, 2, 3)), None);
        assert_eq!(table.index_of_or_add(Color::white()), Some(1));
    }

    #[test]
    fn test_color_table_writer_side_dedupes() {
        let mut table = ColorTable::with_black();
        assert_eq!(table.index_of_or_add(Color::black()), Some(0));
        assert_eq!(table.index_of_or_add(Color::new(0, 0, 255)), Some(1));
        assert_eq!(table.index_of_or_add(Color::white()), Some(2));
        assert_eq!(table.index_of_or_add(Color::new(0, 0, 255)), Some(1));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_color_table_pins_black_when_empty() {
        let mut table = ColorTable::new();
        assert_eq!(table.index_of_or_add(Color::white()), Some(1));
        assert_eq!(table.colors(), &[Color::black(), Color::white()]);
    }

    #[test]
    fn test_font_table_later_entry_shadows() {
        let mut table = FontTable::new();
        table.insert(FontEntry {
            index: 0,
            family: FontFamily::Roman,
            codepage: None,
            name: "Times".to_string(),
        });
        table.insert(FontEntry {
            index: 0,
            family: FontFamily::Swiss,
            codepage: Some(1251),
            name: "Arial".to_string(),
        });
        assert_eq!(table.len(), 2);
        let entry = table.get(0).unwrap();
        assert_eq!(entry.name, "Arial");
        assert_eq!(entry.codepage, Some(1251));
        assert!(table.get(1).is_none());
    }

    #[test]
    fn test_family_string() {
        let mut entry = FontEntry {
            index: 3,
            family: FontFamily::Modern,
            codepage: None,
            name: "Courier New".to_string(),
        };
        assert_eq!(entry.family_string(), "Courier New,Monospace");
        entry.family = FontFamily::Tech;
        assert_eq!(entry.family_string(), "Courier New");
    }

    #[test]
    fn test_family_fallback_round_trip() {
        for family in [
            FontFamily::Roman,
            FontFamily::Swiss,
            FontFamily::Modern,
            FontFamily::Script,
        ] {
            let fallback = family.fallback().unwrap();
            assert_eq!(FontFamily::from_fallback(fallback).fallback(), Some(fallback));
        }
        assert_eq!(FontFamily::from_fallback("Fantasy"), FontFamily::Nil);
    }
}
