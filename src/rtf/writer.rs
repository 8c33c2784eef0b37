//! RTF document writer.
//!
//! The writer reads a [`DocumentSource`] in two passes. The first pass maps
//! every tag in use to the control words reproducing its properties and
//! collects the fonts and colors those words refer to. The second pass writes
//! the header, the font and color tables, and one group per paragraph.
//!
//! Inside a paragraph, tags shared by every run are hoisted into the
//! paragraph prefix. A tag covering a single run gets its own group; tags
//! spanning several runs are switched on where they start and the group is
//! reopened where one of them ends.
//!
//! The output is 7-bit ASCII. Characters outside Latin-1 are written as
//! `\uN?` escapes with a one-byte fallback.

use super::picture::{ImageCodec, default_codec};
use super::source::{DocumentSource, Inline, SourceRun};
use super::state::LANGUAGE_NONE;
use super::tags::TextProperties;
use super::types::{
    Color, ColorTable, FontFamily, Justification, TextDirection, Underline, VerticalPosition,
};
use crate::common::unit::{
    DEFAULT_DPI, pixels_to_twips, points_to_half_points, points_to_millipoints,
};
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::io::{self, Write};
use std::ops::Range;

/// Column after which the writer breaks lines at the next opportunity.
pub const DEFAULT_WRAP_COLUMN: usize = 60;

/// Picture bytes per line of hex output.
pub const DEFAULT_HEX_BYTES_PER_LINE: usize = 40;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// RTF writer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Soft line length of the output
    pub wrap_column: usize,
    /// Picture bytes written per line
    pub hex_bytes_per_line: usize,
    /// Value of `\deflang`
    pub default_language: i32,
    /// Name and version recorded in `\*\generator`, omitted when `None`
    pub generator: Option<String>,
    /// Write an `\info` group with the creation time
    pub info: bool,
    /// Creation time for `\info`, the current local time when `None`
    pub created: Option<NaiveDateTime>,
    /// Resolution used to turn pixel lengths back into twips
    pub dpi: u32,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            wrap_column: DEFAULT_WRAP_COLUMN,
            hex_bytes_per_line: DEFAULT_HEX_BYTES_PER_LINE,
            default_language: LANGUAGE_NONE,
            generator: Some(
                concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")).to_string(),
            ),
            info: true,
            created: None,
            dpi: DEFAULT_DPI,
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wrap_column(mut self, column: usize) -> Self {
        self.wrap_column = column;
        self
    }

    pub fn with_default_language(mut self, language: i32) -> Self {
        self.default_language = language;
        self
    }

    pub fn with_generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_info(mut self, info: bool) -> Self {
        self.info = info;
        self
    }

    pub fn with_created(mut self, created: NaiveDateTime) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }
}

/// RTF document writer
///
/// ```
/// use rtfcodec::rtf::{RichTextBuffer, RtfWriter};
///
/// let mut doc = RichTextBuffer::new();
/// doc.append("Hello\n", &[]);
///
/// let mut writer = RtfWriter::new(Vec::new());
/// writer.write_document(&doc, 0..doc.len())?;
/// let rtf = String::from_utf8(writer.into_inner()).unwrap();
/// assert!(rtf.starts_with("{\\rtf1"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct RtfWriter<W: Write> {
    writer: W,
    options: WriterOptions,
    codec: Option<Box<dyn ImageCodec>>,
}

impl<W: Write> RtfWriter<W> {
    /// Create a writer with default options and the default image codec.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            options: WriterOptions::default(),
            codec: default_codec(),
        }
    }

    pub fn with_options(mut self, options: WriterOptions) -> Self {
        self.options = options;
        self
    }

    /// Use `codec` to encode document images.
    pub fn with_image_codec(mut self, codec: Box<dyn ImageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Drop document images from the output.
    pub fn without_image_codec(mut self) -> Self {
        self.codec = None;
        self
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Write the content of `range` as a complete RTF document.
    ///
    /// Nothing is written when the range holds no paragraph.
    pub fn write_document<S: DocumentSource + ?Sized>(
        &mut self,
        source: &S,
        range: Range<usize>,
    ) -> io::Result<()> {
        let output = Serializer::new(&self.options, self.codec.as_deref()).run(source, range);
        self.writer.write_all(output.as_bytes())
    }

    /// Flush the writer
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize `range` of `source` with default options.
///
/// Returns an empty string when the range holds no paragraph.
pub fn serialize<S: DocumentSource + ?Sized>(source: &S, range: Range<usize>) -> String {
    let options = WriterOptions::default();
    let codec = default_codec();
    Serializer::new(&options, codec.as_deref()).run(source, range)
}

/// Output buffer tracking the current column.
struct Output {
    text: String,
    column: usize,
    wrap_column: usize,
}

impl Output {
    fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        match s.rfind('\n') {
            Some(pos) => self.column = s.len() - pos - 1,
            None => self.column += s.len(),
        }
    }

    fn push(&mut self, c: char) {
        self.text.push(c);
        if c == '\n' {
            self.column = 0;
        } else {
            self.column += c.len_utf8();
        }
    }

    fn push_int(&mut self, value: i32) {
        let mut buffer = itoa::Buffer::new();
        self.push_str(buffer.format(value));
    }

    fn control_word(&mut self, word: &str, param: Option<i32>) {
        self.push('\\');
        self.push_str(word);
        if let Some(param) = param {
            self.push_int(param);
        }
    }

    /// Delimiter after a control word, turned into a line break past the
    /// wrap column.
    fn space_or_newline(&mut self) {
        if self.column > self.wrap_column {
            self.push('\n');
        } else {
            self.push(' ');
        }
    }

    fn escaped_text(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\t' => self.control_word("tab", None),
                '\n' => self.control_word("par", None),
                '\\' | '{' | '}' => {
                    self.push('\\');
                    self.push(c);
                    continue;
                },
                ' ' => {
                    if self.column > self.wrap_column {
                        self.push('\n');
                    }
                    self.push(' ');
                    continue;
                },
                '\u{21}'..='\u{7E}' => {
                    self.push(c);
                    continue;
                },
                '\u{A0}' => {
                    self.push_str("\\~");
                    continue;
                },
                '\u{AD}' => {
                    self.push_str("\\-");
                    continue;
                },
                '\u{2011}' => {
                    self.push_str("\\_");
                    continue;
                },
                '\u{A1}'..='\u{FF}' => {
                    let byte = c as u32 as u8;
                    self.push_str("\\'");
                    self.push(HEX_DIGITS[(byte >> 4) as usize] as char);
                    self.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
                    continue;
                },
                _ => match special_word(c) {
                    Some(word) => self.control_word(word, None),
                    None => {
                        self.unicode_escape(c);
                        continue;
                    },
                },
            }
            self.space_or_newline();
        }
    }

    /// `\uN?` escapes, one per UTF-16 unit.
    fn unicode_escape(&mut self, c: char) {
        let mut units = [0u16; 2];
        for &unit in c.encode_utf16(&mut units).iter() {
            self.control_word("u", Some(unit as i16 as i32));
            self.push('?');
        }
    }
}

fn special_word(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{2002}' => "enspace",
        '\u{2003}' => "emspace",
        '\u{2005}' => "qmspace",
        '\u{200B}' => "zwbo",
        '\u{200C}' => "zwnj",
        '\u{200D}' => "zwj",
        '\u{200E}' => "ltrmark",
        '\u{200F}' => "rtlmark",
        '\u{2013}' => "endash",
        '\u{2014}' => "emdash",
        '\u{2018}' => "lquote",
        '\u{2019}' => "rquote",
        '\u{201C}' => "ldblquote",
        '\u{201D}' => "rdblquote",
        '\u{2022}' => "bullet",
        '\u{2028}' => "line",
        _ => return None,
    })
}

/// Fonts and colors referenced by the tag codes.
struct Tables {
    fonts: Vec<String>,
    colors: ColorTable,
}

impl Tables {
    fn font(&mut self, family: &str) -> i32 {
        let index = match self.fonts.iter().position(|f| f == family) {
            Some(index) => index,
            None => {
                self.fonts.push(family.to_string());
                self.fonts.len() - 1
            },
        };
        index as i32
    }
}

fn push_word(code: &mut String, word: &str, param: Option<i32>) {
    code.push('\\');
    code.push_str(word);
    if let Some(param) = param {
        let mut buffer = itoa::Buffer::new();
        code.push_str(buffer.format(param));
    }
}

fn push_toggle(code: &mut String, word: &str, on: bool) {
    push_word(code, word, if on { None } else { Some(0) });
}

fn color_index(tables: &mut Tables, color: Color) -> Option<i32> {
    let index = tables.colors.index_of_or_add(color);
    if index.is_none() {
        tracing::warn!(?color, "color table is full, dropping color");
    }
    index.map(i32::from)
}

/// Control words reproducing `props`.
fn property_code(props: &TextProperties, tables: &mut Tables, dpi: u32) -> String {
    let twips = |pixels: i32| Some(pixels_to_twips(pixels, dpi));
    let mut code = String::new();

    if let Some(index) = props.background.and_then(|color| color_index(tables, color)) {
        push_word(&mut code, "chshdng", Some(0));
        push_word(&mut code, "chcbpat", Some(index));
        push_word(&mut code, "cb", Some(index));
    }
    if let Some(family) = &props.family {
        let index = tables.font(family);
        push_word(&mut code, "f", Some(index));
    }
    if let Some(index) = props.foreground.and_then(|color| color_index(tables, color)) {
        push_word(&mut code, "cf", Some(index));
    }
    if let Some(indent) = props.indent {
        push_word(&mut code, "fi", twips(indent));
    }
    if let Some(invisible) = props.invisible {
        push_toggle(&mut code, "v", invisible);
    }
    if let Some(justification) = props.justification {
        let word = match justification {
            Justification::Left => "ql",
            Justification::Right => "qr",
            Justification::Center => "qc",
            Justification::Fill => "qj",
        };
        push_word(&mut code, word, None);
    }
    if let Some(language) = props.language {
        push_word(&mut code, "lang", Some(language));
    }
    if let Some(margin) = props.left_margin {
        push_word(&mut code, "li", twips(margin));
    }
    if let Some(index) = props
        .paragraph_background
        .and_then(|color| color_index(tables, color))
    {
        push_word(&mut code, "highlight", Some(index));
    }
    if let Some(space) = props.space_above {
        push_word(&mut code, "sb", twips(space));
    }
    if let Some(space) = props.space_below {
        push_word(&mut code, "sa", twips(space));
    }
    if let Some(spacing) = props.line_spacing {
        push_word(&mut code, "slleading", twips(spacing));
    }
    if let Some(margin) = props.right_margin {
        push_word(&mut code, "ri", twips(margin));
    }
    // \super and \sub carry their own rise and scale
    if props.vertical_position.is_none() {
        match props.rise {
            Some(rise) if rise > 0 => push_word(&mut code, "up", Some(rise)),
            Some(rise) if rise < 0 => push_word(&mut code, "dn", Some(-rise)),
            Some(_) => code.push_str("\\up0\\dn0"),
            None => {},
        }
        match props.scale.map(|scale| (scale * 100.0).round() as i32) {
            Some(percent) if percent > 0 => push_word(&mut code, "charscalex", Some(percent)),
            _ => {},
        }
    }
    // Sizes below half a point cannot be expressed
    match props.size {
        Some(size) if points_to_half_points(size) > 0 => {
            push_word(&mut code, "fs", Some(points_to_half_points(size)));
            let milli = points_to_millipoints(size);
            if milli % 500 != 0 {
                push_word(&mut code, "fsmilli", Some(milli));
            }
        },
        _ => {},
    }
    if let Some(strike) = props.strikethrough {
        push_toggle(&mut code, "strike", strike);
    }
    if let Some(italic) = props.italic {
        push_toggle(&mut code, "i", italic);
    }
    if let Some(tabs) = &props.tabs {
        for &stop in tabs {
            push_word(&mut code, "tx", twips(stop));
        }
    }
    if let Some(underline) = props.underline {
        match underline {
            Underline::None => code.push_str("\\ul0\\ulnone"),
            Underline::Single => push_word(&mut code, "ul", None),
            Underline::Double => push_word(&mut code, "uldb", None),
            Underline::Wave => push_word(&mut code, "ulwave", None),
        }
    }
    if let Some(small_caps) = props.small_caps {
        push_toggle(&mut code, "scaps", small_caps);
    }
    if let Some(bold) = props.bold {
        push_toggle(&mut code, "b", bold);
    }
    if let Some(direction) = props.direction {
        let word = match direction {
            TextDirection::LeftToRight => "ltrch",
            TextDirection::RightToLeft => "rtlch",
        };
        push_word(&mut code, word, None);
    }
    if let Some(position) = props.vertical_position {
        let word = match position {
            VerticalPosition::Superscript => "super",
            VerticalPosition::Subscript => "sub",
        };
        push_word(&mut code, word, None);
    }
    code
}

/// One serialization run.
struct Serializer<'a> {
    options: &'a WriterOptions,
    codec: Option<&'a dyn ImageCodec>,
    out: Output,
    tables: Tables,
}

impl<'a> Serializer<'a> {
    fn new(options: &'a WriterOptions, codec: Option<&'a dyn ImageCodec>) -> Self {
        Self {
            options,
            codec,
            out: Output {
                text: String::new(),
                column: 0,
                wrap_column: options.wrap_column,
            },
            tables: Tables {
                fonts: Vec::new(),
                colors: ColorTable::with_black(),
            },
        }
    }

    fn run<S: DocumentSource + ?Sized>(mut self, source: &S, range: Range<usize>) -> String {
        let paragraphs: Vec<Vec<SourceRun<S::Tag>>> = source
            .paragraphs(range)
            .into_iter()
            .map(|paragraph| source.runs(paragraph))
            .collect();
        if paragraphs.is_empty() {
            return String::new();
        }

        let properties: HashMap<S::Tag, TextProperties> = source.tags().into_iter().collect();
        let mut codes: HashMap<S::Tag, String> = HashMap::new();
        for run in paragraphs.iter().flatten() {
            for tag in &run.tags {
                if codes.contains_key(tag) {
                    continue;
                }
                let code = match properties.get(tag) {
                    Some(props) => property_code(props, &mut self.tables, self.options.dpi),
                    None => String::new(),
                };
                codes.insert(tag.clone(), code);
            }
        }
        tracing::debug!(
            paragraphs = paragraphs.len(),
            tags = codes.len(),
            fonts = self.tables.fonts.len(),
            colors = self.tables.colors.len(),
            "serializing document"
        );

        self.write_header();
        for runs in &paragraphs {
            self.write_paragraph(runs, &codes);
        }
        self.out.push('}');
        self.out.text
    }

    fn write_header(&mut self) {
        let out = &mut self.out;
        out.push('{');
        out.control_word("rtf", Some(1));
        out.control_word("ansi", None);
        out.control_word("deff", Some(0));
        out.control_word("uc", Some(1));
        out.push('\n');

        out.push('{');
        out.control_word("fonttbl", None);
        out.push('\n');
        if self.tables.fonts.is_empty() {
            out.push_str("{\\f0\\fswiss Sans;}\n");
        }
        for (index, family) in self.tables.fonts.iter().enumerate() {
            let (name, keyword) = match family.split_once(',') {
                Some((name, fallback)) => (name, FontFamily::from_fallback(fallback).keyword()),
                None => (family.as_str(), FontFamily::Nil.keyword()),
            };
            out.push('{');
            out.control_word("f", Some(index as i32));
            out.control_word(keyword, None);
            out.push(' ');
            out.escaped_text(name);
            out.push_str(";}\n");
        }
        out.push_str("}\n");

        // Entry 0 stays empty: the automatic color, pinned to black
        out.push('{');
        out.control_word("colortbl", None);
        out.push_str("\n;\n");
        for color in self.tables.colors.colors().iter().skip(1) {
            out.control_word("red", Some(color.red as i32));
            out.control_word("green", Some(color.green as i32));
            out.control_word("blue", Some(color.blue as i32));
            out.push_str(";\n");
        }
        out.push_str("}\n");

        if let Some(generator) = &self.options.generator {
            out.push_str("{\\*\\generator ");
            out.escaped_text(generator);
            out.push_str("}\n");
        }

        if self.options.info {
            let created = self
                .options
                .created
                .unwrap_or_else(|| Local::now().naive_local());
            out.push_str("{\\info {\\author .}{\\company .}{\\title .}\n{");
            out.control_word("creatim", None);
            out.control_word("yr", Some(created.year()));
            out.control_word("mo", Some(created.month() as i32));
            out.control_word("dy", Some(created.day() as i32));
            out.control_word("hr", Some(created.hour() as i32));
            out.control_word("min", Some(created.minute() as i32));
            out.push_str("}}\n");
        }

        out.control_word("deflang", Some(self.options.default_language));
        out.control_word("plain", None);
        out.control_word("widowctrl", None);
        out.control_word("hyphauto", None);
        out.push('\n');
    }

    /// Write the codes of `tags`, followed by a delimiter if any were written.
    fn write_codes<'t, T, I>(&mut self, tags: I, codes: &HashMap<T, String>)
    where
        T: Eq + Hash + 't,
        I: IntoIterator<Item = &'t T>,
    {
        let before = self.out.text.len();
        for tag in tags {
            if let Some(code) = codes.get(tag) {
                self.out.push_str(code);
            }
        }
        if self.out.text.len() != before {
            self.out.space_or_newline();
        }
    }

    fn write_paragraph<T: Clone + Eq + Hash>(
        &mut self,
        runs: &[SourceRun<T>],
        codes: &HashMap<T, String>,
    ) {
        let Some((first, rest)) = runs.split_first() else {
            return;
        };

        let hoisted: Vec<&T> = first
            .tags
            .iter()
            .filter(|tag| rest.iter().all(|run| run.tags.contains(tag)))
            .collect();
        let sets: Vec<Vec<&T>> = runs
            .iter()
            .map(|run| run.tags.iter().filter(|tag| !hoisted.contains(tag)).collect())
            .collect();

        self.out.push('{');
        self.out.control_word("pard", None);
        self.out.control_word("plain", None);
        for tag in &hoisted {
            if let Some(code) = codes.get(*tag) {
                self.out.push_str(code);
            }
        }
        self.out.space_or_newline();
        self.out.push('{');

        for (i, run) in runs.iter().enumerate() {
            let current = &sets[i];
            let previous = i.checked_sub(1).map(|j| &sets[j]);
            let next = sets.get(i + 1);

            let starting: Vec<&T> = current
                .iter()
                .copied()
                .filter(|tag| previous.is_none_or(|set| !set.contains(tag)))
                .collect();
            let ending: Vec<&T> = current
                .iter()
                .copied()
                .filter(|tag| next.is_none_or(|set| !set.contains(tag)))
                .collect();
            let (only, spanning): (Vec<&T>, Vec<&T>) = starting
                .iter()
                .copied()
                .partition(|tag| ending.contains(tag));

            self.write_codes(spanning, codes);
            if only.is_empty() {
                self.write_content(run);
            } else {
                self.out.push('{');
                self.write_codes(only.iter().copied(), codes);
                self.write_content(run);
                self.out.push('}');
            }

            // Close the group to switch off tags that end here and restore
            // the ones that go on
            if let Some(next) = next {
                let closing = ending.iter().any(|tag| !starting.contains(tag));
                if closing {
                    self.out.push_str("}{");
                    let continuing = next.iter().copied().filter(|tag| current.contains(tag));
                    self.write_codes(continuing, codes);
                }
            }
        }
        self.out.push_str("}}\n");
    }

    fn write_content<T>(&mut self, run: &SourceRun<T>) {
        for inline in &run.content {
            match inline {
                Inline::Text(text) => self.out.escaped_text(text),
                Inline::Image(image) => self.write_picture(image),
            }
        }
    }

    fn write_picture(&mut self, image: &super::picture::Image) {
        let Some(codec) = self.codec else {
            tracing::warn!("no image codec installed, dropping picture");
            return;
        };
        let png = match codec.encode_png(image) {
            Ok(png) => png,
            Err(err) => {
                tracing::warn!(%err, "dropping picture");
                return;
            },
        };

        let out = &mut self.out;
        out.push('{');
        out.control_word("pict", None);
        out.control_word("pngblip", None);
        out.control_word("picw", Some(image.width() as i32));
        out.control_word("pich", Some(image.height() as i32));
        let per_line = self.options.hex_bytes_per_line.max(1);
        for chunk in png.chunks(per_line) {
            out.push('\n');
            for &byte in chunk {
                out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
                out.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
            }
        }
        out.push_str("\n}");
    }
}
