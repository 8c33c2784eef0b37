//! RTF parser: the group and destination state machine.
//!
//! The parser drives a [`Lexer`] over the input and keeps a stack of
//! destinations, each with its own stack of per-group states. Literal text
//! is collected in a pending buffer and handed to the active destination's
//! flush function whenever formatting is about to change, so every stretch
//! of text reaches the [`DocumentSink`] together with the attributes that
//! were in force when it was read.

use super::destinations::{Destination, DestinationKind, State, WordKind};
use super::error::{RtfError, RtfResult};
use super::lexer::{ControlWord, Lexer, Token};
use super::picture::{ImageCodec, default_codec};
use super::sink::{Anchor, DocumentSink, Gravity, MarkId, TagName, TextProperties};
use super::state::{Attributes, LANGUAGE_NONE};
use super::tags::attribute_tags;
use super::types::{ColorRef, ColorTable, FontTable};
use crate::common::encoding::{ByteDecoder, TextEncoding};
use crate::common::unit::DEFAULT_DPI;
use serde::{Deserialize, Serialize};
use std::mem;

/// Parser configuration.
///
/// # Examples
///
/// ```
/// use rtfcodec::rtf::ParserOptions;
///
/// let options = ParserOptions::new()
///     .with_default_codepage(1251)
///     .with_dpi(96);
/// assert_eq!(options.default_language, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Codepage for `\'XX` escapes when neither the document nor the current
    /// font names one
    pub default_codepage: u16,
    /// Language restored by `\plain` until `\deflang` overrides it
    pub default_language: i32,
    /// Resolution for converting twips to pixels
    pub dpi: u32,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            default_codepage: 1252,
            default_language: LANGUAGE_NONE,
            dpi: DEFAULT_DPI,
        }
    }
}

impl ParserOptions {
    /// Create default parser options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback codepage.
    pub fn with_default_codepage(mut self, codepage: u16) -> Self {
        self.default_codepage = codepage;
        self
    }

    /// Set the fallback language.
    pub fn with_default_language(mut self, language: i32) -> Self {
        self.default_language = language;
        self
    }

    /// Set the conversion resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }
}

/// RTF parser.
///
/// A parser holds only configuration; every call to [`parse`](Self::parse)
/// starts from a clean state, so one parser can be reused.
///
/// # Examples
///
/// ```
/// use rtfcodec::rtf::{Parser, RichTextBuffer};
///
/// let mut doc = RichTextBuffer::new();
/// Parser::new().parse(br"{\rtf1\ansi Hello {\b world}\par}", &mut doc)?;
/// assert_eq!(doc.text(), "Hello world");
/// # Ok::<(), rtfcodec::rtf::RtfError>(())
/// ```
pub struct Parser {
    options: ParserOptions,
    codec: Option<Box<dyn ImageCodec>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser with default options and the default image codec.
    pub fn new() -> Self {
        Self {
            options: ParserOptions::default(),
            codec: default_codec(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Decode pictures with `codec`.
    pub fn with_image_codec(mut self, codec: Box<dyn ImageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Skip pictures entirely.
    pub fn without_image_codec(mut self) -> Self {
        self.codec = None;
        self
    }

    #[inline]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse `input` and append its content to the end of `sink`.
    pub fn parse(&self, input: &[u8], sink: &mut dyn DocumentSink) -> RtfResult<()> {
        self.parse_at(input, sink, Anchor::End)
    }

    /// Parse `input` and insert its content at `at`.
    ///
    /// Content already committed to the sink stays there if an error aborts
    /// the parse.
    pub fn parse_at(
        &self,
        input: &[u8],
        sink: &mut dyn DocumentSink,
        at: Anchor,
    ) -> RtfResult<()> {
        if !input.starts_with(b"{\\rtf") {
            return Err(RtfError::InvalidFormat);
        }
        let text = std::str::from_utf8(input).map_err(|err| RtfError::InvalidEncoding {
            offset: err.valid_up_to(),
        })?;

        let mut ctx = ParserContext::new(text, sink, self.codec.as_deref(), &self.options, at);
        let result = ctx.run();
        ctx.release_marks();
        result
    }
}

/// Parse `input` with default options, appending to `sink`.
pub fn parse(input: &[u8], sink: &mut dyn DocumentSink) -> RtfResult<()> {
    Parser::new().parse(input, sink)
}

/// Mutable state of one parse, handed to every control word handler.
pub struct ParserContext<'a> {
    pub(crate) lexer: Lexer<'a>,
    pub(crate) sink: &'a mut dyn DocumentSink,
    pub(crate) codec: Option<&'a dyn ImageCodec>,
    pub(crate) dpi: u32,
    /// Document codepage from `\ansicpg`
    pub(crate) codepage: Option<u16>,
    /// Codepage implied by `\ansi`, `\mac`, `\pc` or `\pca`
    pub(crate) default_codepage: u16,
    /// Font from `\deff`
    pub(crate) default_font: Option<i32>,
    pub(crate) default_language: i32,
    /// Open groups
    pub(crate) nesting: usize,
    /// Active destination
    pub(crate) dest: Destination,
    /// Destinations suspended by the active one, innermost last
    pub(crate) parents: Vec<Destination>,
    pub(crate) colors: ColorTable,
    pub(crate) fonts: FontTable,
    /// Number inserted by `\chftn`
    pub(crate) footnote_number: u32,
    /// Text read since the last flush
    pub(crate) text: String,
    decoder: ByteDecoder,
    high_surrogate: Option<u16>,
    /// Start of the text not yet formatted; stays before insertions
    pub(crate) start: MarkId,
    /// Insertion point; moves past insertions
    pub(crate) end: MarkId,
}

impl<'a> ParserContext<'a> {
    pub(crate) fn new(
        input: &'a str,
        sink: &'a mut dyn DocumentSink,
        codec: Option<&'a dyn ImageCodec>,
        options: &ParserOptions,
        at: Anchor,
    ) -> Self {
        let start = sink.create_mark(at, Gravity::Left);
        let end = sink.create_mark(at, Gravity::Right);

        let mut attr = Attributes::default();
        attr.character.language = options.default_language;

        Self {
            lexer: Lexer::new(input),
            sink,
            codec,
            dpi: options.dpi,
            codepage: None,
            default_codepage: options.default_codepage,
            default_font: None,
            default_language: options.default_language,
            nesting: 0,
            dest: Destination::new(DestinationKind::Document, 0, State::Attributes(attr)),
            parents: Vec::new(),
            colors: ColorTable::new(),
            fonts: FontTable::new(),
            footnote_number: 1,
            text: String::new(),
            decoder: ByteDecoder::new(),
            high_surrogate: None,
            start,
            end,
        }
    }

    /// Run the main loop until the outermost group closes.
    fn run(&mut self) -> RtfResult<()> {
        while let Some(token) = self.lexer.next_token()? {
            match token {
                Token::OpenGroup => self.push_group()?,
                Token::CloseGroup => self.pop_group()?,
                Token::Control(word) => self.dispatch(word)?,
                Token::HexByte(byte) => self.push_byte(byte)?,
                Token::Char(ch) => self.push_char(ch)?,
            }
            if self.nesting == 0 {
                // Anything after the closing brace is not part of the document
                return Ok(());
            }
        }
        Err(RtfError::UnexpectedEof {
            open_groups: self.nesting,
        })
    }

    fn release_marks(&mut self) {
        self.sink.delete_mark(self.start);
        self.sink.delete_mark(self.end);
    }

    /// Hand the pending text to the active destination.
    pub(crate) fn flush(&mut self) -> RtfResult<()> {
        (self.dest.info().flush)(self)
    }

    pub(crate) fn push_group(&mut self) -> RtfResult<()> {
        self.flush()?;
        self.nesting += 1;
        self.dest.push_state();
        Ok(())
    }

    /// Close a group. If the group was the one that opened the active
    /// destination, the destination is cleaned up and dropped, and the
    /// parent's state from before the group is restored as well.
    pub(crate) fn pop_group(&mut self) -> RtfResult<()> {
        let offset = self.lexer.position().saturating_sub(1);
        if self.nesting == 0 {
            return Err(RtfError::UnbalancedGroup { offset });
        }
        self.nesting -= 1;
        self.flush()?;

        // Several destinations can be entered inside one group, as in
        // `{\*\foo\*\bar ...}`; all of them end here.
        while self.nesting < self.dest.nesting_level {
            (self.dest.info().cleanup)(self)?;
            let parent = self
                .parents
                .pop()
                .ok_or(RtfError::UnbalancedGroup { offset })?;
            let finished = mem::replace(&mut self.dest, parent);
            debug_assert_eq!(finished.depth(), 0);
            tracing::trace!(destination = ?finished.kind, "leaving destination");
            self.flush()?;
        }

        if !self.dest.pop_state() {
            return Err(RtfError::UnbalancedGroup { offset });
        }
        Ok(())
    }

    /// Enter a destination at the current nesting level.
    pub(crate) fn push_destination(&mut self, kind: DestinationKind) {
        let info = kind.info();
        let state = match self.dest.state.attributes() {
            Some(attr) if info.inherit_attributes => State::Attributes(attr.clone()),
            _ => (info.new_state)(),
        };
        tracing::trace!(destination = ?kind, nesting = self.nesting, "entering destination");
        let dest = Destination::new(kind, self.nesting, state);
        self.parents.push(mem::replace(&mut self.dest, dest));
    }

    fn dispatch(&mut self, word: ControlWord<'a>) -> RtfResult<()> {
        let kind = self.dest.kind;
        let entry = if word.ignorable {
            kind.lookup(&format!("*{}", word.name))
        } else {
            kind.lookup(word.name)
        };
        let Some(entry) = entry else {
            return self.skip_unknown(word);
        };

        match entry.kind {
            WordKind::NoParameter(handler) => {
                self.lexer.eat_space();
                if entry.flush {
                    self.flush()?;
                }
                handler(self, 0)
            },
            WordKind::OptionalParameter(handler, default) => {
                let param = match self.lexer.parse_parameter(word.name)? {
                    Some(param) => param,
                    None => {
                        self.lexer.eat_space();
                        default
                    },
                };
                if entry.flush {
                    self.flush()?;
                }
                handler(self, param)
            },
            WordKind::RequiredParameter(handler) => {
                let param = self.lexer.parse_parameter(word.name)?.ok_or_else(|| {
                    RtfError::MissingParameter {
                        word: word.name.to_string(),
                    }
                })?;
                if entry.flush {
                    self.flush()?;
                }
                handler(self, param)
            },
            WordKind::SpecialCharacter(text) => {
                // Control symbols are self-delimiting
                if is_word(word.name) {
                    self.lexer.eat_space();
                }
                self.push_str(text);
                Ok(())
            },
            WordKind::Destination(handler, kind) => {
                self.lexer.eat_space();
                if entry.flush {
                    self.flush()?;
                }
                if let Some(handler) = handler {
                    handler(self, 0)?;
                }
                self.push_destination(kind);
                Ok(())
            },
        }
    }

    fn skip_unknown(&mut self, word: ControlWord<'a>) -> RtfResult<()> {
        if is_word(word.name) && self.lexer.parse_parameter(word.name)?.is_none() {
            self.lexer.eat_space();
        }
        if word.ignorable {
            tracing::debug!(word = word.name, "ignoring unknown destination");
            self.push_destination(DestinationKind::Ignore);
        } else {
            tracing::debug!(word = word.name, "skipping unknown control word");
        }
        Ok(())
    }

    /// Encoding for `\'XX` escapes in the active destination.
    fn encoding(&self) -> RtfResult<TextEncoding> {
        (self.dest.info().codepage)(self)
            .or(self.codepage)
            .and_then(TextEncoding::for_codepage)
            .or_else(|| TextEncoding::for_codepage(self.default_codepage))
            .ok_or(RtfError::UnsupportedCharset(self.default_codepage as i32))
    }

    fn push_byte(&mut self, byte: u8) -> RtfResult<()> {
        let encoding = self.encoding()?;
        self.resolve_surrogate();
        self.decoder.push(byte, encoding, &mut self.text);
        Ok(())
    }

    fn push_char(&mut self, ch: char) -> RtfResult<()> {
        if ch as u32 > 0xFF {
            return Ok(());
        }
        if self.decoder.is_pending() {
            // Trail bytes of a multi-byte character may be plain ASCII
            return self.push_byte(ch as u8);
        }
        self.resolve_surrogate();
        self.text.push(ch);
        Ok(())
    }

    /// Append text to the pending buffer.
    pub(crate) fn push_str(&mut self, text: &str) {
        self.resolve_surrogate();
        self.text.push_str(text);
    }

    /// Append one UTF-16 code unit from `\u`, pairing surrogates.
    pub(crate) fn push_unicode(&mut self, unit: u16) {
        match unit {
            0xD800..=0xDBFF => {
                self.resolve_surrogate();
                self.high_surrogate = Some(unit);
            },
            0xDC00..=0xDFFF => match self.high_surrogate.take() {
                Some(high) => {
                    let ch = char::decode_utf16([high, unit])
                        .next()
                        .and_then(Result::ok)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    self.text.push(ch);
                },
                None => {
                    tracing::warn!(unit, "unpaired low surrogate");
                    self.text.push(char::REPLACEMENT_CHARACTER);
                },
            },
            _ => {
                self.resolve_surrogate();
                self.text
                    .push(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
            },
        }
    }

    fn resolve_surrogate(&mut self) {
        if let Some(high) = self.high_surrogate.take() {
            tracing::warn!(unit = high, "unpaired high surrogate");
            self.text.push(char::REPLACEMENT_CHARACTER);
        }
    }

    /// Take the pending text, leaving the buffer empty.
    pub(crate) fn take_text(&mut self) -> String {
        self.resolve_surrogate();
        if self.decoder.is_pending() {
            tracing::warn!("dropping incomplete multi-byte character");
            self.decoder.clear();
        }
        mem::take(&mut self.text)
    }

    /// Attributes of the innermost group, for destinations that carry them.
    #[inline]
    pub(crate) fn attributes_mut(&mut self) -> Option<&mut Attributes> {
        self.dest.state.attributes_mut()
    }

    /// Check a color index against the color table.
    pub(crate) fn color_ref(&self, index: i32) -> RtfResult<ColorRef> {
        match ColorRef::try_from(index) {
            Ok(i) if usize::from(i) < self.colors.len() => Ok(i),
            _ => Err(RtfError::UndefinedColor(index)),
        }
    }

    /// Font applied to text without an explicit `\f`.
    pub(crate) fn fallback_font(&self) -> Option<i32> {
        self.default_font
            .filter(|&font| self.fonts.get(font).is_some())
    }

    /// Properties of a tag as currently defined by the font table and color
    /// table. Style tags have none of their own.
    pub(crate) fn tag_properties(&self, tag: &TagName) -> Option<TextProperties> {
        match tag {
            TagName::Font(index) => self.fonts.get(*index).map(|entry| TextProperties {
                family: Some(entry.family_string()),
                ..TextProperties::default()
            }),
            _ => tag.properties(&self.colors, self.dpi),
        }
    }

    /// Apply the tags describing `attr` between two positions, registering
    /// any tag the sink does not have yet.
    pub(crate) fn apply_attributes(&mut self, attr: &Attributes, start: Anchor, end: Anchor) {
        for tag in attribute_tags(attr, self.fallback_font()) {
            if !self.sink.has_tag(&tag) {
                match self.tag_properties(&tag) {
                    Some(properties) => self.sink.ensure_tag(&tag, properties),
                    None => {
                        tracing::debug!(tag = %tag, "no definition for tag");
                        continue;
                    },
                }
            }
            self.sink.apply_tag(&tag, start, end);
        }
    }
}

#[inline]
fn is_word(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic())
}
