//! Destination handlers.
//!
//! A destination is a parsing scope with its own control words, its own
//! per-group state and its own way of consuming text. Each
//! [`DestinationKind`] maps to a static [`DestinationInfo`] holding its word
//! tables and the function pointers the parser calls on flush, on cleanup
//! and when resolving the codepage of `\'XX` escapes.

pub mod color_table;
pub mod document;
pub mod font_table;
pub mod footnote;
pub mod ignore;
pub mod picture;
pub mod stylesheet;

use super::error::RtfResult;
use super::parser::ParserContext;
use super::state::Attributes;

pub use color_table::ColorTableState;
pub use font_table::FontTableState;
pub use picture::PictureState;
pub use stylesheet::StylesheetState;

/// Control word handler, called with the word's parameter (0 for words
/// without one).
pub type Handler = fn(&mut ParserContext<'_>, i32) -> RtfResult<()>;

/// How a control word is read and what it does.
#[derive(Clone, Copy)]
pub enum WordKind {
    /// No parameter; a number after the word is ordinary text
    NoParameter(Handler),
    /// Parameter with a default used when none is given
    OptionalParameter(Handler, i32),
    /// Parameter that must be present
    RequiredParameter(Handler),
    /// Appends fixed text to the pending text
    SpecialCharacter(&'static str),
    /// Enters a destination, after an optional handler
    Destination(Option<Handler>, DestinationKind),
}

/// One entry of a control word table.
#[derive(Clone, Copy)]
pub struct ControlWord {
    pub kind: WordKind,
    /// Flush pending text with the old state before the handler runs
    pub flush: bool,
}

impl ControlWord {
    pub const fn no_parameter(handler: Handler, flush: bool) -> Self {
        Self {
            kind: WordKind::NoParameter(handler),
            flush,
        }
    }

    pub const fn optional(handler: Handler, default: i32, flush: bool) -> Self {
        Self {
            kind: WordKind::OptionalParameter(handler, default),
            flush,
        }
    }

    pub const fn required(handler: Handler, flush: bool) -> Self {
        Self {
            kind: WordKind::RequiredParameter(handler),
            flush,
        }
    }

    pub const fn special(text: &'static str) -> Self {
        Self {
            kind: WordKind::SpecialCharacter(text),
            flush: false,
        }
    }

    pub const fn destination(handler: Option<Handler>, kind: DestinationKind, flush: bool) -> Self {
        Self {
            kind: WordKind::Destination(handler, kind),
            flush,
        }
    }
}

/// Control words keyed by name. Words only recognized after `\*` are keyed
/// with the asterisk, e.g. `"*cs"`.
pub type WordTable = phf::Map<&'static str, ControlWord>;

/// Kinds of destination the parser knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Document,
    ColorTable,
    FontTable,
    Footnote,
    Stylesheet,
    Picture,
    /// `\*\shppict`, a container for one `\pict`
    ShapePicture,
    Ignore,
}

/// Static description of a destination.
pub struct DestinationInfo {
    /// Word tables, searched in order
    pub words: &'static [&'static WordTable],
    /// State for a fresh destination
    pub new_state: fn() -> State,
    /// Start from a copy of the invoking destination's attributes instead
    pub inherit_attributes: bool,
    /// Consume the pending text
    pub flush: fn(&mut ParserContext<'_>) -> RtfResult<()>,
    /// Run once when the destination's scope closes
    pub cleanup: fn(&mut ParserContext<'_>) -> RtfResult<()>,
    /// Codepage for `\'XX` escapes, overriding the document's
    pub codepage: fn(&ParserContext<'_>) -> Option<u16>,
}

impl DestinationKind {
    pub fn info(self) -> &'static DestinationInfo {
        match self {
            DestinationKind::Document => &document::DOCUMENT_DESTINATION,
            DestinationKind::ColorTable => &color_table::COLOR_TABLE_DESTINATION,
            DestinationKind::FontTable => &font_table::FONT_TABLE_DESTINATION,
            DestinationKind::Footnote => &footnote::FOOTNOTE_DESTINATION,
            DestinationKind::Stylesheet => &stylesheet::STYLESHEET_DESTINATION,
            DestinationKind::Picture => &picture::PICTURE_DESTINATION,
            DestinationKind::ShapePicture => &picture::SHAPE_PICTURE_DESTINATION,
            DestinationKind::Ignore => &ignore::IGNORE_DESTINATION,
        }
    }

    /// Find a word in this destination's tables.
    pub fn lookup(self, key: &str) -> Option<&'static ControlWord> {
        self.info().words.iter().find_map(|table| table.get(key))
    }
}

/// Per-group state of a destination.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// Document body and footnotes
    Attributes(Attributes),
    ColorTable(ColorTableState),
    FontTable(FontTableState),
    Stylesheet(StylesheetState),
    Picture(PictureState),
    /// Destinations that keep no state
    Ignore,
}

impl State {
    /// Formatting attributes, for states that carry them.
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            State::Attributes(attr) => Some(attr),
            State::Stylesheet(style) => Some(&style.attributes),
            _ => None,
        }
    }

    pub fn attributes_mut(&mut self) -> Option<&mut Attributes> {
        match self {
            State::Attributes(attr) => Some(attr),
            State::Stylesheet(style) => Some(&mut style.attributes),
            _ => None,
        }
    }
}

/// An active destination on the parser's stack.
#[derive(Debug, Clone)]
pub struct Destination {
    pub kind: DestinationKind,
    /// Group nesting level at which the destination was entered
    pub nesting_level: usize,
    /// State of the innermost group
    pub state: State,
    /// States of the enclosing groups, restored on `}`
    saved: Vec<State>,
    /// Binary payload decoded so far (pictures)
    pub payload: Vec<u8>,
    /// High nibble of a hex pair split across flushes
    pub carry: Option<u8>,
    /// Payload decoding failed; later data is ignored
    pub failed: bool,
}

impl Destination {
    pub fn new(kind: DestinationKind, nesting_level: usize, state: State) -> Self {
        Self {
            kind,
            nesting_level,
            state,
            saved: Vec::new(),
            payload: Vec::new(),
            carry: None,
            failed: false,
        }
    }

    #[inline]
    pub fn info(&self) -> &'static DestinationInfo {
        self.kind.info()
    }

    /// Enter a group: the current state is kept and a copy saved for `}`.
    pub fn push_state(&mut self) {
        self.saved.push(self.state.clone());
    }

    /// Leave a group, restoring the enclosing state. Returns `false` if no
    /// group of this destination is open.
    pub fn pop_state(&mut self) -> bool {
        match self.saved.pop() {
            Some(state) => {
                self.state = state;
                true
            },
            None => false,
        }
    }

    /// Number of open groups inside this destination.
    #[inline]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

/// Flush that discards the pending text.
pub(crate) fn discard_text(ctx: &mut ParserContext<'_>) -> RtfResult<()> {
    ctx.text.clear();
    Ok(())
}

pub(crate) fn no_cleanup(_: &mut ParserContext<'_>) -> RtfResult<()> {
    Ok(())
}

pub(crate) fn no_codepage(_: &ParserContext<'_>) -> Option<u16> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_searches_tables_in_order() {
        assert!(matches!(
            DestinationKind::Document.lookup("par").map(|w| w.kind),
            Some(WordKind::SpecialCharacter("\n"))
        ));
        assert!(DestinationKind::Document.lookup("b").is_some());
        assert!(DestinationKind::Document.lookup("fonttbl").is_some());
        assert!(DestinationKind::FontTable.lookup("fonttbl").is_none());
        assert!(DestinationKind::Stylesheet.lookup("*cs").is_some());
        assert!(DestinationKind::Stylesheet.lookup("cs").is_none());
        assert!(DestinationKind::Ignore.lookup("b").is_none());
        for kind in [
            DestinationKind::ColorTable,
            DestinationKind::FontTable,
            DestinationKind::Stylesheet,
            DestinationKind::Ignore,
        ] {
            assert!(kind.lookup("u").is_some());
            assert!(kind.lookup("uc").is_some());
        }
        assert!(DestinationKind::ShapePicture.lookup("pict").is_some());
    }

    #[test]
    fn test_destination_state_stack() {
        let mut dest = Destination::new(
            DestinationKind::Document,
            0,
            State::Attributes(Attributes::default()),
        );
        assert!(!dest.pop_state());

        dest.push_state();
        if let Some(attr) = dest.state.attributes_mut() {
            attr.style = Some(3);
        }
        assert_eq!(dest.depth(), 1);
        assert!(dest.pop_state());
        assert_eq!(dest.state.attributes().and_then(|a| a.style), None);
    }

    #[test]
    fn test_stateless_destinations_have_no_attributes() {
        assert!(State::Ignore.attributes().is_none());
        let style = State::Stylesheet(StylesheetState::default());
        assert!(style.attributes().is_some());
    }
}
