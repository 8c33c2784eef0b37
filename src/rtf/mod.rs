//! RTF (Rich Text Format) codec.
//!
//! Reading and writing both go through abstract document interfaces, so the
//! codec is independent of any particular text widget:
//!
//! - **Lexer**: Tokenizes RTF input into groups, control words, control
//!   symbols, hex escapes and literal text
//! - **Parser**: A destination state machine that turns tokens into text
//!   insertions and named formatting tags on a [`DocumentSink`]
//! - **Writer**: Reads a [`DocumentSource`] back out as RTF
//!
//! [`RichTextBuffer`] implements both interfaces and is what the examples
//! below use.
//!
//! # Example
//!
//! ```rust
//! use rtfcodec::rtf::{Parser, RichTextBuffer, TagName};
//!
//! let rtf = r"{\rtf1\ansi{\fonttbl{\f0\fswiss Helvetica;}}\f0\pard Hello {\b World}!\par}";
//! let mut doc = RichTextBuffer::new();
//! Parser::new().parse(rtf.as_bytes(), &mut doc)?;
//!
//! assert_eq!(doc.text(), "Hello World!");
//! assert!(doc.tags_at(6).contains(&&TagName::Bold));
//! # Ok::<(), rtfcodec::rtf::RtfError>(())
//! ```
//!
//! Writing it back:
//!
//! ```rust
//! use rtfcodec::rtf::{RichTextBuffer, serialize};
//!
//! let mut doc = RichTextBuffer::new();
//! doc.append("caf\u{e9}", &[]);
//! let rtf = serialize(&doc, 0..doc.len());
//! assert!(rtf.contains(r"{caf\'E9}"));
//! ```

mod buffer;
mod destinations;
mod error;
mod lexer;
mod parser;
mod picture;
mod sink;
mod source;
mod state;
mod tags;
mod types;
mod writer;

// Re-exports
pub use buffer::{OBJECT_REPLACEMENT, RichTextBuffer};
pub use error::{RtfError, RtfResult};
pub use lexer::{ControlWord, Lexer, Token};
pub use parser::{Parser, ParserOptions, parse};
#[cfg(feature = "imgconv")]
pub use picture::RasterCodec;
pub use picture::{Image, ImageCodec, ImageError, PictureFormat, detect_picture_format};
pub use sink::{Anchor, DocumentSink, Gravity, MarkId};
pub use source::{DocumentSource, Inline, SourceRun};
pub use state::LANGUAGE_NONE;
pub use tags::{SCRIPT_RISE, SCRIPT_SCALE, TagName, TextProperties};
pub use types::{
    Color, ColorRef, ColorTable, FontEntry, FontFamily, FontTable, Justification, StyleKind,
    TabStops, TextDirection, Underline, VerticalPosition,
};
pub use writer::{
    DEFAULT_HEX_BYTES_PER_LINE, DEFAULT_WRAP_COLUMN, RtfWriter, WriterOptions, serialize,
};
